//! Built-in special properties
//!
//! - `scale` splitter: a number (uniform) or `[x, y]` into `scale_x` and `scale_y`
//! - `_bezier` modifier: curved interpolation through control points, given
//!   as one object or a list of objects mapping property names to control
//!   values, e.g. `[{"x": 80.0}, {"x": 20.0}]`

use crate::engine::Tweener;
use crate::special::{ModifiedValue, SpecialPropertyModifier, SpecialPropertySplitter, SplitValue};
use serde_json::Value;
use std::collections::BTreeMap;

/// Register every preset on `tweener`
pub fn register_default_special_properties(tweener: &Tweener) {
    tweener.register_special_property_splitter("scale", scale_splitter());
    tweener.register_special_property_modifier("_bezier", bezier_modifier());
}

pub fn scale_splitter() -> SpecialPropertySplitter {
    SpecialPropertySplitter::new(|value, _| {
        let (x, y) = match value {
            Value::Array(items) => {
                let x = items.first().and_then(Value::as_f64).unwrap_or(1.0);
                let y = items.get(1).and_then(Value::as_f64).unwrap_or(x);
                (x, y)
            }
            other => {
                let uniform = other.as_f64().unwrap_or(1.0);
                (uniform, uniform)
            }
        };
        vec![
            SplitValue::new("scale_x", x, 0),
            SplitValue::new("scale_y", y, 1),
        ]
    })
}

pub fn bezier_modifier() -> SpecialPropertyModifier {
    SpecialPropertyModifier::new(bezier_modify, |b, e, t, parameters| {
        let points: Vec<f64> = parameters
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_f64).collect())
            .unwrap_or_default();
        bezier_get(b, e, t, &points)
    })
}

/// Group control values by property name
fn bezier_modify(value: &Value) -> Vec<ModifiedValue> {
    let points: &[Value] = match value {
        Value::Array(items) => items,
        other => std::slice::from_ref(other),
    };

    let mut grouped: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
    for point in points {
        if let Some(object) = point.as_object() {
            for (name, control) in object {
                grouped.entry(name).or_default().push(control.clone());
            }
        }
    }

    grouped
        .into_iter()
        .map(|(name, controls)| ModifiedValue::new(name, Value::Array(controls)))
        .collect()
}

/// Quadratic Bézier from `b` to `e`; several control points chain quadratic
/// segments joined at the midpoints between neighbouring controls
pub fn bezier_get(b: f64, e: f64, t: f64, points: &[f64]) -> f64 {
    match points.len() {
        0 => b + (e - b) * t,
        1 => b + t * (2.0 * (1.0 - t) * (points[0] - b) + t * (e - b)),
        n => {
            let segments = n as f64;
            let ip = ((t * segments).floor().max(0.0) as usize).min(n - 1);
            let it = (t - ip as f64 / segments) * segments;

            let p1 = if ip == 0 {
                b
            } else {
                (points[ip - 1] + points[ip]) / 2.0
            };
            let p2 = if ip == n - 1 {
                e
            } else {
                (points[ip] + points[ip + 1]) / 2.0
            };
            p1 + it * (2.0 * (1.0 - it) * (points[ip] - p1) + it * (p2 - p1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scale_splitter_accepts_number_and_pair() {
        let splitter = scale_splitter();

        let uniform = splitter.split(&json!(2.0));
        assert_eq!(uniform[0], SplitValue::new("scale_x", 2.0, 0));
        assert_eq!(uniform[1], SplitValue::new("scale_y", 2.0, 1));

        let pair = splitter.split(&json!([0.5, 3.0]));
        assert_eq!(pair[0].value, 0.5);
        assert_eq!(pair[1].value, 3.0);

        assert_eq!(splitter.component_names(), vec!["scale_x", "scale_y"]);
    }

    #[test]
    fn test_bezier_modify_groups_controls() {
        let modified = bezier_modify(&json!([{ "x": 80.0, "y": 5.0 }, { "x": 20.0 }]));
        assert_eq!(
            modified,
            vec![
                ModifiedValue::new("x", json!([80.0, 20.0])),
                ModifiedValue::new("y", json!([5.0])),
            ]
        );

        let single = bezier_modify(&json!({ "x": 1.0 }));
        assert_eq!(single, vec![ModifiedValue::new("x", json!([1.0]))]);
    }

    #[test]
    fn test_bezier_endpoints() {
        for points in [&[][..], &[50.0][..], &[50.0, -20.0, 70.0][..]] {
            assert!((bezier_get(0.0, 10.0, 0.0, points) - 0.0).abs() < 1e-9);
            assert!((bezier_get(0.0, 10.0, 1.0, points) - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_control_point_pulls_the_curve() {
        // Midpoint of a quadratic Bézier: (b + 2p + e) / 4
        assert!((bezier_get(0.0, 0.0, 0.5, &[100.0]) - 50.0).abs() < 1e-9);
    }
}
