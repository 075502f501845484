//! Special properties
//!
//! Special properties are proxy properties: names that are not plain fields
//! of the target but are read and written through registered functions.
//! Three kinds exist:
//!
//! - [`SpecialProperty`] - a getter/setter pair, optionally with a pre-processor
//!   that rewrites the end value when the tween starts
//! - [`SpecialPropertySplitter`] - expands one value into several properties
//!   (e.g. `scale` into `scale_x` and `scale_y`)
//! - [`SpecialPropertyModifier`] - attaches an alternative blend function and
//!   its parameters to other properties of the same tween (e.g. `_bezier`)
//!
//! All of them are registered once at configuration time and resolved when a
//! tween is built, so the per-frame path never looks names up.

use crate::entry::{PropertyAccess, PropertyMap, PropertyModifier, PropertySlot};
use crate::params::RawProperties;
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::rc::Rc;
use tweener_core::{Result, TweenError, Tweenable};

/// Per-slot scratch object handed to special property functions
pub type Extra = Map<String, Value>;

pub type SpecialGetFn = dyn Fn(&dyn Tweenable, &Value, &Extra) -> Option<f64>;
pub type SpecialSetFn = dyn Fn(&mut dyn Tweenable, f64, &Value, &mut Extra);
pub type PreProcessFn = dyn Fn(&dyn Tweenable, &Value, f64, &Extra) -> f64;
pub type SplitFn = dyn Fn(&Value, &Value) -> Vec<SplitValue>;
pub type ModifyFn = dyn Fn(&Value) -> Vec<ModifiedValue>;
pub type BlendFn = dyn Fn(f64, f64, f64, &Value) -> f64;

/// A property read and written through functions
pub struct SpecialProperty {
    get: Rc<SpecialGetFn>,
    set: Rc<SpecialSetFn>,
    parameters: Value,
    pre_process: Option<Rc<PreProcessFn>>,
}

impl SpecialProperty {
    pub fn new<G, S>(get: G, set: S) -> Self
    where
        G: Fn(&dyn Tweenable, &Value, &Extra) -> Option<f64> + 'static,
        S: Fn(&mut dyn Tweenable, f64, &Value, &mut Extra) + 'static,
    {
        Self {
            get: Rc::new(get),
            set: Rc::new(set),
            parameters: Value::Null,
            pre_process: None,
        }
    }

    /// Fixed parameters passed to every call
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Rewrite the end value from the originally requested one when the tween starts
    pub fn with_pre_process<F>(mut self, pre_process: F) -> Self
    where
        F: Fn(&dyn Tweenable, &Value, f64, &Extra) -> f64 + 'static,
    {
        self.pre_process = Some(Rc::new(pre_process));
        self
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    pub fn get_value(&self, target: &dyn Tweenable, extra: &Extra) -> Option<f64> {
        (self.get)(target, &self.parameters, extra)
    }

    pub fn set_value(&self, target: &mut dyn Tweenable, value: f64, extra: &mut Extra) {
        (self.set)(target, value, &self.parameters, extra)
    }

    /// `None` when no pre-processor is registered
    pub fn pre_process(
        &self,
        target: &dyn Tweenable,
        original_value: f64,
        extra: &Extra,
    ) -> Option<f64> {
        self.pre_process
            .as_ref()
            .map(|f| f(target, &self.parameters, original_value, extra))
    }
}

/// One component produced by a splitter
#[derive(Clone, Debug, PartialEq)]
pub struct SplitValue {
    pub name: String,
    pub value: f64,
    pub array_index: usize,
}

impl SplitValue {
    pub fn new(name: impl Into<String>, value: f64, array_index: usize) -> Self {
        Self {
            name: name.into(),
            value,
            array_index,
        }
    }
}

/// Expands one requested value into several properties
pub struct SpecialPropertySplitter {
    split: Rc<SplitFn>,
    parameters: Value,
}

impl SpecialPropertySplitter {
    pub fn new<F>(split: F) -> Self
    where
        F: Fn(&Value, &Value) -> Vec<SplitValue> + 'static,
    {
        Self {
            split: Rc::new(split),
            parameters: Value::Null,
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn split(&self, value: &Value) -> Vec<SplitValue> {
        (self.split)(value, &self.parameters)
    }

    /// Names this splitter expands into, used to widen property filters
    pub fn component_names(&self) -> Vec<String> {
        self.split(&Value::from(0.0))
            .into_iter()
            .map(|part| part.name)
            .collect()
    }
}

/// Modifier parameters for one property
#[derive(Clone, Debug, PartialEq)]
pub struct ModifiedValue {
    pub name: String,
    pub parameters: Value,
}

impl ModifiedValue {
    pub fn new(name: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

/// Replaces the plain interpolation of some properties by a blend function
///
/// `modify` maps the requested value to per-property parameters; `blend`
/// receives `(start, end, factor, parameters)` where `factor` is the
/// transition evaluated over `[0, 1]`.
pub struct SpecialPropertyModifier {
    modify: Rc<ModifyFn>,
    blend: Rc<BlendFn>,
}

impl SpecialPropertyModifier {
    pub fn new<M, B>(modify: M, blend: B) -> Self
    where
        M: Fn(&Value) -> Vec<ModifiedValue> + 'static,
        B: Fn(f64, f64, f64, &Value) -> f64 + 'static,
    {
        Self {
            modify: Rc::new(modify),
            blend: Rc::new(blend),
        }
    }

    pub fn modify(&self, value: &Value) -> Vec<ModifiedValue> {
        (self.modify)(value)
    }

    pub fn blend(&self, start: f64, end: f64, factor: f64, parameters: &Value) -> f64 {
        (self.blend)(start, end, factor, parameters)
    }
}

/// Name-keyed registry of special properties, modifiers and splitters
#[derive(Clone, Default)]
pub struct SpecialPropertyRegistry {
    properties: FxHashMap<String, Rc<SpecialProperty>>,
    modifiers: FxHashMap<String, Rc<SpecialPropertyModifier>>,
    splitters: FxHashMap<String, Rc<SpecialPropertySplitter>>,
}

impl SpecialPropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_property(&mut self, name: impl Into<String>, property: SpecialProperty) {
        self.properties.insert(name.into(), Rc::new(property));
    }

    pub fn register_modifier(&mut self, name: impl Into<String>, modifier: SpecialPropertyModifier) {
        self.modifiers.insert(name.into(), Rc::new(modifier));
    }

    pub fn register_splitter(&mut self, name: impl Into<String>, splitter: SpecialPropertySplitter) {
        self.splitters.insert(name.into(), Rc::new(splitter));
    }

    pub fn property(&self, name: &str) -> Option<&Rc<SpecialProperty>> {
        self.properties.get(name)
    }

    pub fn modifier(&self, name: &str) -> Option<&Rc<SpecialPropertyModifier>> {
        self.modifiers.get(name)
    }

    pub fn splitter(&self, name: &str) -> Option<&Rc<SpecialPropertySplitter>> {
        self.splitters.get(name)
    }

    pub fn is_special_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Turn requested values into property slots
    ///
    /// Splitters are expanded (one nested level), modifiers attach to the
    /// properties they name, everything else must be a number. Slots whose
    /// name is a registered special property are bound to it here.
    pub(crate) fn build_properties(&self, raw: &RawProperties) -> Result<PropertyMap> {
        let mut staged: IndexMap<String, (f64, usize), FxBuildHasher> = IndexMap::default();
        let mut modified: FxHashMap<String, PropertyModifier> = FxHashMap::default();

        for (name, value) in raw {
            if let Some(splitter) = self.splitters.get(name) {
                for part in splitter.split(value) {
                    match self.splitters.get(&part.name) {
                        Some(inner) => {
                            for sub in inner.split(&Value::from(part.value)) {
                                staged.insert(sub.name, (sub.value, sub.array_index));
                            }
                        }
                        None => {
                            staged.insert(part.name, (part.value, part.array_index));
                        }
                    }
                }
            } else if let Some(modifier) = self.modifiers.get(name) {
                for entry in modifier.modify(value) {
                    modified.insert(
                        entry.name,
                        PropertyModifier::new(modifier.clone(), entry.parameters),
                    );
                }
            } else {
                let number = value.as_f64().ok_or_else(|| {
                    TweenError::invalid(name.as_str(), format!("expected a number, got {value}"))
                })?;
                staged.insert(name.clone(), (number, 0));
            }
        }

        let mut properties = PropertyMap::default();
        for (name, (value, array_index)) in staged {
            let access = match self.properties.get(&name) {
                Some(special) => PropertyAccess::Special(special.clone()),
                None => PropertyAccess::Plain,
            };
            let modifier = modified.remove(&name);
            properties.insert(
                name,
                PropertySlot::new(value, array_index, access, modifier),
            );
        }

        Ok(properties)
    }

    /// Widen a property filter: splitter names become their component names
    pub(crate) fn expand_filter<S: AsRef<str>>(&self, names: &[S]) -> SmallVec<[String; 4]> {
        let mut expanded: SmallVec<[String; 4]> = SmallVec::new();
        for name in names {
            let name: &str = name.as_ref();
            let components = match self.splitters.get(name) {
                Some(splitter) => splitter.component_names(),
                None => vec![name.to_string()],
            };
            for component in components {
                if !expanded.contains(&component) {
                    expanded.push(component);
                }
            }
        }
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tweener_core::PropertyBag;

    fn raw(pairs: &[(&str, Value)]) -> RawProperties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn xy_splitter() -> SpecialPropertySplitter {
        SpecialPropertySplitter::new(|value, _| {
            let (x, y) = match value {
                Value::Array(items) => (
                    items.first().and_then(Value::as_f64).unwrap_or(0.0),
                    items.get(1).and_then(Value::as_f64).unwrap_or(0.0),
                ),
                other => {
                    let v = other.as_f64().unwrap_or(0.0);
                    (v, v)
                }
            };
            vec![SplitValue::new("x", x, 0), SplitValue::new("y", y, 1)]
        })
    }

    #[test]
    fn test_plain_properties_keep_request_order() {
        let registry = SpecialPropertyRegistry::new();
        let props = registry
            .build_properties(&raw(&[("b", json!(2.0)), ("a", json!(1.0))]))
            .unwrap();

        let names: Vec<&str> = props.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(props["a"].value_complete(), 1.0);
        assert!(!props["a"].is_special_property());
    }

    #[test]
    fn test_non_numeric_plain_value_is_rejected() {
        let registry = SpecialPropertyRegistry::new();
        let err = registry
            .build_properties(&raw(&[("x", json!("far"))]))
            .unwrap_err();
        assert!(matches!(err, TweenError::InvalidParameter { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_splitter_expands_components() {
        let mut registry = SpecialPropertyRegistry::new();
        registry.register_splitter("position", xy_splitter());

        let props = registry
            .build_properties(&raw(&[("position", json!([3.0, 4.0]))]))
            .unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props["x"].value_complete(), 3.0);
        assert_eq!(props["y"].value_complete(), 4.0);
        assert_eq!(props["y"].array_index(), 1);
    }

    #[test]
    fn test_nested_splitter_is_expanded_once_more() {
        let mut registry = SpecialPropertyRegistry::new();
        registry.register_splitter("position", xy_splitter());
        registry.register_splitter(
            "both",
            SpecialPropertySplitter::new(|value, _| {
                vec![SplitValue::new("position", value.as_f64().unwrap_or(0.0), 0)]
            }),
        );

        let props = registry
            .build_properties(&raw(&[("both", json!(7.0))]))
            .unwrap();
        assert_eq!(props["x"].value_complete(), 7.0);
        assert_eq!(props["y"].value_complete(), 7.0);
    }

    #[test]
    fn test_split_components_bind_special_properties() {
        let mut registry = SpecialPropertyRegistry::new();
        registry.register_splitter("position", xy_splitter());
        registry.register_property(
            "x",
            SpecialProperty::new(
                |t, _, _| t.get_property("left"),
                |t, v, _, _| t.set_property("left", v),
            ),
        );

        let props = registry
            .build_properties(&raw(&[("position", json!(1.0))]))
            .unwrap();
        assert!(props["x"].is_special_property());
        assert!(!props["y"].is_special_property());
    }

    #[test]
    fn test_modifier_attaches_only_to_present_properties() {
        let mut registry = SpecialPropertyRegistry::new();
        registry.register_modifier(
            "_wobble",
            SpecialPropertyModifier::new(
                |value| {
                    vec![
                        ModifiedValue::new("x", value.clone()),
                        ModifiedValue::new("z", value.clone()),
                    ]
                },
                |b, e, t, _| b + (e - b) * t,
            ),
        );

        let props = registry
            .build_properties(&raw(&[("x", json!(10.0)), ("_wobble", json!([1.0]))]))
            .unwrap();
        assert_eq!(props.len(), 1);
        assert!(props["x"].has_modifier());
    }

    #[test]
    fn test_special_property_pre_process() {
        let special = SpecialProperty::new(|t, _, _| t.get_property("x"), |t, v, _, _| {
            t.set_property("x", v)
        })
        .with_pre_process(|_, _, original, _| original * 2.0);

        let bag = PropertyBag::new().with("x", 1.0);
        assert_eq!(special.pre_process(&bag, 5.0, &Extra::new()), Some(10.0));
        assert_eq!(special.get_value(&bag, &Extra::new()), Some(1.0));
    }

    #[test]
    fn test_expand_filter_replaces_splitter_names() {
        let mut registry = SpecialPropertyRegistry::new();
        registry.register_splitter("position", xy_splitter());

        let expanded = registry.expand_filter(&["position", "alpha", "x"]);
        assert_eq!(expanded.as_slice(), &["x", "y", "alpha"]);
    }
}
