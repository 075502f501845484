//! Scheduling parameters
//!
//! [`TweenParams`] is the configuration surface of `add_tween` and
//! `add_caller`. It is built either with the builder methods or parsed from a
//! JSON parameters object, where every key that is not a recognized option is
//! a property to animate.

use crate::easing::{Easing, Transition, TransitionParams};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde_json::Value;
use tweener_core::{Callback, IntoCallbackResult, Result, Target, TweenError};

/// Requested property values in insertion order
pub type RawProperties = IndexMap<String, Value, FxBuildHasher>;

/// Lifecycle callbacks of one entry
#[derive(Clone, Debug, Default)]
pub struct Callbacks {
    pub on_start: Option<Callback>,
    pub on_update: Option<Callback>,
    pub on_complete: Option<Callback>,
    pub on_overwrite: Option<Callback>,
}

/// A transition given by name or already resolved
#[derive(Clone, Debug)]
pub enum TransitionSource {
    Named(String),
    Resolved(Transition),
}

impl From<&str> for TransitionSource {
    fn from(name: &str) -> Self {
        TransitionSource::Named(name.to_string())
    }
}

impl From<String> for TransitionSource {
    fn from(name: String) -> Self {
        TransitionSource::Named(name)
    }
}

impl From<Easing> for TransitionSource {
    fn from(easing: Easing) -> Self {
        TransitionSource::Resolved(Transition::Easing(easing))
    }
}

impl From<Transition> for TransitionSource {
    fn from(transition: Transition) -> Self {
        TransitionSource::Resolved(transition)
    }
}

/// Parameters of a tween or caller
///
/// `time` and `delay` are in seconds. Callers use `count` (default 1) and
/// `wait_frames`; tweens ignore them.
#[derive(Clone, Debug)]
pub struct TweenParams {
    pub(crate) time: f64,
    pub(crate) delay: f64,
    pub(crate) transition: Option<TransitionSource>,
    pub(crate) transition_params: TransitionParams,
    pub(crate) callbacks: Callbacks,
    pub(crate) rounded: bool,
    pub(crate) min: Option<f64>,
    pub(crate) max: Option<f64>,
    pub(crate) skip_updates: u32,
    pub(crate) count: u32,
    pub(crate) wait_frames: bool,
    pub(crate) properties: RawProperties,
}

impl Default for TweenParams {
    fn default() -> Self {
        Self {
            time: 0.0,
            delay: 0.0,
            transition: None,
            transition_params: TransitionParams::default(),
            callbacks: Callbacks::default(),
            rounded: false,
            min: None,
            max: None,
            skip_updates: 0,
            count: 1,
            wait_frames: false,
            properties: RawProperties::default(),
        }
    }
}

impl TweenParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration in seconds
    pub fn time(mut self, seconds: f64) -> Self {
        self.time = seconds;
        self
    }

    /// Delay before the start in seconds
    pub fn delay(mut self, seconds: f64) -> Self {
        self.delay = seconds;
        self
    }

    /// Transition by name, [`Easing`] or [`Transition`]
    pub fn transition(mut self, transition: impl Into<TransitionSource>) -> Self {
        self.transition = Some(transition.into());
        self
    }

    pub fn transition_params(mut self, params: TransitionParams) -> Self {
        self.transition_params = params;
        self
    }

    pub fn on_start<F, R>(mut self, f: F) -> Self
    where
        F: Fn(&Target) -> R + 'static,
        R: IntoCallbackResult,
    {
        self.callbacks.on_start = Some(Callback::new(f));
        self
    }

    pub fn on_start_scoped<F, R>(mut self, scope: Target, f: F) -> Self
    where
        F: Fn(&Target) -> R + 'static,
        R: IntoCallbackResult,
    {
        self.callbacks.on_start = Some(Callback::new(f).with_scope(scope));
        self
    }

    pub fn on_update<F, R>(mut self, f: F) -> Self
    where
        F: Fn(&Target) -> R + 'static,
        R: IntoCallbackResult,
    {
        self.callbacks.on_update = Some(Callback::new(f));
        self
    }

    pub fn on_update_scoped<F, R>(mut self, scope: Target, f: F) -> Self
    where
        F: Fn(&Target) -> R + 'static,
        R: IntoCallbackResult,
    {
        self.callbacks.on_update = Some(Callback::new(f).with_scope(scope));
        self
    }

    pub fn on_complete<F, R>(mut self, f: F) -> Self
    where
        F: Fn(&Target) -> R + 'static,
        R: IntoCallbackResult,
    {
        self.callbacks.on_complete = Some(Callback::new(f));
        self
    }

    pub fn on_complete_scoped<F, R>(mut self, scope: Target, f: F) -> Self
    where
        F: Fn(&Target) -> R + 'static,
        R: IntoCallbackResult,
    {
        self.callbacks.on_complete = Some(Callback::new(f).with_scope(scope));
        self
    }

    pub fn on_overwrite<F, R>(mut self, f: F) -> Self
    where
        F: Fn(&Target) -> R + 'static,
        R: IntoCallbackResult,
    {
        self.callbacks.on_overwrite = Some(Callback::new(f));
        self
    }

    pub fn on_overwrite_scoped<F, R>(mut self, scope: Target, f: F) -> Self
    where
        F: Fn(&Target) -> R + 'static,
        R: IntoCallbackResult,
    {
        self.callbacks.on_overwrite = Some(Callback::new(f).with_scope(scope));
        self
    }

    /// Round written values to the nearest integer, halves toward +inf
    pub fn rounded(mut self, rounded: bool) -> Self {
        self.rounded = rounded;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Apply only every `n + 1`th frame
    pub fn skip_updates(mut self, n: u32) -> Self {
        self.skip_updates = n;
        self
    }

    /// Number of calls spread over `time` (callers only)
    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// At most one call per frame (callers only)
    pub fn wait_frames(mut self, wait: bool) -> Self {
        self.wait_frames = wait;
        self
    }

    /// Property to animate; the value is a number, or whatever a registered
    /// splitter or modifier of that name accepts
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn properties(&self) -> &RawProperties {
        &self.properties
    }

    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    /// Parse a parameters object
    ///
    /// Recognized keys use the camelCase names of the classic API (`time`,
    /// `delay`, `transition`, `transitionParams`, `rounded`, `min`, `max`,
    /// `skipUpdates`, `count`, `waitFrames`). Callback keys cannot be
    /// expressed in JSON and are ignored. Everything else is a property.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| TweenError::invalid("params", "expected a JSON object"))?;

        let mut params = Self::default();
        for (key, value) in object {
            match key.as_str() {
                "time" => params.time = number(key, value)?,
                "delay" => params.delay = number(key, value)?,
                "transition" => {
                    let name = value.as_str().ok_or_else(|| {
                        TweenError::invalid(key.as_str(), "expected a transition name")
                    })?;
                    params.transition = Some(TransitionSource::Named(name.to_string()));
                }
                "transitionParams" => {
                    params.transition_params = serde_json::from_value(value.clone())
                        .map_err(|e| TweenError::invalid(key.as_str(), e.to_string()))?;
                }
                "rounded" => {
                    params.rounded = value
                        .as_bool()
                        .ok_or_else(|| TweenError::invalid(key.as_str(), "expected a boolean"))?;
                }
                "waitFrames" => {
                    params.wait_frames = value
                        .as_bool()
                        .ok_or_else(|| TweenError::invalid(key.as_str(), "expected a boolean"))?;
                }
                "min" => params.min = Some(number(key, value)?),
                "max" => params.max = Some(number(key, value)?),
                "skipUpdates" => params.skip_updates = counter(key, value)?,
                "count" => params.count = counter(key, value)?,
                k if is_callback_key(k) => {
                    tracing::warn!("TweenParams: ignoring callback key `{}` in JSON parameters", k);
                }
                _ => {
                    params.properties.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(params)
    }

    /// Check timing values before an entry is built
    pub fn validate(&self) -> Result<()> {
        if !self.time.is_finite() || self.time < 0.0 {
            return Err(TweenError::invalid(
                "time",
                format!("must be a non-negative number of seconds, got {}", self.time),
            ));
        }
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(TweenError::invalid(
                "delay",
                format!("must be a non-negative number of seconds, got {}", self.delay),
            ));
        }
        for (name, bound) in [("min", self.min), ("max", self.max)] {
            if bound.is_some_and(f64::is_nan) {
                return Err(TweenError::invalid(name, "must be a number"));
            }
        }
        Ok(())
    }
}

fn number(key: &str, value: &Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| TweenError::invalid(key, format!("expected a number, got {value}")))
}

fn counter(key: &str, value: &Value) -> Result<u32> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| TweenError::invalid(key, format!("expected a non-negative integer, got {value}")))
}

fn is_callback_key(key: &str) -> bool {
    ["onStart", "onUpdate", "onComplete", "onOverwrite"]
        .iter()
        .any(|prefix| key.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_collects_properties_in_order() {
        let params = TweenParams::new()
            .time(1.5)
            .property("y", 2.0)
            .property("x", 1.0);

        assert_eq!(params.time, 1.5);
        let names: Vec<&str> = params.properties().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["y", "x"]);
        assert_eq!(params.count, 1);
    }

    #[test]
    fn test_from_json_splits_options_and_properties() {
        let params = TweenParams::from_json(&json!({
            "x": 10,
            "alpha": 0.5,
            "time": 2,
            "delay": 0.25,
            "transition": "linear",
            "transitionParams": { "amplitude": 2.0 },
            "rounded": true,
            "min": 0,
            "max": 8,
            "skipUpdates": 2,
            "onCompleteParams": [1, 2]
        }))
        .unwrap();

        assert_eq!(params.time, 2.0);
        assert_eq!(params.delay, 0.25);
        assert!(matches!(params.transition, Some(TransitionSource::Named(ref n)) if n == "linear"));
        assert_eq!(params.transition_params.amplitude, Some(2.0));
        assert!(params.rounded);
        assert_eq!(params.min, Some(0.0));
        assert_eq!(params.max, Some(8.0));
        assert_eq!(params.skip_updates, 2);
        assert_eq!(params.properties().len(), 2);
        assert_eq!(params.properties()["x"], json!(10));
    }

    #[test]
    fn test_from_json_rejects_wrong_types() {
        let err = TweenParams::from_json(&json!({ "time": "slow" })).unwrap_err();
        assert!(matches!(err, TweenError::InvalidParameter { ref name, .. } if name == "time"));

        let err = TweenParams::from_json(&json!({ "count": -1 })).unwrap_err();
        assert!(matches!(err, TweenError::InvalidParameter { ref name, .. } if name == "count"));

        assert!(TweenParams::from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_validate_rejects_negative_timing() {
        assert!(TweenParams::new().time(-1.0).validate().is_err());
        assert!(TweenParams::new().delay(f64::INFINITY).validate().is_err());
        assert!(TweenParams::new().min(f64::NAN).validate().is_err());
        assert!(TweenParams::new().time(0.0).delay(0.5).validate().is_ok());
    }
}
