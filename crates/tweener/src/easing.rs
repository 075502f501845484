//! Transition functions for tweens
//!
//! Every transition follows the parametrized easing signature
//! `f(t, b, c, d, params)`: elapsed time `t`, start value `b`, change `c`
//! and duration `d`. The built-in catalogue is the classic Penner set,
//! addressable by name (`"easeOutExpo"`, `"easeInOutQuad"`, ...).

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use tweener_core::TweenError;

/// Optional shape parameters for elastic and back transitions
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionParams {
    /// Elastic amplitude; ignored when smaller than the tweened change
    #[serde(default)]
    pub amplitude: Option<f64>,
    /// Elastic period in milliseconds (defaults to 30% of the duration)
    #[serde(default)]
    pub period: Option<f64>,
    /// Back overshoot (defaults to 1.70158)
    #[serde(default)]
    pub overshoot: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Curve {
    Linear,
    Quad,
    Cubic,
    Quart,
    Quint,
    Sine,
    Expo,
    Circ,
    Elastic,
    Back,
    Bounce,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    In,
    Out,
    InOut,
    OutIn,
}

/// Named easing curves
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Easing {
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseOutInQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseOutInCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseOutInQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseOutInQuint,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseOutInSine,
    EaseInExpo,
    #[default]
    EaseOutExpo,
    EaseInOutExpo,
    EaseOutInExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
    EaseOutInCirc,
    EaseInElastic,
    EaseOutElastic,
    EaseInOutElastic,
    EaseOutInElastic,
    EaseInBack,
    EaseOutBack,
    EaseInOutBack,
    EaseOutInBack,
    EaseInBounce,
    EaseOutBounce,
    EaseInOutBounce,
    EaseOutInBounce,
}

macro_rules! catalogue {
    ($($variant:ident => $name:literal, $curve:ident, $mode:ident;)*) => {
        const CATALOGUE: &[(Easing, &str, Curve, Mode)] = &[
            $((Easing::$variant, $name, Curve::$curve, Mode::$mode),)*
        ];
    };
}

catalogue! {
    Linear => "linear", Linear, In;
    EaseInQuad => "easeInQuad", Quad, In;
    EaseOutQuad => "easeOutQuad", Quad, Out;
    EaseInOutQuad => "easeInOutQuad", Quad, InOut;
    EaseOutInQuad => "easeOutInQuad", Quad, OutIn;
    EaseInCubic => "easeInCubic", Cubic, In;
    EaseOutCubic => "easeOutCubic", Cubic, Out;
    EaseInOutCubic => "easeInOutCubic", Cubic, InOut;
    EaseOutInCubic => "easeOutInCubic", Cubic, OutIn;
    EaseInQuart => "easeInQuart", Quart, In;
    EaseOutQuart => "easeOutQuart", Quart, Out;
    EaseInOutQuart => "easeInOutQuart", Quart, InOut;
    EaseOutInQuart => "easeOutInQuart", Quart, OutIn;
    EaseInQuint => "easeInQuint", Quint, In;
    EaseOutQuint => "easeOutQuint", Quint, Out;
    EaseInOutQuint => "easeInOutQuint", Quint, InOut;
    EaseOutInQuint => "easeOutInQuint", Quint, OutIn;
    EaseInSine => "easeInSine", Sine, In;
    EaseOutSine => "easeOutSine", Sine, Out;
    EaseInOutSine => "easeInOutSine", Sine, InOut;
    EaseOutInSine => "easeOutInSine", Sine, OutIn;
    EaseInExpo => "easeInExpo", Expo, In;
    EaseOutExpo => "easeOutExpo", Expo, Out;
    EaseInOutExpo => "easeInOutExpo", Expo, InOut;
    EaseOutInExpo => "easeOutInExpo", Expo, OutIn;
    EaseInCirc => "easeInCirc", Circ, In;
    EaseOutCirc => "easeOutCirc", Circ, Out;
    EaseInOutCirc => "easeInOutCirc", Circ, InOut;
    EaseOutInCirc => "easeOutInCirc", Circ, OutIn;
    EaseInElastic => "easeInElastic", Elastic, In;
    EaseOutElastic => "easeOutElastic", Elastic, Out;
    EaseInOutElastic => "easeInOutElastic", Elastic, InOut;
    EaseOutInElastic => "easeOutInElastic", Elastic, OutIn;
    EaseInBack => "easeInBack", Back, In;
    EaseOutBack => "easeOutBack", Back, Out;
    EaseInOutBack => "easeInOutBack", Back, InOut;
    EaseOutInBack => "easeOutInBack", Back, OutIn;
    EaseInBounce => "easeInBounce", Bounce, In;
    EaseOutBounce => "easeOutBounce", Bounce, Out;
    EaseInOutBounce => "easeInOutBounce", Bounce, InOut;
    EaseOutInBounce => "easeOutInBounce", Bounce, OutIn;
}

impl Easing {
    /// Every easing in the catalogue
    pub fn all() -> impl Iterator<Item = Easing> {
        CATALOGUE.iter().map(|(easing, ..)| *easing)
    }

    /// Catalogue name, e.g. `"easeOutExpo"`
    pub fn name(self) -> &'static str {
        self.entry().1
    }

    fn entry(self) -> &'static (Easing, &'static str, Curve, Mode) {
        CATALOGUE
            .iter()
            .find(|(easing, ..)| *easing == self)
            .unwrap_or(&CATALOGUE[0])
    }

    /// Evaluate over `(t, b, c, d)`
    pub fn evaluate(self, t: f64, b: f64, c: f64, d: f64, params: &TransitionParams) -> f64 {
        if d <= 0.0 || !d.is_finite() {
            return b + c;
        }

        let &(_, _, curve, mode) = self.entry();
        let half = d / 2.0;
        match mode {
            Mode::In => ease_in(curve, t, b, c, d, params),
            Mode::Out => ease_out(curve, t, b, c, d, params),
            Mode::InOut => match curve {
                Curve::Elastic => elastic_in_out(t, b, c, d, params),
                Curve::Back => back_in_out(t, b, c, d, params),
                _ if t < half => ease_in(curve, t * 2.0, b, c / 2.0, d, params),
                _ => ease_out(curve, t * 2.0 - d, b + c / 2.0, c / 2.0, d, params),
            },
            Mode::OutIn => {
                if t < half {
                    ease_out(curve, t * 2.0, b, c / 2.0, d, params)
                } else {
                    ease_in(curve, t * 2.0 - d, b + c / 2.0, c / 2.0, d, params)
                }
            }
        }
    }

    /// Apply the easing to a progress value (0.0 to 1.0)
    pub fn apply(self, t: f64) -> f64 {
        self.evaluate(t.clamp(0.0, 1.0), 0.0, 1.0, 1.0, &TransitionParams::default())
    }
}

impl FromStr for Easing {
    type Err = TweenError;

    /// Names match case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CATALOGUE
            .iter()
            .find(|(_, name, ..)| name.eq_ignore_ascii_case(s))
            .map(|(easing, ..)| *easing)
            .ok_or_else(|| TweenError::invalid("transition", format!("unknown transition `{s}`")))
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn ease_in(curve: Curve, t: f64, b: f64, c: f64, d: f64, params: &TransitionParams) -> f64 {
    let x = t / d;
    match curve {
        Curve::Linear => c * x + b,
        Curve::Quad => c * x * x + b,
        Curve::Cubic => c * x.powi(3) + b,
        Curve::Quart => c * x.powi(4) + b,
        Curve::Quint => c * x.powi(5) + b,
        Curve::Sine => -c * (x * FRAC_PI_2).cos() + c + b,
        Curve::Expo => {
            if t == 0.0 {
                b
            } else {
                c * 2f64.powf(10.0 * (x - 1.0)) + b
            }
        }
        Curve::Circ => -c * ((1.0 - x * x).max(0.0).sqrt() - 1.0) + b,
        Curve::Elastic => elastic_in(t, b, c, d, params),
        Curve::Back => {
            let s = params.overshoot.unwrap_or(1.70158);
            c * x * x * ((s + 1.0) * x - s) + b
        }
        Curve::Bounce => c - bounce_out(d - t, 0.0, c, d) + b,
    }
}

fn ease_out(curve: Curve, t: f64, b: f64, c: f64, d: f64, params: &TransitionParams) -> f64 {
    match curve {
        Curve::Bounce => bounce_out(t, b, c, d),
        Curve::Elastic => elastic_out(t, b, c, d, params),
        // The remaining out-curves are point reflections of their in-curves
        _ => b + c - ease_in(curve, d - t, 0.0, c, d, params),
    }
}

/// Amplitude and phase shift for an elastic oscillation of `period`
fn elastic_shape(c: f64, period: f64, params: &TransitionParams) -> (f64, f64) {
    match params.amplitude {
        Some(a) if a >= c.abs() && a != 0.0 => (a, period / (2.0 * PI) * (c / a).asin()),
        _ => (c, period / 4.0),
    }
}

fn elastic_in(t: f64, b: f64, c: f64, d: f64, params: &TransitionParams) -> f64 {
    if t == 0.0 {
        return b;
    }
    let x = t / d;
    if x == 1.0 {
        return b + c;
    }

    let period = params.period.unwrap_or(d * 0.3);
    let (amplitude, shift) = elastic_shape(c, period, params);
    let x = x - 1.0;
    -(amplitude * 2f64.powf(10.0 * x) * ((x * d - shift) * (2.0 * PI) / period).sin()) + b
}

fn elastic_out(t: f64, b: f64, c: f64, d: f64, params: &TransitionParams) -> f64 {
    if t == 0.0 {
        return b;
    }
    let x = t / d;
    if x == 1.0 {
        return b + c;
    }

    let period = params.period.unwrap_or(d * 0.3);
    let (amplitude, shift) = elastic_shape(c, period, params);
    amplitude * 2f64.powf(-10.0 * x) * ((x * d - shift) * (2.0 * PI) / period).sin() + c + b
}

fn elastic_in_out(t: f64, b: f64, c: f64, d: f64, params: &TransitionParams) -> f64 {
    if t == 0.0 {
        return b;
    }
    let x = t / (d / 2.0);
    if x == 2.0 {
        return b + c;
    }

    let period = params.period.unwrap_or(d * 0.45);
    let (amplitude, shift) = elastic_shape(c, period, params);
    let x = x - 1.0;
    let wave = ((x * d - shift) * (2.0 * PI) / period).sin();
    if x < 0.0 {
        -0.5 * (amplitude * 2f64.powf(10.0 * x) * wave) + b
    } else {
        amplitude * 2f64.powf(-10.0 * x) * wave * 0.5 + c + b
    }
}

fn back_in_out(t: f64, b: f64, c: f64, d: f64, params: &TransitionParams) -> f64 {
    let s = params.overshoot.unwrap_or(1.70158) * 1.525;
    let x = t / (d / 2.0);
    if x < 1.0 {
        c / 2.0 * (x * x * ((s + 1.0) * x - s)) + b
    } else {
        let x = x - 2.0;
        c / 2.0 * (x * x * ((s + 1.0) * x + s) + 2.0) + b
    }
}

fn bounce_out(t: f64, b: f64, c: f64, d: f64) -> f64 {
    let x = t / d;
    if x < 1.0 / 2.75 {
        c * (7.5625 * x * x) + b
    } else if x < 2.0 / 2.75 {
        let x = x - 1.5 / 2.75;
        c * (7.5625 * x * x + 0.75) + b
    } else if x < 2.5 / 2.75 {
        let x = x - 2.25 / 2.75;
        c * (7.5625 * x * x + 0.9375) + b
    } else {
        let x = x - 2.625 / 2.75;
        c * (7.5625 * x * x + 0.984375) + b
    }
}

// ============================================================================
// Transition
// ============================================================================

/// Signature of a custom transition function
pub type TransitionFn = dyn Fn(f64, f64, f64, f64, &TransitionParams) -> f64;

/// A resolved transition: a catalogue easing or a caller-supplied function
#[derive(Clone)]
pub enum Transition {
    Easing(Easing),
    Custom(Rc<TransitionFn>),
}

impl Transition {
    pub fn custom<F>(func: F) -> Self
    where
        F: Fn(f64, f64, f64, f64, &TransitionParams) -> f64 + 'static,
    {
        Transition::Custom(Rc::new(func))
    }

    /// Evaluate over `(t, b, c, d)`; a non-positive duration yields `b + c`
    pub fn evaluate(&self, t: f64, b: f64, c: f64, d: f64, params: &TransitionParams) -> f64 {
        if d <= 0.0 {
            return b + c;
        }
        match self {
            Transition::Easing(easing) => easing.evaluate(t, b, c, d, params),
            Transition::Custom(func) => func(t, b, c, d, params),
        }
    }
}

impl Default for Transition {
    fn default() -> Self {
        Transition::Easing(Easing::default())
    }
}

impl From<Easing> for Transition {
    fn from(easing: Easing) -> Self {
        Transition::Easing(easing)
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Easing(easing) => write!(f, "Transition({})", easing),
            Transition::Custom(_) => f.write_str("Transition(<custom>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_every_easing_hits_endpoints() {
        let params = TransitionParams::default();
        for easing in Easing::all() {
            let start = easing.evaluate(0.0, 10.0, 5.0, 100.0, &params);
            let end = easing.evaluate(100.0, 10.0, 5.0, 100.0, &params);
            assert!((start - 10.0).abs() < 1e-6, "{} starts at {}", easing, start);
            assert!((end - 15.0).abs() < 1e-6, "{} ends at {}", easing, end);
        }
    }

    #[test]
    fn test_linear_is_proportional() {
        let params = TransitionParams::default();
        assert!((Easing::Linear.evaluate(25.0, 0.0, 100.0, 100.0, &params) - 25.0).abs() < EPS);
        assert!((Easing::Linear.apply(0.5) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_in_curves_lag_and_out_curves_lead() {
        assert!(Easing::EaseInQuad.apply(0.5) < 0.5);
        assert!(Easing::EaseOutQuad.apply(0.5) > 0.5);
        assert!(Easing::EaseInCubic.apply(0.3) < Easing::EaseInQuad.apply(0.3));
        assert!((Easing::EaseInOutQuad.apply(0.5) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_back_overshoots() {
        assert!(Easing::EaseInBack.apply(0.2) < 0.0);
        assert!(Easing::EaseOutBack.apply(0.8) > 1.0);
    }

    #[test]
    fn test_names_round_trip_case_insensitively() {
        assert_eq!("easeOutExpo".parse::<Easing>().unwrap(), Easing::EaseOutExpo);
        assert_eq!("EASEINOUTBOUNCE".parse::<Easing>().unwrap(), Easing::EaseInOutBounce);
        assert_eq!("linear".parse::<Easing>().unwrap(), Easing::Linear);
        assert!("wobble".parse::<Easing>().is_err());
        assert_eq!(Easing::all().count(), 41);
    }

    #[test]
    fn test_default_is_ease_out_expo() {
        assert_eq!(Easing::default(), Easing::EaseOutExpo);
    }

    #[test]
    fn test_zero_duration_jumps_to_end() {
        let params = TransitionParams::default();
        let transition = Transition::default();
        assert_eq!(transition.evaluate(0.0, 3.0, 4.0, 0.0, &params), 7.0);
    }

    #[test]
    fn test_custom_transition() {
        let step = Transition::custom(|t, b, c, d, _| if t < d { b } else { b + c });
        let params = TransitionParams::default();
        assert_eq!(step.evaluate(50.0, 0.0, 10.0, 100.0, &params), 0.0);
        assert_eq!(step.evaluate(100.0, 0.0, 10.0, 100.0, &params), 10.0);
    }

    #[test]
    fn test_elastic_amplitude_and_period() {
        let params = TransitionParams {
            amplitude: Some(2.0),
            period: Some(40.0),
            overshoot: None,
        };
        let value = Easing::EaseOutElastic.evaluate(30.0, 0.0, 1.0, 100.0, &params);
        assert!(value.is_finite());
        assert!((Easing::EaseOutElastic.evaluate(100.0, 0.0, 1.0, 100.0, &params) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_out_elastic_with_custom_amplitude() {
        let params = TransitionParams {
            amplitude: Some(2.0),
            period: Some(30.0),
            overshoot: None,
        };
        let at = |t| Easing::EaseOutElastic.evaluate(t, 0.0, 1.0, 100.0, &params);
        assert!((at(10.0) - 2.0).abs() < EPS);
        assert!((at(20.0) - 0.75).abs() < EPS);
        assert!((at(40.0) - 1.125).abs() < EPS);
    }

    #[test]
    fn test_in_out_elastic_uses_its_own_period() {
        let params = TransitionParams::default();
        // Default period is 45% of the duration: a quarter period past the middle is a crest
        let value = Easing::EaseInOutElastic.evaluate(61.25, 0.0, 1.0, 100.0, &params);
        assert!((value - (1.0 + 0.5 * 2f64.powf(-2.25))).abs() < EPS);
    }

    #[test]
    fn test_in_out_back_scales_overshoot() {
        let params = TransitionParams::default();
        let value = Easing::EaseInOutBack.evaluate(25.0, 0.0, 1.0, 100.0, &params);
        assert!((value + 0.099_681_843_75).abs() < EPS);
        assert!((Easing::EaseInOutBack.apply(0.5) - 0.5).abs() < EPS);
    }
}
