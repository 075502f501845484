//! Tweener
//!
//! A frame-driven tweening engine. Tweens interpolate numeric properties of
//! target objects over time with an easing transition; callers fire a
//! callback a fixed number of times over an interval. Both are driven by a
//! pluggable frame [`Ticker`].
//!
//! # Features
//!
//! - Penner transition catalogue, resolvable by name
//! - Property-level overwrite of overlapping tweens on the same target
//! - Pause, resume and removal filtered by target and property name
//! - Special properties: getter/setter proxies, splitters and modifiers
//! - Output shaping (rounding, clamping) and frame skipping
//! - TOML configuration for time scale, default transition and frame rate
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use tweener::{Easing, ManualTicker, PropertyBag, TweenParams, Tweener, shared};
//!
//! let ticker = Rc::new(ManualTicker::new());
//! let tweener = Tweener::with_ticker(ticker.clone());
//! let sprite = shared(PropertyBag::new().with("x", 0.0).with("y", 0.0));
//!
//! tweener
//!     .add_tween(
//!         &sprite,
//!         TweenParams::new()
//!             .time(0.5)
//!             .transition(Easing::Linear)
//!             .property("x", 100.0)
//!             .property("y", 40.0),
//!     )
//!     .unwrap();
//!
//! ticker.advance_to(250.0);
//! assert_eq!(sprite.borrow().get_property("x"), Some(50.0));
//!
//! ticker.advance_to(500.0);
//! assert_eq!(sprite.borrow().get_property("y"), Some(40.0));
//! assert!(!tweener.is_running());
//! ```

pub mod config;
pub mod easing;
pub mod engine;
pub mod entry;
pub mod params;
pub mod presets;
pub mod special;

pub use config::TweenerConfig;
pub use easing::{Easing, Transition, TransitionFn, TransitionParams};
pub use engine::{TweenInfo, Tweener};
pub use entry::{OutputShaping, PropertySlot, TweenEntry};
pub use params::{Callbacks, RawProperties, TransitionSource, TweenParams};
pub use presets::register_default_special_properties;
pub use special::{
    Extra, ModifiedValue, SpecialProperty, SpecialPropertyModifier, SpecialPropertyRegistry,
    SpecialPropertySplitter, SplitValue,
};

pub use tweener_core::{
    same_target, shared, Callback, FrameCallback, FrameTicker, IntoCallbackResult, IntoTargets,
    ManualTicker, PropertyBag, Result, SubscriptionId, Target, Ticker, TweenError, Tweenable,
    WeakTarget,
};
