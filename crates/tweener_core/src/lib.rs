//! Tweener Core
//!
//! This crate provides the primitives the Tweener scheduling engine is built on:
//!
//! - **Targets**: objects whose numeric properties are tweened, shared as `Rc<RefCell<dyn Tweenable>>`
//! - **Tickers**: pluggable frame sources with start/stop, a clock and frame subscriptions
//! - **Callbacks**: lifecycle callback descriptors that never take the frame pass down with them
//! - **Errors**: the error type shared by the engine and its configuration surface
//!
//! # Example
//!
//! ```rust
//! use tweener_core::{shared, ManualTicker, PropertyBag, Ticker};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let target = shared(PropertyBag::new().with("x", 0.0));
//! assert_eq!(target.borrow().get_property("x"), Some(0.0));
//!
//! let ticker = ManualTicker::new();
//! let frames = Rc::new(Cell::new(0));
//! let counter = frames.clone();
//! ticker.connect(Rc::new(move || counter.set(counter.get() + 1)));
//! ticker.start();
//! ticker.advance(16.0);
//! assert_eq!(frames.get(), 1);
//! assert_eq!(ticker.time(), 16.0);
//! ```

pub mod callback;
pub mod error;
pub mod target;
pub mod ticker;

pub use callback::{Callback, IntoCallbackResult};
pub use error::{Result, TweenError};
pub use target::{same_target, shared, IntoTargets, PropertyBag, Target, Tweenable, WeakTarget};
pub use ticker::{FrameCallback, FrameTicker, ManualTicker, SubscriptionId, Ticker};
