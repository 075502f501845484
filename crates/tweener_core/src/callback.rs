//! Lifecycle callbacks
//!
//! A [`Callback`] bundles a closure with an optional receiver override. The
//! receiver handed to the closure is the override when one is set, otherwise
//! the target of the tween that fired it. Arguments are captured by the
//! closure itself.
//!
//! Invocation is fenced: a returned error or a panic is logged with the name
//! of the callback and swallowed, so one misbehaving handler cannot abort a
//! frame pass.

use crate::target::Target;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

type CallbackFn = dyn Fn(&Target) -> Result<(), String>;

/// Conversion of a callback's return value into a success/failure outcome
pub trait IntoCallbackResult {
    fn into_callback_result(self) -> Result<(), String>;
}

impl IntoCallbackResult for () {
    fn into_callback_result(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E: fmt::Display> IntoCallbackResult for Result<(), E> {
    fn into_callback_result(self) -> Result<(), String> {
        self.map_err(|e| e.to_string())
    }
}

/// A lifecycle callback bound at tween construction time
#[derive(Clone)]
pub struct Callback {
    func: Rc<CallbackFn>,
    scope: Option<Target>,
}

impl Callback {
    /// Create a callback from a closure returning `()` or `Result<(), E>`
    pub fn new<F, R>(func: F) -> Self
    where
        F: Fn(&Target) -> R + 'static,
        R: IntoCallbackResult,
    {
        Self {
            func: Rc::new(move |target: &Target| func(target).into_callback_result()),
            scope: None,
        }
    }

    /// Invoke the closure with `scope` instead of the tween target
    pub fn with_scope(mut self, scope: Target) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn scope(&self) -> Option<&Target> {
        self.scope.as_ref()
    }

    /// Run the callback, logging any failure under `name`
    ///
    /// Returns `true` when the callback completed without error.
    pub fn invoke(&self, name: &str, fallback: &Target) -> bool {
        let receiver = self.scope.as_ref().unwrap_or(fallback);

        match panic::catch_unwind(AssertUnwindSafe(|| (self.func)(receiver))) {
            Ok(Ok(())) => true,
            Ok(Err(message)) => {
                tracing::error!(callback = name, "Error calling {}: {}", name, message);
                false
            }
            Err(payload) => {
                tracing::error!(
                    callback = name,
                    "Error calling {}: panicked: {}",
                    name,
                    panic_message(payload.as_ref())
                );
                false
            }
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("scoped", &self.scope.is_some())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{shared, PropertyBag};
    use std::cell::Cell;

    #[test]
    fn test_callback_receives_target() {
        let target = shared(PropertyBag::new().with("x", 3.0));
        let seen = Rc::new(Cell::new(0.0));
        let seen_clone = seen.clone();

        let callback = Callback::new(move |t: &Target| {
            seen_clone.set(t.borrow().get_property("x").unwrap_or(0.0));
        });

        assert!(callback.invoke("onUpdate", &target));
        assert_eq!(seen.get(), 3.0);
    }

    #[test]
    fn test_callback_scope_overrides_target() {
        let target = shared(PropertyBag::new().with("x", 1.0));
        let scope = shared(PropertyBag::new().with("x", 9.0));
        let seen = Rc::new(Cell::new(0.0));
        let seen_clone = seen.clone();

        let callback = Callback::new(move |t: &Target| {
            seen_clone.set(t.borrow().get_property("x").unwrap_or(0.0));
        })
        .with_scope(scope);

        callback.invoke("onStart", &target);
        assert_eq!(seen.get(), 9.0);
    }

    #[test]
    fn test_callback_error_is_contained() {
        let target = shared(PropertyBag::new());
        let callback = Callback::new(|_: &Target| -> Result<(), String> {
            Err("boom".to_string())
        });
        assert!(!callback.invoke("onComplete", &target));
    }

    #[test]
    fn test_callback_panic_is_contained() {
        let target = shared(PropertyBag::new());
        let callback = Callback::new(|_: &Target| -> Result<(), String> {
            panic!("callback exploded")
        });
        assert!(!callback.invoke("onOverwrite", &target));

        // The target is still usable after the panic
        target.borrow_mut().set_property("x", 1.0);
        assert_eq!(target.borrow().get_property("x"), Some(1.0));
    }
}
