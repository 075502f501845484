//! Tween targets
//!
//! A target is any object exposing named numeric properties. The engine never
//! owns a target: entries keep a [`WeakTarget`] and stop as soon as the
//! target is dropped.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// An object whose numeric properties can be tweened
pub trait Tweenable {
    /// Read a property; `None` when the object has no numeric value for it
    fn get_property(&self, name: &str) -> Option<f64>;

    /// Write a property
    fn set_property(&mut self, name: &str, value: f64);
}

/// Shared handle to a tween target
pub type Target = Rc<RefCell<dyn Tweenable>>;

/// Non-owning handle to a tween target, held by scheduled entries
pub type WeakTarget = Weak<RefCell<dyn Tweenable>>;

/// Wrap a value into a shared [`Target`]
pub fn shared<T: Tweenable + 'static>(value: T) -> Target {
    Rc::new(RefCell::new(value))
}

/// Check whether a weak handle points at the same object as `target`
///
/// Identity is the allocation address; vtable metadata is ignored.
pub fn same_target(weak: &WeakTarget, target: &Target) -> bool {
    std::ptr::eq(
        weak.as_ptr() as *const (),
        Rc::as_ptr(target) as *const (),
    )
}

/// Conversion into the list of targets an API call applies to
///
/// An empty list is a valid input; scheduling calls report `false` for it.
pub trait IntoTargets {
    fn into_targets(self) -> Vec<Target>;
}

impl IntoTargets for &Target {
    fn into_targets(self) -> Vec<Target> {
        vec![self.clone()]
    }
}

impl IntoTargets for &[Target] {
    fn into_targets(self) -> Vec<Target> {
        self.to_vec()
    }
}

impl IntoTargets for &Vec<Target> {
    fn into_targets(self) -> Vec<Target> {
        self.clone()
    }
}

impl IntoTargets for Vec<Target> {
    fn into_targets(self) -> Vec<Target> {
        self
    }
}

impl<const N: usize> IntoTargets for [Target; N] {
    fn into_targets(self) -> Vec<Target> {
        self.into_iter().collect()
    }
}

impl<const N: usize> IntoTargets for &[Target; N] {
    fn into_targets(self) -> Vec<Target> {
        self.to_vec()
    }
}

/// A dynamic bag of named numeric properties
///
/// Writing a name that is not present inserts it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyBag {
    values: FxHashMap<String, f64>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over property names (unordered)
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl Tweenable for PropertyBag {
    fn get_property(&self, name: &str) -> Option<f64> {
        self.get(name)
    }

    fn set_property(&mut self, name: &str, value: f64) {
        match self.values.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.values.insert(name.to_string(), value);
            }
        }
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_bag_read_write() {
        let mut bag = PropertyBag::new().with("x", 1.0);
        assert_eq!(bag.get_property("x"), Some(1.0));
        assert_eq!(bag.get_property("y"), None);

        bag.set_property("x", 5.0);
        bag.set_property("y", 2.0);
        assert_eq!(bag.get("x"), Some(5.0));
        assert_eq!(bag.get("y"), Some(2.0));
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn test_property_bag_from_iter() {
        let bag: PropertyBag = [("a", 1.0), ("b", 2.0)].into_iter().collect();
        assert!(bag.contains("a"));
        assert!(bag.contains("b"));
        assert!(!bag.is_empty());
    }

    #[test]
    fn test_same_target_identity() {
        let a = shared(PropertyBag::new());
        let b = shared(PropertyBag::new());
        let weak_a = Rc::downgrade(&a);

        assert!(same_target(&weak_a, &a));
        assert!(!same_target(&weak_a, &b));
    }

    #[test]
    fn test_weak_target_does_not_keep_target_alive() {
        let a = shared(PropertyBag::new());
        let weak_a = Rc::downgrade(&a);
        drop(a);
        assert!(weak_a.upgrade().is_none());
    }

    #[test]
    fn test_into_targets_variants() {
        let a = shared(PropertyBag::new());
        let b = shared(PropertyBag::new());

        assert_eq!((&a).into_targets().len(), 1);
        assert_eq!([a.clone(), b.clone()].into_targets().len(), 2);
        assert_eq!(vec![a.clone(), b.clone()].into_targets().len(), 2);
        assert!(Vec::<Target>::new().into_targets().is_empty());
    }
}
