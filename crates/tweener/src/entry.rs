//! Tween entries
//!
//! A [`TweenEntry`] is one scheduled unit of work: a tween interpolating a set
//! of property slots, or a caller firing `on_update` a fixed number of times.
//! The engine drives entries through the per-frame phases implemented here;
//! callbacks are invoked by the engine, never from inside an entry method.

use crate::easing::{Transition, TransitionParams};
use crate::params::Callbacks;
use crate::special::{Extra, SpecialProperty, SpecialPropertyModifier};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;
use std::rc::Rc;
use tweener_core::{same_target, Target, Tweenable, WeakTarget};

/// Property slots of a tween in insertion order
pub type PropertyMap = IndexMap<String, PropertySlot, FxBuildHasher>;

/// How a slot reads and writes its target
#[derive(Clone)]
pub enum PropertyAccess {
    Plain,
    Special(Rc<SpecialProperty>),
}

impl fmt::Debug for PropertyAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyAccess::Plain => f.write_str("Plain"),
            PropertyAccess::Special(_) => f.write_str("Special(..)"),
        }
    }
}

/// Blend function and parameters attached to a slot by a modifier
#[derive(Clone)]
pub struct PropertyModifier {
    modifier: Rc<SpecialPropertyModifier>,
    parameters: Value,
}

impl PropertyModifier {
    pub(crate) fn new(modifier: Rc<SpecialPropertyModifier>, parameters: Value) -> Self {
        Self {
            modifier,
            parameters,
        }
    }

    fn blend(&self, start: f64, end: f64, factor: f64) -> f64 {
        self.modifier.blend(start, end, factor, &self.parameters)
    }
}

impl fmt::Debug for PropertyModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyModifier")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// One animated property of a tween
#[derive(Clone, Debug)]
pub struct PropertySlot {
    value_start: Option<f64>,
    value_complete: f64,
    original_value_complete: f64,
    array_index: usize,
    extra: Extra,
    access: PropertyAccess,
    modifier: Option<PropertyModifier>,
}

impl PropertySlot {
    pub(crate) fn new(
        value_complete: f64,
        array_index: usize,
        access: PropertyAccess,
        modifier: Option<PropertyModifier>,
    ) -> Self {
        Self {
            value_start: None,
            value_complete,
            original_value_complete: value_complete,
            array_index,
            extra: Extra::new(),
            access,
            modifier,
        }
    }

    /// Sampled on the first processed frame
    pub fn value_start(&self) -> Option<f64> {
        self.value_start
    }

    pub fn value_complete(&self) -> f64 {
        self.value_complete
    }

    pub fn original_value_complete(&self) -> f64 {
        self.original_value_complete
    }

    pub fn array_index(&self) -> usize {
        self.array_index
    }

    pub fn is_special_property(&self) -> bool {
        matches!(self.access, PropertyAccess::Special(_))
    }

    pub fn has_modifier(&self) -> bool {
        self.modifier.is_some()
    }

    /// Pre-process the end value, then sample the start value
    ///
    /// An absent property starts from the end value.
    pub(crate) fn sample_start(&mut self, name: &str, target: &dyn Tweenable) {
        let sampled = match &self.access {
            PropertyAccess::Special(special) => {
                if let Some(value) =
                    special.pre_process(target, self.original_value_complete, &self.extra)
                {
                    self.value_complete = value;
                }
                special.get_value(target, &self.extra)
            }
            PropertyAccess::Plain => target.get_property(name),
        };

        self.value_start = Some(match sampled {
            Some(value) if !value.is_nan() => value,
            _ => self.value_complete,
        });
    }

    /// Compute the value for `frame` and write it to the target
    pub(crate) fn render(&mut self, name: &str, target: &mut dyn Tweenable, frame: &FrameState) {
        let start = self.value_start.unwrap_or(self.value_complete);
        let value = if frame.is_over {
            self.value_complete
        } else if let Some(modifier) = &self.modifier {
            let factor = frame.transition.evaluate(
                frame.elapsed,
                0.0,
                1.0,
                frame.duration,
                &frame.transition_params,
            );
            modifier.blend(start, self.value_complete, factor)
        } else {
            frame.transition.evaluate(
                frame.elapsed,
                start,
                self.value_complete - start,
                frame.duration,
                &frame.transition_params,
            )
        };
        self.write(name, target, frame.shaping.apply(value));
    }

    fn write(&mut self, name: &str, target: &mut dyn Tweenable, value: f64) {
        match &self.access {
            PropertyAccess::Special(special) => special.set_value(target, value, &mut self.extra),
            PropertyAccess::Plain => target.set_property(name, value),
        }
    }
}

/// Everything a slot needs to render one frame of its tween
#[derive(Clone, Debug)]
pub(crate) struct FrameState {
    elapsed: f64,
    duration: f64,
    is_over: bool,
    transition: Transition,
    transition_params: TransitionParams,
    shaping: OutputShaping,
}

/// Rounding and clamping applied to every written value
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OutputShaping {
    pub rounded: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl OutputShaping {
    pub fn apply(&self, value: f64) -> f64 {
        let mut value = if self.rounded {
            (value + 0.5).floor()
        } else {
            value
        };
        if let Some(min) = self.min {
            if value < min {
                value = min;
            }
        }
        if let Some(max) = self.max {
            if value > max {
                value = max;
            }
        }
        value
    }
}

#[derive(Clone)]
pub(crate) enum EntryKind {
    Tween {
        properties: PropertyMap,
        shaping: OutputShaping,
        skip_updates: u32,
        updates_skipped: u32,
    },
    Caller {
        count: u32,
        times_called: u32,
        wait_frames: bool,
    },
}

impl EntryKind {
    pub(crate) fn tween(properties: PropertyMap, shaping: OutputShaping, skip_updates: u32) -> Self {
        EntryKind::Tween {
            properties,
            shaping,
            skip_updates,
            updates_skipped: 0,
        }
    }

    pub(crate) fn caller(count: u32, wait_frames: bool) -> Self {
        EntryKind::Caller {
            count,
            times_called: 0,
            wait_frames,
        }
    }
}

/// A scheduled tween or caller
#[derive(Clone)]
pub struct TweenEntry {
    target: WeakTarget,
    time_start: f64,
    time_complete: f64,
    transition: Transition,
    transition_params: TransitionParams,
    callbacks: Callbacks,
    has_started: bool,
    time_paused: Option<f64>,
    kind: EntryKind,
}

impl TweenEntry {
    pub(crate) fn new(
        target: &Target,
        time_start: f64,
        time_complete: f64,
        transition: Transition,
        transition_params: TransitionParams,
        callbacks: Callbacks,
        kind: EntryKind,
    ) -> Self {
        Self {
            target: Rc::downgrade(target),
            time_start,
            time_complete,
            transition,
            transition_params,
            callbacks,
            has_started: false,
            time_paused: None,
            kind,
        }
    }

    /// The target, unless it has been dropped
    pub fn target(&self) -> Option<Target> {
        self.target.upgrade()
    }

    pub fn targets(&self, target: &Target) -> bool {
        same_target(&self.target, target)
    }

    pub fn time_start(&self) -> f64 {
        self.time_start
    }

    pub fn time_complete(&self) -> f64 {
        self.time_complete
    }

    pub fn is_caller(&self) -> bool {
        matches!(self.kind, EntryKind::Caller { .. })
    }

    pub fn is_paused(&self) -> bool {
        self.time_paused.is_some()
    }

    pub fn has_started(&self) -> bool {
        self.has_started
    }

    pub(crate) fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    pub fn properties(&self) -> Option<&PropertyMap> {
        match &self.kind {
            EntryKind::Tween { properties, .. } => Some(properties),
            EntryKind::Caller { .. } => None,
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertySlot> {
        self.properties().and_then(|p| p.get(name))
    }

    pub fn property_names(&self) -> Vec<String> {
        self.properties()
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Zero for callers
    pub fn property_count(&self) -> usize {
        self.properties().map_or(0, IndexMap::len)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties().is_some_and(|p| p.contains_key(name))
    }

    /// Active intervals intersect
    pub fn overlaps(&self, time_start: f64, time_complete: f64) -> bool {
        time_complete > self.time_start && time_start < self.time_complete
    }

    /// Names present both here and in `other`
    pub(crate) fn shared_properties(&self, other: &PropertyMap) -> SmallVec<[String; 4]> {
        match self.properties() {
            Some(properties) => properties
                .keys()
                .filter(|name| other.contains_key(name.as_str()))
                .cloned()
                .collect(),
            None => SmallVec::new(),
        }
    }

    /// Drop the named slots, returning how many were present
    pub(crate) fn remove_properties<S: AsRef<str>>(&mut self, names: &[S]) -> usize {
        match &mut self.kind {
            EntryKind::Tween { properties, .. } => names
                .iter()
                .filter(|name| {
                    let name: &str = name.as_ref();
                    properties.shift_remove(name).is_some()
                })
                .count(),
            EntryKind::Caller { .. } => 0,
        }
    }

    /// Move the named slots into a copy of this entry
    ///
    /// The copy keeps timing, transition, callbacks and pause state; this
    /// entry keeps every other slot.
    pub(crate) fn split_off<S: AsRef<str>>(&mut self, names: &[S]) -> TweenEntry {
        let mut split = self.clone();
        if let (
            EntryKind::Tween {
                properties: kept, ..
            },
            EntryKind::Tween {
                properties: moved, ..
            },
        ) = (&mut self.kind, &mut split.kind)
        {
            moved.retain(|name, _| names.iter().any(|n| AsRef::<str>::as_ref(n) == name.as_str()));
            kept.retain(|name, _| !moved.contains_key(name.as_str()));
        }
        split
    }

    /// Returns `false` when already paused
    pub(crate) fn pause(&mut self, now: f64) -> bool {
        if self.time_paused.is_some() {
            return false;
        }
        self.time_paused = Some(now);
        true
    }

    /// Shift the interval by the paused duration; `false` when not paused
    pub(crate) fn resume(&mut self, now: f64) -> bool {
        match self.time_paused.take() {
            Some(paused_at) => {
                let paused_for = now - paused_at;
                self.time_start += paused_for;
                self.time_complete += paused_for;
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_pending(&self, now: f64) -> bool {
        now < self.time_start
    }

    pub(crate) fn is_over(&self, now: f64) -> bool {
        now >= self.time_complete
    }

    /// Whether this frame is applied or counted as skipped
    pub(crate) fn must_update(&self, is_over: bool) -> bool {
        match self.kind {
            EntryKind::Tween {
                skip_updates,
                updates_skipped,
                ..
            } => is_over || skip_updates < 1 || updates_skipped >= skip_updates,
            EntryKind::Caller { .. } => true,
        }
    }

    pub(crate) fn mark_started(&mut self) {
        self.has_started = true;
    }

    /// Frame inputs at time `now`; `None` for callers
    pub(crate) fn frame_state(&self, now: f64, is_over: bool) -> Option<FrameState> {
        match &self.kind {
            EntryKind::Tween { shaping, .. } => Some(FrameState {
                elapsed: now - self.time_start,
                duration: self.time_complete - self.time_start,
                is_over,
                transition: self.transition.clone(),
                transition_params: self.transition_params,
                shaping: *shaping,
            }),
            EntryKind::Caller { .. } => None,
        }
    }

    /// Reset the skip counter after a rendered frame
    pub(crate) fn finish_render(&mut self) {
        if let EntryKind::Tween {
            updates_skipped, ..
        } = &mut self.kind
        {
            *updates_skipped = 0;
        }
    }

    /// Copy of one slot, to be worked on without borrowing the entry
    pub(crate) fn checkout(&self, name: &str) -> Option<PropertySlot> {
        self.property(name).cloned()
    }

    /// Store a checked-out slot back unless it was removed meanwhile
    pub(crate) fn check_in(&mut self, name: &str, slot: PropertySlot) {
        if let EntryKind::Tween { properties, .. } = &mut self.kind {
            if let Some(current) = properties.get_mut(name) {
                *current = slot;
            }
        }
    }

    pub(crate) fn skip_frame(&mut self) {
        if let EntryKind::Tween {
            updates_skipped, ..
        } = &mut self.kind
        {
            *updates_skipped += 1;
        }
    }

    /// Every scheduled call has been made
    pub(crate) fn calls_exhausted(&self) -> bool {
        match self.kind {
            EntryKind::Caller {
                count,
                times_called,
                ..
            } => times_called >= count,
            EntryKind::Tween { .. } => true,
        }
    }

    /// Time of the next scheduled call
    pub(crate) fn next_call_time(&self) -> f64 {
        match self.kind {
            EntryKind::Caller {
                count,
                times_called,
                ..
            } => {
                let duration = self.time_complete - self.time_start;
                let t = duration / f64::from(count) * f64::from(times_called + 1);
                self.transition.evaluate(
                    t,
                    self.time_start,
                    duration,
                    duration,
                    &self.transition_params,
                )
            }
            EntryKind::Tween { .. } => self.time_complete,
        }
    }

    /// Count one call; returns whether the caller should yield until the next frame
    pub(crate) fn record_call(&mut self) -> bool {
        match &mut self.kind {
            EntryKind::Caller {
                times_called,
                wait_frames,
                ..
            } => {
                *times_called += 1;
                *wait_frames
            }
            EntryKind::Tween { .. } => true,
        }
    }

    pub(crate) fn times_called(&self) -> u32 {
        match self.kind {
            EntryKind::Caller { times_called, .. } => times_called,
            EntryKind::Tween { .. } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Easing;
    use tweener_core::{shared, PropertyBag};

    fn begin(entry: &mut TweenEntry, target: &dyn Tweenable) {
        entry.mark_started();
        for name in entry.property_names() {
            let mut slot = entry.checkout(&name).unwrap();
            slot.sample_start(&name, target);
            entry.check_in(&name, slot);
        }
    }

    fn render(entry: &mut TweenEntry, target: &mut dyn Tweenable, now: f64, is_over: bool) {
        let frame = entry.frame_state(now, is_over).unwrap();
        for name in entry.property_names() {
            let mut slot = entry.checkout(&name).unwrap();
            slot.render(&name, target, &frame);
            entry.check_in(&name, slot);
        }
        entry.finish_render();
    }

    fn slots(values: &[(&str, f64)]) -> PropertyMap {
        values
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    PropertySlot::new(*value, 0, PropertyAccess::Plain, None),
                )
            })
            .collect()
    }

    fn tween(target: &Target, values: &[(&str, f64)], start: f64, complete: f64) -> TweenEntry {
        TweenEntry::new(
            target,
            start,
            complete,
            Transition::Easing(Easing::Linear),
            TransitionParams::default(),
            Callbacks::default(),
            EntryKind::tween(slots(values), OutputShaping::default(), 0),
        )
    }

    #[test]
    fn test_output_shaping_rounds_then_clamps() {
        let shaping = OutputShaping {
            rounded: true,
            min: Some(0.0),
            max: Some(10.0),
        };
        assert_eq!(shaping.apply(2.5), 3.0);
        assert_eq!(shaping.apply(-2.5), 0.0);
        assert_eq!(shaping.apply(9.6), 10.0);
        assert_eq!(shaping.apply(12.0), 10.0);

        let round_only = OutputShaping {
            rounded: true,
            ..Default::default()
        };
        assert_eq!(round_only.apply(-2.5), -2.0);
    }

    #[test]
    fn test_begin_samples_start_and_falls_back_to_end() {
        let target = shared(PropertyBag::new().with("x", 4.0));
        let mut entry = tween(&target, &[("x", 10.0), ("y", 7.0)], 0.0, 100.0);

        begin(&mut entry, &*target.borrow());
        assert!(entry.has_started());
        assert_eq!(entry.property("x").unwrap().value_start(), Some(4.0));
        assert_eq!(entry.property("y").unwrap().value_start(), Some(7.0));
    }

    #[test]
    fn test_render_interpolates_and_lands_on_end() {
        let target = shared(PropertyBag::new().with("x", 0.0));
        let mut entry = tween(&target, &[("x", 10.0)], 0.0, 100.0);
        begin(&mut entry, &*target.borrow());

        render(&mut entry, &mut *target.borrow_mut(), 50.0, false);
        assert!((target.borrow().get_property("x").unwrap() - 5.0).abs() < 1e-9);

        render(&mut entry, &mut *target.borrow_mut(), 130.0, true);
        assert_eq!(target.borrow().get_property("x"), Some(10.0));
    }

    #[test]
    fn test_slots_are_debug_printable() {
        let target = shared(PropertyBag::new());
        let entry = tween(&target, &[("x", 1.5)], 0.0, 100.0);

        let printed = format!("{:?}", entry.properties().unwrap());
        assert!(printed.contains("value_complete: 1.5"), "{printed}");
        assert!(printed.contains("Plain"), "{printed}");
    }

    #[test]
    fn test_split_off_moves_named_slots() {
        let target = shared(PropertyBag::new());
        let mut entry = tween(&target, &[("x", 1.0), ("y", 2.0), ("z", 3.0)], 0.0, 100.0);

        let split = entry.split_off(&["y", "missing"]);
        assert_eq!(split.property_names(), vec!["y".to_string()]);
        assert_eq!(entry.property_names(), vec!["x".to_string(), "z".to_string()]);
        assert_eq!(split.time_complete(), entry.time_complete());
    }

    #[test]
    fn test_pause_resume_shifts_interval() {
        let target = shared(PropertyBag::new());
        let mut entry = tween(&target, &[("x", 1.0)], 100.0, 300.0);

        assert!(entry.pause(150.0));
        assert!(!entry.pause(160.0));
        assert!(entry.resume(250.0));
        assert!(!entry.resume(260.0));

        assert_eq!(entry.time_start(), 200.0);
        assert_eq!(entry.time_complete(), 400.0);
    }

    #[test]
    fn test_overlap_and_shared_properties() {
        let target = shared(PropertyBag::new());
        let entry = tween(&target, &[("x", 1.0), ("y", 2.0)], 0.0, 1000.0);

        assert!(entry.overlaps(500.0, 1500.0));
        assert!(!entry.overlaps(1000.0, 2000.0));
        assert!(!entry.overlaps(-100.0, 0.0));

        let shared_names = entry.shared_properties(&slots(&[("x", 5.0), ("w", 1.0)]));
        assert_eq!(shared_names.as_slice(), &["x".to_string()]);
    }

    #[test]
    fn test_skip_counter_gates_updates() {
        let target = shared(PropertyBag::new().with("x", 0.0));
        let mut entry = TweenEntry::new(
            &target,
            0.0,
            100.0,
            Transition::default(),
            TransitionParams::default(),
            Callbacks::default(),
            EntryKind::tween(slots(&[("x", 1.0)]), OutputShaping::default(), 2),
        );

        assert!(!entry.must_update(false));
        entry.skip_frame();
        assert!(!entry.must_update(false));
        entry.skip_frame();
        assert!(entry.must_update(false));
        assert!(entry.must_update(true));

        render(&mut entry, &mut *target.borrow_mut(), 10.0, false);
        assert!(!entry.must_update(false));
    }

    #[test]
    fn test_caller_schedule_is_evenly_spaced_when_linear() {
        let target = shared(PropertyBag::new());
        let mut entry = TweenEntry::new(
            &target,
            0.0,
            1000.0,
            Transition::Easing(Easing::Linear),
            TransitionParams::default(),
            Callbacks::default(),
            EntryKind::caller(4, false),
        );

        assert!(entry.is_caller());
        assert_eq!(entry.property_count(), 0);
        assert_eq!(entry.next_call_time(), 250.0);
        assert!(!entry.record_call());
        assert_eq!(entry.next_call_time(), 500.0);
        assert_eq!(entry.times_called(), 1);
        assert!(!entry.calls_exhausted());
    }
}
