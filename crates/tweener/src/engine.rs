//! Tween engine
//!
//! The engine owns the registry of scheduled entries and its subscription to
//! the frame ticker. It starts lazily on the first add and stops itself at
//! the end of the first frame pass that leaves the registry empty.
//!
//! # Registry slots
//!
//! Entries live in an ordered `Vec<Option<EntryRef>>`. API calls only push
//! new entries or tombstone existing ones (`None`); physical removal happens
//! in the frame pass alone, so indices stay stable for any call made from a
//! callback in the middle of a pass.
//!
//! # Re-entrancy
//!
//! No borrow of the engine state, an entry or a target is held while a
//! lifecycle callback runs. Callbacks may add, pause, resume or remove
//! tweens (including their own) and may read or write their target.
//!
//! Special property functions run with their target borrowed but no entry
//! borrowed. They may query the schedule or pause, resume and remove tweens,
//! and must not borrow their own target through its handle.

use crate::config::TweenerConfig;
use crate::easing::{Easing, Transition};
use crate::entry::{EntryKind, OutputShaping, PropertyMap, TweenEntry};
use crate::params::{TransitionSource, TweenParams};
use crate::special::{
    SpecialProperty, SpecialPropertyModifier, SpecialPropertyRegistry, SpecialPropertySplitter,
};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;
use tweener_core::{
    FrameTicker, IntoTargets, Result, SubscriptionId, Target, Ticker, TweenError,
};

pub(crate) type EntryRef = Rc<RefCell<TweenEntry>>;

/// State of a running engine
struct ActiveEngine {
    ticker: Rc<dyn Ticker>,
    subscription: SubscriptionId,
    entries: Vec<Option<EntryRef>>,
}

pub(crate) struct EngineState {
    ticker: Option<Rc<dyn Ticker>>,
    active: Option<ActiveEngine>,
    time_scale: f64,
    default_transition: Easing,
    specials: SpecialPropertyRegistry,
}

impl EngineState {
    fn live_entries(&self) -> Vec<EntryRef> {
        self.active
            .as_ref()
            .map(|active| active.entries.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }
}

impl Drop for EngineState {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.ticker.disconnect(active.subscription);
            active.ticker.stop();
        }
    }
}

/// Operation applied by the pause/resume/remove family
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Affect {
    Pause,
    Resume,
    Remove,
}

/// Snapshot of one scheduled entry
#[derive(Clone, Debug, PartialEq)]
pub struct TweenInfo {
    pub properties: Vec<String>,
    pub time_start: f64,
    pub time_complete: f64,
    pub is_paused: bool,
    pub is_caller: bool,
    pub has_started: bool,
    pub times_called: u32,
}

impl TweenInfo {
    fn from_entry(entry: &TweenEntry) -> Self {
        Self {
            properties: entry.property_names(),
            time_start: entry.time_start(),
            time_complete: entry.time_complete(),
            is_paused: entry.is_paused(),
            is_caller: entry.is_caller(),
            has_started: entry.has_started(),
            times_called: entry.times_called(),
        }
    }
}

/// Handle to a tween engine
///
/// Cloning is cheap; all clones drive the same registry. Dropping the last
/// handle while running disconnects from the ticker and stops it.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use tweener::{ManualTicker, PropertyBag, TweenParams, Tweener, shared};
///
/// let ticker = Rc::new(ManualTicker::new());
/// let tweener = Tweener::with_ticker(ticker.clone());
/// let target = shared(PropertyBag::new().with("x", 0.0));
///
/// tweener
///     .add_tween(&target, TweenParams::new().time(1.0).property("x", 10.0))
///     .unwrap();
/// ticker.advance_to(1000.0);
///
/// assert_eq!(target.borrow().get_property("x"), Some(10.0));
/// ```
#[derive(Clone)]
pub struct Tweener {
    inner: Rc<RefCell<EngineState>>,
}

impl Default for Tweener {
    fn default() -> Self {
        Self::new()
    }
}

impl Tweener {
    /// Engine driven by a [`FrameTicker`] at the default frame rate
    pub fn new() -> Self {
        Self::with_ticker(Rc::new(FrameTicker::default()))
    }

    pub fn with_ticker(ticker: Rc<dyn Ticker>) -> Self {
        Self::build(Some(ticker), 1.0, Easing::default())
    }

    /// Engine with no ticker; adding a tween fails until one is set
    pub fn without_ticker() -> Self {
        Self::build(None, 1.0, Easing::default())
    }

    /// Engine configured from a [`TweenerConfig`], driven by a [`FrameTicker`]
    pub fn from_config(config: &TweenerConfig) -> Result<Self> {
        let default_transition = config.default_transition()?;
        let tweener = Self::build(
            Some(Rc::new(FrameTicker::new(config.frame_rate))),
            1.0,
            default_transition,
        );
        tweener.set_time_scale(config.time_scale);
        Ok(tweener)
    }

    fn build(ticker: Option<Rc<dyn Ticker>>, time_scale: f64, default_transition: Easing) -> Self {
        Self {
            inner: Rc::new(RefCell::new(EngineState {
                ticker,
                active: None,
                time_scale,
                default_transition,
                specials: SpecialPropertyRegistry::new(),
            })),
        }
    }

    /// Replace the ticker used by the next start
    ///
    /// A running engine keeps the ticker it started with until it stops.
    pub fn set_frame_ticker(&self, ticker: Option<Rc<dyn Ticker>>) {
        self.inner.borrow_mut().ticker = ticker;
    }

    pub fn ticker(&self) -> Option<Rc<dyn Ticker>> {
        self.inner.borrow().ticker.clone()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Subscribe to the ticker and start it; no-op while running
    pub fn start(&self) -> Result<()> {
        let ticker = {
            let mut state = self.inner.borrow_mut();
            if state.active.is_some() {
                return Ok(());
            }
            let ticker = state.ticker.clone().ok_or(TweenError::MissingTicker)?;

            let weak = Rc::downgrade(&self.inner);
            let subscription = ticker.connect(Rc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Tweener { inner }.on_enter_frame();
                }
            }));

            state.active = Some(ActiveEngine {
                ticker: ticker.clone(),
                subscription,
                entries: Vec::new(),
            });
            ticker
        };

        ticker.start();
        tracing::debug!("Tweener engine started");
        Ok(())
    }

    /// Unsubscribe, stop the ticker and drop every entry; no-op while stopped
    pub fn stop(&self) {
        let active = self.inner.borrow_mut().active.take();
        if let Some(active) = active {
            active.ticker.disconnect(active.subscription);
            active.ticker.stop();
            tracing::debug!(
                dropped = active.entries.iter().flatten().count(),
                "Tweener engine stopped"
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.borrow().active.is_some()
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Schedule a tween on every target
    ///
    /// Returns `Ok(false)` for an empty target set. Overlapping tweens on the
    /// same target lose the properties this one animates. A tween with zero
    /// time and delay is applied and dropped before this returns.
    pub fn add_tween<T: IntoTargets>(&self, targets: T, params: TweenParams) -> Result<bool> {
        let targets = targets.into_targets();
        if targets.is_empty() {
            return Ok(false);
        }
        params.validate()?;

        let properties = self
            .inner
            .borrow()
            .specials
            .build_properties(&params.properties)?;
        let transition = self.resolve_transition(params.transition.as_ref());
        let shaping = OutputShaping {
            rounded: params.rounded,
            min: params.min,
            max: params.max,
        };
        let immediate = params.time == 0.0 && params.delay == 0.0;

        self.start()?;
        let (time_start, time_complete) = self.schedule(params.time, params.delay);

        for target in &targets {
            let entry = TweenEntry::new(
                target,
                time_start,
                time_complete,
                transition.clone(),
                params.transition_params,
                params.callbacks.clone(),
                EntryKind::tween(properties.clone(), shaping, params.skip_updates),
            );
            warn_missing_properties(target, &properties);
            self.remove_tweens_by_time(target, &entry);

            let entry = Rc::new(RefCell::new(entry));
            self.push_entry(entry.clone())?;

            if immediate {
                let now = self.now().unwrap_or(time_complete);
                self.update_entry(&entry, now);
                self.tombstone(&entry);
            }
        }

        Ok(true)
    }

    /// Schedule `count` calls of `on_update` spread over `time` on every target
    ///
    /// Callers take no part in overwriting.
    pub fn add_caller<T: IntoTargets>(&self, targets: T, params: TweenParams) -> Result<bool> {
        let targets = targets.into_targets();
        if targets.is_empty() {
            return Ok(false);
        }
        params.validate()?;

        let transition = self.resolve_transition(params.transition.as_ref());
        let immediate = params.time == 0.0 && params.delay == 0.0;

        self.start()?;
        let (time_start, time_complete) = self.schedule(params.time, params.delay);

        for target in &targets {
            let entry = Rc::new(RefCell::new(TweenEntry::new(
                target,
                time_start,
                time_complete,
                transition.clone(),
                params.transition_params,
                params.callbacks.clone(),
                EntryKind::caller(params.count, params.wait_frames),
            )));
            self.push_entry(entry.clone())?;

            if immediate {
                let now = self.now().unwrap_or(time_complete);
                self.update_entry(&entry, now);
                self.tombstone(&entry);
            }
        }

        Ok(true)
    }

    /// Strip the properties of `incoming` from overlapping entries on `target`
    ///
    /// Each colliding entry gets one `onOverwrite` call before losing its
    /// properties; entries left with none are removed. Returns whether any
    /// property was taken over.
    fn remove_tweens_by_time(&self, target: &Target, incoming: &TweenEntry) -> bool {
        let Some(incoming_properties) = incoming.properties() else {
            return false;
        };
        let candidates = self.inner.borrow().live_entries();
        let mut removed = false;

        for entry in candidates {
            let (collisions, on_overwrite) = {
                let existing = entry.borrow();
                if existing.is_caller()
                    || !existing.targets(target)
                    || !existing.overlaps(incoming.time_start(), incoming.time_complete())
                {
                    continue;
                }
                let collisions = existing.shared_properties(incoming_properties);
                if collisions.is_empty() {
                    continue;
                }
                (collisions, existing.callbacks().on_overwrite.clone())
            };

            if let Some(callback) = on_overwrite {
                callback.invoke("onOverwrite", target);
            }

            let emptied = {
                let mut existing = entry.borrow_mut();
                existing.remove_properties(&collisions);
                existing.property_count() == 0
            };
            tracing::debug!(properties = ?collisions.as_slice(), emptied, "Tween overwritten");

            if emptied {
                self.tombstone(&entry);
            }
            removed = true;
        }

        removed
    }

    // ========================================================================
    // Pause / resume / remove
    // ========================================================================

    /// Pause tweens on `targets`; all of them when `properties` is empty
    ///
    /// Entries animating some but not all named properties are split and
    /// only the named part is paused.
    pub fn pause_tweens<T: IntoTargets>(&self, targets: T, properties: &[&str]) -> bool {
        self.affect_tweens(targets, properties, Affect::Pause)
    }

    pub fn resume_tweens<T: IntoTargets>(&self, targets: T, properties: &[&str]) -> bool {
        self.affect_tweens(targets, properties, Affect::Resume)
    }

    pub fn remove_tweens<T: IntoTargets>(&self, targets: T, properties: &[&str]) -> bool {
        self.affect_tweens(targets, properties, Affect::Remove)
    }

    pub fn pause_all_tweens(&self) -> bool {
        self.affect_all(Affect::Pause)
    }

    pub fn resume_all_tweens(&self) -> bool {
        self.affect_all(Affect::Resume)
    }

    pub fn remove_all_tweens(&self) -> bool {
        self.affect_all(Affect::Remove)
    }

    fn affect_all(&self, action: Affect) -> bool {
        let Some(now) = self.now() else {
            return false;
        };
        let entries = self.inner.borrow().live_entries();

        let mut affected = false;
        for entry in &entries {
            affected |= self.apply(action, entry, now);
        }
        affected
    }

    fn affect_tweens<T: IntoTargets>(&self, targets: T, properties: &[&str], action: Affect) -> bool {
        let targets = targets.into_targets();
        let Some(now) = self.now() else {
            return false;
        };
        let filter = self.inner.borrow().specials.expand_filter(properties);

        let mut affected = false;
        for target in &targets {
            affected |= self.affect_target(target, &filter, action, now);
        }
        affected
    }

    fn affect_target(&self, target: &Target, filter: &[String], action: Affect, now: f64) -> bool {
        let mut affected = false;

        for i in 0..self.slot_count() {
            let Some(entry) = self.slot(i) else {
                continue;
            };
            if !entry.borrow().targets(target) {
                continue;
            }

            if filter.is_empty() {
                self.apply(action, &entry, now);
                affected = true;
                continue;
            }

            let (matched, whole) = {
                let existing = entry.borrow();
                let matched: SmallVec<[String; 4]> = filter
                    .iter()
                    .filter(|name| existing.has_property(name))
                    .cloned()
                    .collect();
                let whole = matched.len() == existing.property_count();
                (matched, whole)
            };
            if matched.is_empty() {
                continue;
            }

            let chosen = if whole {
                entry
            } else {
                let split = Rc::new(RefCell::new(entry.borrow_mut().split_off(&matched)));
                if self.push_entry(split.clone()).is_err() {
                    continue;
                }
                split
            };
            self.apply(action, &chosen, now);
            affected = true;
        }

        affected
    }

    fn apply(&self, action: Affect, entry: &EntryRef, now: f64) -> bool {
        match action {
            Affect::Pause => entry.borrow_mut().pause(now),
            Affect::Resume => entry.borrow_mut().resume(now),
            Affect::Remove => self.tombstone(entry),
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Number of animated properties across the live entries of `target`
    pub fn tween_count(&self, target: &Target) -> usize {
        self.inner
            .borrow()
            .live_entries()
            .iter()
            .map(|entry| entry.borrow())
            .filter(|entry| entry.targets(target))
            .map(|entry| entry.property_count())
            .sum()
    }

    /// Number of live entries, tweens and callers alike
    pub fn entry_count(&self) -> usize {
        self.inner.borrow().live_entries().len()
    }

    /// Snapshots of the live entries of `target` in registry order
    pub fn entries(&self, target: &Target) -> Vec<TweenInfo> {
        self.inner
            .borrow()
            .live_entries()
            .iter()
            .map(|entry| entry.borrow())
            .filter(|entry| entry.targets(target))
            .map(|entry| TweenInfo::from_entry(&entry))
            .collect()
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Scale factor dividing every later `time` and `delay`
    ///
    /// Non-positive or non-finite values are ignored.
    pub fn set_time_scale(&self, scale: f64) {
        if scale.is_finite() && scale > 0.0 {
            self.inner.borrow_mut().time_scale = scale;
        } else {
            tracing::warn!("Tweener: ignoring invalid time scale {}", scale);
        }
    }

    pub fn time_scale(&self) -> f64 {
        self.inner.borrow().time_scale
    }

    /// Transition used when a tween names none or an unknown one
    pub fn set_default_transition(&self, easing: Easing) {
        self.inner.borrow_mut().default_transition = easing;
    }

    pub fn default_transition(&self) -> Easing {
        self.inner.borrow().default_transition
    }

    pub fn register_special_property(&self, name: impl Into<String>, property: SpecialProperty) {
        self.inner
            .borrow_mut()
            .specials
            .register_property(name, property);
    }

    pub fn register_special_property_modifier(
        &self,
        name: impl Into<String>,
        modifier: SpecialPropertyModifier,
    ) {
        self.inner
            .borrow_mut()
            .specials
            .register_modifier(name, modifier);
    }

    pub fn register_special_property_splitter(
        &self,
        name: impl Into<String>,
        splitter: SpecialPropertySplitter,
    ) {
        self.inner
            .borrow_mut()
            .specials
            .register_splitter(name, splitter);
    }

    // ========================================================================
    // Frame pass
    // ========================================================================

    /// Update every non-paused entry, compacting finished ones
    fn on_enter_frame(&self) {
        let Some((subscription, now)) = self.frame_context() else {
            return;
        };

        let mut i = 0;
        loop {
            let slot = {
                let state = self.inner.borrow();
                match &state.active {
                    // Stopped (or restarted) from a callback
                    Some(active) if active.subscription == subscription => {
                        match active.entries.get(i) {
                            Some(slot) => slot.clone(),
                            None => break,
                        }
                    }
                    _ => return,
                }
            };

            let Some(entry) = slot else {
                self.remove_slot(i);
                continue;
            };
            let (detached, paused) = {
                let entry = entry.borrow();
                (entry.target().is_none(), entry.is_paused())
            };
            if detached {
                self.remove_slot(i);
                continue;
            }
            if paused {
                i += 1;
                continue;
            }

            if !self.update_entry(&entry, now) {
                self.tombstone(&entry);
            }

            if self.slot_is_vacant(i) {
                self.remove_slot(i);
            } else {
                i += 1;
            }
        }

        let remaining = self.slot_count();
        tracing::trace!(now, remaining, "Tweener frame");
        if remaining == 0 {
            self.stop();
        }
    }

    /// Advance one entry to `now`; `false` once it is finished
    fn update_entry(&self, entry: &EntryRef, now: f64) -> bool {
        let Some(target) = entry.borrow().target() else {
            return false;
        };
        if entry.borrow().is_pending(now) {
            return true;
        }
        if entry.borrow().is_caller() {
            return self.update_caller(entry, &target, now);
        }

        let (is_over, mut must_update, first_frame, callbacks) = {
            let tween = entry.borrow();
            let is_over = tween.is_over(now);
            (
                is_over,
                tween.must_update(is_over),
                !tween.has_started(),
                tween.callbacks().clone(),
            )
        };

        if first_frame {
            if let Some(callback) = &callbacks.on_start {
                callback.invoke("onStart", &target);
            }
            self.begin_entry(entry, &target);
            must_update = true;
        }

        if must_update {
            self.render_entry(entry, &target, now, is_over);
            if let Some(callback) = &callbacks.on_update {
                callback.invoke("onUpdate", &target);
            }
        } else {
            entry.borrow_mut().skip_frame();
        }

        if is_over {
            if let Some(callback) = &callbacks.on_complete {
                callback.invoke("onComplete", &target);
            }
            return false;
        }
        true
    }

    /// Sample every start value, one slot at a time
    fn begin_entry(&self, entry: &EntryRef, target: &Target) {
        entry.borrow_mut().mark_started();
        let names = entry.borrow().property_names();
        for name in &names {
            let Some(mut slot) = entry.borrow().checkout(name) else {
                continue;
            };
            slot.sample_start(name, &*target.borrow());
            entry.borrow_mut().check_in(name, slot);
        }
    }

    /// Write every slot for `now`, one slot at a time
    fn render_entry(&self, entry: &EntryRef, target: &Target, now: f64, is_over: bool) {
        let Some(frame) = entry.borrow().frame_state(now, is_over) else {
            return;
        };
        let names = entry.borrow().property_names();
        for name in &names {
            let Some(mut slot) = entry.borrow().checkout(name) else {
                continue;
            };
            slot.render(name, &mut *target.borrow_mut(), &frame);
            entry.borrow_mut().check_in(name, slot);
        }
        entry.borrow_mut().finish_render();
    }

    fn update_caller(&self, entry: &EntryRef, target: &Target, now: f64) -> bool {
        let callbacks = entry.borrow().callbacks().clone();
        let mut is_over = false;

        loop {
            if entry.borrow().calls_exhausted() {
                is_over = true;
                break;
            }
            if now < entry.borrow().next_call_time() {
                break;
            }

            if let Some(callback) = &callbacks.on_update {
                callback.invoke("onUpdate", target);
            }
            let wait = entry.borrow_mut().record_call();

            if entry.borrow().calls_exhausted() {
                is_over = true;
                break;
            }
            if wait {
                break;
            }
        }

        if is_over {
            if let Some(callback) = &callbacks.on_complete {
                callback.invoke("onComplete", target);
            }
            return false;
        }
        true
    }

    // ========================================================================
    // Registry plumbing
    // ========================================================================

    fn frame_context(&self) -> Option<(SubscriptionId, f64)> {
        let state = self.inner.borrow();
        state
            .active
            .as_ref()
            .map(|active| (active.subscription, active.ticker.time()))
    }

    /// Current ticker time, `None` while stopped
    fn now(&self) -> Option<f64> {
        self.frame_context().map(|(_, now)| now)
    }

    fn schedule(&self, time: f64, delay: f64) -> (f64, f64) {
        let now = self.now().unwrap_or(0.0);
        let scale = self.inner.borrow().time_scale;
        (
            now + (delay * 1000.0) / scale,
            now + (delay * 1000.0 + time * 1000.0) / scale,
        )
    }

    fn resolve_transition(&self, source: Option<&TransitionSource>) -> Transition {
        let default = self.inner.borrow().default_transition;
        match source {
            None => Transition::Easing(default),
            Some(TransitionSource::Resolved(transition)) => transition.clone(),
            Some(TransitionSource::Named(name)) => match name.parse::<Easing>() {
                Ok(easing) => Transition::Easing(easing),
                Err(_) => {
                    tracing::warn!(
                        "Unknown transition `{}`, using `{}`",
                        name,
                        default.name()
                    );
                    Transition::Easing(default)
                }
            },
        }
    }

    /// Append an entry, restarting the engine if a callback stopped it
    fn push_entry(&self, entry: EntryRef) -> Result<()> {
        self.start()?;
        if let Some(active) = self.inner.borrow_mut().active.as_mut() {
            active.entries.push(Some(entry));
        }
        Ok(())
    }

    /// Clear the slot holding `entry`; `false` when it is not in the registry
    fn tombstone(&self, entry: &EntryRef) -> bool {
        let mut state = self.inner.borrow_mut();
        let Some(active) = state.active.as_mut() else {
            return false;
        };
        match active
            .entries
            .iter_mut()
            .find(|slot| matches!(slot, Some(e) if Rc::ptr_eq(e, entry)))
        {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    fn slot_count(&self) -> usize {
        self.inner
            .borrow()
            .active
            .as_ref()
            .map_or(0, |active| active.entries.len())
    }

    fn slot(&self, i: usize) -> Option<EntryRef> {
        self.inner
            .borrow()
            .active
            .as_ref()
            .and_then(|active| active.entries.get(i).cloned().flatten())
    }

    fn slot_is_vacant(&self, i: usize) -> bool {
        self.inner
            .borrow()
            .active
            .as_ref()
            .is_some_and(|active| matches!(active.entries.get(i), Some(None)))
    }

    fn remove_slot(&self, i: usize) {
        if let Some(active) = self.inner.borrow_mut().active.as_mut() {
            if i < active.entries.len() {
                active.entries.remove(i);
            }
        }
    }
}

/// Warn about plain properties the target does not have
fn warn_missing_properties(target: &Target, properties: &PropertyMap) {
    // Busy while one of its special property functions adds a tween
    let Ok(target) = target.try_borrow() else {
        return;
    };
    for (name, slot) in properties {
        if !slot.is_special_property() && target.get_property(name).is_none() {
            tracing::warn!(
                "The property `{}` does not exist on the target and is not a special property",
                name
            );
        }
    }
}
