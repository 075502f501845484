//! Frame tickers
//!
//! A ticker is the frame source of the engine: it owns the clock and emits a
//! "prepare frame" notification to its subscribers once per frame. The
//! engine starts the ticker when the first tween is added and stops it when
//! the last one finishes.
//!
//! Two implementations are provided:
//! - [`FrameTicker`] - fixed frame rate, driven by [`FrameTicker::run`] or [`FrameTicker::pump`]
//! - [`ManualTicker`] - fully host-controlled clock, for tests and external loops

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

new_key_type! {
    /// Handle to a frame subscription
    pub struct SubscriptionId;
}

/// Callback invoked once per frame
pub type FrameCallback = Rc<dyn Fn()>;

/// A pluggable frame source
///
/// Methods take `&self`: subscribers are allowed to call back into the
/// ticker (read the time, disconnect, stop) while a frame is being emitted.
pub trait Ticker {
    /// Start emitting frames
    fn start(&self);

    /// Stop emitting frames
    fn stop(&self);

    /// Milliseconds elapsed since `start()`
    fn time(&self) -> f64;

    /// Subscribe to the per-frame notification
    fn connect(&self, callback: FrameCallback) -> SubscriptionId;

    /// Remove a subscription; unknown ids are ignored
    fn disconnect(&self, id: SubscriptionId);
}

/// Subscriber list shared by the built-in tickers
#[derive(Default)]
struct Subscribers {
    callbacks: RefCell<SlotMap<SubscriptionId, FrameCallback>>,
}

impl Subscribers {
    fn insert(&self, callback: FrameCallback) -> SubscriptionId {
        self.callbacks.borrow_mut().insert(callback)
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        self.callbacks.borrow_mut().remove(id).is_some()
    }

    fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// Invoke every subscriber without holding the list borrowed
    fn emit(&self) {
        let snapshot: SmallVec<[FrameCallback; 2]> =
            self.callbacks.borrow().values().cloned().collect();
        for callback in snapshot {
            callback();
        }
    }
}

// ============================================================================
// FrameTicker
// ============================================================================

/// Fixed-rate frame ticker
///
/// The clock advances by exactly one frame interval per emitted frame, so
/// the time observed by tweens is independent of scheduling jitter. It is
/// reset to zero on `start()` and `stop()`.
pub struct FrameTicker {
    frame_rate: f64,
    current_time: Cell<f64>,
    running: Cell<bool>,
    subscribers: Subscribers,
}

impl FrameTicker {
    /// Default frame rate in frames per second
    pub const FRAME_RATE: f64 = 65.0;

    pub fn new(frame_rate: f64) -> Self {
        let frame_rate = if frame_rate.is_finite() && frame_rate > 0.0 {
            frame_rate
        } else {
            tracing::warn!(
                "FrameTicker: invalid frame rate {}, using {}",
                frame_rate,
                Self::FRAME_RATE
            );
            Self::FRAME_RATE
        };

        Self {
            frame_rate,
            current_time: Cell::new(0.0),
            running: Cell::new(false),
            subscribers: Subscribers::default(),
        }
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Length of one frame in milliseconds
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / self.frame_rate
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Advance the clock by one frame and notify subscribers
    ///
    /// Does nothing while the ticker is stopped.
    pub fn pump(&self) {
        if !self.running.get() {
            return;
        }
        self.current_time
            .set(self.current_time.get() + self.frame_interval_ms());
        self.subscribers.emit();
    }

    /// Drive frames until the ticker is stopped
    ///
    /// Sleeps for the remainder of each frame interval between frames. The
    /// engine stops its ticker once no tween is left, which ends the loop.
    pub fn run(&self) {
        let frame_duration = Duration::from_millis(self.frame_interval_ms().floor() as u64);

        while self.running.get() {
            let start = Instant::now();
            self.pump();

            let elapsed = start.elapsed();
            if self.running.get() && elapsed < frame_duration {
                thread::sleep(frame_duration - elapsed);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for FrameTicker {
    fn default() -> Self {
        Self::new(Self::FRAME_RATE)
    }
}

impl Ticker for FrameTicker {
    fn start(&self) {
        self.current_time.set(0.0);
        self.running.set(true);
    }

    fn stop(&self) {
        self.running.set(false);
        self.current_time.set(0.0);
    }

    fn time(&self) -> f64 {
        self.current_time.get()
    }

    fn connect(&self, callback: FrameCallback) -> SubscriptionId {
        self.subscribers.insert(callback)
    }

    fn disconnect(&self, id: SubscriptionId) {
        self.subscribers.remove(id);
    }
}

// ============================================================================
// ManualTicker
// ============================================================================

/// Host-controlled ticker
///
/// Time only moves when the host calls [`advance`](Self::advance) or
/// [`advance_to`](Self::advance_to); each call emits exactly one frame.
/// Start, stop and subscription counters make engine lifecycle observable.
#[derive(Default)]
pub struct ManualTicker {
    current_time: Cell<f64>,
    running: Cell<bool>,
    starts: Cell<usize>,
    stops: Cell<usize>,
    disconnects: Cell<usize>,
    subscribers: Subscribers,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `dt_ms` and emit one frame
    pub fn advance(&self, dt_ms: f64) {
        self.advance_to(self.current_time.get() + dt_ms);
    }

    /// Move the clock to `time_ms` and emit one frame
    pub fn advance_to(&self, time_ms: f64) {
        self.current_time.set(time_ms);
        self.emit();
    }

    /// Emit one frame without moving the clock
    pub fn emit(&self) {
        if self.running.get() {
            self.subscribers.emit();
        }
    }

    /// Set the clock without emitting a frame
    pub fn set_time(&self, time_ms: f64) {
        self.current_time.set(time_ms);
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Number of times `start()` has been called
    pub fn start_count(&self) -> usize {
        self.starts.get()
    }

    /// Number of times `stop()` has been called
    pub fn stop_count(&self) -> usize {
        self.stops.get()
    }

    /// Number of subscriptions actually removed by `disconnect()`
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.get()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Ticker for ManualTicker {
    fn start(&self) {
        self.current_time.set(0.0);
        self.running.set(true);
        self.starts.set(self.starts.get() + 1);
    }

    fn stop(&self) {
        self.running.set(false);
        self.current_time.set(0.0);
        self.stops.set(self.stops.get() + 1);
    }

    fn time(&self) -> f64 {
        self.current_time.get()
    }

    fn connect(&self, callback: FrameCallback) -> SubscriptionId {
        self.subscribers.insert(callback)
    }

    fn disconnect(&self, id: SubscriptionId) {
        if self.subscribers.remove(id) {
            self.disconnects.set(self.disconnects.get() + 1);
        }
    }
}
