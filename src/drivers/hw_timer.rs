//! Hardware timer callback registry and the console tick source.
//!
//! Each hardware timer has at most one subscriber. The table lives in
//! process-wide state behind a critical-section mutex so the timer
//! interrupt can read it while the main loop subscribes or tears down.
//!
//! ```text
//!   timer IRQ ──▶ dispatch(id) ──▶ registered fn() ──▶ TICKS[id] += 1
//!                                                          ▲
//!   TimerTicks::now() ─────────────── atomic load ─────────┘
//! ```
//!
//! On ESP-IDF the periodic source is an `esp_timer`; on simulation targets
//! a thread sleeps for the period and calls [`dispatch`].

use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, warn};

use crate::app::ports::{TickError, TickSource};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Registry ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerId {
    Timer0,
    Timer1,
    Timer2,
    Timer3,
}

impl TimerId {
    pub const COUNT: usize = 4;

    const fn index(self) -> usize {
        match self {
            Self::Timer0 => 0,
            Self::Timer1 => 1,
            Self::Timer2 => 2,
            Self::Timer3 => 3,
        }
    }

    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    const fn from_index(i: usize) -> Option<Self> {
        match i {
            0 => Some(Self::Timer0),
            1 => Some(Self::Timer1),
            2 => Some(Self::Timer2),
            3 => Some(Self::Timer3),
            _ => None,
        }
    }
}

/// Callback run from timer context. Must not block.
pub type TimerCallback = fn();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// The timer already has a subscriber.
    AlreadySubscribed(TimerId),
    /// The underlying timer could not be created or started.
    Hardware(i32),
}

impl From<TimerError> for TickError {
    fn from(e: TimerError) -> Self {
        match e {
            TimerError::AlreadySubscribed(_) => Self::InUse,
            TimerError::Hardware(rc) => Self::Hardware(rc),
        }
    }
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadySubscribed(id) => write!(f, "{id:?} already has a subscriber"),
            Self::Hardware(rc) => write!(f, "timer hardware error (rc={rc})"),
        }
    }
}

type Slots = [Option<TimerCallback>; TimerId::COUNT];

/// Table of at most one subscriber per hardware timer.
pub struct TimerRegistry {
    slots: Mutex<CriticalSectionRawMutex, RefCell<Slots>>,
}

impl TimerRegistry {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new([None; TimerId::COUNT])),
        }
    }

    /// Register `callback` as the single subscriber of `id`.
    ///
    /// The returned capability is the only way to unregister; dropping it
    /// clears the slot.
    pub fn subscribe(
        &'static self,
        id: TimerId,
        callback: TimerCallback,
    ) -> Result<TimerSubscription, TimerError> {
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            let slot = &mut slots[id.index()];
            if slot.is_some() {
                return Err(TimerError::AlreadySubscribed(id));
            }
            *slot = Some(callback);
            Ok(())
        })?;
        debug!("TIMER | {:?} subscribed", id);
        Ok(TimerSubscription { registry: self, id })
    }

    pub fn is_subscribed(&self, id: TimerId) -> bool {
        self.slots.lock(|slots| slots.borrow()[id.index()].is_some())
    }

    /// Run the subscriber of `id`, if any. The callback runs outside the
    /// critical section.
    pub fn dispatch(&self, id: TimerId) {
        let callback = self.slots.lock(|slots| slots.borrow()[id.index()]);
        if let Some(cb) = callback {
            cb();
        }
    }

    fn clear(&self, id: TimerId) {
        self.slots.lock(|slots| slots.borrow_mut()[id.index()] = None);
    }
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The registry the hardware timers dispatch into.
pub static TIMERS: TimerRegistry = TimerRegistry::new();

pub fn subscribe(id: TimerId, callback: TimerCallback) -> Result<TimerSubscription, TimerError> {
    TIMERS.subscribe(id, callback)
}

pub fn is_subscribed(id: TimerId) -> bool {
    TIMERS.is_subscribed(id)
}

/// Timer interrupt entry point. No-op when nobody is subscribed.
pub fn dispatch(id: TimerId) {
    TIMERS.dispatch(id);
}

/// Proof of registration. Teardown, explicit or by drop, clears the slot.
pub struct TimerSubscription {
    registry: &'static TimerRegistry,
    id: TimerId,
}

impl TimerSubscription {
    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn teardown(self) {}
}

impl Drop for TimerSubscription {
    fn drop(&mut self) {
        self.registry.clear(self.id);
        debug!("TIMER | {:?} torn down", self.id);
    }
}

impl fmt::Debug for TimerSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerSubscription").field("id", &self.id).finish()
    }
}

// ── Periodic source ───────────────────────────────────────────

/// A periodic trigger that calls [`dispatch`] for its timer id.
#[cfg(target_os = "espidf")]
pub struct PeriodicTimer {
    id: TimerId,
    handle: esp_timer_handle_t,
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn esp_timer_cb(arg: *mut core::ffi::c_void) {
    if let Some(id) = TimerId::from_index(arg as usize) {
        dispatch(id);
    }
}

#[cfg(target_os = "espidf")]
impl PeriodicTimer {
    pub fn new(id: TimerId) -> Result<Self, TimerError> {
        let args = esp_timer_create_args_t {
            callback: Some(esp_timer_cb),
            arg: id.index() as *mut core::ffi::c_void,
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"tick".as_ptr(),
            skip_unhandled_events: false,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: args outlives the call; handle is written by esp_timer_create.
        let ret = unsafe { esp_timer_create(&args, &mut handle) };
        if ret != ESP_OK {
            return Err(TimerError::Hardware(ret));
        }
        Ok(Self { id, handle })
    }

    pub fn start(&mut self, period_ms: u32) -> Result<(), TimerError> {
        // SAFETY: handle was created in new() and is deleted only in drop.
        let ret = unsafe { esp_timer_start_periodic(self.handle, u64::from(period_ms) * 1_000) };
        if ret != ESP_OK {
            return Err(TimerError::Hardware(ret));
        }
        debug!("TIMER | {:?} started, {} ms", self.id, period_ms);
        Ok(())
    }

    pub fn stop(&mut self) {
        // SAFETY: stopping an idle timer returns ESP_ERR_INVALID_STATE, which is harmless.
        unsafe { esp_timer_stop(self.handle) };
    }
}

#[cfg(target_os = "espidf")]
impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.stop();
        // SAFETY: the timer is stopped; no callback can run after delete.
        unsafe { esp_timer_delete(self.handle) };
    }
}

/// Simulation: a thread that sleeps for the period and dispatches.
#[cfg(not(target_os = "espidf"))]
pub struct PeriodicTimer {
    id: TimerId,
    running: Option<(
        std::sync::Arc<core::sync::atomic::AtomicBool>,
        std::thread::JoinHandle<()>,
    )>,
}

#[cfg(not(target_os = "espidf"))]
impl PeriodicTimer {
    pub fn new(id: TimerId) -> Result<Self, TimerError> {
        Ok(Self { id, running: None })
    }

    pub fn start(&mut self, period_ms: u32) -> Result<(), TimerError> {
        use core::sync::atomic::AtomicBool;
        use std::sync::Arc;

        self.stop();
        let alive = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&alive);
        let id = self.id;
        let period = std::time::Duration::from_millis(u64::from(period_ms));
        let handle = std::thread::spawn(move || {
            while flag.load(Ordering::Acquire) {
                std::thread::sleep(period);
                if flag.load(Ordering::Acquire) {
                    dispatch(id);
                }
            }
        });
        self.running = Some((alive, handle));
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some((alive, handle)) = self.running.take() {
            alive.store(false, Ordering::Release);
            if handle.join().is_err() {
                warn!("TIMER | {:?} simulation thread panicked", self.id);
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Console tick source ───────────────────────────────────────

/// Tick counts written by the timer callbacks, one per timer.
static TICKS: [AtomicU8; TimerId::COUNT] = [const { AtomicU8::new(0) }; TimerId::COUNT];

fn on_tick<const I: usize>() {
    TICKS[I].fetch_add(1, Ordering::AcqRel);
}

/// Callback that advances the count of the timer at each index.
const ON_TICK: [TimerCallback; TimerId::COUNT] =
    [on_tick::<0>, on_tick::<1>, on_tick::<2>, on_tick::<3>];

/// Session clock for the console node, driven by one hardware timer.
pub struct TimerTicks {
    timer: PeriodicTimer,
    period_ms: u32,
    subscription: Option<TimerSubscription>,
}

impl TimerTicks {
    pub fn new(id: TimerId, period_ms: u32) -> Result<Self, TimerError> {
        Ok(Self {
            timer: PeriodicTimer::new(id)?,
            period_ms,
            subscription: None,
        })
    }

    fn start(&mut self) -> Result<(), TimerError> {
        let id = self.timer_id();
        if self.subscription.is_none() {
            self.subscription = Some(subscribe(id, ON_TICK[id.index()])?);
        }
        TICKS[id.index()].store(0, Ordering::Release);
        self.timer.start(self.period_ms)
    }

    fn timer_id(&self) -> TimerId {
        self.timer.id
    }
}

impl TickSource for TimerTicks {
    fn restart(&mut self) -> Result<(), TickError> {
        self.start().map_err(|e| {
            warn!("TIMER | tick source failed to start: {}", e);
            TickError::from(e)
        })
    }

    fn now(&self) -> u8 {
        TICKS[self.timer_id().index()].load(Ordering::Acquire)
    }

    fn wait_advance(&mut self, last: u8) -> u8 {
        loop {
            let t = self.now();
            if t != last {
                return t;
            }
            idle_ms(1);
        }
    }

    fn stop(&mut self) {
        self.timer.stop();
        if let Some(sub) = self.subscription.take() {
            sub.teardown();
        }
    }
}

#[cfg(target_os = "espidf")]
fn idle_ms(ms: u32) {
    esp_idf_hal::delay::FreeRtos::delay_ms(ms);
}

#[cfg(not(target_os = "espidf"))]
fn idle_ms(ms: u32) {
    std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
}
