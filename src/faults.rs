//! Persisted fault counters and the breach debounce rule.
//!
//! ## Storage layout
//!
//! | Counter     | Address |
//! |-------------|---------|
//! | temperature | `0x10`  |
//! | distance    | `0x20`  |
//!
//! The addresses are fixed so counters written by earlier firmware survive
//! an upgrade.
//!
//! ## Debounce
//!
//! A counter advances once per *distinct new* breaching reading. A breach
//! that holds the same value tick after tick is counted once; a breach that
//! changes value is counted again.

use log::{error, info, warn};

use crate::app::ports::StoragePort;
use crate::config::NodeConfig;
use crate::error::{StorageFault, StorageOp};

/// Which persisted counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Temperature,
    Distance,
}

impl FaultKind {
    pub const fn addr(self) -> u16 {
        match self {
            Self::Temperature => 0x10,
            Self::Distance => 0x20,
        }
    }
}

/// Snapshot of both counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultCounters {
    pub dist: u8,
    pub temp: u8,
}

impl FaultCounters {
    pub fn get(&self, kind: FaultKind) -> u8 {
        match kind {
            FaultKind::Temperature => self.temp,
            FaultKind::Distance => self.dist,
        }
    }

    fn set(&mut self, kind: FaultKind, value: u8) {
        match kind {
            FaultKind::Temperature => self.temp = value,
            FaultKind::Distance => self.dist = value,
        }
    }
}

// ---------------------------------------------------------------------------
// Counter store
// ---------------------------------------------------------------------------

/// Fault counters backed by byte-addressed storage.
///
/// Every storage primitive is attempted up to `retries` times before a
/// [`StorageFault`] is returned. The last value seen for each counter is
/// cached so callers always have something to report.
pub struct FaultCounterStore<S: StoragePort> {
    storage: S,
    retries: u8,
    cache: FaultCounters,
}

impl<S: StoragePort> FaultCounterStore<S> {
    pub fn new(storage: S, retries: u8) -> Self {
        Self {
            storage,
            retries: retries.max(1),
            cache: FaultCounters::default(),
        }
    }

    /// Read one persisted counter.
    pub fn read(&mut self, kind: FaultKind) -> Result<u8, StorageFault> {
        let addr = kind.addr();
        let value = self.with_retries(StorageOp::Read, addr, |s| s.read(addr))?;
        self.cache.set(kind, value);
        Ok(value)
    }

    /// Read both counters, distance first.
    pub fn counters(&mut self) -> Result<FaultCounters, StorageFault> {
        let dist = self.read(FaultKind::Distance)?;
        let temp = self.read(FaultKind::Temperature)?;
        Ok(FaultCounters { dist, temp })
    }

    /// Last successfully read or written values.
    pub fn cached(&self) -> FaultCounters {
        self.cache
    }

    /// Read-modify-write `+1`. Saturates at 255 so the counter never wraps
    /// back below a value already reported. Returns the new value.
    pub fn increment(&mut self, kind: FaultKind) -> Result<u8, StorageFault> {
        let current = self.read(kind)?;
        let next = current.saturating_add(1);
        if next == current {
            warn!("FAULT | {:?} counter saturated at {}", kind, current);
            return Ok(current);
        }
        self.write(kind, next)?;
        Ok(next)
    }

    pub fn reset(&mut self, kind: FaultKind) -> Result<(), StorageFault> {
        self.write(kind, 0)
    }

    /// Reset both counters. Both are attempted even if the first fails; the
    /// first failure is returned.
    pub fn reset_all(&mut self) -> Result<(), StorageFault> {
        let temp = self.reset(FaultKind::Temperature);
        let dist = self.reset(FaultKind::Distance);
        temp.and(dist)?;
        info!("FAULT | counters reset");
        Ok(())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn write(&mut self, kind: FaultKind, value: u8) -> Result<(), StorageFault> {
        let addr = kind.addr();
        self.with_retries(StorageOp::Write, addr, |s| s.write(addr, value))?;
        self.cache.set(kind, value);
        Ok(())
    }

    fn with_retries<R, E: core::fmt::Display>(
        &mut self,
        op: StorageOp,
        addr: u16,
        mut f: impl FnMut(&mut S) -> Result<R, E>,
    ) -> Result<R, StorageFault> {
        for attempt in 1..=self.retries {
            match f(&mut self.storage) {
                Ok(r) => return Ok(r),
                Err(e) => warn!(
                    "FAULT | storage {:?} at 0x{:02X} attempt {}/{}: {}",
                    op, addr, attempt, self.retries, e
                ),
            }
        }
        let fault = StorageFault {
            op,
            addr,
            attempts: self.retries,
        };
        error!("FAULT | {}", fault);
        Err(fault)
    }
}

// ---------------------------------------------------------------------------
// Breach detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Breach when temperature is strictly above this (°C).
    pub temp_above_c: u8,
    /// Breach when distance is strictly below this (cm).
    pub dist_below_cm: u16,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temp_above_c: 90,
            dist_below_cm: 10,
        }
    }
}

impl From<&NodeConfig> for Thresholds {
    fn from(config: &NodeConfig) -> Self {
        Self {
            temp_above_c: config.temp_breach_c,
            dist_below_cm: config.dist_breach_cm,
        }
    }
}

/// Which counters a reading should advance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Breaches {
    pub temperature: bool,
    pub distance: bool,
}

/// Debounces threshold breaches against the previous sample.
#[derive(Debug, Clone)]
pub struct BreachDetector {
    thresholds: Thresholds,
    prev_temp: u8,
    prev_dist: u16,
}

impl BreachDetector {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            prev_temp: 0,
            prev_dist: 0,
        }
    }

    /// Classify one reading and remember it as the previous sample.
    pub fn evaluate(&mut self, temperature: u8, distance: u16) -> Breaches {
        let breaches = Breaches {
            temperature: temperature > self.thresholds.temp_above_c
                && temperature != self.prev_temp,
            distance: distance < self.thresholds.dist_below_cm && distance != self.prev_dist,
        };
        self.prev_temp = temperature;
        self.prev_dist = distance;
        breaches
    }

    /// Forget the previous sample.
    pub fn clear(&mut self) {
        self.prev_temp = 0;
        self.prev_dist = 0;
    }

    pub fn previous(&self) -> (u8, u16) {
        (self.prev_temp, self.prev_dist)
    }
}
