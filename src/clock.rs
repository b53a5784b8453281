//! Wall-clock abstraction so `TimeBasedForcedExit` can be driven by a fixed
//! clock in tests and by the system clock in production.

use chrono::{NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Supplies the current instant. `TimeBasedForcedExit` only ever asks for
/// the time-of-day component in a configured exchange time zone.
pub trait WallClock: Send + Sync {
    fn now_utc(&self) -> chrono::DateTime<Utc>;

    /// Current time-of-day in `zone`.
    fn time_of_day(&self, zone: Tz) -> NaiveTime {
        zone.from_utc_datetime(&self.now_utc().naive_utc()).time()
    }

    /// Current time-of-day in the system's local time zone, used by
    /// `TimeBasedForcedExit` when a configured exchange time zone
    /// identifier fails to resolve (per §7, the fallback is system local
    /// time, not UTC). Clocks not backed by the real system clock (e.g.
    /// `FixedWallClock`) interpret their fixed instant as already-local,
    /// since they have no OS time zone of their own to consult.
    fn local_time_of_day(&self) -> NaiveTime {
        self.now_utc().naive_utc().time()
    }
}

/// Production clock backed by `SystemTime` via `chrono::Utc::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now_utc(&self) -> chrono::DateTime<Utc> {
        // `Utc::now` is the one place in this crate that is intentionally
        // exempt from the "no wall-clock reads on the hot path without a
        // reason" rule: TimeBasedForcedExit needs it exactly once per tick
        // batch, same as every other strategy reads `cum_pnl` once per batch.
        Utc::now()
    }

    fn local_time_of_day(&self) -> NaiveTime {
        chrono::Local::now().time()
    }
}

/// Fixed clock for tests: always reports the instant it was constructed
/// with until explicitly advanced.
#[derive(Debug, Clone)]
pub struct FixedWallClock {
    now: std::sync::Arc<parking_lot::Mutex<chrono::DateTime<Utc>>>,
}

impl FixedWallClock {
    pub fn new(now: chrono::DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Arc::new(parking_lot::Mutex::new(now)),
        }
    }

    pub fn set(&self, now: chrono::DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl WallClock for FixedWallClock {
    fn now_utc(&self) -> chrono::DateTime<Utc> {
        *self.now.lock()
    }
}
