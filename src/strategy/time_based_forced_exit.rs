use super::{priority, EvalContext, ExitAction, ExitStrategy};
use chrono::NaiveTime;
use chrono_tz::Tz;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Unconditional `ExitAll` once wall-clock time-of-day (in a configured
/// exchange time zone) reaches a cutoff.
pub struct TimeBasedForcedExit {
    forced_exit_time: NaiveTime,
    /// `None` means `time_zone_name` failed to resolve at construction; the
    /// strategy then reads time-of-day from the clock's system local time
    /// instead of a named zone, per §7.
    time_zone: Option<Tz>,
    triggered: Arc<AtomicBool>,
}

impl TimeBasedForcedExit {
    pub fn new(forced_exit_time: NaiveTime, time_zone_name: &str) -> Self {
        let time_zone = Tz::from_str(time_zone_name).ok();
        if time_zone.is_none() {
            tracing::warn!(
                zone = time_zone_name,
                "unknown forced-exit time zone, falling back to system local time"
            );
        }
        Self {
            forced_exit_time,
            time_zone,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Forces the next evaluation to fire. Returns `true` if this call was
    /// the one that set the flag, `false` if it was already set.
    pub fn trigger_manually(&self) -> bool {
        self.triggered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// A clone of the shared triggered-flag handle, so `PositionMonitor` can
    /// flip it from `trigger_forced_exit` without downcasting the boxed
    /// trait object.
    pub fn triggered_handle(&self) -> Arc<AtomicBool> {
        self.triggered.clone()
    }

    fn reason(&self) -> String {
        format!(
            "TIME_BASED_FORCED_EXIT @ {}",
            self.forced_exit_time.format("%H:%M")
        )
    }

    fn current_time_of_day(&self, ctx: &EvalContext<'_>) -> NaiveTime {
        match self.time_zone {
            Some(zone) => ctx.clock.time_of_day(zone),
            None => ctx.clock.local_time_of_day(),
        }
    }
}

impl ExitStrategy for TimeBasedForcedExit {
    fn priority(&self) -> u32 {
        priority::TIME_BASED_FORCED_EXIT
    }

    fn is_enabled(&self, _ctx: &EvalContext<'_>) -> bool {
        true
    }

    fn evaluate(&mut self, ctx: &EvalContext<'_>) -> ExitAction {
        if self.triggered.load(Ordering::Acquire) {
            return ExitAction::ExitAll {
                reason: self.reason(),
            };
        }
        let now = self.current_time_of_day(ctx);
        if now >= self.forced_exit_time {
            self.triggered.store(true, Ordering::Release);
            return ExitAction::ExitAll {
                reason: self.reason(),
            };
        }
        ExitAction::NoExit
    }

    fn name(&self) -> &'static str {
        "TimeBasedForcedExit"
    }
}
