use super::{priority, EvalContext, ExitAction, ExitStrategy};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Trails cumulative P&L once it reaches an activation threshold, exiting
/// if it later retreats to the trail level.
///
/// `high_water_mark` and `current_trailing_stop_level` are updated *before*
/// the exit check on every tick, so a tick that simultaneously lifts the
/// high-water mark and would have touched the old trail level does not
/// fire — the update always wins.
pub struct TrailingStopLoss {
    activation_points: f64,
    distance_points: f64,
    activated: AtomicBool,
    high_water_mark: AtomicU64,
    current_trailing_stop_level: AtomicU64,
}

impl TrailingStopLoss {
    pub fn new(activation_points: f64, distance_points: f64) -> Self {
        Self {
            activation_points,
            distance_points,
            activated: AtomicBool::new(false),
            high_water_mark: AtomicU64::new(0f64.to_bits()),
            current_trailing_stop_level: AtomicU64::new(0f64.to_bits()),
        }
    }

    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::Acquire)
    }

    pub fn high_water_mark(&self) -> f64 {
        f64::from_bits(self.high_water_mark.load(Ordering::Acquire))
    }

    pub fn current_trailing_stop_level(&self) -> f64 {
        f64::from_bits(self.current_trailing_stop_level.load(Ordering::Acquire))
    }
}

impl ExitStrategy for TrailingStopLoss {
    fn priority(&self) -> u32 {
        priority::TRAILING_STOP_LOSS
    }

    fn is_enabled(&self, ctx: &EvalContext<'_>) -> bool {
        ctx.sl_target_mode.is_points_like()
    }

    fn evaluate(&mut self, ctx: &EvalContext<'_>) -> ExitAction {
        if !self.is_activated() {
            if ctx.cum_pnl >= self.activation_points {
                self.high_water_mark.store(ctx.cum_pnl.to_bits(), Ordering::Release);
                self.current_trailing_stop_level
                    .store((ctx.cum_pnl - self.distance_points).to_bits(), Ordering::Release);
                self.activated.store(true, Ordering::Release);
            }
            return ExitAction::NoExit;
        }

        if ctx.cum_pnl > self.high_water_mark() {
            self.high_water_mark.store(ctx.cum_pnl.to_bits(), Ordering::Release);
            self.current_trailing_stop_level
                .store((ctx.cum_pnl - self.distance_points).to_bits(), Ordering::Release);
        }

        if ctx.cum_pnl <= self.current_trailing_stop_level() {
            return ExitAction::ExitAll {
                reason: format!(
                    "TRAILING_STOPLOSS_HIT (P&L={:.2}, HWM={:.2}, TrailLevel={:.2})",
                    ctx.cum_pnl,
                    self.high_water_mark(),
                    self.current_trailing_stop_level()
                ),
            };
        }
        ExitAction::NoExit
    }

    fn name(&self) -> &'static str {
        "TrailingStopLoss"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Direction, SlTargetMode};
    use crate::strategy::test_support::{context, SYSTEM_CLOCK};

    fn ctx_at(cum_pnl: f64) -> crate::strategy::EvalContext<'static> {
        context(Direction::Long, SlTargetMode::Points, cum_pnl, &[], &SYSTEM_CLOCK)
    }

    #[test]
    fn activates_then_fires_on_retreat() {
        let mut strategy = TrailingStopLoss::new(3.0, 1.5);

        // tick 1: 5.0 points -> activates, HWM=5.0, trail=3.5
        let action1 = strategy.evaluate(&ctx_at(5.0));
        assert_eq!(action1, ExitAction::NoExit);
        assert!(strategy.is_activated());
        assert_eq!(strategy.high_water_mark(), 5.0);
        assert_eq!(strategy.current_trailing_stop_level(), 3.5);

        // tick 2: 2.0 <= 3.5 -> fires
        match strategy.evaluate(&ctx_at(2.0)) {
            ExitAction::ExitAll { reason } => assert!(reason.starts_with("TRAILING_STOPLOSS_HIT")),
            other => panic!("expected ExitAll, got {other:?}"),
        }
    }

    #[test]
    fn new_high_uses_the_updated_trail_level_not_the_stale_one() {
        let mut strategy = TrailingStopLoss::new(3.0, 1.5);
        strategy.evaluate(&ctx_at(5.0)); // HWM=5.0, trail=3.5

        // cum_pnl rises further to 6.0: HWM/trail update to 6.0/4.5 before
        // the exit check runs, so the check uses 4.5, not the stale 3.5.
        let action = strategy.evaluate(&ctx_at(6.0));
        assert_eq!(action, ExitAction::NoExit);
        assert_eq!(strategy.high_water_mark(), 6.0);
        assert_eq!(strategy.current_trailing_stop_level(), 4.5);
    }

    #[test]
    fn not_activated_below_activation_threshold() {
        let mut strategy = TrailingStopLoss::new(3.0, 1.5);
        let action = strategy.evaluate(&ctx_at(2.9));
        assert_eq!(action, ExitAction::NoExit);
        assert!(!strategy.is_activated());
    }
}
