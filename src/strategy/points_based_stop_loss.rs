use super::{priority, EvalContext, ExitAction, ExitStrategy};

/// Exits when cumulative P&L in points falls to or below the configured
/// stop-loss threshold.
#[derive(Debug, Default)]
pub struct PointsBasedStopLoss;

impl PointsBasedStopLoss {
    pub fn new() -> Self {
        Self
    }
}

impl ExitStrategy for PointsBasedStopLoss {
    fn priority(&self) -> u32 {
        priority::POINTS_BASED_STOP_LOSS
    }

    fn is_enabled(&self, ctx: &EvalContext<'_>) -> bool {
        ctx.sl_target_mode.is_points_like()
    }

    fn evaluate(&mut self, ctx: &EvalContext<'_>) -> ExitAction {
        if ctx.cum_pnl <= -ctx.cumulative_stop_points {
            return ExitAction::ExitAll {
                reason: format!(
                    "CUMULATIVE_STOPLOSS_HIT (Signal: {:.2} points)",
                    ctx.cum_pnl
                ),
            };
        }
        ExitAction::NoExit
    }

    fn name(&self) -> &'static str {
        "PointsBasedStopLoss"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Direction, SlTargetMode};
    use crate::strategy::test_support::{context, SYSTEM_CLOCK};

    #[test]
    fn fires_when_pnl_at_exactly_negative_stop() {
        let mut ctx = context(Direction::Short, SlTargetMode::Points, -3.0, &[], &SYSTEM_CLOCK);
        ctx.cumulative_stop_points = 3.0;
        let mut strategy = PointsBasedStopLoss::new();

        match strategy.evaluate(&ctx) {
            ExitAction::ExitAll { reason } => assert!(reason.starts_with("CUMULATIVE_STOPLOSS_HIT")),
            other => panic!("expected ExitAll, got {other:?}"),
        }
    }

    #[test]
    fn no_exit_above_stop() {
        let mut ctx = context(Direction::Short, SlTargetMode::Points, -2.99, &[], &SYSTEM_CLOCK);
        ctx.cumulative_stop_points = 3.0;
        let mut strategy = PointsBasedStopLoss::new();

        assert_eq!(strategy.evaluate(&ctx), ExitAction::NoExit);
    }
}
