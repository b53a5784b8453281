use super::{priority, EvalContext, ExitAction, ExitStrategy};

/// Exits when cumulative P&L in points reaches the configured target.
#[derive(Debug, Default)]
pub struct PointsBasedTarget;

impl PointsBasedTarget {
    pub fn new() -> Self {
        Self
    }
}

impl ExitStrategy for PointsBasedTarget {
    fn priority(&self) -> u32 {
        priority::POINTS_BASED_TARGET
    }

    fn is_enabled(&self, ctx: &EvalContext<'_>) -> bool {
        ctx.sl_target_mode.is_points_like()
    }

    fn evaluate(&mut self, ctx: &EvalContext<'_>) -> ExitAction {
        if ctx.cum_pnl >= ctx.cumulative_target_points {
            return ExitAction::ExitAll {
                reason: format!("CUMULATIVE_TARGET_HIT (Signal: {:.2} points)", ctx.cum_pnl),
            };
        }
        ExitAction::NoExit
    }

    fn name(&self) -> &'static str {
        "PointsBasedTarget"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Direction, SlTargetMode};
    use crate::strategy::test_support::context;
    use crate::strategy::test_support::SYSTEM_CLOCK;

    fn ctx_with(cum_pnl: f64, target: f64) -> (PointsBasedTarget, EvalContext<'static>) {
        let mut context = context(Direction::Short, SlTargetMode::Points, cum_pnl, &[], &SYSTEM_CLOCK);
        context.cumulative_target_points = target;
        (PointsBasedTarget::new(), context)
    }

    #[test]
    fn fires_when_pnl_meets_target_exactly() {
        let (mut strategy, ctx) = ctx_with(2.0, 2.0);
        match strategy.evaluate(&ctx) {
            ExitAction::ExitAll { reason } => assert!(reason.starts_with("CUMULATIVE_TARGET_HIT")),
            other => panic!("expected ExitAll, got {other:?}"),
        }
    }

    #[test]
    fn no_exit_below_target() {
        let (mut strategy, ctx) = ctx_with(1.99, 2.0);
        assert_eq!(strategy.evaluate(&ctx), ExitAction::NoExit);
    }

    #[test]
    fn disabled_in_premium_mode() {
        let mut context = context(Direction::Short, SlTargetMode::Premium, 5.0, &[], &SYSTEM_CLOCK);
        context.cumulative_target_points = 2.0;
        let strategy = PointsBasedTarget::new();
        assert!(!strategy.is_enabled(&context));
    }
}
