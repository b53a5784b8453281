use super::{priority, EvalContext, ExitAction, ExitStrategy};
use crate::config::Direction;

/// Exits on combined-LTP decay (target) or expansion (stop) relative to
/// entry premium. Only meaningful when `entry_premium > 0`.
#[derive(Debug, Default)]
pub struct PremiumBasedExit;

impl PremiumBasedExit {
    pub fn new() -> Self {
        Self
    }
}

impl ExitStrategy for PremiumBasedExit {
    fn priority(&self) -> u32 {
        priority::PREMIUM_BASED_EXIT
    }

    fn is_enabled(&self, ctx: &EvalContext<'_>) -> bool {
        ctx.entry_premium > 0.0
    }

    fn evaluate(&mut self, ctx: &EvalContext<'_>) -> ExitAction {
        let combined_ltp: f64 = ctx.legs.iter().map(|leg| leg.current_price()).sum();

        let (decayed, expanded) = match ctx.direction {
            Direction::Short => (
                combined_ltp <= ctx.target_premium_level,
                combined_ltp >= ctx.stop_loss_premium_level,
            ),
            Direction::Long => (
                combined_ltp >= ctx.target_premium_level,
                combined_ltp <= ctx.stop_loss_premium_level,
            ),
        };

        // Decay-target wins the tie when both would fire on the same tick.
        if decayed {
            return ExitAction::ExitAll {
                reason: format!(
                    "PREMIUM_DECAY_TARGET_HIT (Combined LTP={:.2}, Entry={:.2}, Target={:.2})",
                    combined_ltp, ctx.entry_premium, ctx.target_premium_level
                ),
            };
        }
        if expanded {
            return ExitAction::ExitAll {
                reason: format!(
                    "PREMIUM_EXPANSION_SL_HIT (Combined LTP={:.2}, Entry={:.2}, StopLoss={:.2})",
                    combined_ltp, ctx.entry_premium, ctx.stop_loss_premium_level
                ),
            };
        }
        ExitAction::NoExit
    }

    fn name(&self) -> &'static str {
        "PremiumBasedExit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemWallClock;
    use crate::config::SlTargetMode;
    use crate::leg::Leg;
    use crate::strategy::EvalContext;
    use crate::types::{OptionType, OrderId};
    use std::sync::Arc;

    fn straddle(ce: f64, pe: f64) -> Vec<Arc<Leg>> {
        let ce_leg = Leg::new(OrderId::new(1), "CE", 1, 50.0, 1, OptionType::Call);
        ce_leg.set_current_price(ce);
        let pe_leg = Leg::new(OrderId::new(2), "PE", 2, 50.0, 1, OptionType::Put);
        pe_leg.set_current_price(pe);
        vec![Arc::new(ce_leg), Arc::new(pe_leg)]
    }

    fn ctx<'a>(direction: Direction, legs: &'a [Arc<Leg>], clock: &'a SystemWallClock) -> EvalContext<'a> {
        EvalContext {
            direction,
            direction_multiplier: direction.multiplier(),
            sl_target_mode: SlTargetMode::Premium,
            cum_pnl: 0.0,
            cumulative_target_points: 0.0,
            cumulative_stop_points: 0.0,
            entry_premium: 100.0,
            target_premium_level: 95.0,
            stop_loss_premium_level: 110.0,
            legs,
            clock,
        }
    }

    #[test]
    fn short_decay_target_hit() {
        let legs = straddle(47.5, 47.5);
        let clock = SystemWallClock;
        let context = ctx(Direction::Short, &legs, &clock);
        let mut strategy = PremiumBasedExit::new();

        match strategy.evaluate(&context) {
            ExitAction::ExitAll { reason } => assert!(reason.starts_with("PREMIUM_DECAY_TARGET_HIT")),
            other => panic!("expected ExitAll, got {other:?}"),
        }
    }

    #[test]
    fn short_expansion_stop_loss_hit() {
        let legs = straddle(55.0, 55.0); // combined = 110.0
        let clock = SystemWallClock;
        let context = ctx(Direction::Short, &legs, &clock);
        let mut strategy = PremiumBasedExit::new();

        match strategy.evaluate(&context) {
            ExitAction::ExitAll { reason } => assert!(reason.starts_with("PREMIUM_EXPANSION_SL_HIT")),
            other => panic!("expected ExitAll, got {other:?}"),
        }
    }

    #[test]
    fn no_exit_inside_band() {
        let legs = straddle(50.0, 50.0); // combined = 100.0, strictly between 95 and 110
        let clock = SystemWallClock;
        let context = ctx(Direction::Short, &legs, &clock);
        let mut strategy = PremiumBasedExit::new();

        assert_eq!(strategy.evaluate(&context), ExitAction::NoExit);
    }

    #[test]
    fn disabled_when_entry_premium_not_positive() {
        let legs = straddle(50.0, 50.0);
        let clock = SystemWallClock;
        let mut context = ctx(Direction::Short, &legs, &clock);
        context.entry_premium = 0.0;
        let strategy = PremiumBasedExit::new();
        assert!(!strategy.is_enabled(&context));
    }
}
