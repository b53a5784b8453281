use super::{priority, EvalContext, ExitAction, ExitStrategy};
use crate::config::Direction;

/// Exits (or replaces) a single losing leg of a SHORT position once its own
/// P&L falls to or below `individual_leg_stop_points`.
///
/// `replacement_mode` is fixed at construction from the owning monitor's
/// `premium_based_exit_enabled` flag, so `evaluate` stays a pure function
/// of [`EvalContext`] — it does not itself decide whether a replacement is
/// wanted.
pub struct IndividualLegStopLoss {
    individual_leg_stop_points: f64,
    replacement_mode: bool,
}

impl IndividualLegStopLoss {
    pub fn new(individual_leg_stop_points: f64, replacement_mode: bool) -> Self {
        Self {
            individual_leg_stop_points,
            replacement_mode,
        }
    }
}

impl ExitStrategy for IndividualLegStopLoss {
    fn priority(&self) -> u32 {
        priority::INDIVIDUAL_LEG_STOP_LOSS
    }

    fn is_enabled(&self, ctx: &EvalContext<'_>) -> bool {
        ctx.direction == Direction::Short
    }

    fn evaluate(&mut self, ctx: &EvalContext<'_>) -> ExitAction {
        for leg in ctx.legs {
            let leg_pnl = leg.pnl_points(ctx.direction_multiplier);
            if leg_pnl <= -self.individual_leg_stop_points {
                let reason = format!(
                    "INDIVIDUAL_LEG_STOP (Symbol={}, P&L={:.2})",
                    leg.symbol, leg_pnl
                );

                if !self.replacement_mode {
                    return ExitAction::ExitLeg {
                        symbol: leg.symbol.clone(),
                        reason,
                    };
                }

                let Some(other_leg) = ctx.legs.iter().find(|other| other.symbol != leg.symbol) else {
                    // Single-leg position: nothing to replace against, fall
                    // back to a plain leg exit.
                    return ExitAction::ExitLeg {
                        symbol: leg.symbol.clone(),
                        reason,
                    };
                };

                return ExitAction::AdjustLeg {
                    exited_symbol: leg.symbol.clone(),
                    reason,
                    replacement_side: leg.type_tag.opposite(),
                    replacement_target_premium: other_leg.current_price(),
                    loss_making_symbol: other_leg.symbol.clone(),
                };
            }
        }
        ExitAction::NoExit
    }

    fn name(&self) -> &'static str {
        "IndividualLegStopLoss"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SlTargetMode;
    use crate::leg::Leg;
    use crate::strategy::test_support::{context, SYSTEM_CLOCK};
    use crate::types::{OptionType, OrderId};
    use std::sync::Arc;

    fn straddle() -> Vec<Arc<Leg>> {
        let ce = Leg::new(OrderId::new(1), "CE", 1, 100.0, 1, OptionType::Call);
        ce.set_current_price(104.0); // SHORT: pnl = (104-100)*-1 = -4.0
        let pe = Leg::new(OrderId::new(2), "PE", 2, 95.0, 1, OptionType::Put);
        pe.set_current_price(95.0);
        vec![Arc::new(ce), Arc::new(pe)]
    }

    #[test]
    fn simple_exit_leg_form() {
        let legs = straddle();
        let ctx = context(Direction::Short, SlTargetMode::Points, 0.0, &legs, &SYSTEM_CLOCK);
        let mut strategy = IndividualLegStopLoss::new(3.0, false);

        match strategy.evaluate(&ctx) {
            ExitAction::ExitLeg { symbol, reason } => {
                assert_eq!(symbol, "CE");
                assert!(reason.starts_with("INDIVIDUAL_LEG_STOP"));
            }
            other => panic!("expected ExitLeg, got {other:?}"),
        }
    }

    #[test]
    fn replacement_form_targets_the_other_leg_premium() {
        let legs = straddle();
        let ctx = context(Direction::Short, SlTargetMode::Points, 0.0, &legs, &SYSTEM_CLOCK);
        let mut strategy = IndividualLegStopLoss::new(3.0, true);

        match strategy.evaluate(&ctx) {
            ExitAction::AdjustLeg {
                exited_symbol,
                replacement_side,
                replacement_target_premium,
                loss_making_symbol,
                ..
            } => {
                assert_eq!(exited_symbol, "CE");
                assert_eq!(replacement_side, OptionType::Put);
                assert_eq!(replacement_target_premium, 95.0);
                assert_eq!(loss_making_symbol, "PE");
            }
            other => panic!("expected AdjustLeg, got {other:?}"),
        }
    }

    #[test]
    fn no_exit_when_no_leg_breaches_threshold() {
        let legs = straddle();
        let ctx = context(Direction::Short, SlTargetMode::Points, 0.0, &legs, &SYSTEM_CLOCK);
        let mut strategy = IndividualLegStopLoss::new(10.0, false);
        assert_eq!(strategy.evaluate(&ctx), ExitAction::NoExit);
    }

    #[test]
    fn disabled_for_long_positions() {
        let legs = straddle();
        let ctx = context(Direction::Long, SlTargetMode::Points, 0.0, &legs, &SYSTEM_CLOCK);
        let strategy = IndividualLegStopLoss::new(3.0, false);
        assert!(!strategy.is_enabled(&ctx));
    }
}
