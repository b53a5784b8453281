//! Exit strategies: pluggable, priority-ordered evaluators.
//!
//! Each strategy answers one question per tick — *given the current state,
//! what exit (if any) should happen?* — through a single [`ExitStrategy`]
//! trait. `PositionMonitor` holds them in a `Vec<Box<dyn ExitStrategy>>`
//! built once at construction and sorted by [`ExitStrategy::priority`]; this
//! is the one dynamic-dispatch indirection in the crate's hot path, bounded
//! to at most six elements and never reallocated after construction.

mod individual_leg_stop_loss;
mod points_based_stop_loss;
mod points_based_target;
mod premium_based_exit;
mod time_based_forced_exit;
mod trailing_stop_loss;

pub use individual_leg_stop_loss::IndividualLegStopLoss;
pub use points_based_stop_loss::PointsBasedStopLoss;
pub use points_based_target::PointsBasedTarget;
pub use premium_based_exit::PremiumBasedExit;
pub use time_based_forced_exit::TimeBasedForcedExit;
pub use trailing_stop_loss::TrailingStopLoss;

use crate::clock::WallClock;
use crate::config::{Direction, SlTargetMode};
use crate::leg::Leg;
use std::sync::Arc;

/// Numerically-lower evaluates earlier.
pub mod priority {
    pub const TIME_BASED_FORCED_EXIT: u32 = 0;
    pub const PREMIUM_BASED_EXIT: u32 = 50;
    pub const POINTS_BASED_TARGET: u32 = 100;
    pub const INDIVIDUAL_LEG_STOP_LOSS: u32 = 200;
    pub const TRAILING_STOP_LOSS: u32 = 300;
    pub const POINTS_BASED_STOP_LOSS: u32 = 400;
}

/// Read-only view of a position's state, constructed fresh on the stack
/// once per tick batch and passed by reference to every strategy.
pub struct EvalContext<'a> {
    pub direction: Direction,
    pub direction_multiplier: f64,
    pub sl_target_mode: SlTargetMode,
    pub cum_pnl: f64,
    pub cumulative_target_points: f64,
    pub cumulative_stop_points: f64,
    pub entry_premium: f64,
    pub target_premium_level: f64,
    pub stop_loss_premium_level: f64,
    pub legs: &'a [Arc<Leg>],
    pub clock: &'a dyn WallClock,
}

/// What a strategy (or the monitor itself) decided to do about a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitAction {
    NoExit,
    ExitAll {
        reason: String,
    },
    ExitLeg {
        symbol: String,
        reason: String,
    },
    AdjustLeg {
        exited_symbol: String,
        reason: String,
        replacement_side: crate::types::OptionType,
        replacement_target_premium: f64,
        loss_making_symbol: String,
    },
}

impl ExitAction {
    #[inline]
    pub fn is_no_exit(&self) -> bool {
        matches!(self, ExitAction::NoExit)
    }
}

/// Contract shared by every exit strategy.
pub trait ExitStrategy: Send {
    /// Fixed priority used to sort the strategy list; see [`priority`].
    fn priority(&self) -> u32;

    /// Whether this strategy should be evaluated at all given the current
    /// context (e.g. `PointsBasedTarget` is only enabled in POINTS mode).
    /// Called every tick; must be cheap and side-effect free.
    fn is_enabled(&self, ctx: &EvalContext<'_>) -> bool;

    /// Evaluate and return an exit decision. Only called when
    /// `is_enabled` returned true.
    fn evaluate(&mut self, ctx: &EvalContext<'_>) -> ExitAction;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}
