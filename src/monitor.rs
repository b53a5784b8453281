//! `PositionMonitor`: per-position exit-strategy evaluation.
//!
//! One instance owns one multi-leg options position: its legs, its
//! threshold state, and the fixed, priority-ordered list of strategies that
//! decide what to do with each tick. All public methods take `&self` —
//! mutable state lives behind atomics or short-held locks, the same pattern
//! [`crate::leg_book::LegBook`] uses — so a monitor can sit behind a plain
//! `Arc` in a registry without an outer mutex.

use crate::clock::WallClock;
use crate::config::{normalize_percentage, Direction, PositionMonitorConfig, SlTargetMode};
use crate::errors::{LegBookError, MonitorConfigError};
use crate::leg_book::LegBook;
use crate::metrics::{MonitorMetrics, MonitorMetricsSnapshot};
use crate::strategy::{
    EvalContext, ExitAction, ExitStrategy, IndividualLegStopLoss, PointsBasedStopLoss,
    PointsBasedTarget, PremiumBasedExit, TimeBasedForcedExit, TrailingStopLoss,
};
use crate::types::{ExecutionId, InstrumentToken, OptionType, OrderId, Tick, UserId};
use chrono::NaiveTime;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Invoked once a position has fully exited, with a human-readable reason.
pub type ExitCallback = Arc<dyn Fn(UserId, ExecutionId, &str) -> anyhow::Result<()> + Send + Sync>;

/// Invoked when a single leg of a still-open position exits.
pub type IndividualLegExitCallback =
    Arc<dyn Fn(UserId, ExecutionId, &str, &str) -> anyhow::Result<()> + Send + Sync>;

/// Invoked after a leg exit that calls for a replacement to be placed.
pub type LegReplacementCallback =
    Arc<dyn Fn(UserId, ExecutionId, LegReplacementRequest) -> anyhow::Result<()> + Send + Sync>;

/// Parameters of a requested replacement leg, handed to the embedding
/// application's order-placement code. `PositionMonitor` does not place
/// orders itself; it only decides that a replacement is wanted and at what
/// target premium.
#[derive(Debug, Clone, PartialEq)]
pub struct LegReplacementRequest {
    pub exited_symbol: String,
    pub replacement_side: OptionType,
    pub replacement_target_premium: f64,
    pub loss_making_symbol: String,
}

#[inline]
fn load_f64(cell: &AtomicU64) -> f64 {
    f64::from_bits(cell.load(Ordering::Acquire))
}

#[inline]
fn store_f64(cell: &AtomicU64, value: f64) {
    cell.store(value.to_bits(), Ordering::Release);
}

/// `(target_premium_level, stop_loss_premium_level)` for `PremiumBasedExit`,
/// derived from entry premium and the two normalized percentages.
fn premium_levels(entry_premium: f64, target_decay_pct: f64, stop_loss_expansion_pct: f64) -> (f64, f64) {
    let target = entry_premium * (1.0 - target_decay_pct);
    let stop = entry_premium * (1.0 + stop_loss_expansion_pct);
    (target, stop)
}

/// Per-position exit-strategy evaluator.
///
/// Threshold fields that strategies read every tick (`cumulative_*_points`,
/// `entry_premium` and the two derived premium levels) are `AtomicU64`
/// holding `f64` bit patterns, mirroring [`crate::leg::Leg::current_price`].
/// `target_stop_lock` guards the one place the two cumulative fields must
/// move together (raising the target after an individual-leg exit).
pub struct PositionMonitor {
    execution_id: ExecutionId,
    owner_user_id: UserId,

    direction: Direction,
    direction_multiplier: f64,
    sl_target_mode: SlTargetMode,

    cumulative_target_points: AtomicU64,
    cumulative_stop_points: AtomicU64,
    target_stop_lock: Mutex<()>,

    entry_premium: AtomicU64,
    target_premium_level: AtomicU64,
    stop_loss_premium_level: AtomicU64,
    target_decay_pct: f64,
    stop_loss_expansion_pct: f64,

    leg_book: LegBook,
    exit_strategies: Mutex<Vec<Box<dyn ExitStrategy>>>,
    forced_exit_trigger: Option<Arc<AtomicBool>>,

    active: AtomicBool,
    exit_reason: RwLock<String>,

    clock: Arc<dyn WallClock>,
    metrics: MonitorMetrics,

    exit_callback: ExitCallback,
    individual_leg_exit_callback: Option<IndividualLegExitCallback>,
    leg_replacement_callback: Option<LegReplacementCallback>,
}

impl PositionMonitor {
    /// Builds the priority-ordered strategy list from `config` and validates
    /// it. `individual_leg_exit_callback` gates whether `IndividualLegStopLoss`
    /// is included at all (with no callback there is nowhere to report a leg
    /// exit to, so the strategy would be unreachable).
    pub fn new(
        execution_id: ExecutionId,
        owner_user_id: UserId,
        mut config: PositionMonitorConfig,
        clock: Arc<dyn WallClock>,
        exit_callback: ExitCallback,
        individual_leg_exit_callback: Option<IndividualLegExitCallback>,
        leg_replacement_callback: Option<LegReplacementCallback>,
    ) -> Result<Self, MonitorConfigError> {
        config.target_decay_pct = normalize_percentage(config.target_decay_pct);
        config.stop_loss_expansion_pct = normalize_percentage(config.stop_loss_expansion_pct);
        config.validate()?;

        let direction = config.direction;
        let direction_multiplier = direction.multiplier();
        let (target_premium_level, stop_loss_premium_level) = premium_levels(
            config.entry_premium,
            config.target_decay_pct,
            config.stop_loss_expansion_pct,
        );

        let mut exit_strategies: Vec<Box<dyn ExitStrategy>> = Vec::with_capacity(6);
        let mut forced_exit_trigger = None;

        if config.forced_exit_enabled {
            match &config.forced_exit_time {
                Some(time_str) => {
                    let parsed = NaiveTime::parse_from_str(time_str, "%H:%M").map_err(|_| {
                        MonitorConfigError::InvalidTimeZone {
                            zone: time_str.clone(),
                        }
                    })?;
                    let strategy = TimeBasedForcedExit::new(parsed, &config.forced_exit_time_zone);
                    forced_exit_trigger = Some(strategy.triggered_handle());
                    exit_strategies.push(Box::new(strategy));
                }
                None => warn!(
                    execution_id = execution_id.0,
                    "forced_exit_enabled is set but forced_exit_time is absent; forced exit disabled"
                ),
            }
        }
        if config.premium_based_exit_enabled {
            exit_strategies.push(Box::new(PremiumBasedExit::new()));
        }
        exit_strategies.push(Box::new(PointsBasedTarget::new()));
        if individual_leg_exit_callback.is_some() {
            exit_strategies.push(Box::new(IndividualLegStopLoss::new(
                config.individual_leg_stop_points(),
                config.premium_based_exit_enabled,
            )));
        }
        if config.trailing_stop_enabled {
            exit_strategies.push(Box::new(TrailingStopLoss::new(
                config.trailing_activation_points,
                config.trailing_distance_points,
            )));
        }
        exit_strategies.push(Box::new(PointsBasedStopLoss::new()));

        exit_strategies.sort_by_key(|s| s.priority());

        info!(
            execution_id = execution_id.0,
            owner_user_id = owner_user_id.0,
            direction = %direction,
            sl_target_mode = ?config.sl_target_mode,
            strategy_count = exit_strategies.len(),
            "position monitor constructed"
        );

        Ok(Self {
            execution_id,
            owner_user_id,
            direction,
            direction_multiplier,
            sl_target_mode: config.sl_target_mode,
            cumulative_target_points: AtomicU64::new(config.target_points.to_bits()),
            cumulative_stop_points: AtomicU64::new(config.stop_loss_points.to_bits()),
            target_stop_lock: Mutex::new(()),
            entry_premium: AtomicU64::new(config.entry_premium.to_bits()),
            target_premium_level: AtomicU64::new(target_premium_level.to_bits()),
            stop_loss_premium_level: AtomicU64::new(stop_loss_premium_level.to_bits()),
            target_decay_pct: config.target_decay_pct,
            stop_loss_expansion_pct: config.stop_loss_expansion_pct,
            leg_book: LegBook::new(),
            exit_strategies: Mutex::new(exit_strategies),
            forced_exit_trigger,
            active: AtomicBool::new(true),
            exit_reason: RwLock::new(String::new()),
            clock,
            metrics: MonitorMetrics::new(),
            exit_callback,
            individual_leg_exit_callback,
            leg_replacement_callback,
        })
    }

    /// Adds an opening leg. Fails if its symbol is already present or its
    /// entry price/quantity is invalid; see [`LegBookError`].
    pub fn add_leg(
        &self,
        order_id: OrderId,
        symbol: impl Into<String>,
        instrument_token: InstrumentToken,
        entry_price: f64,
        quantity: u32,
        type_tag: OptionType,
    ) -> Result<(), LegBookError> {
        let leg = crate::leg::Leg::new(order_id, symbol, instrument_token, entry_price, quantity, type_tag);
        self.leg_book.add(leg)
    }

    /// Adds a leg placed to replace one closed by `IndividualLegStopLoss`'s
    /// adjustment path. Same validation as [`PositionMonitor::add_leg`]; kept
    /// as a distinct method so callers' call sites read as what they are.
    pub fn add_replacement_leg(
        &self,
        order_id: OrderId,
        symbol: impl Into<String>,
        instrument_token: InstrumentToken,
        entry_price: f64,
        quantity: u32,
        type_tag: OptionType,
    ) -> Result<(), LegBookError> {
        self.add_leg(order_id, symbol, instrument_token, entry_price, quantity, type_tag)
    }

    /// Removes a leg without going through exit-strategy evaluation, e.g.
    /// when the embedding application closes it for a reason outside this
    /// crate's strategies. Silent no-op if `symbol` is not present.
    pub fn remove_leg(&self, symbol: &str) {
        self.leg_book.remove(symbol);
    }

    /// Reports that placing a replacement leg (requested via a prior
    /// [`LegReplacementRequest`]) failed to fill. Unlike `signal_leg_replacement_failed`'s
    /// name might suggest, this does **not** exit the position: the losing
    /// leg is already gone and `cumulative_target_points` already adjusted
    /// (an unconditional side effect of the exit, not of a successful
    /// replacement); this call only logs the failure and records it in
    /// metrics, leaving the remaining legs exactly as they are.
    pub fn signal_leg_replacement_failed(&self, loss_making_symbol: &str, reason: impl Into<String>) {
        self.metrics.record_replacement_failure();
        warn!(
            execution_id = self.execution_id.0,
            remaining_leg = loss_making_symbol,
            reason = %reason.into(),
            "leg replacement failed to fill; remaining legs left unchanged"
        );
    }

    /// Sets the entry premium and recomputes the two derived premium levels.
    pub fn set_entry_premium(&self, entry_premium: f64) {
        let (target, stop) = premium_levels(entry_premium, self.target_decay_pct, self.stop_loss_expansion_pct);
        store_f64(&self.entry_premium, entry_premium);
        store_f64(&self.target_premium_level, target);
        store_f64(&self.stop_loss_premium_level, stop);
    }

    /// Recomputes `entry_premium` (as the sum of current legs' entry
    /// prices) and the two derived premium levels, called after
    /// `add_replacement_leg` has recorded a successful fill.
    pub fn update_entry_premium_after_replacement(&self) {
        let legs = self.leg_book.snapshot();
        let new_entry_premium: f64 = legs.iter().map(|leg| leg.entry_price).sum();
        self.set_entry_premium(new_entry_premium);
        self.metrics.record_leg_replaced();
    }

    /// The hot path: apply each tick to its matching leg, then run one
    /// evaluation pass over the strategy list. No-op if the monitor is
    /// already inactive.
    pub fn update_prices(&self, ticks: &[Tick]) {
        if !self.is_active() {
            return;
        }

        for tick in ticks {
            if let Some(leg) = self.leg_book.get_by_token(tick.instrument_token) {
                leg.set_current_price(tick.last_traded_price);
            }
        }

        self.metrics.record_tick();
        self.run_evaluation_pass();
    }

    /// Deactivates the monitor without invoking `exit_callback`. For when
    /// the embedding application has already closed the position through
    /// some other path and just needs this monitor to stop evaluating.
    pub fn stop(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Manually trips the forced-exit strategy (if one is configured) and
    /// immediately runs an evaluation pass so the exit takes effect without
    /// waiting for the next tick. Returns `true` if this call was the one
    /// that set the trigger; `false` if it was already set, already
    /// inactive, or no forced-exit strategy is configured.
    pub fn trigger_forced_exit(&self) -> bool {
        if !self.is_active() {
            return false;
        }
        let Some(trigger) = &self.forced_exit_trigger else {
            warn!(
                execution_id = self.execution_id.0,
                "trigger_forced_exit called but no forced-exit strategy is configured"
            );
            return false;
        };

        let newly_set = trigger
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.run_evaluation_pass();
        newly_set
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    pub fn owner_user_id(&self) -> UserId {
        self.owner_user_id
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// The reason string passed to the most recent `exit_callback`
    /// invocation. Empty until the position exits.
    pub fn exit_reason(&self) -> String {
        self.exit_reason.read().clone()
    }

    pub fn metrics(&self) -> MonitorMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn leg_count(&self) -> usize {
        self.leg_book.len()
    }

    /// Instrument tokens of every leg currently held, for registering this
    /// monitor's interest with a [`crate::dispatcher::TickDispatcher`].
    pub fn instrument_tokens(&self) -> Vec<InstrumentToken> {
        self.leg_book
            .snapshot()
            .iter()
            .map(|leg| leg.instrument_token)
            .collect()
    }

    /// Builds an [`EvalContext`] from current state and runs the strategy
    /// list until one returns something other than `NoExit`.
    fn run_evaluation_pass(&self) {
        let legs = self.leg_book.snapshot();
        let cum_pnl: f64 = legs.iter().map(|leg| leg.pnl_points(self.direction_multiplier)).sum();

        let ctx = EvalContext {
            direction: self.direction,
            direction_multiplier: self.direction_multiplier,
            sl_target_mode: self.sl_target_mode,
            cum_pnl,
            cumulative_target_points: load_f64(&self.cumulative_target_points),
            cumulative_stop_points: load_f64(&self.cumulative_stop_points),
            entry_premium: load_f64(&self.entry_premium),
            target_premium_level: load_f64(&self.target_premium_level),
            stop_loss_premium_level: load_f64(&self.stop_loss_premium_level),
            legs: legs.as_slice(),
            clock: self.clock.as_ref(),
        };

        let action = {
            let mut strategies = self.exit_strategies.lock();
            let mut decided = ExitAction::NoExit;
            for strategy in strategies.iter_mut() {
                if !strategy.is_enabled(&ctx) {
                    continue;
                }
                let action = strategy.evaluate(&ctx);
                if !action.is_no_exit() {
                    debug!(execution_id = self.execution_id.0, strategy = strategy.name(), "strategy fired");
                    decided = action;
                    break;
                }
            }
            decided
        };

        if !action.is_no_exit() {
            self.handle_exit_action(action);
        }
    }

    fn handle_exit_action(&self, action: ExitAction) {
        match action {
            ExitAction::NoExit => {}
            ExitAction::ExitAll { reason } => self.exit_all(reason),
            ExitAction::ExitLeg { symbol, reason } => self.exit_leg(symbol, reason),
            ExitAction::AdjustLeg {
                exited_symbol,
                reason,
                replacement_side,
                replacement_target_premium,
                loss_making_symbol,
            } => {
                self.exit_leg(exited_symbol.clone(), reason);

                if self.is_active() {
                    if let Some(callback) = self.leg_replacement_callback.clone() {
                        let request = LegReplacementRequest {
                            exited_symbol,
                            replacement_side,
                            replacement_target_premium,
                            loss_making_symbol,
                        };
                        if let Err(err) = callback(self.owner_user_id, self.execution_id, request) {
                            self.metrics.record_callback_error();
                            error!(
                                execution_id = self.execution_id.0,
                                error = %err,
                                "leg_replacement_callback failed"
                            );
                        }
                    }
                }
            }
        }
    }

    fn exit_all(&self, reason: String) {
        self.active.store(false, Ordering::Release);
        *self.exit_reason.write() = reason.clone();
        self.metrics.record_exit_all();
        info!(execution_id = self.execution_id.0, reason = %reason, "position exited");

        if let Err(err) = (self.exit_callback)(self.owner_user_id, self.execution_id, &reason) {
            self.metrics.record_callback_error();
            error!(execution_id = self.execution_id.0, error = %err, "exit_callback failed");
        }
    }

    fn exit_leg(&self, symbol: String, reason: String) {
        if let Some(callback) = self.individual_leg_exit_callback.clone() {
            if let Err(err) = callback(self.owner_user_id, self.execution_id, &symbol, &reason) {
                self.metrics.record_callback_error();
                error!(
                    execution_id = self.execution_id.0,
                    symbol = %symbol,
                    error = %err,
                    "individual_leg_exit_callback failed"
                );
            }
        }

        self.leg_book.remove(&symbol);
        self.metrics.record_exit_leg();
        debug!(execution_id = self.execution_id.0, symbol = %symbol, reason = %reason, "leg exited");

        {
            let _guard = self.target_stop_lock.lock();
            let stop = load_f64(&self.cumulative_stop_points);
            let target = load_f64(&self.cumulative_target_points);
            store_f64(&self.cumulative_target_points, target + stop);
        }

        if self.leg_book.is_empty() {
            self.exit_all(format!("ALL_LEGS_CLOSED_INDIVIDUALLY (last: {reason})"));
        }
    }
}
