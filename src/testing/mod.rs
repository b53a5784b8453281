//! Test builders for constructing monitors, legs and ticks without
//! repeating the full constructor argument list at every call site.
//!
//! Gated behind the `testing` feature so downstream crates embedding this
//! one can pull these builders into their own integration tests; this
//! crate's own `#[cfg(test)]` modules use them unconditionally.

use crate::clock::{SystemWallClock, WallClock};
use crate::config::{Direction, PositionMonitorConfig, SlTargetMode};
use crate::errors::MonitorConfigError;
use crate::monitor::{ExitCallback, IndividualLegExitCallback, LegReplacementCallback, PositionMonitor};
use crate::types::{ExecutionId, InstrumentToken, OptionType, OrderId, Tick, UserId};
use std::sync::Arc;

/// A `PositionMonitorConfig` with every threshold effectively disabled
/// (large points targets, no forced exit, no premium mode), so tests can
/// flip on exactly the one field they care about.
pub fn test_config() -> PositionMonitorConfig {
    PositionMonitorConfig {
        direction: Direction::Short,
        sl_target_mode: SlTargetMode::Points,
        stop_loss_points: 1_000.0,
        target_points: 1_000.0,
        trailing_stop_enabled: false,
        trailing_activation_points: 0.0,
        trailing_distance_points: 0.0,
        forced_exit_enabled: false,
        forced_exit_time: None,
        forced_exit_time_zone: "Asia/Kolkata".to_string(),
        premium_based_exit_enabled: false,
        entry_premium: 0.0,
        target_decay_pct: 0.0,
        stop_loss_expansion_pct: 0.0,
        individual_leg_stop_points: None,
    }
}

/// An `ExitCallback`/`IndividualLegExitCallback`/`LegReplacementCallback`
/// that does nothing and always succeeds, for tests that only care about
/// monitor state transitions, not callback side effects.
pub fn no_op_exit_callback() -> ExitCallback {
    Arc::new(|_user, _execution, _reason| Ok(()))
}

pub fn no_op_leg_exit_callback() -> IndividualLegExitCallback {
    Arc::new(|_user, _execution, _symbol, _reason| Ok(()))
}

pub fn no_op_replacement_callback() -> LegReplacementCallback {
    Arc::new(|_user, _execution, _request| Ok(()))
}

/// A price tick for `instrument_token` at `last_traded_price`, stamped with
/// the current wall-clock time.
pub fn test_tick(instrument_token: InstrumentToken, last_traded_price: f64) -> Tick {
    Tick::new(instrument_token, last_traded_price)
}

/// Builds a `PositionMonitor` from a `test_config()` base, with callbacks
/// defaulted to no-ops unless overridden. Mirrors `PositionMonitor::new`'s
/// constructor but removes the boilerplate of threading every argument
/// through at each call site.
pub struct MonitorBuilder {
    execution_id: ExecutionId,
    owner_user_id: UserId,
    config: PositionMonitorConfig,
    clock: Arc<dyn WallClock>,
    exit_callback: ExitCallback,
    individual_leg_exit_callback: Option<IndividualLegExitCallback>,
    leg_replacement_callback: Option<LegReplacementCallback>,
    legs: Vec<(OrderId, String, InstrumentToken, f64, u32, OptionType)>,
}

impl MonitorBuilder {
    pub fn new(execution_id: u64) -> Self {
        Self {
            execution_id: ExecutionId(execution_id),
            owner_user_id: UserId(1),
            config: test_config(),
            clock: Arc::new(SystemWallClock),
            exit_callback: no_op_exit_callback(),
            individual_leg_exit_callback: None,
            leg_replacement_callback: None,
            legs: Vec::new(),
        }
    }

    pub fn owner_user_id(mut self, user_id: u64) -> Self {
        self.owner_user_id = UserId(user_id);
        self
    }

    pub fn config(mut self, config: PositionMonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn WallClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn exit_callback(mut self, callback: ExitCallback) -> Self {
        self.exit_callback = callback;
        self
    }

    pub fn individual_leg_exit_callback(mut self, callback: IndividualLegExitCallback) -> Self {
        self.individual_leg_exit_callback = Some(callback);
        self
    }

    pub fn leg_replacement_callback(mut self, callback: LegReplacementCallback) -> Self {
        self.leg_replacement_callback = Some(callback);
        self
    }

    /// Queues a leg to be added via `add_leg` once the monitor is built.
    pub fn with_leg(
        mut self,
        symbol: impl Into<String>,
        instrument_token: InstrumentToken,
        entry_price: f64,
        quantity: u32,
        type_tag: OptionType,
    ) -> Self {
        let order_id = OrderId::generate();
        self.legs.push((order_id, symbol.into(), instrument_token, entry_price, quantity, type_tag));
        self
    }

    pub fn build(self) -> Result<PositionMonitor, MonitorConfigError> {
        let monitor = PositionMonitor::new(
            self.execution_id,
            self.owner_user_id,
            self.config,
            self.clock,
            self.exit_callback,
            self.individual_leg_exit_callback,
            self.leg_replacement_callback,
        )?;
        for (order_id, symbol, instrument_token, entry_price, quantity, type_tag) in self.legs {
            monitor
                .add_leg(order_id, symbol, instrument_token, entry_price, quantity, type_tag)
                .expect("MonitorBuilder legs must be valid");
        }
        Ok(monitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_builder_produces_an_active_monitor_with_queued_legs() {
        let monitor = MonitorBuilder::new(1)
            .with_leg("CE", 101, 100.0, 1, OptionType::Call)
            .with_leg("PE", 102, 95.0, 1, OptionType::Put)
            .build()
            .unwrap();

        assert!(monitor.is_active());
        assert_eq!(monitor.leg_count(), 2);
    }

    #[test]
    fn monitor_builder_propagates_invalid_config() {
        let mut config = test_config();
        config.stop_loss_points = -1.0;
        let err = MonitorBuilder::new(1).config(config).build().unwrap_err();
        assert!(matches!(err, MonitorConfigError::NegativeThreshold { .. }));
    }
}
