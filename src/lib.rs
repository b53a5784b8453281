//! Position Monitor Core
//!
//! Per-position exit-strategy evaluation for an intraday, multi-leg options
//! trading system. One [`monitor::PositionMonitor`] owns one position: its
//! legs, its cumulative P&L thresholds, and a fixed, priority-ordered list of
//! exit strategies that decide what to do with each incoming tick.
//! [`dispatcher::TickDispatcher`] fans out tick batches from the market-data
//! transport to every monitor with a leg on the ticked instrument;
//! [`registry::MonitorRegistry`] owns the per-user set of monitors and keeps
//! the dispatcher's token index in sync as positions open and close.
//!
//! ## Core modules
//! - `types`: identifiers and small value types (`ExecutionId`, `Tick`, ...)
//! - `config`: `PositionMonitorConfig`, validated once at construction
//! - `leg` / `leg_book`: a position's legs and their concurrent storage
//! - `strategy`: the six pluggable exit strategies
//! - `monitor`: `PositionMonitor`, the per-position evaluator
//! - `dispatcher`: tick fan-out by instrument token
//! - `registry`: per-user monitor lifecycle
//! - `clock`: wall-clock abstraction for deterministic forced-exit tests
//! - `metrics`: lock-free per-monitor counters
//! - `errors`: domain error types

pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod leg;
pub mod leg_book;
pub mod metrics;
pub mod monitor;
pub mod registry;
pub mod strategy;
pub mod types;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use errors::{LegBookError, MonitorConfigError};
pub use monitor::{
    ExitCallback, IndividualLegExitCallback, LegReplacementCallback, LegReplacementRequest, PositionMonitor,
};

/// Convenience re-exports for the common embedding-application call sites:
/// construct a config, build monitors, register them, and dispatch ticks.
pub mod prelude {
    pub use crate::clock::{FixedWallClock, SystemWallClock, WallClock};
    pub use crate::config::{Direction, PositionMonitorConfig, SlTargetMode};
    pub use crate::dispatcher::TickDispatcher;
    pub use crate::errors::{LegBookError, MonitorConfigError};
    pub use crate::metrics::{MonitorMetrics, MonitorMetricsSnapshot};
    pub use crate::monitor::{
        ExitCallback, IndividualLegExitCallback, LegReplacementCallback, LegReplacementRequest, PositionMonitor,
    };
    pub use crate::registry::MonitorRegistry;
    pub use crate::types::{ExecutionId, InstrumentToken, OptionType, OrderId, Tick, UserId};
}
