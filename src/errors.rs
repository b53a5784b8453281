//! Domain-specific error types for position-monitor operations.
//!
//! These are the invariant-violation errors from §7 of the design: programmer
//! errors that are rejected at the call site rather than recovered from.

use std::fmt;

/// Errors raised by [`crate::leg_book::LegBook`] mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegBookError {
    /// `add` was called with a symbol already present in the book.
    DuplicateSymbol { symbol: String },
    /// `add` was called with a non-positive entry price.
    NonPositiveEntryPrice { symbol: String, entry_price: f64 },
    /// `add` was called with a zero quantity.
    ZeroQuantity { symbol: String },
}

impl fmt::Display for LegBookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegBookError::DuplicateSymbol { symbol } => {
                write!(f, "leg '{symbol}' already present in LegBook")
            }
            LegBookError::NonPositiveEntryPrice {
                symbol,
                entry_price,
            } => {
                write!(
                    f,
                    "leg '{symbol}' has non-positive entry price {entry_price}"
                )
            }
            LegBookError::ZeroQuantity { symbol } => {
                write!(f, "leg '{symbol}' has zero quantity")
            }
        }
    }
}

impl std::error::Error for LegBookError {}

/// Errors raised while constructing or reconfiguring a `PositionMonitor`.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorConfigError {
    /// `sl_target_mode = PREMIUM` but `entry_premium <= 0`.
    NonPositiveEntryPremium { entry_premium: f64 },
    /// `target_points` or `stop_loss_points` is negative.
    NegativeThreshold { field: &'static str, value: f64 },
    /// Trailing stop enabled but `trailing_distance_points <= 0`.
    NonPositiveTrailingDistance { trailing_distance_points: f64 },
    /// A forced-exit time zone identifier could not be parsed.
    InvalidTimeZone { zone: String },
}

impl fmt::Display for MonitorConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorConfigError::NonPositiveEntryPremium { entry_premium } => write!(
                f,
                "PREMIUM mode requires entry_premium > 0, got {entry_premium}"
            ),
            MonitorConfigError::NegativeThreshold { field, value } => {
                write!(f, "{field} must be non-negative, got {value}")
            }
            MonitorConfigError::NonPositiveTrailingDistance {
                trailing_distance_points,
            } => write!(
                f,
                "trailing_distance_points must be > 0, got {trailing_distance_points}"
            ),
            MonitorConfigError::InvalidTimeZone { zone } => {
                write!(f, "unknown time zone identifier '{zone}'")
            }
        }
    }
}

impl std::error::Error for MonitorConfigError {}
