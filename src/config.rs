//! Configuration accepted by `PositionMonitor`'s constructor.

use crate::errors::MonitorConfigError;
pub use crate::types::Direction;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which thresholds drive exit decisions.
///
/// `Mtm` is accepted for forward compatibility with callers that pass it,
/// but this crate treats it as an alias of `Points`: no distinct
/// mark-to-market data source is defined for this core, so `Points`-mode
/// strategies are gated on `Mtm` exactly as they are on `Points`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SlTargetMode {
    Points,
    Premium,
    Mtm,
}

impl SlTargetMode {
    /// Whether this mode drives `PointsBasedTarget` / `PointsBasedStopLoss`
    /// / `TrailingStopLoss`.
    #[inline]
    pub fn is_points_like(self) -> bool {
        matches!(self, SlTargetMode::Points | SlTargetMode::Mtm)
    }
}

/// Normalizes a percentage input: fractions (`0.05`) pass through unchanged,
/// whole-number percentages (`5.0`) are divided by 100.
#[inline]
pub fn normalize_percentage(value: f64) -> f64 {
    if value > 1.0 {
        value / 100.0
    } else {
        value
    }
}

/// Every option recognized by `PositionMonitor::new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionMonitorConfig {
    pub direction: Direction,
    pub sl_target_mode: SlTargetMode,

    pub stop_loss_points: f64,
    pub target_points: f64,

    #[serde(default)]
    pub trailing_stop_enabled: bool,
    #[serde(default)]
    pub trailing_activation_points: f64,
    #[serde(default)]
    pub trailing_distance_points: f64,

    #[serde(default)]
    pub forced_exit_enabled: bool,
    /// "HH:MM" time of day in `forced_exit_time_zone`.
    #[serde(default)]
    pub forced_exit_time: Option<String>,
    #[serde(default = "default_time_zone")]
    pub forced_exit_time_zone: String,

    #[serde(default)]
    pub premium_based_exit_enabled: bool,
    #[serde(default)]
    pub entry_premium: f64,
    #[serde(default)]
    pub target_decay_pct: f64,
    #[serde(default)]
    pub stop_loss_expansion_pct: f64,

    /// Defaults to `stop_loss_points` if unset; resolved once at
    /// construction, not re-read every tick, so it does not drift if
    /// `cumulative_stop_points` is later raised by an individual-leg exit.
    #[serde(default)]
    pub individual_leg_stop_points: Option<f64>,
}

fn default_time_zone() -> String {
    "Asia/Kolkata".to_string()
}

impl PositionMonitorConfig {
    /// Validates the invariants from §7 that belong at construction time.
    /// Percentage fields are expected to already be normalized by the
    /// caller via [`normalize_percentage`]; this only checks sign and mode
    /// consistency.
    pub fn validate(&self) -> Result<(), MonitorConfigError> {
        if self.stop_loss_points < 0.0 {
            return Err(MonitorConfigError::NegativeThreshold {
                field: "stop_loss_points",
                value: self.stop_loss_points,
            });
        }
        if self.target_points < 0.0 {
            return Err(MonitorConfigError::NegativeThreshold {
                field: "target_points",
                value: self.target_points,
            });
        }
        if self.sl_target_mode == SlTargetMode::Premium && self.entry_premium <= 0.0 {
            return Err(MonitorConfigError::NonPositiveEntryPremium {
                entry_premium: self.entry_premium,
            });
        }
        if self.trailing_stop_enabled && self.trailing_distance_points <= 0.0 {
            return Err(MonitorConfigError::NonPositiveTrailingDistance {
                trailing_distance_points: self.trailing_distance_points,
            });
        }
        if self.forced_exit_enabled {
            chrono_tz::Tz::from_str(&self.forced_exit_time_zone).map_err(|_| {
                MonitorConfigError::InvalidTimeZone {
                    zone: self.forced_exit_time_zone.clone(),
                }
            })?;
        }
        Ok(())
    }

    /// The per-leg stop threshold, defaulting to `stop_loss_points`.
    #[inline]
    pub fn individual_leg_stop_points(&self) -> f64 {
        self.individual_leg_stop_points.unwrap_or(self.stop_loss_points)
    }
}
