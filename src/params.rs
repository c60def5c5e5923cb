use std::time::Duration;

use crate::cost::LocalizationMode;
use crate::error::OcCostError::{self, InvalidInput};
use serde::{Deserialize, Serialize};

/// Evaluation parameters.
///
/// Defaults: IoU localization, `lambda = 1` (localization only), `beta = 0.6`
/// and a 100 second solver budget. Missing fields fall back to the defaults
/// when deserializing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OcCostParams {
    /// Overlap measure used by the localization cost.
    pub mode: LocalizationMode,
    /// Weight of the localization cost against the classification cost.
    pub lambda: f64,
    /// Cost of leaving one unit of mass unmatched.
    pub beta: f64,
    /// Wall-clock budget of the LP solve, in seconds.
    pub time_limit_secs: f64,
}

impl Default for OcCostParams {
    fn default() -> Self {
        Self {
            mode: LocalizationMode::Iou,
            lambda: 1.0,
            beta: 0.6,
            time_limit_secs: 100.0,
        }
    }
}

impl OcCostParams {
    pub fn new(mode: LocalizationMode, lambda: f64, beta: f64) -> Self {
        Self {
            mode,
            lambda,
            beta,
            ..Self::default()
        }
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit_secs = time_limit.as_secs_f64();
        self
    }

    pub fn time_limit(&self) -> Duration {
        Duration::try_from_secs_f64(self.time_limit_secs.max(0.0))
            .unwrap_or(Duration::MAX)
    }

    pub fn validate(&self) -> Result<(), OcCostError> {
        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(InvalidInput(format!(
                "lambda must be in [0, 1], got {}",
                self.lambda
            )));
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(InvalidInput(format!(
                "beta must be finite and non-negative, got {}",
                self.beta
            )));
        }
        if Duration::try_from_secs_f64(self.time_limit_secs).is_err() {
            return Err(InvalidInput(format!(
                "time limit must be a finite number of seconds, got {}",
                self.time_limit_secs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        let params = OcCostParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.time_limit(), Duration::from_secs(100));
        assert_eq!(params.mode, LocalizationMode::Iou);
    }

    #[test]
    fn test_params_from_json() {
        let params: OcCostParams =
            serde_json::from_str(r#"{"mode": "giou_ch", "lambda": 0.5}"#).unwrap();
        assert_eq!(params.mode, LocalizationMode::GiouCh);
        assert_eq!(params.lambda, 0.5);
        assert_eq!(params.beta, 0.6);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_params_round_trip_mode_names() {
        let json = serde_json::to_string(&OcCostParams::new(LocalizationMode::GiouBb, 0.3, 0.2))
            .unwrap();
        assert!(json.contains(r#""mode":"giou_bb""#));
    }

    #[test]
    fn test_params_validate_rejects() {
        assert!(OcCostParams::new(LocalizationMode::Iou, 1.2, 0.5).validate().is_err());
        assert!(OcCostParams::new(LocalizationMode::Iou, 0.5, -0.5).validate().is_err());
        let mut params = OcCostParams::default();
        params.time_limit_secs = f64::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_with_time_limit() {
        let params = OcCostParams::default().with_time_limit(Duration::from_millis(250));
        assert_eq!(params.time_limit(), Duration::from_millis(250));
    }
}
