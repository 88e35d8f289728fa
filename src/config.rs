use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Run controls for the time stepper and the Picard loop.
///
/// The run length and step keep their short JSON names `T` and `DT`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Picard tolerance on the max-norm of the update. `0` never converges,
    /// which forces exactly `npicard` iterations per step.
    pub accuracy: f64,
    /// Maximum Picard iterations per time step.
    pub npicard: usize,
    /// Emit a snapshot every `step` time steps.
    pub step: usize,
    /// Simulated duration in days.
    #[serde(rename = "T")]
    pub duration_days: f64,
    /// Time step in seconds.
    #[serde(rename = "DT")]
    pub dt_seconds: f64,
    /// Lagrange basis degree. Only linear elements are provided.
    pub degree: usize,
    /// Degree of the surface quadrature rule.
    pub nq: usize,
    /// Prefix of snapshot labels.
    pub output: String,
    pub logging: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            accuracy: 1e-10,
            npicard: 20,
            step: 1,
            duration_days: 1.0,
            dt_seconds: 600.0,
            degree: 1,
            nq: 3,
            output: "temperature_".to_string(),
            logging: false,
        }
    }
}

impl SimulationConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.accuracy.is_finite() && self.accuracy >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "accuracy must be finite and >= 0, got {}",
                self.accuracy
            )));
        }
        if self.npicard < 1 {
            return Err(ConfigError::Invalid("npicard must be >= 1".to_string()));
        }
        if self.step < 1 {
            return Err(ConfigError::Invalid("step must be >= 1".to_string()));
        }
        if !(self.duration_days.is_finite() && self.duration_days > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "T must be > 0 days, got {}",
                self.duration_days
            )));
        }
        if !(self.dt_seconds.is_finite() && self.dt_seconds > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "DT must be > 0 seconds, got {}",
                self.dt_seconds
            )));
        }
        if self.degree != 1 {
            return Err(ConfigError::Invalid(format!(
                "only linear elements are available, got degree {}",
                self.degree
            )));
        }
        if !(1..=4).contains(&self.nq) {
            return Err(ConfigError::Invalid(format!(
                "nq must be in 1..=4, got {}",
                self.nq
            )));
        }
        Ok(())
    }

    /// Normalised end time and step length, `t · ω`, and the step count.
    pub fn normalized_timeline(&self, omega: f64) -> Result<(f64, f64, usize), ConfigError> {
        if !(omega.is_finite() && omega > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "rotation rate omega must be > 0, got {omega}"
            )));
        }
        let t_end = self.duration_days * 86_400.0 * omega;
        let dt = self.dt_seconds * omega;
        // guard against 23.999... from the ω round trip
        let nt = (t_end / dt + 1e-9).floor() as usize;
        if nt == 0 {
            return Err(ConfigError::Invalid(format!(
                "DT = {} s is longer than T = {} days",
                self.dt_seconds, self.duration_days
            )));
        }
        Ok((t_end, dt, nt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SimulationConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            SimulationConfig { npicard: 0, ..Default::default() },
            SimulationConfig { step: 0, ..Default::default() },
            SimulationConfig { duration_days: 0.0, ..Default::default() },
            SimulationConfig { dt_seconds: -1.0, ..Default::default() },
            SimulationConfig { degree: 2, ..Default::default() },
            SimulationConfig { nq: 7, ..Default::default() },
            SimulationConfig { accuracy: f64::NAN, ..Default::default() },
        ];
        for cfg in &bad {
            assert!(cfg.validate().is_err(), "{cfg:?}");
        }
    }

    #[test]
    fn parses_short_option_names() {
        let json = r#"{ "T": 2.0, "DT": 3600.0, "npicard": 5, "accuracy": 1e-8 }"#;
        let cfg: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.duration_days, 2.0);
        assert_eq!(cfg.dt_seconds, 3600.0);
        assert_eq!(cfg.npicard, 5);
        assert_eq!(cfg.nq, 3);
    }

    #[test]
    fn timeline_is_normalised_by_spin_rate() {
        let cfg = SimulationConfig {
            duration_days: 1.0,
            dt_seconds: 3600.0,
            ..Default::default()
        };
        let omega = 2.0 * std::f64::consts::PI / 86_400.0;
        let (t_end, dt, nt) = cfg.normalized_timeline(omega).unwrap();
        assert!((t_end - 2.0 * std::f64::consts::PI).abs() < 1e-12);
        assert!((dt * 24.0 - t_end).abs() < 1e-12);
        assert_eq!(nt, 24);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, r#"{ "T": 0.5, "step": 4 }"#).unwrap();
        let cfg = SimulationConfig::from_file(&path).unwrap();
        assert_eq!(cfg.step, 4);

        std::fs::write(&path, r#"{ "npicard": 0 }"#).unwrap();
        assert!(SimulationConfig::from_file(&path).is_err());
    }
}
