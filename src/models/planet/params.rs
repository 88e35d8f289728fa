use crate::config::ConfigError;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;

/// [W m^-2 K^-4] Stefan-Boltzmann constant
pub const STEFAN_BOLTZMANN: f64 = 5.670_374_419e-8;

/// Nondimensional parameters of the surface energy balance.
///
/// Temperatures are scaled by the subsolar equilibrium temperature `tss`
/// and time by the spin rate `omega`, which leaves a single conduction
/// parameter `phi` in the boundary law `phi ∂u/∂n = mu - u^4`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanetParams {
    /// [rad/s] spin rate
    pub omega: f64,
    /// [K] subsolar equilibrium temperature
    pub tss: f64,
    /// [K] uniform initial temperature
    pub theta: f64,
    pub phi: f64,
    /// Direction towards the Sun at t = 0 in the body frame.
    pub sun_direction: [f64; 3],
    /// Scale on the absorbed solar flux, 0 turns the Sun off.
    #[serde(default = "unit_insolation")]
    pub insolation: f64,
}

fn unit_insolation() -> f64 {
    1.0
}

/// Dimensional description of a body, in SI units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalParams {
    /// [s] rotation period
    pub period: f64,
    pub bond_albedo: f64,
    /// [W m^-2] solar flux at the body's distance
    pub solar_flux: f64,
    pub emissivity: f64,
    /// [J m^-2 K^-1 s^-1/2] thermal inertia
    pub thermal_inertia: f64,
    /// [K]
    pub initial_temperature: f64,
    pub sun_direction: [f64; 3],
}

impl Default for PhysicalParams {
    /// A dark, fast-spinning asteroid at 1.19 AU with the Sun in the equator.
    fn default() -> Self {
        Self {
            period: 7.63 * 3600.0,
            bond_albedo: 0.02,
            solar_flux: 1361.0 / (1.19 * 1.19),
            emissivity: 0.9,
            thermal_inertia: 300.0,
            initial_temperature: 200.0,
            sun_direction: [1.0, 0.0, 0.0],
        }
    }
}

impl PlanetParams {
    pub fn from_physical(p: &PhysicalParams, logging: bool) -> Result<Self, ConfigError> {
        if !(p.period.is_finite() && p.period > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "rotation period must be > 0, got {}",
                p.period
            )));
        }
        if !(0.0..1.0).contains(&p.bond_albedo) {
            return Err(ConfigError::Invalid(format!(
                "Bond albedo must be in [0, 1), got {}",
                p.bond_albedo
            )));
        }
        if !(p.emissivity > 0.0 && p.emissivity <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "emissivity must be in (0, 1], got {}",
                p.emissivity
            )));
        }

        let es = p.emissivity * STEFAN_BOLTZMANN;
        let omega = 2.0 * PI / p.period;
        let tss = ((1.0 - p.bond_albedo) * p.solar_flux / es).powf(0.25);
        let phi = p.thermal_inertia * omega.sqrt() / (es * tss.powi(3));

        if logging {
            println!("--- Scaling Constants ---");
            println!("Spin rate (omega): {:.4e} rad/s", omega);
            println!("Subsolar temperature (Tss): {:.2} K", tss);
            println!("Thermal parameter (Phi): {:.4}", phi);
            println!("-------------------------\n");
        }

        let params = Self {
            omega,
            tss,
            theta: p.initial_temperature,
            phi,
            sun_direction: p.sun_direction,
            insolation: 1.0,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&contents)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.omega.is_finite() && self.omega > 0.0) {
            return Err(ConfigError::Invalid(format!("omega must be > 0, got {}", self.omega)));
        }
        if !(self.tss.is_finite() && self.tss > 0.0) {
            return Err(ConfigError::Invalid(format!("Tss must be > 0, got {}", self.tss)));
        }
        if !(self.theta.is_finite() && self.theta >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "initial temperature must be >= 0 K, got {}",
                self.theta
            )));
        }
        if !(self.phi.is_finite() && self.phi > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "Phi must be > 0, got {}",
                self.phi
            )));
        }
        let sd = self.sun_direction();
        if !(sd.is_finite() && sd.length_squared() > 0.0) {
            return Err(ConfigError::Invalid("sun direction must be non-zero".to_string()));
        }
        if !(self.insolation.is_finite() && self.insolation >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "insolation must be >= 0, got {}",
                self.insolation
            )));
        }
        Ok(())
    }

    pub fn sun_direction(&self) -> DVec3 {
        DVec3::from_array(self.sun_direction)
    }

    /// Initial dimensionless temperature `theta / Tss`.
    pub fn initial_value(&self) -> f64 {
        self.theta / self.tss
    }
}
