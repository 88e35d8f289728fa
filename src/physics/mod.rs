pub mod illumination;
pub mod radiation;

use nalgebra::DVector;
use radiation::RadiativeLinearization;

/// Defines the contract for a nonlinear boundary condition solved by Picard
/// iteration.
pub trait BoundaryModel {
    /// Linearise the boundary flux around the iterate `trial` at normalised
    /// time `time`.
    /// The result is a pure function of its arguments and is rebuilt from
    /// scratch on every call.
    fn linearize(&self, trial: &DVector<f64>, time: f64) -> RadiativeLinearization;
}
