//! Surface and subsurface temperature of a rotating body heated by the Sun.
//!
//! Heat conduction on a tetrahedral mesh is advanced with backward Euler. The
//! radiative surface law `Φ ∂u/∂n = mu − u⁴` is handled by Picard iteration,
//! reassembling the linearised boundary terms from the latest iterate.
pub mod config;
pub mod discretization;
pub mod error;
pub mod models;
pub mod numerics;
pub mod physics;
pub mod processing;
