use glam::{DMat3, DVec3};

/// Solar incidence on a body spinning about +z.
///
/// Time is normalised by the spin rate, so one rotation takes `2π`.
#[derive(Debug, Clone, Copy)]
pub struct IlluminationModel {
    /// Direction towards the Sun at `t = 0`, body frame.
    pub sun_direction: DVec3,
}

impl IlluminationModel {
    /// Returns `None` for a zero or non-finite reference direction.
    pub fn new(sun_direction: DVec3) -> Option<Self> {
        if sun_direction.is_finite() && sun_direction.length_squared() > 0.0 {
            Some(Self { sun_direction })
        } else {
            None
        }
    }

    /// Unit vector towards the Sun at time `t`, seen from the rotating body.
    pub fn direction_at(&self, t: f64) -> DVec3 {
        (DMat3::from_rotation_z(-t) * self.sun_direction).normalize()
    }

    /// Cosine of the incidence angle, clamped to zero on the night side.
    #[inline]
    pub fn cosine(direction: DVec3, normal: DVec3) -> f64 {
        normal.dot(direction).max(0.0)
    }

    /// `mu` for each of `normals` at time `t`.
    pub fn incidence(&self, t: f64, normals: &[DVec3]) -> Vec<f64> {
        let d = self.direction_at(t);
        normals.iter().map(|n| Self::cosine(d, *n)).collect()
    }
}
