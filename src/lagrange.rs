use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One of the analytically tracked equilibrium points of a two-primary
/// system. L3 is omitted; nothing in the search space reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LagrangeKind {
    L1,
    L2,
    L4,
    L5,
}

impl fmt::Display for LagrangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L4 => "L4",
            Self::L5 => "L5",
        };
        write!(f, "{name}")
    }
}

/// A parametric tracker body: looks like a body to consumers (position,
/// trajectory, zero mass, never dead) but is recomputed each step from the
/// primary/secondary source positions instead of being integrated.
#[derive(Debug, Clone)]
pub struct LagrangePoint {
    pub kind: LagrangeKind,
    pub position: Vector3<f64>,
    pub positions: Vec<Vector3<f64>>,
}

impl LagrangePoint {
    pub fn new(kind: LagrangeKind) -> Self {
        Self {
            kind,
            position: Vector3::zeros(),
            positions: Vec::new(),
        }
    }

    /// Repositions the point from the current primary and secondary states,
    /// given as `(position, mass)` with the primary the heavier of the two.
    pub fn recompute(
        &mut self,
        primary: (Vector3<f64>, f64),
        secondary: (Vector3<f64>, f64),
    ) {
        let (primary_position, primary_mass) = primary;
        let (secondary_position, secondary_mass) = secondary;
        let offset = secondary_position - primary_position;
        let a = offset.norm();
        if a == 0.0 {
            return;
        }

        self.position = match self.kind {
            // Collinear points, to first order in (m2 / 3 m1)^(1/3).
            LagrangeKind::L1 => {
                let r = a * (1.0 - (secondary_mass / (3.0 * primary_mass)).cbrt());
                primary_position + offset * (r / a)
            }
            LagrangeKind::L2 => {
                let r = a * (1.0 + (secondary_mass / (3.0 * primary_mass)).cbrt());
                primary_position + offset * (r / a)
            }
            // Triangular points: the secondary's offset rotated +-60 degrees
            // about the z axis.
            LagrangeKind::L4 => primary_position + rotate_z(offset, 60f64.to_radians()),
            LagrangeKind::L5 => primary_position + rotate_z(offset, -60f64.to_radians()),
        };
        if self.positions.is_empty() {
            self.positions.push(self.position);
        }
    }

    pub fn save_position(&mut self) {
        self.positions.push(self.position);
    }
}

fn rotate_z(v: Vector3<f64>, angle: f64) -> Vector3<f64> {
    let (sin, cos) = angle.sin_cos();
    Vector3::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUN_MASS: f64 = 1.989e30;
    const EARTH_MASS: f64 = 5.972e24;

    #[test]
    fn l1_sits_between_primaries_near_the_secondary() {
        let mut point = LagrangePoint::new(LagrangeKind::L1);
        let sun = (Vector3::new(450.0, 450.0, 0.0), SUN_MASS);
        let earth = (Vector3::new(300.0, 450.0, 0.0), EARTH_MASS);
        point.recompute(sun, earth);

        // Sun-Earth L1 lies about 1% of the separation sunward of Earth.
        let expected_x = 450.0 - 150.0 * (1.0 - (EARTH_MASS / (3.0 * SUN_MASS)).cbrt());
        assert!((point.position.x - expected_x).abs() < 1e-9);
        assert!((point.position.y - 450.0).abs() < 1e-9);
        assert!(point.position.x > 300.0 && point.position.x < 310.0);
    }

    #[test]
    fn l2_sits_beyond_the_secondary() {
        let mut point = LagrangePoint::new(LagrangeKind::L2);
        point.recompute(
            (Vector3::new(450.0, 450.0, 0.0), SUN_MASS),
            (Vector3::new(300.0, 450.0, 0.0), EARTH_MASS),
        );
        assert!(point.position.x < 300.0);
        assert!(point.position.x > 290.0);
    }

    #[test]
    fn triangular_points_form_equilateral_triangles() {
        let primary = (Vector3::new(0.0, 0.0, 0.0), SUN_MASS);
        let secondary = (Vector3::new(100.0, 0.0, 0.0), EARTH_MASS);

        for kind in [LagrangeKind::L4, LagrangeKind::L5] {
            let mut point = LagrangePoint::new(kind);
            point.recompute(primary, secondary);
            let to_primary = (point.position - primary.0).norm();
            let to_secondary = (point.position - secondary.0).norm();
            assert!((to_primary - 100.0).abs() < 1e-9);
            assert!((to_secondary - 100.0).abs() < 1e-9);
        }
    }
}
