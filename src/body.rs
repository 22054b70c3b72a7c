use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::{FieldTerm, ScalarField};
use crate::G;

/// Fixed-step integration scheme, chosen once at body construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Integrator {
    Euler,
    Leapfrog,
    Synchronous,
    KickDriftKick,
    Yoshida,
    RungeKutta,
}

impl FromStr for Integrator {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "euler" => Ok(Self::Euler),
            "leapfrog" => Ok(Self::Leapfrog),
            "synchronous" => Ok(Self::Synchronous),
            "kick-drift-kick" => Ok(Self::KickDriftKick),
            "yoshida" => Ok(Self::Yoshida),
            "runge-kutta" => Ok(Self::RungeKutta),
            other => Err(Error::UnsupportedOption(format!(
                "unknown integrator {other:?}, expected one of euler, leapfrog, synchronous, \
                 kick-drift-kick, yoshida, runge-kutta"
            ))),
        }
    }
}

impl fmt::Display for Integrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Euler => "euler",
            Self::Leapfrog => "leapfrog",
            Self::Synchronous => "synchronous",
            Self::KickDriftKick => "kick-drift-kick",
            Self::Yoshida => "yoshida",
            Self::RungeKutta => "runge-kutta",
        };
        write!(f, "{name}")
    }
}

/// A point mass with position, velocity and a trajectory log.
///
/// Bodies never reference other bodies; the acceleration acting on one is
/// supplied by the owning system as a closure over a frozen source snapshot.
#[derive(Debug, Clone)]
pub struct Body {
    pub mass: f64,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub acceleration: Vector3<f64>,
    pub fixed: bool,
    pub has_potential: bool,
    pub integrator: Integrator,
    pub initial_position: Vector3<f64>,
    pub initial_velocity: Vector3<f64>,
    pub positions: Vec<Vector3<f64>>,
    pub time_survived: f64,
    pub dead: bool,
    leapfrog_primed: bool,
}

impl Body {
    pub fn new(
        mass: f64,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
        fixed: bool,
        has_potential: bool,
        integrator: Integrator,
    ) -> Result<Self> {
        if mass <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "body mass must be positive, got {mass}"
            )));
        }
        Ok(Self {
            mass,
            position,
            velocity,
            acceleration: Vector3::zeros(),
            fixed,
            has_potential,
            integrator,
            initial_position: position,
            initial_velocity: velocity,
            positions: Vec::new(),
            time_survived: 0.0,
            dead: false,
            leapfrog_primed: false,
        })
    }

    /// A fixed field source.
    pub fn fixed_source(mass: f64, position: Vector3<f64>) -> Result<Self> {
        Self::new(
            mass,
            position,
            Vector3::zeros(),
            true,
            true,
            Integrator::Synchronous,
        )
    }

    /// A massless-in-effect probe that generates no potential.
    pub fn probe(
        position: Vector3<f64>,
        velocity: Vector3<f64>,
        integrator: Integrator,
    ) -> Result<Self> {
        Self::new(1.0, position, velocity, false, false, integrator)
    }

    /// This body's own contribution to the aggregate potential, in meters.
    pub fn potential(&self) -> ScalarField {
        ScalarField::new(vec![FieldTerm::new(-1.0, -G * self.mass, self.position)])
    }

    /// Appends the current position to the trajectory log. Sampling cadence
    /// is the caller's concern, decoupled from the physics step.
    pub fn save_position(&mut self) {
        self.positions.push(self.position);
    }

    /// Advances the body by one step of `dt` seconds under the acceleration
    /// field `accel`, using the scheme chosen at construction.
    pub fn step<F>(&mut self, dt: f64, accel: F)
    where
        F: Fn(Vector3<f64>) -> Vector3<f64>,
    {
        self.time_survived += dt;
        let x = self.position;
        let v = self.velocity;
        let a = accel(x);

        match self.integrator {
            Integrator::Euler => {
                self.position = x + v * dt + a * (dt * dt / 2.0);
                self.velocity = v + a * dt;
                self.acceleration = a;
            }
            Integrator::Leapfrog => {
                // One-time half-step desynchronization so velocities live at
                // half-integer times.
                let v = if self.leapfrog_primed {
                    v
                } else {
                    self.leapfrog_primed = true;
                    v - a * (dt / 2.0)
                };
                let v_new = v + a * dt;
                self.position = x + v_new * dt;
                self.velocity = v_new;
                self.acceleration = a;
            }
            Integrator::Synchronous => {
                let x_new = x + v * dt + a * (dt * dt / 2.0);
                let a_new = accel(x_new);
                self.position = x_new;
                self.velocity = v + (a + a_new) * (dt / 2.0);
                self.acceleration = a_new;
            }
            Integrator::KickDriftKick => {
                let v_half = v + a * (dt / 2.0);
                let x_new = x + v_half * dt;
                let a_new = accel(x_new);
                self.position = x_new;
                self.velocity = v_half + a_new * (dt / 2.0);
                self.acceleration = a_new;
            }
            Integrator::Yoshida => {
                let w0 = -2f64.powf(1.0 / 3.0) / (2.0 - 2f64.powf(1.0 / 3.0));
                let w1 = 1.0 / (2.0 - 2f64.powf(1.0 / 3.0));
                let c = [w1 / 2.0, (w0 + w1) / 2.0, (w0 + w1) / 2.0, w1 / 2.0];
                let d = [w1, w0, w1];

                let mut x = x;
                let mut v = v;
                for stage in 0..3 {
                    x += v * (c[stage] * dt);
                    let a = accel(x);
                    v += a * (d[stage] * dt);
                }
                self.position = x + v * (c[3] * dt);
                self.velocity = v;
            }
            Integrator::RungeKutta => {
                // Classical RK4 on the coupled (x, v) system.
                let k1_x = v;
                let k1_v = a;
                let k2_x = v + k1_v * (dt / 2.0);
                let k2_v = accel(x + k1_x * (dt / 2.0));
                let k3_x = v + k2_v * (dt / 2.0);
                let k3_v = accel(x + k2_x * (dt / 2.0));
                let k4_x = v + k3_v * dt;
                let k4_v = accel(x + k3_x * dt);

                self.position = x + (k1_x + k2_x * 2.0 + k3_x * 2.0 + k4_x) * (dt / 6.0);
                self.velocity = v + (k1_v + k2_v * 2.0 + k3_v * 2.0 + k4_v) * (dt / 6.0);
            }
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Body(m={:.2e}, p=[{:.2e}, {:.2e}, {:.2e}], v=[{:.2e}, {:.2e}, {:.2e}], survived={:.2e}s)",
            self.mass,
            self.position.x,
            self.position.y,
            self.position.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
            self.time_survived,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_mass_is_rejected() {
        let err = Body::new(
            0.0,
            Vector3::zeros(),
            Vector3::zeros(),
            false,
            false,
            Integrator::Euler,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));

        let err = Body::new(
            -3.0,
            Vector3::zeros(),
            Vector3::zeros(),
            false,
            false,
            Integrator::Euler,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn integrator_names_parse_and_round_trip() {
        for name in [
            "euler",
            "leapfrog",
            "synchronous",
            "kick-drift-kick",
            "yoshida",
            "runge-kutta",
        ] {
            let integrator: Integrator = name.parse().unwrap();
            assert_eq!(integrator.to_string(), name);
        }
        assert!(matches!(
            "rk45".parse::<Integrator>(),
            Err(Error::UnsupportedOption(_))
        ));
    }

    #[test]
    fn time_survived_accumulates_for_every_scheme() {
        for integrator in [
            Integrator::Euler,
            Integrator::Leapfrog,
            Integrator::Synchronous,
            Integrator::KickDriftKick,
            Integrator::Yoshida,
            Integrator::RungeKutta,
        ] {
            let mut body = Body::new(
                1.0,
                Vector3::zeros(),
                Vector3::zeros(),
                false,
                false,
                integrator,
            )
            .unwrap();
            for _ in 0..7 {
                body.step(50.0, |_| Vector3::zeros());
            }
            assert!((body.time_survived - 350.0).abs() < 1e-9);
        }
    }

    #[test]
    fn own_potential_is_a_single_inverse_distance_term() {
        let body = Body::fixed_source(2.0e30, Vector3::new(1.0, 2.0, 3.0)).unwrap();
        let potential = body.potential();
        assert_eq!(potential.terms.len(), 1);
        let term = potential.terms[0];
        assert_eq!(term.power, -1.0);
        assert!((term.coefficient - (-G * 2.0e30)).abs() < 1e15);
        assert_eq!(term.origin, Vector3::new(1.0, 2.0, 3.0));
    }
}
