use nalgebra::Vector3;
use ordered_float::OrderedFloat;

use crate::body::Body;
use crate::error::Result;
use crate::field::{FieldTerm, ScalarField, DEFAULT_EPSILON};
use crate::lagrange::LagrangePoint;
use crate::liveness::AlivePredicate;
use crate::G;

/// How per-body accelerations are obtained: direct Newtonian summation over
/// the sources, or a finite-difference gradient of the aggregate potential.
/// Both must agree to finite-difference accuracy; `Force` is the default and
/// the one the search path uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldMethod {
    #[default]
    Force,
    Potential,
}

/// A collection of bodies advancing under their mutual gravity.
///
/// Positions are stored in units of `10^n` meters; the conversion to SI
/// happens in exactly one place per field method (the source accelerator
/// below and `ScalarField::rescale`), never at call sites.
#[derive(Debug, Clone)]
pub struct System {
    pub bodies: Vec<Body>,
    pub trackers: Vec<LagrangePoint>,
    pub n: i32,
    pub method: FieldMethod,
    fixed: Vec<usize>,
    moving: Vec<usize>,
    attractive: Vec<usize>,
    dead: Vec<usize>,
    tracked: Option<usize>,
}

impl System {
    pub fn new(bodies: Vec<Body>, trackers: Vec<LagrangePoint>, n: i32) -> Self {
        let mut fixed = Vec::new();
        let mut moving = Vec::new();
        let mut attractive = Vec::new();
        for (i, body) in bodies.iter().enumerate() {
            if body.fixed {
                fixed.push(i);
            } else {
                moving.push(i);
            }
            if body.has_potential {
                attractive.push(i);
            }
        }
        // The heaviest moving body is the reference for relative liveness
        // predicates.
        let tracked = moving
            .iter()
            .copied()
            .max_by_key(|&i| OrderedFloat(bodies[i].mass));

        let mut system = Self {
            bodies,
            trackers,
            n,
            method: FieldMethod::default(),
            fixed,
            moving,
            attractive,
            dead: Vec::new(),
            tracked,
        };
        system.update_trackers();
        system
    }

    pub fn fixed_bodies(&self) -> impl Iterator<Item = &Body> {
        self.fixed.iter().map(|&i| &self.bodies[i])
    }

    pub fn moving_bodies(&self) -> impl Iterator<Item = &Body> {
        self.moving.iter().map(|&i| &self.bodies[i])
    }

    pub fn attractive_bodies(&self) -> impl Iterator<Item = &Body> {
        self.attractive.iter().map(|&i| &self.bodies[i])
    }

    pub fn dead_bodies(&self) -> impl Iterator<Item = &Body> {
        self.dead.iter().map(|&i| &self.bodies[i])
    }

    pub fn tracked_body(&self) -> Option<&Body> {
        self.tracked.map(|i| &self.bodies[i])
    }

    /// Moving non-source bodies still alive — the population whose survival
    /// the search cares about.
    pub fn live_test_body_count(&self) -> usize {
        self.moving
            .iter()
            .filter(|&&i| !self.bodies[i].has_potential && !self.bodies[i].dead)
            .count()
    }

    /// Snapshot of the live sources as `(index, position, mass)`, frozen at
    /// the start of a step so every body integrates against the same state.
    fn source_snapshot(&self) -> Vec<(usize, Vector3<f64>, f64)> {
        self.attractive
            .iter()
            .filter(|&&i| !self.bodies[i].dead)
            .map(|&i| (i, self.bodies[i].position, self.bodies[i].mass))
            .collect()
    }

    /// Advances every movable body by one step of `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        let snapshot = self.source_snapshot();
        let n = self.n;
        let moving = self.moving.clone();

        for i in moving {
            if self.bodies[i].dead {
                continue;
            }
            // Self-force exclusion: a source never accelerates itself.
            let sources: Vec<(Vector3<f64>, f64)> = snapshot
                .iter()
                .filter(|&&(j, _, _)| j != i)
                .map(|&(_, position, mass)| (position, mass))
                .collect();

            match self.method {
                FieldMethod::Force => {
                    self.bodies[i].step(dt, |p| source_acceleration(&sources, p, n));
                }
                FieldMethod::Potential => {
                    let field = combined_potential(&sources).rescale(n);
                    self.bodies[i].step(dt, |p| field.acceleration(p, DEFAULT_EPSILON));
                }
            }
        }

        self.update_trackers();
    }

    fn update_trackers(&mut self) {
        if self.trackers.is_empty() {
            return;
        }
        let mut sources: Vec<(Vector3<f64>, f64)> = self
            .source_snapshot()
            .into_iter()
            .map(|(_, position, mass)| (position, mass))
            .collect();
        if sources.len() < 2 {
            return;
        }
        sources.sort_by_key(|&(_, mass)| std::cmp::Reverse(OrderedFloat(mass)));
        for tracker in &mut self.trackers {
            tracker.recompute(sources[0], sources[1]);
        }
    }

    /// Applies the liveness policy to every live test body: the alive
    /// predicate (if any), the potential-gradient threshold, and a
    /// non-finite guard against numerical blow-up. Dead bodies migrate from
    /// the moving roster to `dead_bodies` exactly once and are never
    /// re-examined.
    pub fn remove_dead_bodies(
        &mut self,
        potential_gradient_limit: f64,
        body_alive_func: Option<&AlivePredicate>,
    ) -> Result<()> {
        let tracked_position = self.tracked.map(|i| self.bodies[i].position);
        let snapshot = self.source_snapshot();
        let mut killed = Vec::new();

        for &i in &self.moving {
            let body = &self.bodies[i];
            if body.dead || body.has_potential {
                continue;
            }

            let mut dead = !(body.position.x.is_finite()
                && body.position.y.is_finite()
                && body.position.z.is_finite());

            if !dead {
                if let Some(predicate) = body_alive_func {
                    dead = !predicate.is_alive(body.position, tracked_position)?;
                }
            }

            if !dead {
                let sources: Vec<(Vector3<f64>, f64)> = snapshot
                    .iter()
                    .filter(|&&(j, _, _)| j != i)
                    .map(|&(_, position, mass)| (position, mass))
                    .collect();
                let magnitude = source_acceleration(&sources, body.position, self.n).norm();
                if !magnitude.is_finite() || magnitude > potential_gradient_limit {
                    dead = true;
                }
            }

            if dead {
                killed.push(i);
            }
        }

        for i in killed {
            self.bodies[i].dead = true;
            self.moving.retain(|&j| j != i);
            self.dead.push(i);
        }
        Ok(())
    }

    /// Appends a trajectory sample for every live movable body.
    pub fn save_positions(&mut self, include_trackers: bool) {
        for &i in &self.moving {
            if !self.bodies[i].dead {
                self.bodies[i].save_position();
            }
        }
        if include_trackers {
            for tracker in &mut self.trackers {
                tracker.save_position();
            }
        }
    }

    /// The combined potential of all live sources, rescaled to stored
    /// units, for external consumers (potential-surface overlays, etc.).
    pub fn get_potential_function(&self) -> ScalarField {
        let sources: Vec<(Vector3<f64>, f64)> = self
            .source_snapshot()
            .into_iter()
            .map(|(_, position, mass)| (position, mass))
            .collect();
        combined_potential(&sources).rescale(self.n)
    }

    /// The test body that survived the longest, alive or dead.
    pub fn get_best_body(&self) -> Option<&Body> {
        self.bodies
            .iter()
            .filter(|body| !body.has_potential && !body.fixed)
            .max_by_key(|body| OrderedFloat(body.time_survived))
    }
}

/// Newtonian acceleration at `position` (stored units) from the given
/// sources, with the `10^n` meter conversion applied here and nowhere else
/// on the direct-force path.
fn source_acceleration(
    sources: &[(Vector3<f64>, f64)],
    position: Vector3<f64>,
    n: i32,
) -> Vector3<f64> {
    let to_meters = 10f64.powi(n);
    let mut acceleration = Vector3::zeros();
    for &(origin, mass) in sources {
        let r_vec = (origin - position) * to_meters;
        let r = r_vec.norm();
        acceleration += G * mass * r_vec / r.powi(3);
    }
    acceleration * 10f64.powi(-n)
}

/// Sums the sources' individual potentials into one fresh field (in
/// meters); each contribution is copied in, never aliased.
fn combined_potential(sources: &[(Vector3<f64>, f64)]) -> ScalarField {
    let mut field = ScalarField::null();
    for &(origin, mass) in sources {
        field = field + ScalarField::new(vec![FieldTerm::new(-1.0, -G * mass, origin)]);
    }
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Integrator;

    fn sun_earth() -> System {
        let sun = Body::fixed_source(1.989e30, Vector3::new(450.0, 450.0, 0.0)).unwrap();
        let earth = Body::new(
            5.972e24,
            Vector3::new(300.0, 450.0, 0.0),
            Vector3::new(0.0, 30.0e-6, 0.0),
            false,
            true,
            Integrator::Synchronous,
        )
        .unwrap();
        System::new(vec![sun, earth], vec![], 9)
    }

    #[test]
    fn partitions_cover_every_body_exactly_once() {
        let system = sun_earth();
        assert_eq!(system.fixed_bodies().count(), 1);
        assert_eq!(system.moving_bodies().count(), 1);
        assert_eq!(system.attractive_bodies().count(), 2);
        assert_eq!(
            system.fixed_bodies().count() + system.moving_bodies().count(),
            system.bodies.len()
        );
    }

    #[test]
    fn tracked_body_is_heaviest_moving_body() {
        let mut system = sun_earth();
        let probe = Body::probe(
            Vector3::new(310.0, 450.0, 0.0),
            Vector3::zeros(),
            Integrator::Synchronous,
        )
        .unwrap();
        system.bodies.push(probe);
        let system = System::new(system.bodies, vec![], 9);
        assert!((system.tracked_body().unwrap().mass - 5.972e24).abs() < 1.0);
    }

    #[test]
    fn force_and_potential_methods_agree() {
        let system = sun_earth();
        let sources = vec![(Vector3::new(450.0, 450.0, 0.0), 1.989e30)];
        let p = Vector3::new(300.0, 450.0, 0.0);

        let direct = source_acceleration(&sources, p, system.n);
        let field = combined_potential(&sources).rescale(system.n);
        let from_potential = field.acceleration(p, DEFAULT_EPSILON);

        let scale = direct.norm();
        assert!(scale > 0.0);
        assert!((direct - from_potential).norm() / scale < 1e-4);
    }

    #[test]
    fn potential_function_evaluates_negative_near_source() {
        let system = sun_earth();
        let value = system
            .get_potential_function()
            .evaluate(Vector3::new(440.0, 450.0, 0.0));
        assert!(value < 0.0);
    }
}
