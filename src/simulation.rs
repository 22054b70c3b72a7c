use std::path::Path;

use nalgebra::Vector3;

use crate::body::Body;
use crate::error::{Error, Result};
use crate::field::{FieldTerm, ScalarField};
use crate::lagrange::LagrangePoint;
use crate::liveness::AlivePredicate;
use crate::storage::{self, BodyClass, BodyRecord};
use crate::system::System;
use crate::G;

/// Largest accepted integration step, in seconds.
pub const DEFAULT_MAXIMUM_DELTA_TIME: f64 = 5000.0;

/// Liveness is checked every this many steps, not every step, to amortize
/// its cost.
pub const DEAD_BODY_REMOVAL_FREQUENCY: u64 = 10;

/// Bodies partitioned by how a bounded run ended for them.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub alive: Vec<Body>,
    pub dead: Vec<Body>,
}

/// Trajectories of the reference system alone (sources + trackers), used as
/// the baseline against which sweep results are replayed.
#[derive(Debug, Clone)]
pub struct ReferenceOutcome {
    pub attractive_moving: Vec<Body>,
    pub trackers: Vec<LagrangePoint>,
}

/// Drives one `System` with a fixed maximum step size.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub system: System,
    pub maximum_delta_time: f64,
}

impl Simulation {
    pub fn new(system: System, maximum_delta_time: f64) -> Self {
        Self {
            system,
            maximum_delta_time,
        }
    }

    /// Runs a bounded research simulation: `duration / maximum_delta_time`
    /// fixed steps, liveness every `DEAD_BODY_REMOVAL_FREQUENCY` steps, one
    /// trajectory sample per `positions_saving_frequency` steps, early exit
    /// once every test body has died.
    pub fn run(
        &mut self,
        duration: f64,
        positions_saving_frequency: usize,
        potential_gradient_limit: f64,
        body_alive_func: Option<&AlivePredicate>,
    ) -> Result<RunOutcome> {
        let total_steps = (duration / self.maximum_delta_time) as u64;
        let blocks = total_steps / positions_saving_frequency.max(1) as u64;
        let mut tick: u64 = 0;

        for _ in 0..blocks {
            for _ in 0..positions_saving_frequency {
                self.system.update(self.maximum_delta_time);
                tick += 1;
                if tick % DEAD_BODY_REMOVAL_FREQUENCY == 0 {
                    self.system
                        .remove_dead_bodies(potential_gradient_limit, body_alive_func)?;
                }
            }
            if self.system.live_test_body_count() == 0 {
                break;
            }
            self.system.save_positions(false);
        }

        Ok(RunOutcome {
            alive: self
                .system
                .moving_bodies()
                .filter(|body| !body.has_potential && !body.dead)
                .cloned()
                .collect(),
            dead: self.system.dead_bodies().cloned().collect(),
        })
    }

    /// Advances only the reference system (no test bodies involved) and
    /// records the source and tracker trajectories.
    pub fn run_attractive_bodies(
        &mut self,
        duration: f64,
        positions_saving_frequency: usize,
    ) -> Result<ReferenceOutcome> {
        let total_steps = (duration / self.maximum_delta_time) as u64;
        let blocks = total_steps / positions_saving_frequency.max(1) as u64;

        for _ in 0..blocks {
            for _ in 0..positions_saving_frequency {
                self.system.update(self.maximum_delta_time);
            }
            self.system.save_positions(true);
        }

        Ok(ReferenceOutcome {
            attractive_moving: self
                .system
                .moving_bodies()
                .filter(|body| body.has_potential)
                .cloned()
                .collect(),
            trackers: self.system.trackers.clone(),
        })
    }

    /// Loads a persisted simulation folder into a `Replay`.
    ///
    /// `min_time_survived` drops short-lived bodies (ignored when loading
    /// only the best body). Missing folders fail before any read is tried.
    pub fn load_from_folder(
        foldername: &Path,
        min_time_survived: Option<f64>,
        only_load_best_body: bool,
    ) -> Result<Replay> {
        if !foldername.exists() {
            return Err(Error::FolderNotFound(foldername.to_path_buf()));
        }
        let info = storage::read_info(&foldername.join("info.txt"))?;
        let n = storage::info_value_f64(&info, "BaseSystem n")? as i32;
        let positions_saving_frequency = storage::info_value_f64(&info, "positions_saving_frequency")?;
        let delta_time = storage::info_value_f64(&info, "delta_time")?;

        let mut records = storage::read_records(&storage::records_path(foldername, "base_system"))?;
        let stem = if only_load_best_body {
            "best_body"
        } else {
            "bodies"
        };
        let mut bodies = storage::read_records(&storage::records_path(foldername, stem))?;
        if let Some(minimum) = min_time_survived {
            if !only_load_best_body {
                bodies.retain(|record| record.time_survived >= minimum);
            }
        }
        records.append(&mut bodies);

        Ok(Replay::new(
            records,
            n,
            delta_time,
            positions_saving_frequency,
        ))
    }
}

/// A pre-computed system reconstructed from persisted records. Each
/// `update` call is one playback tick; one recorded sample is consumed
/// every `positions_saving_frequency * delta_time` ticks, so real-time
/// playback advances a sample every N simulated seconds.
#[derive(Debug, Clone)]
pub struct Replay {
    pub records: Vec<BodyRecord>,
    pub n: i32,
    pub delta_time: f64,
    pub positions_saving_frequency: f64,
    tick_factor: f64,
    current_tick: f64,
    cursor: usize,
}

impl Replay {
    pub fn new(
        records: Vec<BodyRecord>,
        n: i32,
        delta_time: f64,
        positions_saving_frequency: f64,
    ) -> Self {
        Self {
            records,
            n,
            delta_time,
            positions_saving_frequency,
            tick_factor: positions_saving_frequency * delta_time,
            current_tick: 0.0,
            cursor: 0,
        }
    }

    /// Advances one playback tick.
    pub fn update(&mut self) {
        self.current_tick += 1.0;
        if self.current_tick >= self.tick_factor {
            self.current_tick = 0.0;
            self.cursor += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Current position of record `index`: its trajectory sample at the
    /// playback cursor, clamped to the last sample; bodies recorded without
    /// a trajectory (e.g. fixed sources) sit at their initial position.
    pub fn position(&self, index: usize) -> Vector3<f64> {
        let record = &self.records[index];
        match record.positions.len() {
            0 => record.initial_position,
            len => record.positions[self.cursor.min(len - 1)],
        }
    }

    /// A record is rendered dead once its recorded trajectory is exhausted
    /// and it was classified dead.
    pub fn is_dead(&self, index: usize) -> bool {
        let record = &self.records[index];
        record.class == BodyClass::Dead && self.cursor >= record.positions.len()
    }

    /// Combined potential of the recorded sources at their current playback
    /// positions, rescaled to stored units. Built from the reference
    /// snapshots only; the `attractive_moving` duplicates in the full body
    /// log must not double-count a source.
    pub fn get_potential_function(&self) -> ScalarField {
        let mut field = ScalarField::null();
        for (index, record) in self.records.iter().enumerate() {
            if record.class == BodyClass::BaseBody && record.has_potential && record.mass > 0.0 {
                field = field
                    + ScalarField::new(vec![FieldTerm::new(
                        -1.0,
                        -G * record.mass,
                        self.position(index),
                    )]);
            }
        }
        field.rescale(self.n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(class: BodyClass, positions: Vec<Vector3<f64>>) -> BodyRecord {
        BodyRecord {
            class,
            mass: 1.0,
            initial_position: Vector3::zeros(),
            initial_velocity: Vector3::zeros(),
            fixed: false,
            has_potential: false,
            integrator: None,
            time_survived: 0.0,
            positions,
        }
    }

    #[test]
    fn replay_advances_one_sample_per_tick_factor() {
        let samples = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
        ];
        // tick_factor = 2 * 1.5 = 3 ticks per sample
        let mut replay = Replay::new(vec![record(BodyClass::Alive, samples)], 0, 1.5, 2.0);
        assert_eq!(replay.position(0).x, 0.0);
        for _ in 0..3 {
            replay.update();
        }
        assert_eq!(replay.position(0).x, 1.0);
        for _ in 0..3 {
            replay.update();
        }
        assert_eq!(replay.position(0).x, 2.0);
        // Clamped at the final sample.
        for _ in 0..9 {
            replay.update();
        }
        assert_eq!(replay.position(0).x, 2.0);
    }

    #[test]
    fn dead_record_reports_dead_after_trajectory_exhaustion() {
        let mut replay = Replay::new(
            vec![record(BodyClass::Dead, vec![Vector3::zeros()])],
            0,
            1.0,
            1.0,
        );
        assert!(!replay.is_dead(0));
        replay.update();
        assert!(replay.is_dead(0));
    }
}
