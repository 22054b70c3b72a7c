use std::path::PathBuf;
use std::time::Instant;

use chrono::{Local, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::body::{Body, Integrator};
use crate::error::{Error, Result};
use crate::liveness::AlivePredicate;
use crate::sampling::{sample_vectors, AxisLimits, SamplingMode};
use crate::simulation::{RunOutcome, Simulation};
use crate::storage::{
    self, BodyClass, BodyRecord, RecordWriter, SweepRecord,
};
use crate::system::System;

/// Everything one `dispatch` call needs to know. The predicate is optional;
/// without one only the gradient threshold kills bodies.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub simulation_count: usize,
    pub bodies_per_simulation: usize,
    pub body_initial_position_limits: AxisLimits,
    pub body_initial_velocity_limits: AxisLimits,
    pub save_foldername: String,
    pub simulation_duration: f64,
    pub positions_saving_frequency: usize,
    pub potential_gradient_limit: f64,
    pub body_alive_func: Option<AlivePredicate>,
    pub integrator: Integrator,
    pub sampling: SamplingMode,
}

/// Generates candidate initial conditions, fans independent simulations out
/// across a worker pool, and persists the aggregated results.
#[derive(Debug, Clone)]
pub struct SimulationMother {
    pub base_system: System,
    pub delta_time: f64,
}

impl SimulationMother {
    pub fn new(base_system: System, delta_time: f64) -> Self {
        Self {
            base_system,
            delta_time,
        }
    }

    /// Runs the full sweep and returns the (possibly suffix-adjusted)
    /// output folder.
    pub fn dispatch(&self, config: &DispatchConfig) -> Result<PathBuf> {
        validate(config)?;
        let folder = storage::unique_folder(&config.save_foldername);

        let positions = sample_vectors(
            &config.body_initial_position_limits,
            config.simulation_count,
            config.sampling,
        )?;
        let velocities = sample_vectors(
            &config.body_initial_velocity_limits,
            config.bodies_per_simulation,
            config.sampling,
        )?;

        println!(
            "Sweep starting at {} with parameters:\n\
             \tsimulation_count:      {}\n\
             \tbodies_per_simulation: {}\n\
             \tposition limits:       {:?}\n\
             \tvelocity limits:       {:?}\n\
             \tsystem n:              {}\n\
             \tsimulation duration:   {:e}\n\
             \tintegrator:            {}\n\
             \tsave folder:           {}",
            Local::now().format("%H:%M:%S"),
            config.simulation_count,
            config.bodies_per_simulation,
            config.body_initial_position_limits,
            config.body_initial_velocity_limits,
            self.base_system.n,
            config.simulation_duration,
            config.integrator,
            folder.display(),
        );

        // The pool lives exactly as long as this dispatch call.
        let pool = rayon::ThreadPoolBuilder::new()
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;
        let number_of_workers = pool.current_num_threads();
        println!("Number of workers used: {number_of_workers}");
        let start = Instant::now();

        // Baseline: the reference system alone, trackers included.
        let mut reference = Simulation::new(self.base_system.clone(), self.delta_time);
        let reference_outcome = reference.run_attractive_bodies(
            config.simulation_duration,
            config.positions_saving_frequency,
        )?;

        let progress = ProgressBar::new(positions.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .unwrap()
                .progress_chars("#>-"),
        );

        // One work unit per position sample, each fully self-contained; a
        // failing unit is captured, not sweep-aborting.
        let outcomes: Vec<std::result::Result<RunOutcome, String>> = pool.install(|| {
            positions
                .par_iter()
                .map(|&position| {
                    let outcome = self
                        .run_work_unit(position, &velocities, config)
                        .map_err(|e| e.to_string());
                    progress.inc(1);
                    outcome
                })
                .collect()
        });
        progress.finish();
        let elapsed = start.elapsed();
        println!("\nSweep finished in {:.1}s.", elapsed.as_secs_f64());

        let failed_work_units = outcomes.iter().filter(|o| o.is_err()).count();
        if failed_work_units > 0 {
            eprintln!("{failed_work_units} work unit(s) failed and were skipped.");
        }

        std::fs::create_dir_all(&folder)?;

        let mut base_records: Vec<BodyRecord> = reference
            .system
            .fixed_bodies()
            .map(|body| BodyRecord::from_body(body, BodyClass::BaseBody))
            .collect();
        base_records.extend(
            reference_outcome
                .attractive_moving
                .iter()
                .map(|body| BodyRecord::from_body(body, BodyClass::BaseBody)),
        );
        let tracker_records: Vec<BodyRecord> = reference_outcome
            .trackers
            .iter()
            .map(BodyRecord::from_tracker)
            .collect();

        let mut writer = RecordWriter::create(&storage::records_path(&folder, "base_system"))?;
        for record in &base_records {
            writer.append(record)?;
        }
        writer.finish()?;

        // Stream every simulated test body out one record at a time while
        // tracking the longest survivor.
        let mut best: Option<BodyRecord> = None;
        let mut writer = RecordWriter::create(&storage::records_path(&folder, "bodies"))?;
        for record in &tracker_records {
            writer.append(record)?;
        }
        for body in &reference_outcome.attractive_moving {
            writer.append(&BodyRecord::from_body(body, BodyClass::AttractiveMoving))?;
        }
        for outcome in outcomes.iter().flatten() {
            for (bodies, class) in [
                (&outcome.alive, BodyClass::Alive),
                (&outcome.dead, BodyClass::Dead),
            ] {
                for body in bodies {
                    let record = BodyRecord::from_body(body, class);
                    writer.append(&record)?;
                    let is_better = best
                        .as_ref()
                        .map(|b| record.time_survived > b.time_survived)
                        .unwrap_or(true);
                    if is_better {
                        best = Some(record);
                    }
                }
            }
        }
        writer.finish()?;

        let mut writer = RecordWriter::create(&storage::records_path(&folder, "best_body"))?;
        for record in base_records.iter().chain(&tracker_records) {
            writer.append(record)?;
        }
        if let Some(best) = &best {
            writer.append(best)?;
        }
        writer.finish()?;

        let best_time_survived = best
            .as_ref()
            .map(|record| record.time_survived)
            .unwrap_or(0.0);

        storage::write_info(
            &folder.join("info.txt"),
            &[
                ("Time", Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()),
                ("Number of processes", number_of_workers.to_string()),
                ("Duration", format!("{:.1}", elapsed.as_secs_f64())),
                ("delta_time", self.delta_time.to_string()),
                ("BaseSystem n", self.base_system.n.to_string()),
                (
                    "positions_saving_frequency",
                    config.positions_saving_frequency.to_string(),
                ),
                ("simulation_count", config.simulation_count.to_string()),
                (
                    "bodies_per_simulation",
                    config.bodies_per_simulation.to_string(),
                ),
                (
                    "simulation_duration",
                    config.simulation_duration.to_string(),
                ),
                (
                    "potential_gradient_limit",
                    config.potential_gradient_limit.to_string(),
                ),
                ("integrator", config.integrator.to_string()),
                ("best_time_survived", best_time_survived.to_string()),
                ("failed_work_units", failed_work_units.to_string()),
            ],
        )?;

        let ledger_path = folder
            .parent()
            .map(|parent| parent.join("sweep_history.csv"))
            .unwrap_or_else(|| PathBuf::from("sweep_history.csv"));
        storage::append_sweep_record(
            &ledger_path,
            &SweepRecord {
                date: Utc::now().to_rfc3339(),
                folder: folder.display().to_string(),
                simulation_count: config.simulation_count,
                bodies_per_simulation: config.bodies_per_simulation,
                integrator: config.integrator.to_string(),
                delta_time: self.delta_time,
                simulation_duration: config.simulation_duration,
                positions_saving_frequency: config.positions_saving_frequency,
                potential_gradient_limit: config.potential_gradient_limit,
                position_limits: serde_json::to_string(&config.body_initial_position_limits)
                    .unwrap_or_default(),
                velocity_limits: serde_json::to_string(&config.body_initial_velocity_limits)
                    .unwrap_or_default(),
                best_time_survived,
                failed_work_units,
                execution_seconds: elapsed.as_secs_f64(),
            },
        )?;

        println!("Sweep successfully saved at {}.", folder.display());
        Ok(folder)
    }

    /// One work unit: the reference bodies plus one probe per velocity
    /// sample, all sharing one position, simulated to completion.
    fn run_work_unit(
        &self,
        position: nalgebra::Vector3<f64>,
        velocities: &[nalgebra::Vector3<f64>],
        config: &DispatchConfig,
    ) -> Result<RunOutcome> {
        let mut bodies: Vec<Body> = self.base_system.bodies.clone();
        for &velocity in velocities {
            bodies.push(Body::probe(position, velocity, config.integrator)?);
        }
        let system = System::new(bodies, Vec::new(), self.base_system.n);
        let mut simulation = Simulation::new(system, self.delta_time);
        simulation.run(
            config.simulation_duration,
            config.positions_saving_frequency,
            config.potential_gradient_limit,
            config.body_alive_func.as_ref(),
        )
    }
}

fn validate(config: &DispatchConfig) -> Result<()> {
    if config.simulation_count == 0 {
        return Err(Error::InvalidParameter(
            "simulation_count must be at least 1".to_string(),
        ));
    }
    if config.bodies_per_simulation == 0 {
        return Err(Error::InvalidParameter(
            "bodies_per_simulation must be at least 1".to_string(),
        ));
    }
    if config.positions_saving_frequency == 0 {
        return Err(Error::InvalidParameter(
            "positions_saving_frequency must be at least 1".to_string(),
        ));
    }
    if !(config.simulation_duration > 0.0) {
        return Err(Error::InvalidParameter(
            "simulation_duration must be positive".to_string(),
        ));
    }
    Ok(())
}
