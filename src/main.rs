use nalgebra::Vector3;

use librator::{
    AlivePredicate, Body, DispatchConfig, Integrator, LagrangeKind, LagrangePoint, Result,
    SamplingMode, Simulation, SimulationMother, System,
};

/// Sweeps initial conditions around the Sun-Earth L1 point, looking for the
/// probe that stays near it the longest. Positions are in Gm (n = 9), the
/// Earth starts at apoapsis.
fn main() -> Result<()> {
    let sun = Body::fixed_source(1.989e30, Vector3::new(450.0, 450.0, 0.0))?;
    let earth = Body::new(
        5.972e24,
        Vector3::new(297.90, 450.0, 0.0),
        Vector3::new(0.0, -29.29e-6, 0.0),
        false,
        true,
        Integrator::Synchronous,
    )?;
    let earth_velocity = earth.velocity;

    let system = System::new(
        vec![sun, earth],
        vec![LagrangePoint::new(LagrangeKind::L1)],
        9,
    );
    let l1 = system.trackers[0].position;

    let mother = SimulationMother::new(system, 5000.0);
    let folder = mother.dispatch(&DispatchConfig {
        simulation_count: 50,
        bodies_per_simulation: 10,
        body_initial_position_limits: [
            (l1.x - 10.0, l1.x + 10.0),
            (l1.y - 10.0, l1.y + 10.0),
            (0.0, 0.0),
        ],
        body_initial_velocity_limits: [
            (earth_velocity.x - 300e-7, earth_velocity.x - 200e-7),
            (earth_velocity.y + 110e-7, earth_velocity.y + 170e-7),
            (0.0, 0.0),
        ],
        save_foldername: "simulations/L1".to_string(),
        simulation_duration: 3e8,
        positions_saving_frequency: 100,
        potential_gradient_limit: 1e-10,
        body_alive_func: Some(AlivePredicate::relative(|x, y, _z, tx, ty, _tz| {
            (x - tx).abs() < 15.0 && (y - ty).abs() < 15.0
        })),
        integrator: Integrator::Synchronous,
        sampling: SamplingMode::Random,
    })?;

    let replay = Simulation::load_from_folder(&folder, None, true)?;
    if let Some(best) = replay
        .records
        .iter()
        .filter(|record| !record.has_potential && record.time_survived.is_finite())
        .last()
    {
        println!(
            "Best probe survived {:.3e} s starting from ({:.2}, {:.2}, {:.2})",
            best.time_survived,
            best.initial_position.x,
            best.initial_position.y,
            best.initial_position.z,
        );
    }
    Ok(())
}
