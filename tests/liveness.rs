//! Liveness policy: predicate arity enforcement, relative predicates against
//! the tracked body, and dead-body idempotence.

use nalgebra::Vector3;

use librator::{AlivePredicate, Body, Error, Integrator, System};

/// Sun (fixed source) + Earth (heaviest moving body, the tracked one) +
/// one probe at the given offset from Earth.
fn tracked_system(probe_offset: Vector3<f64>) -> System {
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
    let probe = Body::probe(
        Vector3::new(300.0, 450.0, 0.0) + probe_offset,
        Vector3::new(0.0, 30.0e-6, 0.0),
        Integrator::Synchronous,
    )
    .unwrap();
    System::new(vec![sun, earth, probe], vec![], 9)
}

fn within_15_of_tracked() -> AlivePredicate {
    AlivePredicate::relative(|x, y, _z, tx, ty, _tz| {
        (x - tx).abs() < 15.0 && (y - ty).abs() < 15.0
    })
}

#[test]
fn predicate_construction_rejects_any_arity_but_3_or_6() {
    for arity in [0, 1, 2, 4, 5, 7, 12] {
        let err = AlivePredicate::new(arity, |_| true).unwrap_err();
        assert!(matches!(err, Error::InvalidPredicateArity(a) if a == arity));
    }
    assert!(AlivePredicate::new(3, |_| true).is_ok());
    assert!(AlivePredicate::new(6, |_| true).is_ok());
}

#[test]
fn relative_predicate_keeps_nearby_probe_alive() {
    let mut system = tracked_system(Vector3::new(5.0, 0.0, 0.0));
    let predicate = within_15_of_tracked();
    system.remove_dead_bodies(1e10, Some(&predicate)).unwrap();
    assert_eq!(system.dead_bodies().count(), 0);
    assert_eq!(system.live_test_body_count(), 1);
}

#[test]
fn relative_predicate_kills_faraway_probe() {
    let mut system = tracked_system(Vector3::new(30.0, 0.0, 0.0));
    let predicate = within_15_of_tracked();
    system.remove_dead_bodies(1e10, Some(&predicate)).unwrap();
    assert_eq!(system.dead_bodies().count(), 1);
    assert_eq!(system.live_test_body_count(), 0);
    assert!(system.dead_bodies().next().unwrap().dead);
}

#[test]
fn gradient_threshold_kills_bodies_in_steep_regions() {
    // A probe two units from the Sun feels a far steeper gradient than the
    // threshold permits.
    let sun = Body::fixed_source(1.989e30, Vector3::new(450.0, 450.0, 0.0)).unwrap();
    let probe = Body::probe(
        Vector3::new(452.0, 450.0, 0.0),
        Vector3::zeros(),
        Integrator::Synchronous,
    )
    .unwrap();
    let mut system = System::new(vec![sun, probe], vec![], 9);
    system.remove_dead_bodies(1e-10, None).unwrap();
    assert_eq!(system.dead_bodies().count(), 1);
}

#[test]
fn dead_bodies_are_never_reintegrated_or_resampled() {
    let mut system = tracked_system(Vector3::new(30.0, 0.0, 0.0));
    let predicate = within_15_of_tracked();
    system.remove_dead_bodies(1e10, Some(&predicate)).unwrap();
    assert_eq!(system.dead_bodies().count(), 1);

    let (position, trajectory_len, time_survived) = {
        let dead = system.dead_bodies().next().unwrap();
        (dead.position, dead.positions.len(), dead.time_survived)
    };

    for _ in 0..50 {
        system.update(5000.0);
        system.remove_dead_bodies(1e10, Some(&predicate)).unwrap();
        system.save_positions(false);
    }

    // Still exactly one dead body, untouched by further stepping.
    assert_eq!(system.dead_bodies().count(), 1);
    let dead = system.dead_bodies().next().unwrap();
    assert_eq!(dead.position, position);
    assert_eq!(dead.positions.len(), trajectory_len);
    assert_eq!(dead.time_survived, time_survived);
}
