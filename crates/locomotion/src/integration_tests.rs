//! Whole-pipeline tests: driver, steering, and physics running together
//! through the real `FixedUpdate` schedule.

use bevy::prelude::*;

use crate::snapshot::{capture_world, from_bytes, restore_world, to_bytes};
use crate::terrain::TerrainMap;
use crate::test_harness::TestRange;

const TANK_FIELDS: &[(&str, &str)] = &[
    ("Surfaces", "GROUND"),
    ("Appearance", "TREADS"),
    ("Speed", "30"),
    ("TurnRate", "90"),
    ("Acceleration", "300"),
    ("Braking", "300"),
];

#[test]
fn test_tank_drives_to_goal_and_stops() {
    let mut range = TestRange::new();
    range.register_template("PatrolTank", TANK_FIELDS);
    let tank = range.spawn_unit("PatrolTank", Vec3::new(100.0, 100.0, 0.0));
    let goal = Vec3::new(250.0, 180.0, 0.0);
    range.order_move(tank, goal);
    range.tick(600);

    assert!(!range.has_order(tank), "order retired on arrival");
    let pose = range.pose(tank);
    let dist = (pose.position - goal).truncate().length();
    assert!(dist <= 1.5, "stopped on the goal, {dist} away");
    let body = range.body(tank);
    assert!(
        body.velocity_magnitude_2d() < 0.1,
        "at rest: {:?}",
        body.vel
    );
}

const RIFLEMAN_FIELDS: &[(&str, &str)] = &[
    ("Surfaces", "GROUND"),
    ("Appearance", "TWO_LEGS"),
    ("Speed", "15"),
    ("TurnRate", "360"),
    ("Acceleration", "300"),
    ("Braking", "300"),
    ("WanderWidthFactor", "1"),
];

#[test]
fn test_same_seed_runs_are_identical() {
    let run = |seed| {
        let mut range = TestRange::new().with_seed(seed);
        range.register_template("PatrolTank", TANK_FIELDS);
        range.register_template("Rifleman", RIFLEMAN_FIELDS);
        let a = range.spawn_unit("PatrolTank", Vec3::new(100.0, 100.0, 0.0));
        let b = range.spawn_unit("Rifleman", Vec3::new(400.0, 400.0, 0.0));
        range.order_move(a, Vec3::new(500.0, 200.0, 0.0));
        range.order_move(b, Vec3::new(150.0, 350.0, 0.0));
        range.tick(200);
        range.state_hash()
    };
    assert_eq!(run(7), run(7));
    // The rifleman's wander state is seeded, so a different seed walks a
    // different path.
    assert_ne!(run(7).hash, run(8).hash);
}

#[test]
fn test_generated_terrain_is_deterministic() {
    let run = || {
        let mut range = TestRange::with_terrain(TerrainMap::generate(9, 64, 64));
        range.register_template("PatrolTank", TANK_FIELDS);
        let tank = range.spawn_unit("PatrolTank", Vec3::new(80.0, 80.0, 0.0));
        range.order_move(tank, Vec3::new(400.0, 400.0, 0.0));
        range.tick(150);
        range.state_hash()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_snapshot_resume_matches_uninterrupted_run() {
    let setup = |range: &mut TestRange| {
        range.register_template("PatrolTank", TANK_FIELDS);
        let tank = range.spawn_unit("PatrolTank", Vec3::new(100.0, 100.0, 0.0));
        range.order_move(tank, Vec3::new(500.0, 300.0, 0.0));
    };

    let mut live = TestRange::new();
    setup(&mut live);
    live.tick(100);

    let bytes = to_bytes(&capture_world(live.app.world_mut()));

    // A fresh process: same templates, no units, then restore.
    let mut resumed = TestRange::new();
    resumed.register_template("PatrolTank", TANK_FIELDS);
    let snap = from_bytes(&bytes).unwrap();
    restore_world(resumed.app.world_mut(), &snap).unwrap();
    assert_eq!(resumed.tick_count(), 100);

    live.tick(50);
    resumed.tick(50);
    assert_eq!(
        live.state_hash(),
        resumed.state_hash(),
        "restored run stays in lockstep with the original"
    );
}

#[test]
fn test_hover_rises_to_preferred_height() {
    let mut range = TestRange::new();
    range.register_template(
        "ScoutHover",
        &[
            ("Surfaces", "GROUND WATER AIR"),
            ("Appearance", "HOVER"),
            ("Speed", "30"),
            ("TurnRate", "90"),
            ("Acceleration", "300"),
            ("Braking", "300"),
            ("Lift", "900"),
            ("ZAxisBehavior", "SURFACE_RELATIVE_HEIGHT"),
            ("PreferredHeight", "20"),
        ],
    );
    let hover = range.spawn_unit("ScoutHover", Vec3::new(100.0, 100.0, 0.0));
    range.order_move(hover, Vec3::new(400.0, 100.0, 0.0));
    range.tick(300);

    let pose = range.pose(hover);
    assert!(
        pose.position.z > 10.0,
        "climbed towards cruise height: {:?}",
        pose.position
    );
    assert!(pose.position.x > 150.0, "also made forward progress");
}
