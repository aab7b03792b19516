//! Headless proving-grounds runner.
//!
//! Builds a simulation-only Bevy app, runs a scenario for a fixed number of
//! logic frames, and reports per-interval state hashes plus final unit
//! positions. Pass a JSON scenario file as the first argument, or run with no
//! arguments for the built-in demo scenario. Because the simulation is
//! deterministic, the printed hashes double as a regression fingerprint: the
//! same scenario and seed must print the same lines on every machine.

use std::collections::BTreeMap;
use std::error::Error;
use std::time::Instant;

use bevy::prelude::*;
use serde::Deserialize;

use locomotion::driver::MoveOrder;
use locomotion::locomotor_set::LocomotorSet;
use locomotion::physics::{PhysicsProfile, RigidBody};
use locomotion::pose::Pose;
use locomotion::registry::TemplateRegistry;
use locomotion::state_hash::StateHash;
use locomotion::template::LocomotorTemplate;
use locomotion::terrain::TerrainMap;
use locomotion::unit::{BodyDamageState, UnitKind};
use locomotion::{LocomotionPlugin, SimRng, TickCounter};

/// Ticks between progress reports.
const REPORT_INTERVAL: u64 = 150;

#[derive(Deserialize)]
struct Scenario {
    seed: u64,
    terrain_seed: i32,
    ticks: u64,
    templates: Vec<TemplateDef>,
    units: Vec<UnitDef>,
}

#[derive(Deserialize)]
struct TemplateDef {
    name: String,
    fields: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct UnitDef {
    template: String,
    position: [f32; 3],
    #[serde(default)]
    goal: Option<[f32; 3]>,
}

fn demo_scenario() -> Scenario {
    let tank_fields: BTreeMap<String, String> = [
        ("Surfaces", "GROUND"),
        ("Appearance", "TREADS"),
        ("Speed", "30"),
        ("TurnRate", "90"),
        ("Acceleration", "300"),
        ("Braking", "300"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let hover_fields: BTreeMap<String, String> = [
        ("Surfaces", "GROUND WATER AIR"),
        ("Appearance", "HOVER"),
        ("Speed", "45"),
        ("TurnRate", "180"),
        ("Acceleration", "450"),
        ("Braking", "450"),
        ("Lift", "900"),
        ("ZAxisBehavior", "SURFACE_RELATIVE_HEIGHT"),
        ("PreferredHeight", "15"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Scenario {
        seed: 42,
        terrain_seed: 1977,
        ticks: 900,
        templates: vec![
            TemplateDef {
                name: "PatrolTank".to_string(),
                fields: tank_fields,
            },
            TemplateDef {
                name: "ScoutHover".to_string(),
                fields: hover_fields,
            },
        ],
        units: vec![
            UnitDef {
                template: "PatrolTank".to_string(),
                position: [150.0, 150.0, 0.0],
                goal: Some([900.0, 700.0, 0.0]),
            },
            UnitDef {
                template: "PatrolTank".to_string(),
                position: [200.0, 150.0, 0.0],
                goal: Some([950.0, 650.0, 0.0]),
            },
            UnitDef {
                template: "ScoutHover".to_string(),
                position: [150.0, 250.0, 0.0],
                goal: Some([1000.0, 1000.0, 0.0]),
            },
        ],
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let scenario = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            serde_json::from_str(&text)?
        }
        None => demo_scenario(),
    };

    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(LocomotionPlugin);
    app.insert_resource(SimRng::from_seed_u64(scenario.seed));
    app.insert_resource(TerrainMap::generate(scenario.terrain_seed, 128, 128));

    {
        let mut registry = app.world_mut().resource_mut::<TemplateRegistry>();
        for def in &scenario.templates {
            let mut template = LocomotorTemplate::named(&def.name);
            for (key, value) in &def.fields {
                template.set_field(key, value)?;
            }
            registry.register_base(template)?;
        }
    }

    let mut spawned = Vec::new();
    for def in &scenario.units {
        let world = app.world_mut();
        let mut set = LocomotorSet::default();
        world.resource_scope::<SimRng, Result<(), Box<dyn Error>>>(|world, mut rng| {
            let registry = world.resource::<TemplateRegistry>();
            set.add_locomotor(registry, &def.template, &mut rng, 0)?;
            Ok(())
        })?;
        let profile = PhysicsProfile::default();
        let body = RigidBody::from_profile(&profile);
        let mut entity = world.spawn((
            Pose::at(Vec3::from_array(def.position)),
            body,
            profile,
            UnitKind::default(),
            BodyDamageState::Pristine,
            set,
        ));
        if let Some(goal) = def.goal {
            entity.insert(MoveOrder::to(Vec3::from_array(goal)));
        }
        spawned.push((entity.id(), def.template.clone()));
    }

    println!(
        "proving-grounds: {} units, {} ticks, seed {}",
        spawned.len(),
        scenario.ticks,
        scenario.seed
    );

    let started = Instant::now();
    for _ in 0..scenario.ticks {
        app.world_mut().run_schedule(FixedUpdate);
        let tick = app.world().resource::<TickCounter>().0;
        if tick % REPORT_INTERVAL == 0 {
            let hash = app.world().resource::<StateHash>();
            println!("tick {:5}  state-hash {:08x}", tick, hash.hash);
        }
    }
    let elapsed = started.elapsed();

    for (entity, template) in &spawned {
        match app.world().get::<Pose>(*entity) {
            Some(pose) => {
                let arrived = app.world().get::<MoveOrder>(*entity).is_none();
                println!(
                    "{template}: at ({:.1}, {:.1}, {:.1}){}",
                    pose.position.x,
                    pose.position.y,
                    pose.position.z,
                    if arrived { ", arrived" } else { ", en route" }
                );
            }
            None => println!("{template}: destroyed"),
        }
    }
    println!(
        "simulated {} ticks in {:.2?} ({:.0} ticks/s)",
        scenario.ticks,
        elapsed,
        scenario.ticks as f64 / elapsed.as_secs_f64().max(1e-9)
    );
    Ok(())
}
