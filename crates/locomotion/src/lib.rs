//! Unit locomotion and rigid-body physics for a fixed-tick battlefield
//! simulation.
//!
//! The crate splits movement into two layers that run in a strict order each
//! logic frame:
//!
//! * **Steering** (`locomotor`, `steering`, `driver`) — decides how a unit
//!   wants to move and expresses that purely as motive forces and turn
//!   commands. Locomotor templates (`template`, `registry`) supply the
//!   per-chassis tuning; a `locomotor_set` picks the right locomotor for the
//!   surface a unit is currently on.
//! * **Physics** (`physics`) — integrates forces, friction, gravity, ground
//!   contact, and collisions. Steering never writes position or velocity
//!   directly; physics never decides where to go.
//!
//! Determinism is a hard requirement: all randomness flows through [`SimRng`],
//! all per-tick work runs in `FixedUpdate` under the [`SimulationSet`] chain,
//! and `state_hash` fingerprints the world each tick so divergence between two
//! runs of the same seed is caught immediately.

use std::collections::BTreeMap;

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub mod config;
pub mod driver;
pub mod locomotor;
pub mod locomotor_set;
pub mod physics;
pub mod pose;
pub mod registry;
pub mod snapshot;
pub mod state_hash;
pub mod steering;
pub mod surfaces;
pub mod template;
pub mod terrain;
pub mod unit;

#[cfg(test)]
mod integration_tests;
#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

// ---------------------------------------------------------------------------
// Saveable trait + registry for the extension map save pattern
// ---------------------------------------------------------------------------

/// Trait for resources that can be saved/loaded via the snapshot's extension
/// map.
///
/// Each implementing resource provides its own serialization, so adding a new
/// saveable feature requires no changes to the snapshot module -- the feature
/// plugin registers itself in the [`SaveableRegistry`] during `build()`.
pub trait Saveable: Resource + Default + Send + Sync + 'static {
    /// Unique key for this resource in the snapshot's extension map.
    /// Must be stable across versions.
    const SAVE_KEY: &'static str;

    /// Serialize this resource to bytes. Return `None` to skip saving.
    fn save_to_bytes(&self) -> Option<Vec<u8>>;

    /// Deserialize from bytes, returning the restored resource.
    fn load_from_bytes(bytes: &[u8]) -> Self;
}

/// Decode bytes via `bitcode::decode`, logging a warning and returning
/// `Default` on failure.
pub fn decode_or_warn<T: bitcode::DecodeOwned + Default>(key: &str, bytes: &[u8]) -> T {
    match bitcode::decode(bytes) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                "Saveable {}: failed to decode {} bytes, falling back to default: {}",
                key,
                bytes.len(),
                e
            );
            T::default()
        }
    }
}

pub type SaveFn = Box<dyn Fn(&World) -> Option<Vec<u8>> + Send + Sync>;
pub type LoadFn = Box<dyn Fn(&mut World, &[u8]) + Send + Sync>;
pub type ResetFn = Box<dyn Fn(&mut World) + Send + Sync>;

/// Type-erased save/load/reset operations for one registered resource.
pub struct SaveableEntry {
    pub key: String,
    pub save_fn: SaveFn,
    pub load_fn: LoadFn,
    pub reset_fn: ResetFn,
}

/// Registry of all saveable resources, populated during plugin setup. The
/// snapshot module iterates it to persist and restore extension entries
/// without knowing individual feature types.
#[derive(Resource, Default)]
pub struct SaveableRegistry {
    pub entries: Vec<SaveableEntry>,
}

impl SaveableRegistry {
    /// Register a resource type that implements [`Saveable`]. Duplicate keys
    /// are ignored (and assert in debug builds) to prevent silent data loss.
    pub fn register<T: Saveable>(&mut self) {
        let key = T::SAVE_KEY.to_string();
        if self.entries.iter().any(|e| e.key == key) {
            warn!("SaveableRegistry: duplicate key '{key}' -- ignoring second registration");
            debug_assert!(false, "SaveableRegistry: duplicate key '{key}'");
            return;
        }
        self.entries.push(SaveableEntry {
            key,
            save_fn: Box::new(|world: &World| {
                world.get_resource::<T>().and_then(|r| r.save_to_bytes())
            }),
            load_fn: Box::new(|world: &mut World, bytes: &[u8]| {
                let value = T::load_from_bytes(bytes);
                world.insert_resource(value);
            }),
            reset_fn: Box::new(|world: &mut World| {
                world.insert_resource(T::default());
            }),
        });
    }

    /// Save all registered resources into an extension map.
    pub fn save_all(&self, world: &World) -> BTreeMap<String, Vec<u8>> {
        let mut extensions = BTreeMap::new();
        for entry in &self.entries {
            if let Some(bytes) = (entry.save_fn)(world) {
                extensions.insert(entry.key.clone(), bytes);
            }
        }
        extensions
    }

    /// Load registered resources from an extension map. Resources whose key
    /// is absent keep their current value.
    pub fn load_all(&self, world: &mut World, extensions: &BTreeMap<String, Vec<u8>>) {
        for entry in &self.entries {
            if let Some(bytes) = extensions.get(&entry.key) {
                (entry.load_fn)(world, bytes);
            }
        }
    }

    /// Reset all registered resources to their defaults.
    pub fn reset_all(&self, world: &mut World) {
        for entry in &self.entries {
            (entry.reset_fn)(world);
        }
    }
}

// ---------------------------------------------------------------------------
// Core resources
// ---------------------------------------------------------------------------

/// Global logic-frame counter, incremented at the top of each `FixedUpdate`.
/// Steering and physics use it for timers (motive-force expiry, stuck
/// detection) instead of wall-clock time.
#[derive(Resource, Default)]
pub struct TickCounter(pub u64);

impl Saveable for TickCounter {
    const SAVE_KEY: &'static str = "tick_counter";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(&self.0))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        Self(decode_or_warn::<u64>(Self::SAVE_KEY, bytes))
    }
}

fn advance_tick(mut tick: ResMut<TickCounter>) {
    tick.0 += 1;
}

/// Default seed used when no explicit seed is provided.
const DEFAULT_SEED: u64 = 42;

/// Captures the full internal state of a `ChaCha8Rng` so it can be
/// round-tripped through bitcode.
#[derive(Encode, Decode)]
struct RngSnapshot {
    seed: [u8; 32],
    word_pos: u128,
    stream: u64,
}

/// Deterministic RNG resource for all simulation randomness.
///
/// Systems that need randomness take `ResMut<SimRng>` and use `rng.0` instead
/// of `rand::thread_rng()`, so identical seeds produce identical runs.
#[derive(Resource)]
pub struct SimRng(pub ChaCha8Rng);

impl Default for SimRng {
    fn default() -> Self {
        Self(ChaCha8Rng::seed_from_u64(DEFAULT_SEED))
    }
}

impl SimRng {
    pub fn from_seed_u64(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl Saveable for SimRng {
    const SAVE_KEY: &'static str = "sim_rng";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        let snapshot = RngSnapshot {
            seed: self.0.get_seed(),
            word_pos: self.0.get_word_pos(),
            stream: self.0.get_stream(),
        };
        Some(bitcode::encode(&snapshot))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        match bitcode::decode::<RngSnapshot>(bytes) {
            Ok(snapshot) => {
                let mut rng = ChaCha8Rng::from_seed(snapshot.seed);
                rng.set_stream(snapshot.stream);
                rng.set_word_pos(snapshot.word_pos);
                Self(rng)
            }
            Err(e) => {
                warn!("SimRng: failed to decode save data, falling back to default: {e}");
                Self::default()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FixedUpdate phases
// ---------------------------------------------------------------------------

/// Ordered phases for systems running in the `FixedUpdate` schedule.
///
/// Configured as a chain: `Steering` → `Physics` → `PostSim`. Plugins place
/// their systems with `.in_set(SimulationSet::X)`, which gives automatic
/// ordering across phases while keeping `.after()` available within a phase.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Locomotor decisions: goal selection, turn commands, motive forces.
    Steering,
    /// Force integration, friction, gravity, ground contact, collisions.
    Physics,
    /// Read-only aggregation: state hashing, arrival reporting.
    PostSim,
}

// ---------------------------------------------------------------------------
// Root plugin
// ---------------------------------------------------------------------------

pub struct LocomotionPlugin;

impl Plugin for LocomotionPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_hz(
            config::LOGIC_FRAMES_PER_SECOND as f64,
        ));

        app.init_resource::<TickCounter>()
            .init_resource::<SimRng>()
            .init_resource::<SaveableRegistry>()
            .init_resource::<terrain::TerrainMap>()
            .init_resource::<registry::TemplateRegistry>();

        {
            let mut saveables = app.world_mut().resource_mut::<SaveableRegistry>();
            saveables.register::<TickCounter>();
            saveables.register::<SimRng>();
        }

        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::Steering,
                SimulationSet::Physics,
                SimulationSet::PostSim,
            )
                .chain(),
        );

        app.add_systems(
            FixedUpdate,
            advance_tick.before(SimulationSet::Steering),
        );

        app.add_plugins((
            driver::DriverPlugin,
            physics::PhysicsPlugin,
            state_hash::StateHashPlugin,
        ));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
