//! World save format: capture and restore of all locomotion state.
//!
//! The wire format is bitcode-encoded structs, lz4-compressed, behind a
//! fixed 20-byte header (magic, format version, flags, uncompressed size,
//! checksum). Entity ids are never serialized; restore spawns fresh entities
//! in record order, which is stable because capture iterates a deterministic
//! world. Feature resources outside this module save themselves through the
//! [`SaveableRegistry`](crate::SaveableRegistry) extension map.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use xxhash_rust::xxh32::xxh32;

use crate::driver::MoveOrder;
use crate::locomotor_set::{LocomotorSet, LocomotorSetSnapshot};
use crate::physics::{PhysicsFlags, PhysicsProfile, RigidBody, Turning};
use crate::pose::Pose;
use crate::registry::TemplateRegistry;
use crate::unit::{BodyDamageState, UnitKind};
use crate::{SaveableRegistry, SimRng, TickCounter};

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"LOCO";
/// Container format version (header + compression framing).
pub const FORMAT_VERSION: u32 = 1;
/// Payload schema version.
pub const WORLD_VERSION: u32 = 2;

const HEADER_LEN: usize = 20;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// Input shorter than the fixed header.
    TooShort,
    /// Header magic does not match.
    BadMagic,
    /// Checksum or decompression failure.
    Corrupted,
    /// Payload decoding failed after the container checks passed.
    Decode(String),
    /// Container or record version is not the one this build writes.
    VersionMismatch { found: u32, expected: u32 },
    /// A save references a locomotor template this build does not define.
    UnknownTemplate(String),
    /// Locomotor set snapshots only restore into a freshly created set.
    NonEmptySet,
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::TooShort => write!(f, "snapshot data shorter than header"),
            SnapshotError::BadMagic => write!(f, "bad snapshot magic"),
            SnapshotError::Corrupted => write!(f, "snapshot checksum or compression mismatch"),
            SnapshotError::Decode(msg) => write!(f, "snapshot payload decode failed: {msg}"),
            SnapshotError::VersionMismatch { found, expected } => {
                write!(f, "snapshot version {found}, expected {expected}")
            }
            SnapshotError::UnknownTemplate(name) => {
                write!(f, "snapshot references unknown locomotor template '{name}'")
            }
            SnapshotError::NonEmptySet => {
                write!(f, "locomotor set snapshot applied to a non-empty set")
            }
        }
    }
}

impl Error for SnapshotError {}

// ---------------------------------------------------------------------------
// Wire structs
// ---------------------------------------------------------------------------

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PoseSnapshot {
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl PoseSnapshot {
    pub fn capture(pose: &Pose) -> Self {
        Self {
            position: pose.position.to_array(),
            yaw: pose.yaw,
            pitch: pose.pitch,
            roll: pose.roll,
        }
    }

    pub fn restore(&self) -> Pose {
        Pose {
            position: Vec3::from_array(self.position),
            yaw: self.yaw,
            pitch: self.pitch,
            roll: self.roll,
        }
    }
}

/// Dynamic rigid-body state. Entity-valued fields (overlap and collision
/// bookkeeping) are transient within a tick and are not saved.
#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct PhysicsSnapshot {
    pub yaw_rate: f32,
    pub roll_rate: f32,
    pub pitch_rate: f32,
    pub accel: [f32; 3],
    pub prev_accel: [f32; 3],
    pub vel: [f32; 3],
    pub turning: u8,
    pub flags: u32,
    pub mass: f32,
    pub motive_force_expires: u64,
    pub extra_bounciness: f32,
    pub extra_friction: f32,
    pub vel_mag: f32,
}

impl PhysicsSnapshot {
    pub fn capture(body: &RigidBody) -> Self {
        Self {
            yaw_rate: body.yaw_rate,
            roll_rate: body.roll_rate,
            pitch_rate: body.pitch_rate,
            accel: body.accel.to_array(),
            prev_accel: body.prev_accel.to_array(),
            vel: body.vel.to_array(),
            turning: body.turning.to_u8(),
            flags: body.flags.0,
            mass: body.mass,
            motive_force_expires: body.motive_force_expires,
            extra_bounciness: body.extra_bounciness,
            extra_friction: body.extra_friction,
            vel_mag: body.velocity_magnitude(),
        }
    }

    pub fn restore(&self) -> RigidBody {
        RigidBody {
            vel: Vec3::from_array(self.vel),
            accel: Vec3::from_array(self.accel),
            prev_accel: Vec3::from_array(self.prev_accel),
            yaw_rate: self.yaw_rate,
            pitch_rate: self.pitch_rate,
            roll_rate: self.roll_rate,
            turning: Turning::from_u8(self.turning),
            flags: PhysicsFlags(self.flags),
            mass: self.mass,
            extra_bounciness: self.extra_bounciness,
            extra_friction: self.extra_friction,
            motive_force_expires: self.motive_force_expires,
            current_overlap: None,
            previous_overlap: None,
            last_collidee: None,
            ignore_collisions_with: None,
        }
    }
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct ProfileSnapshot {
    pub mass: f32,
    pub forward_friction: f32,
    pub lateral_friction: f32,
    pub z_friction: f32,
    pub aerodynamic_friction: f32,
    pub center_of_mass_offset: f32,
    pub bounding_radius: f32,
    pub stick_to_ground: bool,
    pub allow_bouncing: bool,
    pub allow_collide_force: bool,
    pub kill_when_resting_on_ground: bool,
    pub min_fall_speed_for_damage: f32,
    pub fall_height_damage_factor: f32,
    pub pitch_roll_yaw_factor: f32,
}

impl ProfileSnapshot {
    pub fn capture(profile: &PhysicsProfile) -> Self {
        Self {
            mass: profile.mass,
            forward_friction: profile.forward_friction,
            lateral_friction: profile.lateral_friction,
            z_friction: profile.z_friction,
            aerodynamic_friction: profile.aerodynamic_friction,
            center_of_mass_offset: profile.center_of_mass_offset,
            bounding_radius: profile.bounding_radius,
            stick_to_ground: profile.stick_to_ground,
            allow_bouncing: profile.allow_bouncing,
            allow_collide_force: profile.allow_collide_force,
            kill_when_resting_on_ground: profile.kill_when_resting_on_ground,
            min_fall_speed_for_damage: profile.min_fall_speed_for_damage,
            fall_height_damage_factor: profile.fall_height_damage_factor,
            pitch_roll_yaw_factor: profile.pitch_roll_yaw_factor,
        }
    }

    pub fn restore(&self) -> PhysicsProfile {
        PhysicsProfile {
            mass: self.mass,
            forward_friction: self.forward_friction,
            lateral_friction: self.lateral_friction,
            z_friction: self.z_friction,
            aerodynamic_friction: self.aerodynamic_friction,
            center_of_mass_offset: self.center_of_mass_offset,
            bounding_radius: self.bounding_radius,
            stick_to_ground: self.stick_to_ground,
            allow_bouncing: self.allow_bouncing,
            allow_collide_force: self.allow_collide_force,
            kill_when_resting_on_ground: self.kill_when_resting_on_ground,
            min_fall_speed_for_damage: self.min_fall_speed_for_damage,
            fall_height_damage_factor: self.fall_height_damage_factor,
            pitch_roll_yaw_factor: self.pitch_roll_yaw_factor,
        }
    }
}

#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq)]
pub struct OrderSnapshot {
    pub goal: [f32; 3],
    pub desired_speed: Option<f32>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct UnitRecord {
    pub pose: PoseSnapshot,
    pub body: PhysicsSnapshot,
    pub profile: ProfileSnapshot,
    pub kind: u32,
    pub damage: u8,
    pub order: Option<OrderSnapshot>,
    pub locomotors: LocomotorSetSnapshot,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct WorldSnapshot {
    pub version: u32,
    pub tick: u64,
    pub units: Vec<UnitRecord>,
    pub extensions: BTreeMap<String, Vec<u8>>,
}

// ---------------------------------------------------------------------------
// World capture / restore
// ---------------------------------------------------------------------------

/// Capture every unit plus registered extension resources.
pub fn capture_world(world: &mut World) -> WorldSnapshot {
    let tick = world.resource::<TickCounter>().0;
    let mut units = Vec::new();
    let mut query = world.query::<(
        &Pose,
        &RigidBody,
        &PhysicsProfile,
        &UnitKind,
        &BodyDamageState,
        &LocomotorSet,
        Option<&MoveOrder>,
    )>();
    for (pose, body, profile, kind, damage, set, order) in query.iter(world) {
        units.push(UnitRecord {
            pose: PoseSnapshot::capture(pose),
            body: PhysicsSnapshot::capture(body),
            profile: ProfileSnapshot::capture(profile),
            kind: kind.0,
            damage: damage.to_u8(),
            order: order.map(|o| OrderSnapshot {
                goal: o.goal.to_array(),
                desired_speed: o.desired_speed,
            }),
            locomotors: set.to_snapshot(),
        });
    }
    let extensions = world.resource::<SaveableRegistry>().save_all(world);
    WorldSnapshot {
        version: WORLD_VERSION,
        tick,
        units,
        extensions,
    }
}

/// Replace all unit state with the snapshot's. Locomotor sets are validated
/// against the live template registry before any existing unit is touched,
/// so a save from an incompatible template base fails without side effects
/// on the entity population.
pub fn restore_world(world: &mut World, snap: &WorldSnapshot) -> Result<(), SnapshotError> {
    if snap.version != WORLD_VERSION {
        return Err(SnapshotError::VersionMismatch {
            found: snap.version,
            expected: WORLD_VERSION,
        });
    }

    let mut sets = Vec::with_capacity(snap.units.len());
    world.resource_scope::<SimRng, Result<(), SnapshotError>>(|world, mut rng| {
        let registry = world.resource::<TemplateRegistry>();
        for unit in &snap.units {
            let mut set = LocomotorSet::default();
            set.apply_snapshot(&unit.locomotors, registry, &mut rng, snap.tick)?;
            sets.push(set);
        }
        Ok(())
    })?;

    let existing: Vec<Entity> = world
        .query_filtered::<Entity, With<LocomotorSet>>()
        .iter(world)
        .collect();
    for entity in existing {
        world.despawn(entity);
    }

    world.resource_mut::<TickCounter>().0 = snap.tick;

    for (record, set) in snap.units.iter().zip(sets) {
        let mut spawned = world.spawn((
            record.pose.restore(),
            record.body.restore(),
            record.profile.restore(),
            UnitKind(record.kind),
            BodyDamageState::from_u8(record.damage),
            set,
        ));
        if let Some(order) = &record.order {
            spawned.insert(MoveOrder {
                goal: Vec3::from_array(order.goal),
                desired_speed: order.desired_speed,
            });
        }
    }

    world.resource_scope::<SaveableRegistry, _>(|world, registry| {
        registry.load_all(world, &snap.extensions);
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// Container codec
// ---------------------------------------------------------------------------

pub fn to_bytes(snap: &WorldSnapshot) -> Vec<u8> {
    let payload = bitcode::encode(snap);
    let compressed = compress_prepend_size(&payload);
    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(&SNAPSHOT_MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // flags, reserved
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&xxh32(&compressed, 0).to_le_bytes());
    out.extend_from_slice(&compressed);
    out
}

pub fn from_bytes(bytes: &[u8]) -> Result<WorldSnapshot, SnapshotError> {
    if bytes.len() < HEADER_LEN {
        return Err(SnapshotError::TooShort);
    }
    if bytes[0..4] != SNAPSHOT_MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    let read_u32 = |at: usize| u32::from_le_bytes(bytes[at..at + 4].try_into().expect("in range"));
    let version = read_u32(4);
    if version != FORMAT_VERSION {
        return Err(SnapshotError::VersionMismatch {
            found: version,
            expected: FORMAT_VERSION,
        });
    }
    let uncompressed_len = read_u32(12) as usize;
    let checksum = read_u32(16);

    let body = &bytes[HEADER_LEN..];
    if xxh32(body, 0) != checksum {
        return Err(SnapshotError::Corrupted);
    }
    let payload = decompress_size_prepended(body).map_err(|_| SnapshotError::Corrupted)?;
    if payload.len() != uncompressed_len {
        return Err(SnapshotError::Corrupted);
    }
    bitcode::decode(&payload).map_err(|e| SnapshotError::Decode(e.to_string()))
}
