//! Save/load of sandbox designs
//!
//! Features:
//! - Versioned JSON envelope (only version 1 is accepted)
//! - One record per seesaw despite its two bodies
//! - Validation before anything is torn down, so a bad record never leaves
//!   a half-loaded sandbox
//! - Key-value stores: memory, JSON file (native), LocalStorage (web)

pub mod store;

pub use store::{DesignStore, MemoryStore, StoreError};
#[cfg(not(target_arch = "wasm32"))]
pub use store::FileStore;
#[cfg(target_arch = "wasm32")]
pub use store::LocalStorageStore;

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Pose;
use crate::consts::MAX_NAME_LEN;
use crate::sim::factory::{BodyTag, EntityKind};
use crate::sim::registry::{EntityRegistry, infer_kind};
use crate::sim::world::World;

/// The only format version this build reads and writes
pub const FORMAT_VERSION: u64 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Saved design is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Saved design has no format version")]
    MissingVersion,
    #[error("Unsupported save format version {0} (expected {expected})", expected = FORMAT_VERSION)]
    UnsupportedVersion(u64),
    #[error("Enter a name for the design")]
    EmptyName,
    #[error("Name is too long (max {max} characters)", max = MAX_NAME_LEN)]
    NameTooLong,
    #[error("Seesaw record {0} has no compound id")]
    MissingCompoundId(usize),
    #[error("Record {0} has a non-finite coordinate")]
    InvalidCoordinate(usize),
    #[error("Seesaw record {0} reuses a compound id")]
    DuplicateCompoundId(usize),
    #[error("Seesaw record {0} has an out-of-range compound id")]
    CompoundIdOutOfRange(usize),
}

/// One saved object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    /// Entity type tag, kept as text so unknown tags can be skipped on load
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound_id: Option<u32>,
}

/// A named snapshot of the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedDesign {
    pub version: u64,
    /// Unix epoch milliseconds
    pub timestamp: f64,
    pub name: String,
    pub objects: Vec<ObjectRecord>,
}

/// Listing entry for the load menu
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSummary {
    pub name: String,
    pub timestamp: f64,
    pub object_count: usize,
}

/// One creation call produced by a load
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Spawn {
    Body { kind: EntityKind, pose: Pose },
    Seesaw { id: u32, position: Vec2 },
}

/// Validated creation calls for a saved design
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RestorePlan {
    pub spawns: Vec<Spawn>,
    /// Highest seesaw id in the design; fresh ids must start above it
    pub max_compound_id: Option<u32>,
}

/// Trim and bound-check a design name
pub fn validate_name(name: &str) -> Result<String, PersistError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PersistError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(PersistError::NameTooLong);
    }
    Ok(name.to_string())
}

/// Snapshot the live registry.
///
/// Seesaws are emitted once, when their pivot is reached; planks are
/// skipped. Simple bodies record their current pose.
pub fn capture<W: World>(world: &W, registry: &EntityRegistry, name: &str, timestamp: f64) -> SavedDesign {
    let mut objects = Vec::with_capacity(registry.len());

    for placed in registry.entities() {
        let Some(view) = world.body(placed.handle) else {
            continue;
        };
        match view.tag {
            BodyTag::SeesawPivot => objects.push(ObjectRecord {
                kind: EntityKind::Seesaw.as_str().to_string(),
                x: view.position.x,
                y: view.position.y,
                angle: 0.0,
                compound_id: view.compound_id,
            }),
            BodyTag::SeesawPlank => {}
            _ => objects.push(ObjectRecord {
                kind: infer_kind(&view).as_str().to_string(),
                x: view.position.x,
                y: view.position.y,
                angle: view.angle,
                compound_id: None,
            }),
        }
    }

    SavedDesign {
        version: FORMAT_VERSION,
        timestamp,
        name: name.to_string(),
        objects,
    }
}

pub fn encode(design: &SavedDesign) -> Result<String, PersistError> {
    Ok(serde_json::to_string(design)?)
}

/// Parse a stored design. The version is checked before the rest of the
/// envelope so a future format is reported as such, not as corruption.
pub fn decode(json: &str) -> Result<SavedDesign, PersistError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let version = value
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .ok_or(PersistError::MissingVersion)?;
    if version != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion(version));
    }
    Ok(serde_json::from_value(value)?)
}

/// Turn a decoded design into creation calls.
///
/// Static kinds are restored at their saved angle; dynamic kinds come back
/// at their default placement angle. Unknown type tags are skipped.
pub fn restore_plan(design: &SavedDesign) -> Result<RestorePlan, PersistError> {
    if design.version != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion(design.version));
    }

    let mut plan = RestorePlan::default();
    let mut seen = BTreeSet::new();
    for (index, record) in design.objects.iter().enumerate() {
        if !(record.x.is_finite() && record.y.is_finite() && record.angle.is_finite()) {
            return Err(PersistError::InvalidCoordinate(index));
        }
        let Some(kind) = EntityKind::from_tag(&record.kind) else {
            log::warn!("Skipping saved object {} with unknown type '{}'", index, record.kind);
            continue;
        };

        let spawn = match kind {
            EntityKind::Seesaw => {
                let id = record
                    .compound_id
                    .ok_or(PersistError::MissingCompoundId(index))?;
                // The counter must stay able to hand out max + 1
                if id == u32::MAX {
                    return Err(PersistError::CompoundIdOutOfRange(index));
                }
                if !seen.insert(id) {
                    return Err(PersistError::DuplicateCompoundId(index));
                }
                plan.max_compound_id = Some(plan.max_compound_id.map_or(id, |max| max.max(id)));
                Spawn::Seesaw {
                    id,
                    position: Vec2::new(record.x, record.y),
                }
            }
            _ => {
                let angle = if kind.is_static() {
                    record.angle
                } else {
                    kind.default_angle()
                };
                Spawn::Body {
                    kind,
                    pose: Pose::new(record.x, record.y, angle),
                }
            }
        };
        plan.spawns.push(spawn);
    }
    Ok(plan)
}

/// Summarize every readable design in a store, newest first.
/// Corrupt entries are logged and left out.
pub fn summaries(store: &dyn DesignStore) -> Result<Vec<SavedSummary>, StoreError> {
    let mut listing = Vec::new();
    for name in store.names()? {
        let Some(json) = store.get(&name)? else {
            continue;
        };
        match decode(&json) {
            Ok(design) => listing.push(SavedSummary {
                name,
                timestamp: design.timestamp,
                object_count: design.objects.len(),
            }),
            Err(e) => log::warn!("Skipping saved design '{}': {}", name, e),
        }
    }
    listing.sort_by(|a, b| b.timestamp.total_cmp(&a.timestamp));
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::factory::body_desc;
    use crate::sim::rapier::RapierWorld;
    use crate::sim::seesaw::SeesawManager;

    fn record(kind: &str, x: f32, angle: f32, compound_id: Option<u32>) -> ObjectRecord {
        ObjectRecord {
            kind: kind.to_string(),
            x,
            y: 0.0,
            angle,
            compound_id,
        }
    }

    fn design(objects: Vec<ObjectRecord>) -> SavedDesign {
        SavedDesign {
            version: FORMAT_VERSION,
            timestamp: 1.0,
            name: "test".to_string(),
            objects,
        }
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  my design ").unwrap(), "my design");
        assert!(matches!(validate_name("   "), Err(PersistError::EmptyName)));
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(validate_name(&long), Err(PersistError::NameTooLong)));
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_capture_emits_seesaw_once() {
        let mut world = RapierWorld::new(Vec2::new(0.0, -9.81));
        let mut registry = EntityRegistry::new();
        let mut seesaws = SeesawManager::new();

        let pose = Pose::new(4.0, 1.0, 0.0);
        let ball = world.add_body(&body_desc(EntityKind::Ball, pose).unwrap());
        registry.add(ball, pose);
        seesaws
            .create(&mut world, &mut registry, Vec2::new(-2.0, 0.5), None)
            .unwrap();

        let saved = capture(&world, &registry, "mix", 5.0);
        assert_eq!(saved.version, FORMAT_VERSION);
        assert_eq!(saved.objects.len(), 2);
        assert_eq!(saved.objects[0].kind, "ball");
        assert_eq!(saved.objects[1].kind, "seesaw");
        assert_eq!(saved.objects[1].compound_id, Some(1));
        assert_eq!(saved.objects[1].angle, 0.0);
        assert!((saved.objects[1].x + 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_json_shape() {
        let saved = design(vec![
            record("box", 1.0, 0.0, None),
            record("seesaw", 2.0, 0.0, Some(4)),
        ]);
        let json = encode(&saved).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["objects"][0]["type"], "box");
        assert!(value["objects"][0].get("compoundId").is_none());
        assert_eq!(value["objects"][1]["compoundId"], 4);
    }

    #[test]
    fn test_decode_rejects_other_versions() {
        let json = r#"{"version":2,"timestamp":0,"name":"x","objects":[]}"#;
        assert!(matches!(decode(json), Err(PersistError::UnsupportedVersion(2))));

        let json = r#"{"timestamp":0,"name":"x","objects":[]}"#;
        assert!(matches!(decode(json), Err(PersistError::MissingVersion)));
    }

    #[test]
    fn test_decode_reports_corruption() {
        assert!(matches!(decode("{not json"), Err(PersistError::Corrupt(_))));
        let json = r#"{"version":1,"timestamp":0,"name":"x"}"#;
        assert!(matches!(decode(json), Err(PersistError::Corrupt(_))));
    }

    #[test]
    fn test_restore_plan_tracks_max_id_and_angles() {
        let saved = design(vec![
            record("ramp", 0.0, 0.7, None),
            record("domino", 1.0, 1.2, None),
            record("seesaw", 2.0, 0.0, Some(7)),
            record("seesaw", 3.0, 0.0, Some(3)),
            record("anvil", 4.0, 0.0, None),
        ]);
        let plan = restore_plan(&saved).unwrap();

        assert_eq!(plan.spawns.len(), 4);
        assert_eq!(plan.max_compound_id, Some(7));
        assert_eq!(
            plan.spawns[0],
            Spawn::Body {
                kind: EntityKind::Ramp,
                pose: Pose::new(0.0, 0.0, 0.7),
            }
        );
        assert_eq!(
            plan.spawns[1],
            Spawn::Body {
                kind: EntityKind::Domino,
                pose: Pose::new(1.0, 0.0, 0.0),
            }
        );
    }

    #[test]
    fn test_restore_plan_requires_seesaw_id() {
        let saved = design(vec![record("seesaw", 0.0, 0.0, None)]);
        assert!(matches!(
            restore_plan(&saved),
            Err(PersistError::MissingCompoundId(0))
        ));
    }

    #[test]
    fn test_restore_plan_rejects_bad_compound_ids() {
        let saved = design(vec![
            record("seesaw", 0.0, 0.0, Some(4)),
            record("box", 1.0, 0.0, None),
            record("seesaw", 2.0, 0.0, Some(4)),
        ]);
        assert!(matches!(
            restore_plan(&saved),
            Err(PersistError::DuplicateCompoundId(2))
        ));

        let saved = design(vec![record("seesaw", 0.0, 0.0, Some(u32::MAX))]);
        assert!(matches!(
            restore_plan(&saved),
            Err(PersistError::CompoundIdOutOfRange(0))
        ));

        let saved = design(vec![record("seesaw", 0.0, 0.0, Some(u32::MAX - 1))]);
        assert_eq!(restore_plan(&saved).unwrap().max_compound_id, Some(u32::MAX - 1));
    }

    #[test]
    fn test_error_messages_name_limits() {
        assert_eq!(
            PersistError::UnsupportedVersion(2).to_string(),
            format!("Unsupported save format version 2 (expected {})", FORMAT_VERSION)
        );
        assert_eq!(
            PersistError::NameTooLong.to_string(),
            format!("Name is too long (max {} characters)", MAX_NAME_LEN)
        );
    }

    #[test]
    fn test_summaries_skip_corrupt_entries() {
        let mut store = MemoryStore::new();
        let mut older = design(vec![record("box", 0.0, 0.0, None)]);
        older.name = "older".to_string();
        let mut newer = design(vec![]);
        newer.name = "newer".to_string();
        newer.timestamp = 10.0;
        store.put("older", &encode(&older).unwrap()).unwrap();
        store.put("newer", &encode(&newer).unwrap()).unwrap();
        store.put("broken", "{").unwrap();

        let listing = summaries(&store).unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].name, "newer");
        assert_eq!(listing[1].object_count, 1);
    }
}
