//! Entity factory
//!
//! Maps an entity kind and pose to the physical description the world
//! adapter needs. Pure construction: nothing here touches the world.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Pose;
use crate::consts::*;

/// Every kind of object a user can place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Ball,
    Box,
    Domino,
    Ramp,
    Platform,
    Trampoline,
    Tnt,
    Seesaw,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Ball,
        EntityKind::Box,
        EntityKind::Domino,
        EntityKind::Ramp,
        EntityKind::Platform,
        EntityKind::Trampoline,
        EntityKind::Tnt,
        EntityKind::Seesaw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Ball => "ball",
            EntityKind::Box => "box",
            EntityKind::Domino => "domino",
            EntityKind::Ramp => "ramp",
            EntityKind::Platform => "platform",
            EntityKind::Trampoline => "trampoline",
            EntityKind::Tnt => "tnt",
            EntityKind::Seesaw => "seesaw",
        }
    }

    /// Parse a type tag. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Static simple kinds keep whatever angle they were placed or saved with
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            EntityKind::Ramp | EntityKind::Platform | EntityKind::Trampoline
        )
    }

    /// Angle applied when the user places the kind without specifying one
    pub fn default_angle(&self) -> f32 {
        match self {
            EntityKind::Ramp => RAMP_DEFAULT_ANGLE,
            _ => 0.0,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collision geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    Rect { width: f32, height: f32 },
}

/// Surface and mass properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub restitution: f32,
    pub density: f32,
    pub friction: f32,
}

impl Material {
    const fn new(restitution: f32, density: f32, friction: f32) -> Self {
        Self {
            restitution,
            density,
            friction,
        }
    }
}

/// Marker carried by a body for simulation logic and rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyTag {
    #[default]
    Plain,
    /// Detonates on a hard enough impact
    Volatile,
    SeesawPivot,
    SeesawPlank,
    /// The body the contraption has to hit
    Target,
}

/// Everything the world needs to create one rigid body
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub pose: Pose,
    pub shape: Shape,
    pub material: Material,
    pub is_static: bool,
    pub tag: BodyTag,
    pub compound_id: Option<u32>,
}

/// A spring-like constraint between two bodies
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDesc {
    /// Attachment point in the first body's local frame
    pub anchor_a: Vec2,
    /// Attachment point in the second body's local frame
    pub anchor_b: Vec2,
    pub rest_length: f32,
    pub stiffness: f32,
    pub damping: f32,
    pub compound_id: Option<u32>,
}

/// The three parts of a seesaw, created and destroyed together
#[derive(Debug, Clone, PartialEq)]
pub struct SeesawDesc {
    pub id: u32,
    pub pivot: BodyDesc,
    pub plank: BodyDesc,
    /// Joins pivot (a) to plank (b)
    pub joint: ConstraintDesc,
}

/// Result of building an entity
#[derive(Debug, Clone, PartialEq)]
pub enum Blueprint {
    Body(BodyDesc),
    Seesaw(SeesawDesc),
}

const BOUNCY: Material = Material::new(0.8, 0.5, 0.3);
const HEAVY: Material = Material::new(0.3, 2.0, 0.6);
const BRITTLE: Material = Material::new(0.05, 1.0, 0.5);
const SURFACE: Material = Material::new(0.1, 1.0, 0.6);
const LAUNCHER: Material = Material::new(1.3, 0.1, 0.2);
const VOLATILE: Material = Material::new(0.2, 1.0, 0.5);
const PLANK: Material = Material::new(0.1, 1.0, 0.8);

/// Build the physical description of a simple (single body) kind.
/// Returns `None` for the compound seesaw kind.
pub fn body_desc(kind: EntityKind, pose: Pose) -> Option<BodyDesc> {
    let (shape, material, is_static, tag) = match kind {
        EntityKind::Ball => (
            Shape::Circle {
                radius: BALL_RADIUS,
            },
            BOUNCY,
            false,
            BodyTag::Plain,
        ),
        EntityKind::Box => (rect(BOX_SIZE, BOX_SIZE), HEAVY, false, BodyTag::Plain),
        EntityKind::Domino => (
            rect(DOMINO_WIDTH, DOMINO_HEIGHT),
            BRITTLE,
            false,
            BodyTag::Plain,
        ),
        EntityKind::Ramp => (
            rect(RAMP_WIDTH, SURFACE_THICKNESS),
            SURFACE,
            true,
            BodyTag::Plain,
        ),
        EntityKind::Platform => (
            rect(PLATFORM_WIDTH, SURFACE_THICKNESS),
            SURFACE,
            true,
            BodyTag::Plain,
        ),
        EntityKind::Trampoline => (
            rect(TRAMPOLINE_WIDTH, SURFACE_THICKNESS),
            LAUNCHER,
            true,
            BodyTag::Plain,
        ),
        EntityKind::Tnt => (rect(TNT_SIZE, TNT_SIZE), VOLATILE, false, BodyTag::Volatile),
        EntityKind::Seesaw => return None,
    };

    Some(BodyDesc {
        pose,
        shape,
        material,
        is_static,
        tag,
        compound_id: None,
    })
}

/// Build the three parts of a seesaw whose pivot sits at `position`
pub fn seesaw_desc(position: Vec2, id: u32) -> SeesawDesc {
    // Plank rests on top of the pivot
    let lift = PIVOT_RADIUS + PLANK_THICKNESS / 2.0;

    let pivot = BodyDesc {
        pose: Pose {
            position,
            angle: 0.0,
        },
        shape: Shape::Circle {
            radius: PIVOT_RADIUS,
        },
        material: SURFACE,
        is_static: true,
        tag: BodyTag::SeesawPivot,
        compound_id: Some(id),
    };
    let plank = BodyDesc {
        pose: Pose {
            position: position + Vec2::new(0.0, lift),
            angle: 0.0,
        },
        shape: rect(PLANK_WIDTH, PLANK_THICKNESS),
        material: PLANK,
        is_static: false,
        tag: BodyTag::SeesawPlank,
        compound_id: Some(id),
    };
    let joint = ConstraintDesc {
        anchor_a: Vec2::new(0.0, lift),
        anchor_b: Vec2::ZERO,
        rest_length: 0.0,
        stiffness: SEESAW_STIFFNESS,
        damping: SEESAW_DAMPING,
        compound_id: Some(id),
    };

    SeesawDesc {
        id,
        pivot,
        plank,
        joint,
    }
}

/// Build any kind. Seesaws need the compound id they will be created under.
pub fn create(kind: EntityKind, pose: Pose, compound_id: u32) -> Blueprint {
    match body_desc(kind, pose) {
        Some(desc) => Blueprint::Body(desc),
        None => Blueprint::Seesaw(seesaw_desc(pose.position, compound_id)),
    }
}

/// Build the target body
pub fn target_desc(position: Vec2) -> BodyDesc {
    BodyDesc {
        pose: Pose {
            position,
            angle: 0.0,
        },
        shape: Shape::Circle {
            radius: TARGET_RADIUS,
        },
        material: SURFACE,
        is_static: true,
        tag: BodyTag::Target,
        compound_id: None,
    }
}

fn rect(width: f32, height: f32) -> Shape {
    Shape::Rect { width, height }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_tag(kind.as_str()), Some(kind));
        }
        assert_eq!(EntityKind::from_tag("anvil"), None);
        assert_eq!(EntityKind::from_tag("Ball"), None);
    }

    #[test]
    fn test_material_ordering() {
        let ball = body_desc(EntityKind::Ball, Pose::default()).unwrap();
        let crate_box = body_desc(EntityKind::Box, Pose::default()).unwrap();
        let domino = body_desc(EntityKind::Domino, Pose::default()).unwrap();
        let trampoline = body_desc(EntityKind::Trampoline, Pose::default()).unwrap();

        assert!(ball.material.restitution > crate_box.material.restitution);
        assert!(ball.material.density < crate_box.material.density);
        assert!(domino.material.restitution < crate_box.material.restitution);
        assert!(trampoline.material.restitution > ball.material.restitution);
        assert!(trampoline.material.density < ball.material.density);
    }

    #[test]
    fn test_tnt_is_tagged() {
        let tnt = body_desc(EntityKind::Tnt, Pose::default()).unwrap();
        assert_eq!(tnt.tag, BodyTag::Volatile);
        assert!(!tnt.is_static);
    }

    #[test]
    fn test_seesaw_has_no_single_body() {
        assert!(body_desc(EntityKind::Seesaw, Pose::default()).is_none());
        match create(EntityKind::Seesaw, Pose::new(1.0, 2.0, 0.0), 7) {
            Blueprint::Seesaw(seesaw) => {
                assert_eq!(seesaw.id, 7);
                assert_eq!(seesaw.pivot.pose.position, Vec2::new(1.0, 2.0));
                assert!(seesaw.pivot.is_static);
                assert!(!seesaw.plank.is_static);
                assert_eq!(seesaw.pivot.compound_id, Some(7));
                assert_eq!(seesaw.plank.compound_id, Some(7));
                assert_eq!(seesaw.joint.compound_id, Some(7));
                assert_eq!(seesaw.joint.rest_length, 0.0);
            }
            Blueprint::Body(_) => panic!("seesaw must build a compound"),
        }
    }

    #[test]
    fn test_create_keeps_pose() {
        let pose = Pose::new(3.0, -1.0, 0.4);
        match create(EntityKind::Ramp, pose, 0) {
            Blueprint::Body(desc) => assert_eq!(desc.pose, pose),
            Blueprint::Seesaw(_) => panic!("ramp is a simple body"),
        }
    }
}
