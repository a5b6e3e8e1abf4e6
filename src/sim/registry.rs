//! Entity registry
//!
//! The single record of what the user has placed and is still alive. Bodies
//! carry no kind metadata, so the kind is recovered from geometry with the
//! same constants the factory builds from.

use std::collections::BTreeSet;

use glam::Vec2;

use super::factory::{BodyTag, EntityKind, Shape};
use super::world::{BodyHandle, BodyView, ConstraintHandle, World};
use crate::Pose;
use crate::consts::*;

/// A live body and the pose it was created with (restored on reset)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placed {
    pub handle: BodyHandle,
    pub original: Pose,
}

/// Live placed bodies and constraints, in insertion order
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: Vec<Placed>,
    constraints: Vec<ConstraintHandle>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a body. Adding the same handle twice is a caller bug.
    pub fn add(&mut self, handle: BodyHandle, original: Pose) {
        self.entities.push(Placed { handle, original });
    }

    pub fn add_constraint(&mut self, handle: ConstraintHandle) {
        self.constraints.push(handle);
    }

    /// Stop tracking a body. Unknown handles are ignored.
    pub fn remove(&mut self, handle: BodyHandle) -> bool {
        let before = self.entities.len();
        self.entities.retain(|placed| placed.handle != handle);
        self.entities.len() != before
    }

    /// Stop tracking a constraint. Unknown handles are ignored.
    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> bool {
        let before = self.constraints.len();
        self.constraints.retain(|c| *c != handle);
        self.constraints.len() != before
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.entities.iter().any(|placed| placed.handle == handle)
    }

    /// Number of live bodies. A seesaw counts twice.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[Placed] {
        &self.entities
    }

    pub fn handles(&self) -> Vec<BodyHandle> {
        self.entities.iter().map(|placed| placed.handle).collect()
    }

    pub fn constraints(&self) -> &[ConstraintHandle] {
        &self.constraints
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.constraints.clear();
    }

    /// Topmost placed body under `point`
    pub fn entity_at<W: World>(&self, world: &W, point: Vec2) -> Option<BodyHandle> {
        world.bodies_at(point, &self.handles()).into_iter().next()
    }

    /// Kind of a live body, `None` if the world no longer has it
    pub fn kind_of<W: World>(&self, world: &W, handle: BodyHandle) -> Option<EntityKind> {
        world.body(handle).map(|view| infer_kind(&view))
    }

    /// Distinct kinds among the live bodies
    pub fn distinct_kinds<W: World>(&self, world: &W) -> BTreeSet<EntityKind> {
        self.entities
            .iter()
            .filter_map(|placed| self.kind_of(world, placed.handle))
            .collect()
    }
}

/// Recover the entity kind of a body from its tag, geometry and material
pub fn infer_kind(view: &BodyView) -> EntityKind {
    match view.tag {
        BodyTag::SeesawPivot | BodyTag::SeesawPlank => return EntityKind::Seesaw,
        BodyTag::Volatile => return EntityKind::Tnt,
        BodyTag::Plain | BodyTag::Target => {}
    }

    let (width, height) = match view.shape {
        Shape::Circle { .. } => return EntityKind::Ball,
        Shape::Rect { width, height } => (width, height),
    };

    if view.is_static {
        if view.material.restitution > LAUNCHER_RESTITUTION {
            EntityKind::Trampoline
        } else if width > FLAT_SURFACE_MIN_WIDTH {
            EntityKind::Platform
        } else {
            EntityKind::Ramp
        }
    } else if height > TALL_BODY_MIN_HEIGHT {
        EntityKind::Domino
    } else {
        EntityKind::Box
    }
}
