//! World adapter contract
//!
//! The sandbox never talks to the physics engine directly. Everything it
//! needs (adding and removing bodies, reading their geometry back, point
//! queries, stepping) goes through this trait.

use std::fmt;

use glam::Vec2;

use super::factory::{BodyDesc, BodyTag, ConstraintDesc, Material, Shape};

/// Identifies a rigid body. Allocated by the world, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

/// Identifies a constraint. Allocated by the world, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintHandle(pub u64);

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

impl fmt::Display for ConstraintHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constraint#{}", self.0)
    }
}

/// Read-only snapshot of a live body
#[derive(Debug, Clone, PartialEq)]
pub struct BodyView {
    pub handle: BodyHandle,
    pub position: Vec2,
    pub angle: f32,
    pub velocity: Vec2,
    pub is_static: bool,
    pub shape: Shape,
    pub material: Material,
    pub tag: BodyTag,
    pub compound_id: Option<u32>,
}

/// Two bodies started touching during a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionStart {
    pub a: BodyHandle,
    pub b: BodyHandle,
    /// Speed of `a` relative to `b` just before the step
    pub relative_speed: f32,
}

impl CollisionStart {
    pub fn involves(&self, handle: BodyHandle) -> bool {
        self.a == handle || self.b == handle
    }

    /// The body on the other side of the contact from `handle`
    pub fn other(&self, handle: BodyHandle) -> Option<BodyHandle> {
        if self.a == handle {
            Some(self.b)
        } else if self.b == handle {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Physics engine seen from the sandbox
pub trait World {
    fn add_body(&mut self, desc: &BodyDesc) -> BodyHandle;

    /// Join two live bodies. Returns `None` if either body is gone.
    fn add_constraint(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
        desc: &ConstraintDesc,
    ) -> Option<ConstraintHandle>;

    /// Returns false if the body was already gone
    fn remove_body(&mut self, handle: BodyHandle) -> bool;

    /// Returns false if the constraint was already gone
    fn remove_constraint(&mut self, handle: ConstraintHandle) -> bool;

    fn body(&self, handle: BodyHandle) -> Option<BodyView>;

    /// Compound id a live constraint was created under
    fn constraint_compound(&self, handle: ConstraintHandle) -> Option<u32>;

    fn set_body_position(&mut self, handle: BodyHandle, position: Vec2);

    fn set_body_angle(&mut self, handle: BodyHandle, angle: f32);

    /// Sets linear velocity and clears angular velocity
    fn set_body_velocity(&mut self, handle: BodyHandle, velocity: Vec2);

    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2);

    /// Bodies among `candidates` containing `point`, in candidate order
    fn bodies_at(&self, point: Vec2, candidates: &[BodyHandle]) -> Vec<BodyHandle>;

    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f32) -> Vec<CollisionStart>;

    fn body_count(&self) -> usize;

    fn constraint_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_other() {
        let hit = CollisionStart {
            a: BodyHandle(1),
            b: BodyHandle(2),
            relative_speed: 3.0,
        };
        assert!(hit.involves(BodyHandle(2)));
        assert_eq!(hit.other(BodyHandle(1)), Some(BodyHandle(2)));
        assert_eq!(hit.other(BodyHandle(2)), Some(BodyHandle(1)));
        assert_eq!(hit.other(BodyHandle(3)), None);
    }
}
