//! Seesaw lifecycle
//!
//! A seesaw is a static pivot, a dynamic plank and the constraint joining
//! them, all sharing one compound id. Nothing outside this module creates or
//! destroys those parts, so the three always live and die together.

use glam::Vec2;

use super::factory::{BodyTag, seesaw_desc};
use super::registry::EntityRegistry;
use super::world::{BodyHandle, ConstraintHandle, World};

/// Handles of a live seesaw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seesaw {
    pub id: u32,
    pub pivot: BodyHandle,
    pub plank: BodyHandle,
    pub constraint: ConstraintHandle,
}

/// Owns the compound id counter
#[derive(Debug, Clone)]
pub struct SeesawManager {
    next_id: u32,
}

impl Default for SeesawManager {
    fn default() -> Self {
        Self { next_id: 1 }
    }
}

impl SeesawManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next fresh seesaw will get
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Make sure fresh ids start above `max_id`. Never moves backwards.
    pub fn reserve_through(&mut self, max_id: u32) {
        self.next_id = self.next_id.max(max_id.saturating_add(1));
    }

    /// Create a seesaw with its pivot at `position`.
    ///
    /// With `id` set (undo/redo replay, load) the recorded id is reused;
    /// otherwise the next counter value is allocated. Returns `None` without
    /// touching anything if `id` is already held by a live seesaw.
    pub fn create<W: World>(
        &mut self,
        world: &mut W,
        registry: &mut EntityRegistry,
        position: Vec2,
        id: Option<u32>,
    ) -> Option<Seesaw> {
        let id = match id {
            Some(id) => {
                if self.is_live(world, registry, id) {
                    log::warn!("Seesaw {} already exists, not recreating it", id);
                    return None;
                }
                self.reserve_through(id);
                id
            }
            None => {
                let id = self.next_id;
                let Some(next) = id.checked_add(1) else {
                    log::warn!("Seesaw ids exhausted");
                    return None;
                };
                self.next_id = next;
                id
            }
        };

        let desc = seesaw_desc(position, id);
        let pivot = world.add_body(&desc.pivot);
        let plank = world.add_body(&desc.plank);
        let Some(constraint) = world.add_constraint(pivot, plank, &desc.joint) else {
            world.remove_body(plank);
            world.remove_body(pivot);
            log::warn!("Seesaw {} constraint rejected by the world", id);
            return None;
        };

        registry.add(pivot, desc.pivot.pose);
        registry.add(plank, desc.plank.pose);
        registry.add_constraint(constraint);
        log::debug!("Created seesaw {} at ({:.2}, {:.2})", id, position.x, position.y);

        Some(Seesaw {
            id,
            pivot,
            plank,
            constraint,
        })
    }

    /// Remove every part carrying `id`. Parts already gone are skipped.
    /// Returns how many parts were removed.
    pub fn remove<W: World>(&self, world: &mut W, registry: &mut EntityRegistry, id: u32) -> usize {
        let mut removed = 0;

        // Constraints first: removing a body also drops its joints in the world
        let constraints: Vec<ConstraintHandle> = registry
            .constraints()
            .iter()
            .copied()
            .filter(|c| world.constraint_compound(*c) == Some(id))
            .collect();
        for constraint in constraints {
            world.remove_constraint(constraint);
            registry.remove_constraint(constraint);
            removed += 1;
        }

        // Joints the world already dropped along with one of their bodies
        let orphaned: Vec<ConstraintHandle> = registry
            .constraints()
            .iter()
            .copied()
            .filter(|c| world.constraint_compound(*c).is_none())
            .collect();
        for constraint in orphaned {
            registry.remove_constraint(constraint);
        }

        for handle in self.parts(world, registry, id) {
            world.remove_body(handle);
            registry.remove(handle);
            removed += 1;
        }

        log::debug!("Removed seesaw {} ({} parts)", id, removed);
        removed
    }

    /// Look up a live seesaw by id
    pub fn find<W: World>(&self, world: &W, registry: &EntityRegistry, id: u32) -> Option<Seesaw> {
        let mut pivot = None;
        let mut plank = None;
        for placed in registry.entities() {
            let Some(view) = world.body(placed.handle) else {
                continue;
            };
            if view.compound_id != Some(id) {
                continue;
            }
            match view.tag {
                BodyTag::SeesawPivot => pivot = Some(placed.handle),
                BodyTag::SeesawPlank => plank = Some(placed.handle),
                _ => {}
            }
        }
        let constraint = registry
            .constraints()
            .iter()
            .copied()
            .find(|c| world.constraint_compound(*c) == Some(id))?;

        Some(Seesaw {
            id,
            pivot: pivot?,
            plank: plank?,
            constraint,
        })
    }

    /// Compound id of a registry body, if it is a seesaw part
    pub fn id_of<W: World>(world: &W, handle: BodyHandle) -> Option<u32> {
        world.body(handle)?.compound_id
    }

    fn is_live<W: World>(&self, world: &W, registry: &EntityRegistry, id: u32) -> bool {
        !self.parts(world, registry, id).is_empty()
    }

    fn parts<W: World>(&self, world: &W, registry: &EntityRegistry, id: u32) -> Vec<BodyHandle> {
        registry
            .entities()
            .iter()
            .map(|placed| placed.handle)
            .filter(|handle| Self::id_of(world, *handle) == Some(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rapier::RapierWorld;

    fn world() -> RapierWorld {
        RapierWorld::new(Vec2::new(0.0, -9.81))
    }

    #[test]
    fn test_create_registers_all_parts() {
        let mut world = world();
        let mut registry = EntityRegistry::new();
        let mut seesaws = SeesawManager::new();

        let seesaw = seesaws
            .create(&mut world, &mut registry, Vec2::new(1.0, 0.0), None)
            .unwrap();
        assert_eq!(seesaw.id, 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.constraints().len(), 1);
        assert_eq!(seesaws.next_id(), 2);
        assert_eq!(seesaws.find(&world, &registry, 1), Some(seesaw));
    }

    #[test]
    fn test_create_then_remove_leaves_nothing() {
        let mut world = world();
        let mut registry = EntityRegistry::new();
        let mut seesaws = SeesawManager::new();

        let seesaw = seesaws
            .create(&mut world, &mut registry, Vec2::ZERO, None)
            .unwrap();
        assert_eq!(seesaws.remove(&mut world, &mut registry, seesaw.id), 3);

        assert!(registry.is_empty());
        assert!(registry.constraints().is_empty());
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.constraint_count(), 0);
    }

    #[test]
    fn test_remove_only_touches_matching_id() {
        let mut world = world();
        let mut registry = EntityRegistry::new();
        let mut seesaws = SeesawManager::new();

        let first = seesaws
            .create(&mut world, &mut registry, Vec2::ZERO, None)
            .unwrap();
        let second = seesaws
            .create(&mut world, &mut registry, Vec2::new(5.0, 0.0), None)
            .unwrap();
        seesaws.remove(&mut world, &mut registry, first.id);

        assert_eq!(registry.len(), 2);
        assert_eq!(seesaws.find(&world, &registry, second.id), Some(second));
        assert_eq!(seesaws.find(&world, &registry, first.id), None);
    }

    #[test]
    fn test_remove_tolerates_partial_prior_removal() {
        let mut world = world();
        let mut registry = EntityRegistry::new();
        let mut seesaws = SeesawManager::new();

        let seesaw = seesaws
            .create(&mut world, &mut registry, Vec2::ZERO, None)
            .unwrap();
        world.remove_constraint(seesaw.constraint);
        registry.remove_constraint(seesaw.constraint);

        assert_eq!(seesaws.remove(&mut world, &mut registry, seesaw.id), 2);
        assert_eq!(seesaws.remove(&mut world, &mut registry, seesaw.id), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_forgets_joint_dropped_with_a_part() {
        let mut world = world();
        let mut registry = EntityRegistry::new();
        let mut seesaws = SeesawManager::new();

        let seesaw = seesaws
            .create(&mut world, &mut registry, Vec2::ZERO, None)
            .unwrap();
        // The plank goes behind the manager's back; the world drops the joint
        world.remove_body(seesaw.plank);
        registry.remove(seesaw.plank);
        assert_eq!(registry.constraints().len(), 1);

        assert_eq!(seesaws.remove(&mut world, &mut registry, seesaw.id), 1);
        assert!(registry.is_empty());
        assert!(registry.constraints().is_empty());
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_fresh_ids_stop_at_the_top_of_the_range() {
        let mut world = world();
        let mut registry = EntityRegistry::new();
        let mut seesaws = SeesawManager::new();
        seesaws.reserve_through(u32::MAX - 1);
        assert_eq!(seesaws.next_id(), u32::MAX);

        assert!(seesaws
            .create(&mut world, &mut registry, Vec2::ZERO, None)
            .is_none());
        assert!(registry.is_empty());
        assert_eq!(world.body_count(), 0);
        assert_eq!(seesaws.next_id(), u32::MAX);
    }

    #[test]
    fn test_recorded_id_is_reused_and_counter_advances() {
        let mut world = world();
        let mut registry = EntityRegistry::new();
        let mut seesaws = SeesawManager::new();

        let seesaw = seesaws
            .create(&mut world, &mut registry, Vec2::ZERO, Some(9))
            .unwrap();
        assert_eq!(seesaw.id, 9);
        assert_eq!(seesaws.next_id(), 10);

        // Live id cannot be duplicated
        assert!(seesaws
            .create(&mut world, &mut registry, Vec2::ZERO, Some(9))
            .is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_reserve_never_moves_backwards() {
        let mut seesaws = SeesawManager::new();
        seesaws.reserve_through(20);
        assert_eq!(seesaws.next_id(), 21);
        seesaws.reserve_through(3);
        assert_eq!(seesaws.next_id(), 21);
    }
}
