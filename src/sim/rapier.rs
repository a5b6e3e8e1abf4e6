//! rapier2d-backed world adapter
//!
//! rapier owns body, collider and joint storage. This adapter hands out its
//! own never-reused handles and maps them onto rapier's, so a handle held by
//! the action history after its body is gone can never alias a new body.

use std::collections::HashMap;

use glam::Vec2;
use rapier2d::prelude::*;

use super::factory::{BodyDesc, BodyTag, ConstraintDesc, Material, Shape};
use super::world::{BodyHandle, BodyView, CollisionStart, ConstraintHandle, World};

#[derive(Debug, Clone, Copy)]
struct BodyEntry {
    rigid_body: RigidBodyHandle,
    collider: ColliderHandle,
    material: Material,
    tag: BodyTag,
    compound_id: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
struct ConstraintEntry {
    joint: ImpulseJointHandle,
    compound_id: Option<u32>,
}

/// Physics world driven by rapier2d
pub struct RapierWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    bodies: HashMap<BodyHandle, BodyEntry>,
    collider_to_body: HashMap<ColliderHandle, BodyHandle>,
    constraints: HashMap<ConstraintHandle, ConstraintEntry>,
    next_handle: u64,
}

impl RapierWorld {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![gravity.x, gravity.y],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            bodies: HashMap::new(),
            collider_to_body: HashMap::new(),
            constraints: HashMap::new(),
            next_handle: 1,
        }
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    fn rigid_body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        let rigid_body = self.bodies.get(&handle)?.rigid_body;
        self.rigid_body_set.get_mut(rigid_body)
    }
}

impl World for RapierWorld {
    fn add_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let builder = if desc.is_static {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        let rigid_body = builder
            .translation(vector![desc.pose.position.x, desc.pose.position.y])
            .rotation(desc.pose.angle)
            .build();
        let rigid_body = self.rigid_body_set.insert(rigid_body);

        let shape = match desc.shape {
            Shape::Circle { radius } => SharedShape::ball(radius),
            Shape::Rect { width, height } => SharedShape::cuboid(width / 2.0, height / 2.0),
        };
        let collider = ColliderBuilder::new(shape)
            .restitution(desc.material.restitution)
            .restitution_combine_rule(CoefficientCombineRule::Max)
            .density(desc.material.density)
            .friction(desc.material.friction)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let collider =
            self.collider_set
                .insert_with_parent(collider, rigid_body, &mut self.rigid_body_set);

        let handle = BodyHandle(self.allocate());
        self.bodies.insert(
            handle,
            BodyEntry {
                rigid_body,
                collider,
                material: desc.material,
                tag: desc.tag,
                compound_id: desc.compound_id,
            },
        );
        self.collider_to_body.insert(collider, handle);
        handle
    }

    fn add_constraint(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
        desc: &ConstraintDesc,
    ) -> Option<ConstraintHandle> {
        let body_a = self.bodies.get(&a)?.rigid_body;
        let body_b = self.bodies.get(&b)?.rigid_body;

        let joint = SpringJointBuilder::new(desc.rest_length, desc.stiffness, desc.damping)
            .local_anchor1(point![desc.anchor_a.x, desc.anchor_a.y])
            .local_anchor2(point![desc.anchor_b.x, desc.anchor_b.y]);
        let joint = self.impulse_joint_set.insert(body_a, body_b, joint, true);

        let handle = ConstraintHandle(self.allocate());
        self.constraints.insert(
            handle,
            ConstraintEntry {
                joint,
                compound_id: desc.compound_id,
            },
        );
        Some(handle)
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        let Some(entry) = self.bodies.remove(&handle) else {
            return false;
        };
        self.collider_to_body.remove(&entry.collider);
        self.rigid_body_set.remove(
            entry.rigid_body,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true, // remove attached colliders
        );
        // rapier drops joints attached to a removed body
        self.constraints
            .retain(|_, c| self.impulse_joint_set.get(c.joint).is_some());
        true
    }

    fn remove_constraint(&mut self, handle: ConstraintHandle) -> bool {
        let Some(entry) = self.constraints.remove(&handle) else {
            return false;
        };
        self.impulse_joint_set.remove(entry.joint, true).is_some()
    }

    fn body(&self, handle: BodyHandle) -> Option<BodyView> {
        let entry = self.bodies.get(&handle)?;
        let rigid_body = self.rigid_body_set.get(entry.rigid_body)?;
        let collider = self.collider_set.get(entry.collider)?;

        let shape = if let Some(ball) = collider.shape().as_ball() {
            Shape::Circle {
                radius: ball.radius,
            }
        } else if let Some(cuboid) = collider.shape().as_cuboid() {
            Shape::Rect {
                width: cuboid.half_extents.x * 2.0,
                height: cuboid.half_extents.y * 2.0,
            }
        } else {
            return None;
        };

        let translation = rigid_body.translation();
        let linvel = rigid_body.linvel();
        Some(BodyView {
            handle,
            position: Vec2::new(translation.x, translation.y),
            angle: rigid_body.rotation().angle(),
            velocity: Vec2::new(linvel.x, linvel.y),
            is_static: rigid_body.is_fixed(),
            shape,
            material: entry.material,
            tag: entry.tag,
            compound_id: entry.compound_id,
        })
    }

    fn constraint_compound(&self, handle: ConstraintHandle) -> Option<u32> {
        self.constraints.get(&handle)?.compound_id
    }

    fn set_body_position(&mut self, handle: BodyHandle, position: Vec2) {
        if let Some(rigid_body) = self.rigid_body_mut(handle) {
            let angle = rigid_body.rotation().angle();
            rigid_body.set_position(Isometry::new(vector![position.x, position.y], angle), true);
        }
    }

    fn set_body_angle(&mut self, handle: BodyHandle, angle: f32) {
        if let Some(rigid_body) = self.rigid_body_mut(handle) {
            let translation = *rigid_body.translation();
            rigid_body.set_position(Isometry::new(translation, angle), true);
        }
    }

    fn set_body_velocity(&mut self, handle: BodyHandle, velocity: Vec2) {
        if let Some(rigid_body) = self.rigid_body_mut(handle) {
            rigid_body.set_linvel(vector![velocity.x, velocity.y], true);
            rigid_body.set_angvel(0.0, true);
        }
    }

    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2) {
        if let Some(rigid_body) = self.rigid_body_mut(handle) {
            rigid_body.apply_impulse(vector![impulse.x, impulse.y], true);
        }
    }

    fn bodies_at(&self, point: Vec2, candidates: &[BodyHandle]) -> Vec<BodyHandle> {
        let point = point![point.x, point.y];
        candidates
            .iter()
            .copied()
            .filter(|handle| {
                let Some(entry) = self.bodies.get(handle) else {
                    return false;
                };
                // Collider poses only catch up on the next step; a body moved
                // by reset is already where its rigid body says
                match (
                    self.rigid_body_set.get(entry.rigid_body),
                    self.collider_set.get(entry.collider),
                ) {
                    (Some(rigid_body), Some(collider)) => collider
                        .shape()
                        .contains_point(rigid_body.position(), &point),
                    _ => false,
                }
            })
            .collect()
    }

    fn step(&mut self, dt: f32) -> Vec<CollisionStart> {
        self.integration_params.dt = dt;

        // Contact begins inside the step, so the approach speed is the one
        // before the solver resolves it
        let velocities: HashMap<RigidBodyHandle, Vector<Real>> = self
            .rigid_body_set
            .iter()
            .map(|(handle, rigid_body)| (handle, *rigid_body.linvel()))
            .collect();

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );

        let velocity_of = |handle: BodyHandle| -> Vector<Real> {
            self.bodies
                .get(&handle)
                .and_then(|entry| velocities.get(&entry.rigid_body))
                .copied()
                .unwrap_or_else(|| vector![0.0, 0.0])
        };

        let mut collisions = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(h1, h2, _flags) = event {
                let a = self.collider_to_body.get(&h1).copied();
                let b = self.collider_to_body.get(&h2).copied();
                if let (Some(a), Some(b)) = (a, b) {
                    let relative_speed = (velocity_of(a) - velocity_of(b)).norm();
                    collisions.push(CollisionStart {
                        a,
                        b,
                        relative_speed,
                    });
                }
            }
        }

        // Channel delivery order is not stable
        collisions.sort_by_key(|c| (c.a.min(c.b), c.a.max(c.b)));
        collisions
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}
