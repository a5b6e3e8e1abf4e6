//! Sandbox context
//!
//! `Sandbox` owns one world and everything layered on it: the registry, the
//! seesaw manager, the undo/redo log, the clock and the run telemetry. Every
//! UI action goes through a method here, and every rejection comes back as a
//! `SandboxError` whose message is meant for the status line. A rejected call
//! leaves the sandbox exactly as it was.

use std::collections::BTreeSet;

use glam::Vec2;
use thiserror::Error;

use super::clock::{SimClock, Telemetry};
use super::factory::{self, BodyTag, EntityKind};
use super::history::{Action, ActionHistory, ActionKind, Target};
use super::rapier::RapierWorld;
use super::registry::{EntityRegistry, infer_kind};
use super::score::{self, ScoreInput, ScoreReport};
use super::seesaw::SeesawManager;
use super::world::{BodyHandle, CollisionStart, World};
use crate::consts::*;
use crate::persistence::{self, DesignStore, PersistError, SavedSummary, Spawn, StoreError};
use crate::{Pose, Settings, normalize_angle};

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Stop the simulation first")]
    SimulationRunning,
    #[error("Simulation is already running")]
    AlreadyRunning,
    #[error("Simulation is not running")]
    NotRunning,
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Nothing to redo")]
    NothingToRedo,
    #[error("Nothing to delete here")]
    NothingHere,
    #[error("Unknown object type '{0}'")]
    UnknownKind(String),
    #[error("Position is not a finite coordinate")]
    InvalidPosition,
    #[error("Could not place {0}")]
    PlacementFailed(EntityKind),
    #[error("Nothing to save")]
    NothingToSave,
    #[error("No saved design named '{0}'")]
    NotFound(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one undo or redo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStep {
    pub kind: ActionKind,
    pub entity: EntityKind,
    /// False when the entry's object was already gone and nothing changed
    pub applied: bool,
}

/// Something that happened while advancing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SandboxEvent {
    Collision(CollisionStart),
    Detonated { handle: BodyHandle, position: Vec2 },
    TargetHit(ScoreReport),
}

/// World plus the bookkeeping that must change in step with it
#[derive(Debug)]
struct Stage<W: World> {
    world: W,
    registry: EntityRegistry,
    seesaws: SeesawManager,
}

impl<W: World> Stage<W> {
    /// Create one entity. `compound_id` is only read for seesaws.
    fn spawn(&mut self, kind: EntityKind, pose: Pose, compound_id: Option<u32>) -> Option<Target> {
        match factory::body_desc(kind, pose) {
            Some(desc) => {
                let handle = self.world.add_body(&desc);
                self.registry.add(handle, desc.pose);
                Some(Target::Body(handle))
            }
            None => self
                .seesaws
                .create(&mut self.world, &mut self.registry, pose.position, compound_id)
                .map(Target::Seesaw),
        }
    }

    /// Remove an entity. Returns false if it was already gone.
    fn despawn(&mut self, target: &Target) -> bool {
        match *target {
            Target::Body(handle) => {
                let in_world = self.world.remove_body(handle);
                let in_registry = self.registry.remove(handle);
                in_world || in_registry
            }
            Target::Seesaw(seesaw) => {
                self.seesaws
                    .remove(&mut self.world, &mut self.registry, seesaw.id)
                    > 0
            }
        }
    }

    /// Bring an action's object back, pointing the entry at the new handles
    fn respawn(&mut self, action: &mut Action) -> bool {
        let compound_id = match action.target {
            Target::Seesaw(seesaw) => Some(seesaw.id),
            Target::Body(_) => None,
        };
        match self.spawn(action.entity, action.pose, compound_id) {
            Some(target) => {
                action.target = target;
                true
            }
            None => false,
        }
    }

    fn revert(&mut self, action: &mut Action) -> bool {
        match action.kind {
            ActionKind::Place => self.despawn(&action.target),
            ActionKind::Delete => self.respawn(action),
        }
    }

    fn apply(&mut self, action: &mut Action) -> bool {
        match action.kind {
            ActionKind::Place => self.respawn(action),
            ActionKind::Delete => self.despawn(&action.target),
        }
    }

    /// Remove every placed entity. Returns how many bodies went.
    fn clear(&mut self) -> usize {
        let count = self.registry.len();

        let compound_ids: BTreeSet<u32> = self
            .registry
            .handles()
            .into_iter()
            .filter_map(|handle| SeesawManager::id_of(&self.world, handle))
            .collect();
        for id in compound_ids {
            self.seesaws.remove(&mut self.world, &mut self.registry, id);
        }

        for constraint in self.registry.constraints().to_vec() {
            self.world.remove_constraint(constraint);
        }
        for handle in self.registry.handles() {
            self.world.remove_body(handle);
        }
        self.registry.clear();
        count
    }
}

/// Run one history step. Also reports the old and new target when the step
/// re-created the entry's object, so other entries naming it can follow.
fn replay<W: World>(
    stage: &mut Stage<W>,
    action: &mut Action,
    step: fn(&mut Stage<W>, &mut Action) -> bool,
) -> (HistoryStep, Option<(Target, Target)>) {
    let before = action.target;
    let applied = step(stage, action);
    let moved = (action.target != before).then_some((before, action.target));
    (
        HistoryStep {
            kind: action.kind,
            entity: action.entity,
            applied,
        },
        moved,
    )
}

/// One independent sandbox
#[derive(Debug)]
pub struct Sandbox<W: World> {
    stage: Stage<W>,
    history: ActionHistory,
    clock: SimClock,
    telemetry: Telemetry,
    settings: Settings,
    target: BodyHandle,
    last_score: Option<ScoreReport>,
}

impl Sandbox<RapierWorld> {
    /// Sandbox on a fresh rapier world
    pub fn with_settings(settings: Settings) -> Self {
        Self::new(RapierWorld::new(settings.gravity), settings)
    }
}

impl Default for Sandbox<RapierWorld> {
    fn default() -> Self {
        Self::with_settings(Settings::default())
    }
}

impl<W: World> Sandbox<W> {
    /// Wrap an empty world and add the target to it
    pub fn new(mut world: W, settings: Settings) -> Self {
        let target = world.add_body(&factory::target_desc(settings.target));
        log::info!(
            "Sandbox ready, target at ({:.2}, {:.2})",
            settings.target.x,
            settings.target.y
        );

        Self {
            stage: Stage {
                world,
                registry: EntityRegistry::new(),
                seesaws: SeesawManager::new(),
            },
            history: ActionHistory::new(settings.history_limit),
            clock: SimClock::new(settings.slow_motion_factor),
            telemetry: Telemetry::default(),
            settings,
            target,
            last_score: None,
        }
    }

    fn ensure_stopped(&self) -> Result<(), SandboxError> {
        if self.clock.is_running() {
            Err(SandboxError::SimulationRunning)
        } else {
            Ok(())
        }
    }

    // === Editing ===

    /// Place `kind` at its default angle
    pub fn place(&mut self, kind: EntityKind, x: f32, y: f32) -> Result<Target, SandboxError> {
        self.place_rotated(kind, x, y, kind.default_angle())
    }

    /// Place `kind` at an explicit angle. Seesaws ignore the angle.
    pub fn place_rotated(
        &mut self,
        kind: EntityKind,
        x: f32,
        y: f32,
        angle: f32,
    ) -> Result<Target, SandboxError> {
        self.ensure_stopped()?;
        if !(x.is_finite() && y.is_finite() && angle.is_finite()) {
            return Err(SandboxError::InvalidPosition);
        }

        let angle = if kind == EntityKind::Seesaw {
            0.0
        } else {
            normalize_angle(angle)
        };
        let pose = Pose::new(x, y, angle);
        let target = self
            .stage
            .spawn(kind, pose, None)
            .ok_or(SandboxError::PlacementFailed(kind))?;

        self.history.record(Action {
            kind: ActionKind::Place,
            entity: kind,
            pose,
            target,
        });
        log::debug!("Placed {} at ({:.2}, {:.2})", kind, x, y);
        Ok(target)
    }

    /// Place by type tag, as sent by the UI
    pub fn place_tag(&mut self, tag: &str, x: f32, y: f32) -> Result<Target, SandboxError> {
        let Some(kind) = EntityKind::from_tag(tag) else {
            log::warn!("Unknown entity type '{}'", tag);
            return Err(SandboxError::UnknownKind(tag.to_string()));
        };
        self.place(kind, x, y)
    }

    /// Delete the topmost entity under the point. A seesaw goes as a whole.
    pub fn delete_at(&mut self, x: f32, y: f32) -> Result<EntityKind, SandboxError> {
        self.ensure_stopped()?;

        let stage = &mut self.stage;
        let handle = stage
            .registry
            .entity_at(&stage.world, Vec2::new(x, y))
            .ok_or(SandboxError::NothingHere)?;
        let view = stage.world.body(handle).ok_or(SandboxError::NothingHere)?;
        let entity = infer_kind(&view);

        let (pose, target) = match view.compound_id {
            Some(id) => {
                let Some(seesaw) = stage.seesaws.find(&stage.world, &stage.registry, id) else {
                    // Incomplete compound: clear what is left, nothing to record
                    log::warn!("Seesaw {} is incomplete, removing remaining parts", id);
                    stage.seesaws.remove(&mut stage.world, &mut stage.registry, id);
                    return Ok(entity);
                };
                let pivot = stage
                    .world
                    .body(seesaw.pivot)
                    .map_or(view.position, |pivot| pivot.position);
                (
                    Pose {
                        position: pivot,
                        angle: 0.0,
                    },
                    Target::Seesaw(seesaw),
                )
            }
            None => (
                Pose {
                    position: view.position,
                    angle: view.angle,
                },
                Target::Body(handle),
            ),
        };

        stage.despawn(&target);
        self.history.record(Action {
            kind: ActionKind::Delete,
            entity,
            pose,
            target,
        });
        log::debug!("Deleted {} at ({:.2}, {:.2})", entity, x, y);
        Ok(entity)
    }

    /// Reverse the newest applied action.
    ///
    /// If the action's object was removed some other way in the meantime the
    /// step changes nothing, but the cursor still moves back.
    pub fn undo(&mut self) -> Result<HistoryStep, SandboxError> {
        self.ensure_stopped()?;
        let stage = &mut self.stage;
        let (step, moved) = self
            .history
            .undo_with(|action| replay(stage, action, Stage::revert))
            .ok_or(SandboxError::NothingToUndo)?;
        if let Some((from, to)) = moved {
            self.history.retarget(from, to);
        }

        if step.applied {
            log::debug!("Undid {:?} {}", step.kind, step.entity);
        } else {
            log::info!("Undo of {:?} {} had nothing left to change", step.kind, step.entity);
        }
        Ok(step)
    }

    /// Re-apply the oldest undone action
    pub fn redo(&mut self) -> Result<HistoryStep, SandboxError> {
        self.ensure_stopped()?;
        let stage = &mut self.stage;
        let (step, moved) = self
            .history
            .redo_with(|action| replay(stage, action, Stage::apply))
            .ok_or(SandboxError::NothingToRedo)?;
        if let Some((from, to)) = moved {
            self.history.retarget(from, to);
        }

        if step.applied {
            log::debug!("Redid {:?} {}", step.kind, step.entity);
        } else {
            log::info!("Redo of {:?} {} had nothing left to change", step.kind, step.entity);
        }
        Ok(step)
    }

    /// Remove everything and forget the history
    pub fn clear_all(&mut self) -> Result<usize, SandboxError> {
        self.ensure_stopped()?;
        let removed = self.stage.clear();
        self.history.clear();
        self.telemetry.reset();
        self.last_score = None;
        log::info!("Cleared {} objects", removed);
        Ok(removed)
    }

    // === Running ===

    pub fn run(&mut self) -> Result<(), SandboxError> {
        if self.clock.is_running() {
            return Err(SandboxError::AlreadyRunning);
        }
        self.telemetry.reset();
        self.last_score = None;
        self.clock.start();
        log::info!("Simulation started with {} objects", self.stage.registry.len());
        Ok(())
    }

    /// Returns whether the simulation is now paused
    pub fn toggle_pause(&mut self) -> Result<bool, SandboxError> {
        if !self.clock.is_running() {
            return Err(SandboxError::NotRunning);
        }
        let paused = self.clock.toggle_pause();
        log::info!("Simulation {}", if paused { "paused" } else { "resumed" });
        Ok(paused)
    }

    /// Returns whether slow motion is now on. Kept across runs.
    pub fn toggle_slow_motion(&mut self) -> bool {
        let slow = self.clock.toggle_slow_motion();
        log::info!("Slow motion {}", if slow { "on" } else { "off" });
        slow
    }

    /// Stop and put every entity back where it was placed. History is kept.
    pub fn reset(&mut self) {
        self.clock.stop();
        self.telemetry.reset();
        self.last_score = None;

        let Stage {
            world, registry, ..
        } = &mut self.stage;
        for placed in registry.entities() {
            world.set_body_position(placed.handle, placed.original.position);
            world.set_body_angle(placed.handle, placed.original.angle);
            world.set_body_velocity(placed.handle, Vec2::ZERO);
        }
        log::info!("Reset {} objects", registry.len());
    }

    /// Feed a frame's worth of wall time to the world
    pub fn advance(&mut self, frame_dt: f32) -> Vec<SandboxEvent> {
        let mut events = Vec::new();
        if !self.clock.is_running() {
            return events;
        }

        let frame_dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };
        self.telemetry.elapsed += frame_dt;

        let steps = self.clock.accumulate(frame_dt, SIM_DT, MAX_SUBSTEPS);
        for _ in 0..steps {
            for hit in self.stage.world.step(SIM_DT) {
                self.on_collision(hit, &mut events);
                if !self.clock.is_running() {
                    return events;
                }
            }
        }
        events
    }

    fn on_collision(&mut self, hit: CollisionStart, events: &mut Vec<SandboxEvent>) {
        self.telemetry.collisions += 1;
        events.push(SandboxEvent::Collision(hit));

        if hit.relative_speed >= self.settings.fuse_speed {
            for handle in [hit.a, hit.b] {
                if let Some(position) = self.detonate(handle) {
                    events.push(SandboxEvent::Detonated { handle, position });
                }
            }
        }

        if hit.involves(self.target)
            && hit.relative_speed >= self.settings.impact_speed
            && !self.telemetry.triggered()
        {
            let report = self.finish_run();
            events.push(SandboxEvent::TargetHit(report));
        }
    }

    /// Blow up a placed TNT crate: remove it and push dynamic bodies in range
    /// away from it. Returns the blast center, or `None` if `handle` is not a
    /// live TNT crate.
    ///
    /// The crate leaves without a history entry, so the entry that placed it
    /// goes stale and undoes as a no-op.
    pub fn detonate(&mut self, handle: BodyHandle) -> Option<Vec2> {
        let Stage {
            world, registry, ..
        } = &mut self.stage;
        if !registry.contains(handle) {
            return None;
        }
        let view = world.body(handle)?;
        if view.tag != BodyTag::Volatile {
            return None;
        }

        let center = view.position;
        world.remove_body(handle);
        registry.remove(handle);

        let mut pushed = 0;
        for placed in registry.entities() {
            let Some(body) = world.body(placed.handle) else {
                continue;
            };
            if body.is_static {
                continue;
            }
            let offset = body.position - center;
            let distance = offset.length();
            if distance >= BLAST_RADIUS {
                continue;
            }
            let falloff = 1.0 - distance / BLAST_RADIUS;
            let direction = offset.try_normalize().unwrap_or(Vec2::Y);
            world.apply_impulse(placed.handle, direction * BLAST_IMPULSE * falloff);
            pushed += 1;
        }

        log::info!(
            "TNT {} detonated at ({:.2}, {:.2}), {} bodies pushed",
            handle,
            center.x,
            center.y,
            pushed
        );
        Some(center)
    }

    /// Stop on a target hit and score the run once
    fn finish_run(&mut self) -> ScoreReport {
        self.telemetry.time_to_trigger = Some(self.telemetry.elapsed);
        self.clock.stop();

        let input = ScoreInput {
            triggered: true,
            entity_count: self.stage.registry.len(),
            elapsed_secs: self.telemetry.elapsed,
            distinct_kinds: self.stage.registry.distinct_kinds(&self.stage.world).len(),
            collisions: self.telemetry.collisions,
        };
        let report = score::score(&input);
        self.last_score = Some(report);

        log::info!(
            "Target hit after {:.2}s: {} points, {} stars",
            self.telemetry.elapsed,
            report.total,
            report.stars
        );
        report
    }

    // === Saved designs ===

    /// Store the current layout under `name`, replacing any design with
    /// the same name
    pub fn save(
        &self,
        store: &mut dyn DesignStore,
        name: &str,
    ) -> Result<SavedSummary, SandboxError> {
        self.ensure_stopped()?;
        let name = persistence::validate_name(name)?;
        if self.stage.registry.is_empty() {
            return Err(SandboxError::NothingToSave);
        }

        let design = persistence::capture(
            &self.stage.world,
            &self.stage.registry,
            &name,
            crate::now_millis(),
        );
        let json = persistence::encode(&design)?;
        store.put(&name, &json)?;

        log::info!("Saved design '{}' ({} objects)", name, design.objects.len());
        Ok(SavedSummary {
            name,
            timestamp: design.timestamp,
            object_count: design.objects.len(),
        })
    }

    /// Replace the layout with a saved design. Returns how many objects were
    /// created. Nothing is torn down until the design has been validated.
    pub fn load(&mut self, store: &dyn DesignStore, name: &str) -> Result<usize, SandboxError> {
        self.ensure_stopped()?;
        let name = persistence::validate_name(name)?;
        let json = store
            .get(&name)?
            .ok_or_else(|| SandboxError::NotFound(name.clone()))?;
        let design = persistence::decode(&json)?;
        let plan = persistence::restore_plan(&design)?;

        self.stage.clear();
        self.history.clear();
        self.telemetry.reset();
        self.last_score = None;

        let mut created = 0;
        for spawn in &plan.spawns {
            let spawned = match *spawn {
                Spawn::Body { kind, pose } => self.stage.spawn(kind, pose, None),
                Spawn::Seesaw { id, position } => self.stage.spawn(
                    EntityKind::Seesaw,
                    Pose {
                        position,
                        angle: 0.0,
                    },
                    Some(id),
                ),
            };
            match spawned {
                Some(_) => created += 1,
                None => log::warn!("Could not restore {:?} from '{}'", spawn, name),
            }
        }
        if let Some(max_id) = plan.max_compound_id {
            self.stage.seesaws.reserve_through(max_id);
        }

        log::info!("Loaded design '{}' ({} objects)", name, created);
        Ok(created)
    }

    pub fn delete_saved(
        &self,
        store: &mut dyn DesignStore,
        name: &str,
    ) -> Result<(), SandboxError> {
        let name = name.trim();
        if !store.remove(name)? {
            return Err(SandboxError::NotFound(name.to_string()));
        }
        log::info!("Deleted saved design '{}'", name);
        Ok(())
    }

    /// Saved designs, newest first
    pub fn list_saved(&self, store: &dyn DesignStore) -> Result<Vec<SavedSummary>, SandboxError> {
        Ok(persistence::summaries(store)?)
    }

    // === Accessors ===

    pub fn can_undo(&self) -> bool {
        !self.clock.is_running() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.clock.is_running() && self.history.can_redo()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    pub fn is_slow_motion(&self) -> bool {
        self.clock.is_slow_motion()
    }

    /// Live bodies; a seesaw counts twice
    pub fn entity_count(&self) -> usize {
        self.stage.registry.len()
    }

    pub fn last_score(&self) -> Option<ScoreReport> {
        self.last_score
    }

    pub fn telemetry(&self) -> Telemetry {
        self.telemetry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn world(&self) -> &W {
        &self.stage.world
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.stage.registry
    }

    pub fn history(&self) -> &ActionHistory {
        &self.history
    }

    pub fn target(&self) -> BodyHandle {
        self.target
    }

    /// Id the next freshly placed seesaw will get
    pub fn next_compound_id(&self) -> u32 {
        self.stage.seesaws.next_id()
    }
}
