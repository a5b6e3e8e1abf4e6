//! Simulation-side object lifecycle
//!
//! Everything that decides what exists in the physics world lives here:
//! - `factory`: kind + pose to body/constraint descriptions
//! - `world`/`rapier`: the engine seam and its rapier2d implementation
//! - `registry`: what the user placed and what kind each body is
//! - `seesaw`: the only writer of seesaw parts
//! - `history`: undo/redo log
//! - `clock`, `score`: run control, telemetry and scoring
//! - `sandbox`: the context object tying it together
//!
//! No rendering or platform dependencies.

pub mod clock;
pub mod factory;
pub mod history;
pub mod rapier;
pub mod registry;
pub mod sandbox;
pub mod score;
pub mod seesaw;
pub mod world;

pub use clock::{SimClock, Telemetry};
pub use factory::{BodyTag, EntityKind, Material, Shape};
pub use history::{Action, ActionHistory, ActionKind, MAX_HISTORY, Target};
pub use rapier::RapierWorld;
pub use registry::{EntityRegistry, infer_kind};
pub use sandbox::{HistoryStep, Sandbox, SandboxError, SandboxEvent};
pub use score::{ScoreBreakdown, ScoreReport};
pub use seesaw::{Seesaw, SeesawManager};
pub use world::{BodyHandle, BodyView, CollisionStart, ConstraintHandle, World};
