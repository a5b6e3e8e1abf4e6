//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Logger setup (console on web, env_logger on native)
//! - Status lines for the UI
//! - JS bindings to the sandbox (web only)

use crate::sim::SandboxError;

/// Install the logger for the current target
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialized".into());
    }
}

/// Install the logger for the current target
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Status line for a UI operation: `ok` formats success, the error's own
/// message covers rejection
pub fn status<T>(result: Result<T, SandboxError>, ok: impl FnOnce(T) -> String) -> String {
    match result {
        Ok(value) => ok(value),
        Err(e) => {
            log::debug!("Rejected: {}", e);
            e.to_string()
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod web {
    use serde_json::json;
    use wasm_bindgen::prelude::*;

    use super::status;
    use crate::Settings;
    use crate::persistence::{LocalStorageStore, StoreError};
    use crate::sim::{
        EntityKind, RapierWorld, Sandbox, SandboxError, SandboxEvent, Shape, World, infer_kind,
    };

    fn unavailable() -> SandboxError {
        StoreError::Unavailable("LocalStorage is disabled".to_string()).into()
    }

    /// The sandbox as seen from JS. Every action returns a status line.
    #[wasm_bindgen]
    pub struct SandboxHandle {
        sandbox: Sandbox<RapierWorld>,
        store: Option<LocalStorageStore>,
    }

    #[wasm_bindgen]
    impl SandboxHandle {
        #[wasm_bindgen(constructor)]
        pub fn new() -> SandboxHandle {
            let store = match LocalStorageStore::open() {
                Ok(store) => Some(store),
                Err(e) => {
                    log::warn!("Saving disabled: {}", e);
                    None
                }
            };
            SandboxHandle {
                sandbox: Sandbox::with_settings(Settings::load()),
                store,
            }
        }

        pub fn place(&mut self, tag: &str, x: f32, y: f32) -> String {
            status(self.sandbox.place_tag(tag, x, y), |_| format!("Placed {}", tag))
        }

        pub fn delete_at(&mut self, x: f32, y: f32) -> String {
            status(self.sandbox.delete_at(x, y), |kind| format!("Deleted {}", kind))
        }

        pub fn undo(&mut self) -> String {
            status(self.sandbox.undo(), |step| format!("Undid {}", step.entity))
        }

        pub fn redo(&mut self) -> String {
            status(self.sandbox.redo(), |step| format!("Redid {}", step.entity))
        }

        pub fn run(&mut self) -> String {
            status(self.sandbox.run(), |_| "Running".to_string())
        }

        pub fn toggle_pause(&mut self) -> String {
            status(self.sandbox.toggle_pause(), |paused| {
                if paused { "Paused" } else { "Resumed" }.to_string()
            })
        }

        pub fn toggle_slow_motion(&mut self) -> String {
            if self.sandbox.toggle_slow_motion() {
                "Slow motion on".to_string()
            } else {
                "Slow motion off".to_string()
            }
        }

        pub fn reset(&mut self) -> String {
            self.sandbox.reset();
            "Reset".to_string()
        }

        pub fn clear_all(&mut self) -> String {
            status(self.sandbox.clear_all(), |n| format!("Cleared {} objects", n))
        }

        /// Advance by a frame; returns a status line when the target is hit
        pub fn advance(&mut self, dt: f32) -> Option<String> {
            self.sandbox
                .advance(dt)
                .into_iter()
                .find_map(|event| match event {
                    SandboxEvent::TargetHit(report) => Some(format!(
                        "Target hit! {} points, {} stars",
                        report.total, report.stars
                    )),
                    _ => None,
                })
        }

        pub fn save(&mut self, name: &str) -> String {
            let result = match self.store.as_mut() {
                Some(store) => self.sandbox.save(store, name),
                None => Err(unavailable()),
            };
            status(result, |summary| format!("Saved '{}'", summary.name))
        }

        pub fn load(&mut self, name: &str) -> String {
            let result = match self.store.as_ref() {
                Some(store) => self.sandbox.load(store, name),
                None => Err(unavailable()),
            };
            status(result, |n| format!("Loaded {} objects", n))
        }

        pub fn delete_saved(&mut self, name: &str) -> String {
            let result = match self.store.as_mut() {
                Some(store) => self.sandbox.delete_saved(store, name),
                None => Err(unavailable()),
            };
            status(result, |_| format!("Deleted '{}'", name.trim()))
        }

        /// JSON array of `{name, timestamp, objects}`, newest first
        pub fn list_saved(&self) -> String {
            let Some(store) = self.store.as_ref() else {
                return "[]".to_string();
            };
            match self.sandbox.list_saved(store) {
                Ok(listing) => json!(
                    listing
                        .iter()
                        .map(|s| json!({
                            "name": s.name,
                            "timestamp": s.timestamp,
                            "objects": s.object_count,
                        }))
                        .collect::<Vec<_>>()
                )
                .to_string(),
                Err(e) => {
                    log::warn!("Could not list designs: {}", e);
                    "[]".to_string()
                }
            }
        }

        /// JSON array of live bodies for the renderer, target first
        pub fn bodies(&self) -> String {
            let world = self.sandbox.world();
            let target = self.sandbox.target();
            let mut handles = vec![target];
            handles.extend(self.sandbox.registry().handles());

            let bodies: Vec<_> = handles
                .into_iter()
                .filter_map(|handle| world.body(handle))
                .map(|view| {
                    let kind = if view.handle == target {
                        "target"
                    } else {
                        infer_kind(&view).as_str()
                    };
                    let (width, height) = match view.shape {
                        Shape::Circle { radius } => (radius * 2.0, radius * 2.0),
                        Shape::Rect { width, height } => (width, height),
                    };
                    json!({
                        "kind": kind,
                        "x": view.position.x,
                        "y": view.position.y,
                        "angle": view.angle,
                        "circle": matches!(view.shape, Shape::Circle { .. }),
                        "width": width,
                        "height": height,
                    })
                })
                .collect();
            json!(bodies).to_string()
        }

        pub fn kinds(&self) -> String {
            json!(EntityKind::ALL.iter().map(|k| k.as_str()).collect::<Vec<_>>()).to_string()
        }

        pub fn can_undo(&self) -> bool {
            self.sandbox.can_undo()
        }

        pub fn can_redo(&self) -> bool {
            self.sandbox.can_redo()
        }

        pub fn is_running(&self) -> bool {
            self.sandbox.is_running()
        }

        pub fn entity_count(&self) -> usize {
            self.sandbox.entity_count()
        }

        pub fn elapsed(&self) -> f32 {
            self.sandbox.telemetry().elapsed
        }

        pub fn collisions(&self) -> u32 {
            self.sandbox.telemetry().collisions
        }
    }

    impl Default for SandboxHandle {
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::SandboxHandle;
