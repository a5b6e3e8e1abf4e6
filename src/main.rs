//! Tumble Lab entry point
//!
//! Native: builds a small contraption (or loads a saved one by name), runs it
//! headless and reports the score. Web: sets up logging; the page drives the
//! sandbox through `SandboxHandle`.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    tumble_lab::platform::init_logging();
    log::info!("Tumble Lab starting...");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use tumble_lab::persistence::FileStore;
    use tumble_lab::platform::status;
    use tumble_lab::{Sandbox, Settings};

    tumble_lab::platform::init_logging();
    log::info!("Tumble Lab (native) starting...");

    let settings = Settings::load();
    let mut store = match FileStore::open(&settings.storage_path) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Cannot open design store: {}", e);
            std::process::exit(1);
        }
    };
    let mut sandbox = Sandbox::with_settings(settings);

    match std::env::args().nth(1) {
        Some(name) => {
            let line = status(sandbox.load(&store, &name), |n| {
                format!("Loaded '{}' ({} objects)", name, n)
            });
            log::info!("{}", line);
        }
        None => {
            build_demo(&mut sandbox);
            let line = status(sandbox.save(&mut store, "demo"), |summary| {
                format!("Saved '{}' ({} objects)", summary.name, summary.object_count)
            });
            log::info!("{}", line);
        }
    }

    run_headless(&mut sandbox);
}

/// A ramp feeding a ball toward the target, plus some clutter for variety
#[cfg(not(target_arch = "wasm32"))]
fn build_demo(sandbox: &mut tumble_lab::Sandbox<tumble_lab::sim::RapierWorld>) {
    use tumble_lab::EntityKind;
    use tumble_lab::platform::status;

    let target = sandbox.settings().target;
    let steps = [
        (EntityKind::Ramp, target.x - 3.0, target.y + 3.0),
        (EntityKind::Ball, target.x - 3.8, target.y + 4.5),
        (EntityKind::Platform, target.x - 9.0, target.y),
        (EntityKind::Domino, target.x - 10.0, target.y + 0.6),
        (EntityKind::Domino, target.x - 9.0, target.y + 0.6),
        (EntityKind::Seesaw, target.x + 4.0, target.y),
        (EntityKind::Box, target.x + 5.0, target.y + 2.0),
    ];
    for (kind, x, y) in steps {
        let line = status(sandbox.place(kind, x, y), |_| format!("Placed {}", kind));
        log::info!("{}", line);
    }

    // Exercise history: drop the last box and bring it back
    let undo = status(sandbox.undo(), |step| format!("Undid {}", step.entity));
    let redo = status(sandbox.redo(), |step| format!("Redid {}", step.entity));
    log::info!("{} / {}", undo, redo);
}

#[cfg(not(target_arch = "wasm32"))]
fn run_headless(sandbox: &mut tumble_lab::Sandbox<tumble_lab::sim::RapierWorld>) {
    use tumble_lab::consts::SIM_DT;
    use tumble_lab::sim::SandboxEvent;

    /// Give up after this much simulated time
    const TIME_LIMIT: f32 = 20.0;

    if let Err(e) = sandbox.run() {
        log::error!("{}", e);
        return;
    }

    while sandbox.is_running() && sandbox.telemetry().elapsed < TIME_LIMIT {
        for event in sandbox.advance(SIM_DT) {
            match event {
                SandboxEvent::Detonated { position, .. } => {
                    log::info!("Boom at ({:.2}, {:.2})", position.x, position.y)
                }
                SandboxEvent::TargetHit(report) => {
                    let b = report.breakdown;
                    println!(
                        "Target hit after {:.2}s: {} points, {} stars",
                        sandbox.telemetry().elapsed,
                        report.total,
                        report.stars
                    );
                    println!(
                        "  base {} + efficiency {} + speed {} + variety {}, x{:.2}",
                        b.base,
                        b.efficiency,
                        b.speed,
                        b.variety,
                        b.multiplier()
                    );
                }
                SandboxEvent::Collision(_) => {}
            }
        }
    }

    if sandbox.last_score().is_none() {
        println!(
            "No hit within {:.0}s ({} collisions)",
            TIME_LIMIT,
            sandbox.telemetry().collisions
        );
    }
    sandbox.reset();
}
