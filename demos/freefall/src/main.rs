//! Falling-body demo.
//!
//! Three systems over two falling entities and one constants entity:
//!
//! - `gravity` accelerates anything with a `vy` using the `g` constant.
//! - `inertia` integrates position from velocity.
//! - `output` is suspendable: it skips 24 of every 25 ticks per entity,
//!   then logs the entity's position — the continuation protocol standing
//!   in for a frame limiter.

use anyhow::Result;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ensemble_runtime::{
    Continuation, Entity, Metasystem, Step, System, TickConfig, TickLoop, World,
};

/// Fixed timestep, 25 ticks per simulated second.
const DT: f64 = 0.04;

/// Suspends for `remaining` ticks, then logs the bound entity's position.
struct Throttled {
    remaining: u32,
}

impl Continuation for Throttled {
    fn advance(&mut self, world: &mut World, args: &[Entity]) -> Step {
        if self.remaining > 0 {
            self.remaining -= 1;
            return Step::Pending;
        }
        let subject = args[0];
        info!(
            name = world.get_str(subject, "name").unwrap_or("?"),
            x = world.get_f64(subject, "x").unwrap_or(0.0),
            y = world.get_f64(subject, "y").unwrap_or(0.0),
            "position"
        );
        Step::Done
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("freefall=info".parse()?))
        .init();

    let mut ms = Metasystem::new();

    ms.add_system(
        System::builder("gravity")
            .role("object", ["vy"])
            .role("constants", ["g"])
            .process(|world, args| {
                let g = world.get_f64(args[1], "g").unwrap_or(0.0);
                let vy = world.get_f64(args[0], "vy").unwrap_or(0.0);
                world.set_attribute(args[0], "vy", json!(vy + g * DT)).ok();
            }),
    );

    ms.add_system(
        System::builder("inertia")
            .role("object", ["x", "y", "vx", "vy"])
            .process(|world, args| {
                let object = args[0];
                let x = world.get_f64(object, "x").unwrap_or(0.0);
                let y = world.get_f64(object, "y").unwrap_or(0.0);
                let vx = world.get_f64(object, "vx").unwrap_or(0.0);
                let vy = world.get_f64(object, "vy").unwrap_or(0.0);
                world.set_attribute(object, "x", json!(x + vx * DT)).ok();
                world.set_attribute(object, "y", json!(y + vy * DT)).ok();
            }),
    );

    ms.add_system(
        System::builder("output")
            .role("object", ["name", "x", "y"])
            .suspendable(|_| -> Box<dyn Continuation> { Box::new(Throttled { remaining: 24 }) }),
    );

    ms.create([
        ("name", json!("falling_guy1")),
        ("x", json!(0.0)),
        ("y", json!(0.0)),
        ("vx", json!(0.0)),
        ("vy", json!(0.0)),
    ]);
    ms.create([
        ("name", json!("falling_guy2")),
        ("x", json!(100.0)),
        ("y", json!(0.0)),
        ("vx", json!(0.0)),
        ("vy", json!(0.0)),
    ]);
    ms.create([("g", json!(10.0))]);

    let config = TickConfig {
        tick_rate: 1.0 / DT,
        max_ticks: 250, // ten simulated seconds
    };
    let mut tick_loop = TickLoop::new(ms, config);
    tick_loop.run();

    Ok(())
}
