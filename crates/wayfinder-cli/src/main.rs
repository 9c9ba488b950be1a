//! `wayfinder-cli` – Wayfinder demo entry point.
//!
//! This binary wires the full sensing core against the simulated scene and
//! walks a virtual user down a corridor:
//!
//! 1. Loads `~/.wayfinder/config.toml` (defaults when absent) and applies
//!    `WAYFINDER_*` environment overrides.
//! 2. Validates the configuration; an out-of-range parameter is fatal and
//!    the scheduler never starts.
//! 3. Builds a corridor [`SimScene`] with static walls, a doorway, and a
//!    movable obstacle, then runs the [`RefreshScheduler`] over it while
//!    printing every marker event.
//! 4. Intercepts **Ctrl-C** to clear all markers and exit cleanly.

mod config;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::Colorize;
use tracing::warn;

use wayfinder_runtime::{MarkerBus, RefreshScheduler, ScanConfig, bus};
use wayfinder_spatial::{SimBatchCaster, SimScene};
use wayfinder_types::{HeadPose, MarkerEvent, SurfaceCategory, Vec3};

#[tokio::main]
async fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // Initialise tracing-subscriber using RUST_LOG (defaults to "info").
    // Set WAYFINDER_LOG_FORMAT=json to emit newline-delimited JSON logs for
    // log aggregators. User-facing demo output still uses println!.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("WAYFINDER_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = ScanConfig::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  No config found; defaults written to {}",
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("  {}: {}", "Could not write default config".yellow(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            ScanConfig::default()
        }
    };

    // Configuration errors are fatal: surface them and refuse to start.
    if let Err(e) = cfg.validate() {
        eprintln!("{} {}", "✗".red().bold(), e.to_string().red());
        std::process::exit(1);
    }

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – shutting down …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Simulated environment ─────────────────────────────────────────────
    // A 40 m corridor along +z: walls at x = ±2, a crate at z = 8, and a
    // light movable bin at z = 14.
    let scene = SimScene::new()
        .with_floor(0.0)
        .with_ceiling(3.0)
        .with_wall_x(2.0, 80.0, 3.0)
        .with_wall_x(-2.0, 80.0, 3.0)
        .with_wall_z(40.0, 10.0, 3.0)
        .with_tagged_box(Vec3::new(0.5, 0.0, 8.0), Vec3::new(1.5, 1.2, 9.0), "crate")
        .with_movable_box(Vec3::new(-1.5, 0.0, 14.0), Vec3::new(-0.8, 1.0, 14.7), 3.0);

    let bus = MarkerBus::default();
    let mut events = bus.subscribe();

    let mut scheduler = match RefreshScheduler::new(cfg, Arc::new(scene.clone())) {
        Ok(s) => s
            .with_batch_caster(Arc::new(SimBatchCaster::new(scene)))
            .with_sink(bus.sink()),
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e.to_string().red());
            std::process::exit(1);
        }
    };

    // ── Walkthrough ───────────────────────────────────────────────────────
    println!("  Walking a simulated user down the corridor. {}", "Ctrl-C to stop.".dimmed());
    println!();

    let start = HeadPose {
        position: Vec3::new(0.0, 1.6, 0.0),
        forward: Vec3::new(0.0, 0.0, 1.0),
    };
    scheduler.enable(start).await;

    const DT: f32 = 0.05;
    const WALK_SPEED: f32 = 1.0; // m/s along +z
    let mut z = 0.0f32;
    for _ in 0..600 {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        z += WALK_SPEED * DT;
        let pose = HeadPose {
            position: Vec3::new(0.0, 1.6, z),
            forward: Vec3::new(0.0, 0.0, 1.0),
        };
        scheduler.update(pose, DT).await;

        for event in bus::drain(&mut events) {
            print_event(&event, z);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    println!();
    println!(
        "  Walk finished at z = {:.1} m: {} cycles, {} live markers.",
        z,
        scheduler.cycles_started().to_string().bold(),
        scheduler.marker_count().to_string().bold()
    );

    scheduler.disable().await;
    for event in bus::drain(&mut events) {
        print_event(&event, z);
    }
    println!("{}", "  ✓ Markers cleared. Exiting.".green());
}

// ─────────────────────────────────────────────────────────────────────────────
// Output helpers
// ─────────────────────────────────────────────────────────────────────────────

fn print_event(event: &MarkerEvent, z: f32) {
    match event {
        MarkerEvent::Placed(marker) => {
            let label = category_label(marker.category);
            println!(
                "  [{z:5.1} m] {} {} at ({:.1}, {:.1}, {:.1})  importance {:.2}",
                "+".green().bold(),
                label,
                marker.position.x,
                marker.position.y,
                marker.position.z,
                marker.importance,
            );
        }
        MarkerEvent::Removed(id) => {
            println!("  [{z:5.1} m] {} marker {}", "-".red().bold(), id.0.to_string().dimmed());
        }
        MarkerEvent::Cleared => {
            println!("  [{z:5.1} m] {} all markers cleared", "×".yellow().bold());
        }
        MarkerEvent::StyleChanged { proximity, spotlight } => {
            println!(
                "  [{z:5.1} m] style changed: proximity={proximity} spotlight={spotlight}"
            );
        }
    }
}

fn category_label(category: SurfaceCategory) -> colored::ColoredString {
    match category {
        SurfaceCategory::Wall => "wall".cyan(),
        SurfaceCategory::Floor => "floor".normal(),
        SurfaceCategory::Ceiling => "ceiling".normal(),
        SurfaceCategory::Overhead => "overhead".magenta(),
        SurfaceCategory::GroundLevel => "ground".blue(),
        SurfaceCategory::Dynamic => "dynamic".yellow(),
    }
}

fn print_banner() {
    println!();
    println!("{}", r#" _    _             __ _           _           "#.bold().cyan());
    println!("{}", r#"| |  | |           / _(_)         | |          "#.bold().cyan());
    println!("{}", r#"| |  | | __ _ _   _| |_ _ _ __   __| | ___ _ __ "#.bold().cyan());
    println!("{}", r#"| |/\| |/ _` | | | |  _| | '_ \ / _` |/ _ \ '__|"#.bold().cyan());
    println!("{}", r#"\  /\  / (_| | |_| | | | | | | | (_| |  __/ |   "#.bold().cyan());
    println!("{}", r#" \/  \/ \__,_|\__, |_| |_|_| |_|\__,_|\___|_|   "#.bold().cyan());
    println!("{}", r#"               __/ |                            "#.bold().cyan());
    println!("{}", r#"              |___/                             "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Wayfinder".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Obstacle scanning core – simulated walkthrough");
    println!();
}
