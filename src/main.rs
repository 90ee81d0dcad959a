//! Greenhouse controller: host runner.
//!
//! Runs the full control loop against the simulated greenhouse.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimulatedGreenhouse  LogEventSink  SharedSetpoints  SysClock  │
//! │  (Sensor+Actuator)    (EventSink)   (Setpoints)      (Clock)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              ControlLoop (pure logic)                  │    │
//! │  │  Health · Aggregator · Policy · Sequencer              │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Environment:
//! - `GREENHOUSE_CONFIG`: TOML file with `[setpoints]` and `[control]`
//!   tables (default `greenhouse.toml`; missing file = defaults).
//! - `GREENHOUSE_CYCLES`: stop after this many cycles (default 0 = until
//!   SIGINT/SIGTERM).
//! - `RUST_LOG`: log filter (default `info`).

#![deny(unused_must_use)]

use std::path::Path;
use std::time::Duration;
use std::{env, fs};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Deserialize;
use tokio::time::{self, MissedTickBehavior};

use greenhouse::adapters::log_sink::LogEventSink;
use greenhouse::adapters::setpoints::SharedSetpoints;
use greenhouse::adapters::sim::SimulatedGreenhouse;
use greenhouse::adapters::time::SystemClock;
use greenhouse::app::service::ControlLoop;
use greenhouse::config::{ControlConfig, Setpoints};

const DEFAULT_CONFIG_PATH: &str = "greenhouse.toml";

/// On-disk configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    setpoints: Setpoints,
    control: ControlConfig,
    /// Added to UTC to get the local hour for the lighting window.
    utc_offset_hours: i8,
}

fn load_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return Ok(FileConfig::default());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: FileConfig =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    info!("Config loaded from {}", path.display());
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Greenhouse controller v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let path = env::var("GREENHOUSE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let file = load_config(Path::new(&path))?;
    let setpoints = SharedSetpoints::new(file.setpoints)
        .with_context(|| format!("invalid setpoints in {}", path))?;
    let cycles: u64 = match env::var("GREENHOUSE_CYCLES") {
        Ok(v) => v.parse().context("GREENHOUSE_CYCLES must be an integer")?,
        Err(_) => 0,
    };
    let interval_ms = file.control.control_interval_ms.max(1);

    // ── 3. Adapters ───────────────────────────────────────────
    let mut runner = Runner {
        app: ControlLoop::new(file.control),
        hw: SimulatedGreenhouse::new(),
        clock: SystemClock::new(file.utc_offset_hours),
        setpoints,
        sink: LogEventSink::new(),
    };

    // ── 4. Control loop ───────────────────────────────────────
    runner.start();
    runner.run(interval_ms, cycles, shutdown_signal()).await
}

/// The control loop wired to its host adapters.
struct Runner {
    app: ControlLoop,
    hw: SimulatedGreenhouse,
    clock: SystemClock,
    setpoints: SharedSetpoints,
    sink: LogEventSink,
}

impl Runner {
    fn start(&mut self) {
        self.app.start(&mut self.hw, &self.clock, &mut self.sink);
    }

    /// Tick every `interval_ms` until `cycles` have run (0 = no limit) or
    /// `shutdown` resolves, then switch every relay off.
    async fn run(
        &mut self,
        interval_ms: u64,
        cycles: u64,
        shutdown: impl Future<Output = &'static str>,
    ) -> Result<()> {
        tokio::pin!(shutdown);

        let mut ticker = time::interval(Duration::from_millis(interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut n: u64 = 0;
        let exit_reason = loop {
            if cycles != 0 && n >= cycles {
                break "cycle limit";
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.hw.step(interval_ms);
                    let report =
                        self.app.tick(&mut self.hw, &self.clock, &self.setpoints, &mut self.sink);
                    if !report.applied.is_ok() || !report.expired.is_ok() {
                        warn!("Cycle {}: actuator writes failed, retrying next cycle", report.tick);
                    }
                    n += 1;
                }
                reason = &mut shutdown => break reason,
            }
        };

        // ── 5. Safe shutdown ──────────────────────────────────
        info!("Stopping after {} cycles ({})", n, exit_reason);
        for d in self.app.device_summary() {
            info!(
                "{}: present={} status={:?} errors={}",
                d.device, d.present, d.status, d.consecutive_errors
            );
        }
        self.app
            .shutdown(&mut self.hw, &self.clock, &mut self.sink)
            .context("relays could not all be switched off")
    }
}

/// Resolves on SIGINT or SIGTERM with the signal's name.
async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c() => "SIGINT",
                    _ = sigterm.recv() => "SIGTERM",
                }
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                ctrl_c().await;
                "SIGINT"
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c().await;
        "SIGINT"
    }
}

/// Waits for Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}
