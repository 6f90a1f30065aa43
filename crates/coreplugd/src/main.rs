//! coreplugd — the coreplug daemon.
//!
//! Wires the scaling controller to the local host:
//! - Unit control via sysfs CPU hotplug (or an in-memory pool)
//! - Load from `/proc/stat`
//! - REST control surface
//! - Unix signals: SIGUSR1 suspend, SIGUSR2 resume, SIGHUP activity
//!
//! # Usage
//!
//! ```text
//! coreplugd run --config /etc/coreplug.toml
//! coreplugd check-config --config /etc/coreplug.toml
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::{error, info, warn};

use coreplug_controller::sim::SimulatedPool;
use coreplug_controller::{CoreControl, LoadSource, ScalingController, SignalCoordinator};
use coreplug_core::PlugConfig;
use coreplug_host::procfs::{DEFAULT_LOAD_SCALE, DEFAULT_PROC_STAT};
use coreplug_host::sysfs::DEFAULT_SYSFS_ROOT;
use coreplug_host::{ProcStatLoad, SysfsCores};

const DEFAULT_LISTEN: &str = "127.0.0.1:8470";

#[derive(Parser)]
#[command(name = "coreplugd", about = "Adaptive CPU hotplug daemon", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the controller until Ctrl-C.
    Run {
        /// Path to coreplug.toml. Built-in defaults are used if omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Read real load but drive an in-memory pool instead of sysfs.
        #[arg(long)]
        simulate: bool,

        /// Override the API listen address.
        #[arg(long)]
        listen: Option<String>,
    },
    /// Validate a config file and print the effective ladder.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,coreplug=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            simulate,
            listen,
        } => run(config.as_deref(), simulate, listen).await,
        Command::CheckConfig { config } => check_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PlugConfig> {
    let config = match path {
        Some(p) => PlugConfig::from_file(p)
            .with_context(|| format!("loading config from {}", p.display()))?,
        None => PlugConfig::default(),
    };
    Ok(config)
}

fn check_config(path: &Path) -> anyhow::Result<()> {
    let config = load_config(Some(path))?;
    config.validate()?;

    let ladder = config.build_ladder()?;
    println!("config ok: {} units, {:?} mode, peak {}", ladder.units(), ladder.mode(), ladder.peak());
    for c in 1..=ladder.units() as usize {
        println!(
            "  band {c}: down[{}]={} up[{c}]={} down[{c}]={}",
            c - 1,
            ladder.down()[c - 1],
            ladder.up()[c],
            ladder.down()[c]
        );
    }
    Ok(())
}

async fn run(config_path: Option<&Path>, simulate: bool, listen: Option<String>) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "coreplug daemon starting");

    let mut config = load_config(config_path)?;
    let sysfs_root = config
        .host
        .sysfs_root
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSFS_ROOT));

    if config.pool.units.is_none() && !simulate {
        let detected = SysfsCores::present_units(&sysfs_root)
            .with_context(|| format!("counting units under {}", sysfs_root.display()))?;
        info!(units = detected, "pool size detected from sysfs");
        config.pool.units = Some(detected);
    }
    config.validate()?;
    let units = config.units()?;

    // ── Host adapters ──────────────────────────────────────────

    let control: Arc<dyn CoreControl> = if simulate {
        info!(units, "using simulated pool");
        Arc::new(SimulatedPool::new(units, 1))
    } else {
        info!(root = %sysfs_root.display(), units, "using sysfs unit control");
        Arc::new(SysfsCores::new(sysfs_root, units))
    };

    let source: Arc<dyn LoadSource> = Arc::new(ProcStatLoad::new(
        config
            .host
            .proc_stat
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_STAT)),
        config.host.load_scale.unwrap_or(DEFAULT_LOAD_SCALE),
    ));

    // ── Controller ─────────────────────────────────────────────

    let controller = ScalingController::from_config(&config, control.clone(), source)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let controller_handle = controller.spawn(shutdown_rx.clone())?;

    let signal_handle = tokio::spawn(forward_signals(controller.signals(), shutdown_rx));

    // ── API server ─────────────────────────────────────────────

    let listen = listen
        .or_else(|| config.api.listen.clone())
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid listen address {listen:?}"))?;

    let router = coreplug_api::build_router(controller.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl-C");
            }
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = controller_handle.await;
    match signal_handle.await {
        Ok(Err(e)) => warn!(error = %e, "signal forwarding failed"),
        Err(e) => warn!(error = %e, "signal task panicked"),
        Ok(Ok(())) => {}
    }

    // Leave the host fully provisioned once nothing is managing it.
    let restore = tokio::task::spawn_blocking(move || {
        coreplug_controller::set_cpus(control.as_ref(), units, units)
    })
    .await?;
    info!(online = restore.target, failed = restore.failed, "pool restored");

    info!("coreplug daemon stopped");
    Ok(())
}

/// Map host signals onto the controller until shutdown.
async fn forward_signals(
    signals: SignalCoordinator,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut usr1 = signal(SignalKind::user_defined1())?;
    let mut usr2 = signal(SignalKind::user_defined2())?;
    let mut hup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            _ = usr1.recv() => {
                info!("SIGUSR1 received, suspending");
                signals.on_suspend().await;
            }
            _ = usr2.recv() => {
                info!("SIGUSR2 received, resuming");
                signals.on_resume().await;
            }
            _ = hup.recv() => {
                signals.on_activity_pulse();
            }
            _ = shutdown.changed() => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "coreplugd",
            "run",
            "--config",
            "/etc/coreplug.toml",
            "--simulate",
            "--listen",
            "0.0.0.0:9000",
        ])
        .unwrap();

        match cli.command {
            Command::Run {
                config,
                simulate,
                listen,
            } => {
                assert_eq!(config, Some(PathBuf::from("/etc/coreplug.toml")));
                assert!(simulate);
                assert_eq!(listen.as_deref(), Some("0.0.0.0:9000"));
            }
            Command::CheckConfig { .. } => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn check_config_accepts_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coreplug.toml");
        std::fs::write(&path, "[pool]\nunits = 2\n").unwrap();

        check_config(&path).unwrap();
    }

    #[test]
    fn check_config_rejects_short_ladder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coreplug.toml");
        std::fs::write(
            &path,
            "[pool]\nunits = 2\n[ladder]\nup = [0.0, 5.0, inf]\ndown = [0.0, 8.0]\n",
        )
        .unwrap();

        assert!(check_config(&path).is_err());
    }

    #[test]
    fn missing_config_path_falls_back_to_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.units().unwrap(), 4);
    }
}
