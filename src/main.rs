//! Beacon Duel headless runner
//!
//! Loads the endpoint config, runs one match until game over or Ctrl-C, and
//! logs every event as it happens.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

use beacon_duel::agent::HttpTransport;
use beacon_duel::phase::MatchPhase;
use beacon_duel::runtime::ArenaHandle;
use beacon_duel::sim::MovementKind;
use beacon_duel::{Arena, ArenaConfig};

/// Two remote models pilot ships in a shared arena
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Endpoint configuration file
    #[arg(short, long, default_value = "beacon-duel.json")]
    config: PathBuf,
    /// Seed for beacon placement and polling jitter
    #[arg(long)]
    seed: Option<u64>,
    /// Ship movement model (eased or cruise)
    #[arg(long, value_parser = parse_movement)]
    movement: Option<MovementKind>,
    /// Board width
    #[arg(long)]
    width: Option<f32>,
    /// Board height
    #[arg(long)]
    height: Option<f32>,
    /// Write the effective config back to disk and exit
    #[arg(long)]
    write_config: bool,
    /// Seconds between status lines
    #[arg(long, default_value_t = 5)]
    status_every: u64,
}

fn parse_movement(s: &str) -> Result<MovementKind, String> {
    MovementKind::from_str(s).ok_or_else(|| format!("unknown movement model '{s}'"))
}

impl Args {
    fn apply(&self, config: &mut ArenaConfig) {
        let settings = &mut config.settings;
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if let Some(movement) = self.movement {
            settings.movement = movement;
        }
        if let Some(width) = self.width {
            settings.width = width;
        }
        if let Some(height) = self.height {
            settings.height = height;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = ArenaConfig::load(&args.config);
    args.apply(&mut config);
    if args.write_config {
        config.save(&args.config)?;
        return Ok(());
    }

    let transport = Arc::new(HttpTransport::new(&config.proxy)?);
    let handle = ArenaHandle::spawn(Arena::new(config), transport);
    let mut events = handle.subscribe().await;
    handle.start().await?;

    let mut status = tokio::time::interval(Duration::from_secs(args.status_every.max(1)));
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => log::warn!("Observer lagged, {n} events skipped"),
                Err(RecvError::Closed) => break,
            },
            _ = status.tick() => {
                let snapshot = handle.snapshot().await;
                let scores: Vec<_> = snapshot.ships.iter().map(|s| s.score.to_string()).collect();
                log::info!(
                    "[{}] {} | score {} | shots {}",
                    snapshot.clock(),
                    handle.phase().await.label(),
                    scores.join(" : "),
                    snapshot.stats.shots
                );
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
        }

        match handle.phase().await {
            MatchPhase::GameOver(outcome) => {
                println!("{}", outcome.describe());
                break;
            }
            MatchPhase::Error => {
                log::error!("Match stopped on a transport error");
                break;
            }
            _ => {}
        }
    }

    handle.shutdown().await;
    Ok(())
}
