use anyhow::{Context, Result};
use borough_heat::config::AppConfig;
use borough_heat::playback::PlaybackState;
use borough_heat::projection::Mercator;
use borough_heat::session::{Event, Outcome, Session};
use borough_heat::temporal::{Clock, SystemClock};
use borough_heat::{data, processing};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration; built-in defaults are used when the file is absent
    #[arg(short, long, value_name = "FILE", default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Override the boundary file from the configuration
    #[arg(short, long, value_name = "FILE", global = true)]
    boundaries: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample and tag points, then print them as JSON
    Generate,
    /// Print the frame (visibility and density contours) for one cursor position
    Frame {
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long, default_value_t = 720)]
        minute: i64,
    },
    /// Autoplay through the day, logging every frame
    Play {
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if let Some(boundaries) = cli.boundaries {
        config.input.boundaries = boundaries;
    }

    match cli.command {
        Commands::Generate => {
            let session = build_session(config)?;
            println!("{}", serde_json::to_string(session.points())?);
        }
        Commands::Frame { date, minute } => {
            let mut session = build_session(config)?;
            if let Some(date) = date {
                session.handle(Event::SelectDate(date));
            }
            if let Outcome::Frame(frame) = session.handle(Event::Scrub(minute)) {
                tracing::info!(
                    "{} at minute {}: {} visible, {} contours",
                    frame.date,
                    frame.cursor,
                    frame.visible_count,
                    frame.surface.len()
                );
                println!("{}", serde_json::to_string(&frame)?);
            }
        }
        Commands::Play { date } => play(config, date).await?,
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        AppConfig::load_from_file(path)
    } else {
        tracing::warn!("No config at {:?}, using defaults", path);
        Ok(AppConfig::default())
    }
}

fn build_session(config: AppConfig) -> Result<Session> {
    let clock = SystemClock;
    let day = config.temporal.day.unwrap_or_else(|| clock.now().date());

    let regions = data::load_boundaries(&config)?;
    let points = processing::generate_seeded(&config.sampling, &regions, day)
        .context("Failed to sample points")?;

    let projection = Mercator::from_config(&config.projection);
    Ok(Session::new(config, points, Box::new(projection), Box::new(clock)))
}

async fn play(config: AppConfig, date: Option<NaiveDate>) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut session = build_session(config)?.with_autoplay(tx.clone());

    if let Some(date) = date {
        session.handle(Event::SelectDate(date));
    }
    tx.send(Event::TogglePlayback)?;

    while let Some(event) = rx.recv().await {
        match session.handle(event) {
            Outcome::Frame(frame) => {
                tracing::info!(
                    "{:02}:{:02} {} visible, {} contours",
                    frame.cursor / 60,
                    frame.cursor % 60,
                    frame.visible_count,
                    frame.surface.len()
                );
                if frame.playback == PlaybackState::Stopped {
                    break;
                }
            }
            Outcome::Hover(_) | Outcome::Ignored => {}
        }
    }

    tracing::info!("Playback finished at minute {}", session.cursor());
    Ok(())
}
