use std::path::PathBuf;

use clap::{Parser, Subcommand, arg};
use log::info;

use gridreplay::{
    FileCache, GridReplayError, ReplayConfig, SessionKey, SessionReplay, ui::run_viewer,
};

const DEFAULT_ICON_DIR: &str = "assets/tyres";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a session and open the replay viewer
    Replay {
        #[arg(short, long)]
        year: u32,

        #[arg(short, long)]
        location: String,

        /// Session type, e.g. R, Q, S
        #[arg(short, long, default_value = "R")]
        session: String,

        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Seconds between replay frames
        #[arg(long)]
        frame_interval: Option<f64>,
    },
    /// Open the viewer on the session selection menu
    Menu {
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// List the sessions available in the cache
    Sessions {
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Print the leaderboard at a replay time
    Standings {
        #[arg(short, long)]
        year: u32,

        #[arg(short, long)]
        location: String,

        #[arg(short, long, default_value = "R")]
        session: String,

        /// Seconds since the start of the replay
        #[arg(long)]
        at: f64,

        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

fn open_cache(config: &ReplayConfig, cache_dir: Option<PathBuf>) -> Result<FileCache, GridReplayError> {
    match cache_dir.or_else(|| config.cache_dir.clone()) {
        Some(dir) => FileCache::new(dir),
        None => FileCache::new_default(),
    }
}

fn replay(
    mut config: ReplayConfig,
    key: SessionKey,
    cache_dir: Option<PathBuf>,
    frame_interval: Option<f64>,
) -> Result<(), GridReplayError> {
    if let Some(interval) = frame_interval {
        config.frame_interval_s = interval;
    }
    config.validate()?;
    let cache = open_cache(&config, cache_dir)?;
    let session = cache.load(&key)?;
    let replay = SessionReplay::build(&session, &config)?;
    run_viewer(Box::new(cache), config, Some(replay), PathBuf::from(DEFAULT_ICON_DIR))
}

fn menu(config: ReplayConfig, cache_dir: Option<PathBuf>) -> Result<(), GridReplayError> {
    let cache = open_cache(&config, cache_dir)?;
    run_viewer(Box::new(cache), config, None, PathBuf::from(DEFAULT_ICON_DIR))
}

fn sessions(config: &ReplayConfig, cache_dir: Option<PathBuf>) -> Result<(), GridReplayError> {
    let cache = open_cache(config, cache_dir)?;
    let keys = cache.list_available_sessions()?;
    if keys.is_empty() {
        println!("No cached sessions in {:?}", cache.cache_dir());
    }
    for key in keys {
        println!("{:>4}  {:<24} {}", key.year, key.location, key.session_type);
    }
    Ok(())
}

fn standings(
    config: &ReplayConfig,
    key: SessionKey,
    at: f64,
    cache_dir: Option<PathBuf>,
) -> Result<(), GridReplayError> {
    let cache = open_cache(config, cache_dir)?;
    let session = cache.load(&key)?;
    let replay = SessionReplay::build(&session, config)?;

    println!(
        "{} - lap {}/{} at {:.1}s",
        replay.event_name(),
        replay.lap_for_time(at),
        replay.total_laps(),
        at.clamp(0., replay.race_duration())
    );
    for standing in replay.leaderboard_at(at) {
        println!(
            "{:>3}  {:<4} {:<24} {:<13} {}{}",
            standing.rank,
            standing.abbreviation,
            standing.team,
            standing.compound,
            if standing.is_dnf { "DNF" } else { "" },
            if standing.is_pitting { "PIT" } else { "" },
        );
    }
    Ok(())
}

fn main() {
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    let config = ReplayConfig::from_local_file().unwrap_or_default();
    info!("Using config {:?}", config);

    let result = match cli.command {
        Commands::Replay {
            year,
            location,
            session,
            cache_dir,
            frame_interval,
        } => replay(
            config,
            SessionKey::new(year, location, session),
            cache_dir,
            frame_interval,
        ),
        Commands::Menu { cache_dir } => menu(config, cache_dir),
        Commands::Sessions { cache_dir } => sessions(&config, cache_dir),
        Commands::Standings {
            year,
            location,
            session,
            at,
            cache_dir,
        } => standings(&config, SessionKey::new(year, location, session), at, cache_dir),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
