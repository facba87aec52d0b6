//! Tonedeck - terminal front end for the playback engine
//!
//! Loads a local file or downloads a remote URL, starts playback, and
//! accepts single-letter transport commands on stdin while printing engine
//! events as they arrive.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tonedeck_engine::{EngineConfig, EngineEvent, PlaybackEngine};

/// Command-line arguments for tonedeck
#[derive(Parser, Debug)]
#[command(name = "tonedeck")]
#[command(about = "Audio player with live speed, pitch, and reverb controls")]
#[command(version)]
struct Args {
    /// Audio source: a local file path or an http(s) URL
    source: String,

    /// Output device name (default: system default device)
    #[arg(short, long, env = "TONEDECK_DEVICE")]
    device: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial playback speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f32,

    /// Initial pitch offset in semitones
    #[arg(long, default_value_t = 0.0)]
    pitch: f32,

    /// Reverb preset name (hall, movie, room, plate, cathedral, small room)
    #[arg(long)]
    reverb: Option<String>,

    /// Master volume (0.0 to 1.0)
    #[arg(long, default_value_t = 1.0)]
    volume: f32,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tonedeck=info,tonedeck_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if args.device.is_some() {
        config.device = args.device.clone();
    }
    config.volume = args.volume;

    let engine =
        Arc::new(PlaybackEngine::new(config).context("failed to initialize playback engine")?);
    info!("Playback engine initialized");

    // Print engine events as they arrive
    let mut events = engine.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                EngineEvent::PlaybackStateChanged { new_state, .. } => {
                    println!("state: {}", new_state);
                }
                EngineEvent::TrackDurationChanged { seconds, .. } => {
                    println!("track duration: {:.1}s", seconds);
                }
                EngineEvent::DownloadWaitChanged {
                    message, waiting, ..
                } => {
                    if waiting {
                        println!("{}", message);
                    } else {
                        println!("download finished");
                    }
                }
            }
        }
    });

    engine.set_playback_speed(args.speed);
    engine.set_pitch(args.pitch);
    if let Some(name) = &args.reverb {
        engine.set_reverb_effect(name);
    }

    if args.source.starts_with("http://") || args.source.starts_with("https://") {
        engine
            .download_and_load(&args.source)
            .await
            .context("failed to fetch track")?;
    } else {
        engine
            .load_track(Path::new(&args.source))
            .await
            .context("failed to load track")?;
    }

    engine.play_pause().await?;

    print_help();
    run_repl(engine).await
}

fn print_help() {
    println!("commands:");
    println!("  p          play/pause");
    println!("  s          stop");
    println!("  f / b      skip forward / backward 10s");
    println!("  g <0..1>   seek to position fraction");
    println!("  x <rate>   playback speed (0.25 to 1.5)");
    println!("  t <semis>  pitch offset (-1.0 to 1.0)");
    println!("  r <name>   reverb preset");
    println!("  v <vol>    volume (0.0 to 1.0)");
    println!("  ?          position");
    println!("  q          quit");
}

/// Line-oriented transport control until quit or Ctrl+C
async fn run_repl(engine: Arc<PlaybackEngine>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_command(&engine, line.trim()).await? {
                    break;
                }
            }
        }
    }

    engine.stop().await?;
    Ok(())
}

/// Returns false when the user asked to quit
async fn handle_command(engine: &PlaybackEngine, line: &str) -> Result<bool> {
    let (command, argument) = match line.split_once(' ') {
        Some((c, a)) => (c, a.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "p" => engine.play_pause().await?,
        "s" => engine.stop().await?,
        "f" => engine.skip_forward().await?,
        "b" => engine.skip_backward().await?,
        "g" => match argument.parse::<f32>() {
            Ok(progress) => engine.seek_to(progress).await?,
            Err(_) => println!("usage: g <0..1>"),
        },
        "x" => match argument.parse::<f32>() {
            Ok(rate) => engine.set_playback_speed(rate),
            Err(_) => println!("usage: x <rate>"),
        },
        "t" => match argument.parse::<f32>() {
            Ok(semitones) => engine.set_pitch(semitones),
            Err(_) => println!("usage: t <semitones>"),
        },
        "r" => {
            if argument.is_empty() {
                println!("usage: r <preset name>");
            } else {
                engine.set_reverb_effect(argument);
            }
        }
        "v" => match argument.parse::<f32>() {
            Ok(volume) => engine.set_volume(volume),
            Err(_) => println!("usage: v <volume>"),
        },
        "?" => match engine.position_seconds() {
            Some(position) => println!("position: {:.1}s", position),
            None => println!("position: (nothing scheduled)"),
        },
        "q" => return Ok(false),
        _ => print_help(),
    }

    Ok(true)
}
