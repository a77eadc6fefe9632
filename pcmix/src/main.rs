//! pcmix-play - play a music file with optional periodic sound effects
//!
//! Loads one music file (in memory or streamed from a scratch file), plays
//! it, and optionally fires a sound effect at a fixed interval. Every engine
//! event is logged. Exits when non-looping music finishes or after the
//! `--seconds` limit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use pcmix::{Engine, EngineConfig, EventListener, MusicEvent, SoundEvent};
use pcmix_common::config::resolve_config_file;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Command-line arguments for pcmix-play
#[derive(Parser, Debug)]
#[command(name = "pcmix-play")]
#[command(about = "Play audio through the pcmix engine")]
#[command(version)]
struct Args {
    /// Music file to play
    music: Option<PathBuf>,

    /// Sound effect fired every --sound-interval-ms
    #[arg(long)]
    sound: Option<PathBuf>,

    /// Interval between sound effect plays in milliseconds
    #[arg(long, default_value = "2000")]
    sound_interval_ms: u64,

    /// Loop the music
    #[arg(short, long = "loop")]
    looping: bool,

    /// Stream audio from scratch files instead of holding it in memory
    #[arg(long)]
    stream: bool,

    /// Music volume
    #[arg(long, default_value = "1.0")]
    volume: f64,

    /// Music pan, -1.0 (left) to 1.0 (right)
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    pan: f64,

    /// Stop after this many seconds
    #[arg(long)]
    seconds: Option<u64>,

    /// Output device name (overrides the config file)
    #[arg(short, long, env = "PCMIX_DEVICE")]
    device: Option<String>,

    /// Config file (defaults to PCMIX_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

/// Logs every engine event
struct LogListener;

impl EventListener for LogListener {
    fn on_music_event(&self, event: &MusicEvent) {
        info!("{}: {:?}", event.source, event.action);
    }

    fn on_sound_event(&self, event: &SoundEvent) {
        info!("{} voice {}: {:?}", event.source, event.voice, event.action);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pcmix=info,pcmix_play=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.list_devices {
        for name in Engine::list_devices().context("Failed to enumerate output devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let music_path = args
        .music
        .clone()
        .context("A music file is required (see --help)")?;

    let config = load_config(&args)?;
    let engine = Engine::new(config);
    engine.register_event_listener(Arc::new(LogListener));
    engine.init().context("Failed to initialize audio engine")?;

    let music = engine
        .load_music(music_path.as_path(), args.stream)
        .with_context(|| format!("Failed to load music {}", music_path.display()))?;
    let sound = match &args.sound {
        Some(path) => Some(
            engine
                .load_sound(path.as_path(), args.stream)
                .with_context(|| format!("Failed to load sound {}", path.display()))?,
        ),
        None => None,
    };

    info!(
        "Playing {} ({:.1}s, loop: {})",
        music_path.display(),
        music.frames() as f64 / pcmix_common::format::SAMPLE_RATE as f64,
        args.looping
    );
    music.play_with_volume_and_pan(args.looping, args.volume, args.pan);

    let started = Instant::now();
    let limit = args.seconds.map(Duration::from_secs);
    let sound_interval = Duration::from_millis(args.sound_interval_ms.max(1));
    let mut next_sound = started + sound_interval;

    while !music.done() && limit.map_or(true, |l| started.elapsed() < l) {
        if let Some(sound) = &sound {
            if Instant::now() >= next_sound {
                sound.play();
                next_sound += sound_interval;
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    music.unload();
    if let Some(sound) = sound {
        sound.unload();
    }
    engine.shutdown().context("Playback ended with an error")?;
    Ok(())
}

/// Defaults, overridden by the config file, overridden by the command line
fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match resolve_config_file(args.config.as_deref()) {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if args.device.is_some() {
        config.device_name = args.device.clone();
    }
    Ok(config)
}
