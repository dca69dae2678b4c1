//! bbtimerd - The bbtimer daemon
//!
//! Wires together:
//! - Configuration loading
//! - Store initialization (falls back to memory when the disk store fails)
//! - The timer engine, driven by the timer tick, backup counter and
//!   voice discovery from one event loop
//! - Terminal commands on stdin
//! - Offline cache maintenance (`bbtimerd cache ...`)

mod command;

use anyhow::{Context, Result};
use bbtimer_cache::OfflineCache;
use bbtimer_config::{AppConfig, load_config};
use bbtimer_core::{CoreEvent, TickHandle, TimerEngine};
use bbtimer_host_api::{PlatformInfo, Request};
use bbtimer_host_native::{CommandAudio, DEFAULT_FETCH_TIMEOUT, EspeakSpeech, HttpNetwork, LocalWorkerHost};
use bbtimer_store::{KeyValueStore, MemoryStore, SqliteStore};
use bbtimer_util::{BBTIMER_CONFIG_ENV, BBTIMER_DATA_DIR_ENV, database_path, default_config_path};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{SignalKind, signal};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use command::{HELP, UserCommand, parse_command};

/// Countdown timer tick
const TIMER_TICK: Duration = Duration::from_millis(100);

/// Backup counter period
const COUNTER_TICK: Duration = Duration::from_secs(1);

/// Voice discovery poll period
const VOICE_POLL: Duration = Duration::from_millis(200);

/// bbtimerd - Countdown timer with spoken warnings
#[derive(Parser, Debug)]
#[command(name = "bbtimerd")]
#[command(about = "Countdown timer with spoken warnings and an offline asset cache", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/bbtimer/config.toml)
    #[arg(short, long, env = BBTIMER_CONFIG_ENV, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set BBTIMER_DATA_DIR env var)
    #[arg(short, long, env = BBTIMER_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the timer, reading commands from stdin (default)
    Run,

    /// Maintain the offline asset cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Fetch every manifest asset into the current generation
    Install,
    /// Delete stale generations
    Activate,
    /// Answer a request the way an offline client would see it
    Get { path: String },
    /// List the assets of the current generation
    List,
}

fn load_app_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        info!(config_path = %path.display(), "No config file, using defaults");
        return Ok(AppConfig::default());
    }

    let config = load_config(path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;
    info!(
        config_path = %path.display(),
        generation = %config.manifest.generation_key(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Open the on-disk store
fn open_store(data_dir: &Path) -> Result<Arc<SqliteStore>> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    let db_path = database_path(data_dir);
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open database {:?}", db_path))?;

    info!(db_path = %db_path.display(), "Store initialized");
    Ok(Arc::new(store))
}

/// The 100ms tick for the engine's active handle
struct TimerTick {
    handle: TickHandle,
    interval: Interval,
}

/// Keep the tick interval in step with the engine's active handle
fn sync_timer_tick(engine: &TimerEngine, tick: &mut Option<TimerTick>) {
    let wanted = engine.active_tick();
    if tick.as_ref().map(|t| t.handle) == wanted {
        return;
    }

    *tick = wanted.map(|handle| {
        let mut interval = tokio::time::interval(TIMER_TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(handle = handle.id(), "Timer tick started");
        TimerTick { handle, interval }
    });
}

async fn next_timer_tick(tick: &mut Option<TimerTick>) -> TickHandle {
    match tick {
        Some(tick) => {
            tick.interval.tick().await;
            tick.handle
        }
        None => std::future::pending().await,
    }
}

/// Terminal view of core events
fn render(engine: &TimerEngine, events: &[CoreEvent]) {
    for event in events {
        match event {
            CoreEvent::StateChanged { to, .. } => println!("state: {:?}", to),
            CoreEvent::RemainingChanged { remaining } => println!("{}", remaining),
            CoreEvent::WarningIssued { warn_seconds } => {
                println!("warning: {} seconds left", warn_seconds)
            }
            CoreEvent::Expired => println!("time!"),
            CoreEvent::CounterChanged { display } => {
                if engine.profile().show_counter {
                    println!("counter: {}", display);
                }
            }
            CoreEvent::VoicesReady { count, selected } => match selected {
                Some(voice) => println!("voices: {} available, using {}", count, voice),
                None => println!("voices: none available offline"),
            },
            CoreEvent::SettingsOpened => print_draft(engine),
            CoreEvent::SettingsCommitted => println!("settings saved"),
            CoreEvent::SettingsCancelled => println!("settings discarded"),
            CoreEvent::ThemeChanged { dark } => {
                println!("theme: {}", if *dark { "dark" } else { "light" })
            }
            CoreEvent::CounterVisibilityChanged { visible } => {
                println!("counter: {}", if *visible { "shown" } else { "hidden" })
            }
        }
    }
}

fn print_draft(engine: &TimerEngine) {
    let draft = engine.draft();
    println!("settings:");
    println!("  full     {}", draft.full_seconds);
    println!("  warn     {}", draft.warn_seconds);
    println!("  end      {:?}", draft.end_mode());
    println!("  warning  {:?}", draft.warn_mode());
    match draft.voice_index.and_then(|i| engine.catalog().get(i)) {
        Some(voice) => println!("  voice    {}", voice.display_id()),
        None => println!("  voice    (default)"),
    }
    println!("  rate     {:.1}", draft.speech_rate);
    println!("  counter  {}", draft.show_counter);
    println!("  dark     {}", draft.dark_theme);
}

fn print_status(engine: &TimerEngine) {
    let profile = engine.profile();
    println!(
        "state: {:?}, remaining {}s (full {}s, warn {}s), counter {}",
        engine.state(),
        engine.remaining(),
        profile.full_seconds,
        profile.warn_seconds,
        engine.counter_display()
    );
}

fn print_voices(engine: &TimerEngine) {
    if engine.catalog().is_empty() {
        println!("voices: none yet");
        return;
    }
    let selected = engine.profile().voice_id.as_deref();
    for (index, voice) in engine.catalog().voices().iter().enumerate() {
        let id = voice.display_id();
        let marker = if Some(id.as_str()) == selected { "*" } else { " " };
        println!("{} {:2} {}", marker, index, id);
    }
}

/// Apply one terminal command. Returns false when the user asked to quit.
fn handle_command(engine: &mut TimerEngine, command: UserCommand) -> bool {
    let now = bbtimer_util::now();

    let events = match command {
        UserCommand::Tap => engine.tap(now),
        UserCommand::Jump => engine.jump_to_warning(now),
        UserCommand::Settings => engine.show_settings(),
        UserCommand::Ok => match engine.settings_ok() {
            Ok(events) => events,
            Err(e) => {
                println!("{}", e);
                Vec::new()
            }
        },
        UserCommand::Cancel => engine.settings_cancel(),
        UserCommand::Set(change) => {
            let mut events = Vec::new();
            if !engine.settings_visible() {
                events.extend(engine.show_settings());
            }
            change.apply(engine.draft_mut());
            events
        }
        UserCommand::Theme(dark) => engine.preview_theme(dark),
        UserCommand::Status => {
            print_status(engine);
            Vec::new()
        }
        UserCommand::Voices => {
            print_voices(engine);
            Vec::new()
        }
        UserCommand::Help => {
            println!("{}", HELP);
            Vec::new()
        }
        UserCommand::Quit => return false,
    };

    render(engine, &events);
    true
}

async fn run_timer(config: AppConfig, data_dir: PathBuf) -> Result<()> {
    let store: Arc<dyn KeyValueStore> = match open_store(&data_dir) {
        Ok(store) => store,
        Err(e) => {
            warn!(error = %e, "Settings will not be saved, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let sounds_dir = config
        .service
        .sounds_dir
        .clone()
        .unwrap_or_else(|| data_dir.join("sounds"));
    let audio = Arc::new(CommandAudio::new(config.service.audio_player.clone(), sounds_dir));
    let speech = Arc::new(EspeakSpeech::new(config.service.speech_command.clone()));

    let mut engine = TimerEngine::new(&config.timer, PlatformInfo::detect(), store, audio, speech);

    let mut sigterm = signal(SignalKind::terminate())
        .context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt())
        .context("Failed to create SIGINT handler")?;

    let mut counter_timer = tokio::time::interval(COUNTER_TICK);
    counter_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The counter starts one second in, like the display it backs up
    counter_timer.tick().await;

    let mut voice_timer = tokio::time::interval(VOICE_POLL);
    voice_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut timer_tick: Option<TimerTick> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    println!("{}", engine.remaining());
    info!("Timer running, type 'help' for commands");

    loop {
        sync_timer_tick(&engine, &mut timer_tick);

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }

            handle = next_timer_tick(&mut timer_tick) => {
                let events = engine.tick(handle, bbtimer_util::now());
                render(&engine, &events);
            }

            _ = counter_timer.tick() => {
                let event = engine.counter_tick();
                render(&engine, &[event]);
            }

            _ = voice_timer.tick(), if !engine.voice_discovery_finished() => {
                let events = engine.poll_voices();
                render(&engine, &events);
            }

            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match parse_command(&line) {
                        Ok(command) => {
                            if !handle_command(&mut engine, command) {
                                info!("Quit requested");
                                break;
                            }
                        }
                        Err(message) => println!("{}", message),
                    },
                    Ok(None) => {
                        debug!("stdin closed");
                        stdin_open = false;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin");
                        stdin_open = false;
                    }
                }
            }
        }
    }

    info!("Shutdown complete");
    Ok(())
}

async fn run_cache(action: CacheAction, config: AppConfig, data_dir: PathBuf) -> Result<()> {
    let storage = open_store(&data_dir)?;
    let network = Arc::new(
        HttpNetwork::new(config.service.origin.clone(), DEFAULT_FETCH_TIMEOUT)
            .context("Failed to set up HTTP client")?,
    );
    let cache = OfflineCache::new(config.manifest, storage, network, Arc::new(LocalWorkerHost));

    match action {
        CacheAction::Install => {
            let report = cache.install().await.context("Install failed")?;
            println!(
                "installed {} ({} assets, {} bytes)",
                report.generation, report.asset_count, report.total_bytes
            );
        }
        CacheAction::Activate => {
            let report = cache.activate().await.context("Activation failed")?;
            println!("active: {}", report.generation);
            for stale in &report.purged {
                println!("purged: {}", stale);
            }
        }
        CacheAction::Get { path } => {
            let response = cache.handle(&Request::get(path)).await;
            eprintln!(
                "{} {}",
                response.status,
                response.header("Content-Type").unwrap_or("-")
            );
            std::io::stdout()
                .write_all(&response.body)
                .context("Failed to write response body")?;
        }
        CacheAction::List => {
            println!("{}", cache.generation_key());
            for key in cache.generation_entries()? {
                println!("  {}", key);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "bbtimerd starting");

    let config = load_app_config(&args.config)?;
    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| config.service.data_dir.clone());

    match args.command.unwrap_or(Commands::Run) {
        Commands::Run => run_timer(config, data_dir).await,
        Commands::Cache { action } => run_cache(action, config, data_dir).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbtimer_config::TimerDefaults;
    use bbtimer_core::TimerState;
    use bbtimer_host_api::{MockAudio, MockSpeech};
    use bbtimer_util::EpochMillis;

    fn engine() -> TimerEngine {
        TimerEngine::new(
            &TimerDefaults::default(),
            PlatformInfo::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(MockAudio::new()),
            Arc::new(MockSpeech::new()),
        )
    }

    fn synced_handle(engine: &TimerEngine, tick: &mut Option<TimerTick>) -> Option<TickHandle> {
        sync_timer_tick(engine, tick);
        tick.as_ref().map(|t| t.handle)
    }

    #[test]
    fn test_parse_defaults_to_run() {
        let args = Args::try_parse_from(["bbtimerd", "--config", "/tmp/none.toml"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.config, PathBuf::from("/tmp/none.toml"));
    }

    #[tokio::test]
    async fn test_timer_tick_follows_engine_handle() {
        let mut engine = engine();
        let mut tick = None;
        assert_eq!(synced_handle(&engine, &mut tick), None);

        let start = EpochMillis::from_millis(1_000_000);
        engine.tap(start);
        let first = synced_handle(&engine, &mut tick);
        assert!(first.is_some());
        assert_eq!(first, engine.active_tick());
        assert_eq!(synced_handle(&engine, &mut tick), first);
        assert_eq!(Some(next_timer_tick(&mut tick).await), first);

        // Jumping swaps in a new handle and a new interval
        engine.jump_to_warning(start);
        let second = synced_handle(&engine, &mut tick);
        assert_ne!(second, first);
        assert_eq!(Some(next_timer_tick(&mut tick).await), second);

        let handle = next_timer_tick(&mut tick).await;
        engine.tick(handle, EpochMillis::from_millis(start.as_millis() + 5_000));
        assert_eq!(engine.state(), TimerState::Expired);

        // Expired: nothing left to drive
        assert_eq!(synced_handle(&engine, &mut tick), None);
        let idle = tokio::time::timeout(3 * TIMER_TICK, next_timer_tick(&mut tick)).await;
        assert!(idle.is_err());
    }
}
