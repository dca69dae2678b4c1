//! Integration tests for bbtimerd
//!
//! These exercise the engine, the offline cache and the SQLite store
//! together, with mock audio, speech and network.

use bbtimer_cache::{CacheError, OfflineCache, OFFLINE_BODY};
use bbtimer_config::{AppConfig, NotificationMode, parse_config};
use bbtimer_core::{CoreEvent, TimerEngine, TimerState};
use bbtimer_host_api::{
    MockAudio, MockNetwork, MockSpeech, MockWorkerHost, PlatformInfo, Request, Response, SoundRef,
};
use bbtimer_store::{KeyValueStore, SqliteStore};
use bbtimer_util::{EpochMillis, database_path};
use std::sync::Arc;

fn at(ms: i64) -> EpochMillis {
    EpochMillis::from_millis(ms)
}

fn engine_with(
    config: &AppConfig,
    store: Arc<SqliteStore>,
) -> (TimerEngine, Arc<MockAudio>, Arc<MockSpeech>) {
    let audio = Arc::new(MockAudio::new());
    let speech = Arc::new(MockSpeech::new());
    let engine = TimerEngine::new(
        &config.timer,
        PlatformInfo::default(),
        store,
        audio.clone(),
        speech.clone(),
    );
    (engine, audio, speech)
}

/// Drive the active tick every 100ms until `to`
fn run_until(engine: &mut TimerEngine, from: i64, to: i64) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    let mut ms = from;
    while ms <= to {
        if let Some(handle) = engine.active_tick() {
            events.extend(engine.tick(handle, at(ms)));
        }
        ms += 100;
    }
    events
}

fn serve_manifest(network: &MockNetwork, config: &AppConfig, tag: &str) {
    for url in &config.manifest.urls {
        network.serve(
            url.clone(),
            Response::new(200, format!("{} {}", tag, url)).with_header("Content-Type", "text/plain"),
        );
    }
}

#[test]
fn test_settings_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = database_path(dir.path());
    let config = AppConfig::default();

    {
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let (mut engine, _, _) = engine_with(&config, store);
        engine.show_settings();
        engine.draft_mut().full_seconds = 30;
        engine.draft_mut().warn_seconds = 10;
        engine.draft_mut().end_voice = false;
        engine.draft_mut().end_beep = true;
        engine.draft_mut().dark_theme = true;
        engine.settings_ok().unwrap();
    }

    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let (engine, _, _) = engine_with(&config, store);
    let profile = engine.profile();
    assert_eq!(profile.full_seconds, 30);
    assert_eq!(profile.warn_seconds, 10);
    assert_eq!(profile.end_mode, NotificationMode::Beep);
    assert!(profile.dark_theme);
    assert!(engine.dark_theme());
    assert_eq!(engine.remaining(), 30);
}

#[test]
fn test_configured_defaults_drive_countdown() {
    let config = parse_config(
        r#"
        config_version = 1

        [timer]
        full_seconds = 20
        warn_seconds = 8
        end_notification = "beep"
        warn_notification = "voice"
        "#,
    )
    .unwrap();
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let (mut engine, audio, speech) = engine_with(&config, store);
    assert_eq!(engine.jump_label(), "8 seconds");

    engine.tap(at(0));
    audio.clear();
    speech.clear();

    let events = run_until(&mut engine, 100, 20_000);
    assert!(events.contains(&CoreEvent::WarningIssued { warn_seconds: 8 }));
    assert!(events.contains(&CoreEvent::Expired));
    assert_eq!(engine.state(), TimerState::Expired);

    assert_eq!(speech.spoken(), vec!["8 seconds"]);
    assert_eq!(audio.played(), vec![SoundRef::new("/timer/media/sounds/beep.mp3")]);
}

#[test]
fn test_rejected_commit_leaves_store_untouched() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let (mut engine, _, _) = engine_with(&AppConfig::default(), store.clone());

    engine.show_settings();
    engine.draft_mut().full_seconds = 5;
    engine.draft_mut().warn_seconds = 15;
    assert!(engine.settings_ok().is_err());

    assert_eq!(store.get("storedFullTime").unwrap().as_deref(), Some("15"));
    assert_eq!(store.get("storedPartTime").unwrap().as_deref(), Some("5"));
}

#[tokio::test]
async fn test_offline_lifecycle_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(database_path(dir.path())).unwrap());
    let network = Arc::new(MockNetwork::new());
    let worker = Arc::new(MockWorkerHost::new());
    let config = AppConfig::default();
    serve_manifest(&network, &config, "v0.2");

    let cache = OfflineCache::new(
        config.manifest.clone(),
        store.clone(),
        network.clone(),
        worker.clone(),
    );

    let report = cache.install().await.unwrap();
    assert_eq!(report.asset_count, config.manifest.urls.len());
    cache.activate().await.unwrap();
    assert_eq!(cache.generation_entries().unwrap(), config.manifest.urls);

    network.set_offline(true);
    let fetches = network.fetch_count();

    let hit = cache.handle(&Request::get("/timer/timer.js")).await;
    assert_eq!(hit.body, b"v0.2 /timer/timer.js".to_vec());
    assert_eq!(network.fetch_count(), fetches);

    let fallback = cache.handle(&Request::get("/timer/missing.html")).await;
    assert_eq!(fallback.body, b"v0.2 /timer/index.html".to_vec());
}

#[tokio::test]
async fn test_version_bump_replaces_generation() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let network = Arc::new(MockNetwork::new());
    let worker = Arc::new(MockWorkerHost::new());

    let old = AppConfig::default();
    serve_manifest(&network, &old, "old");
    let old_cache = OfflineCache::new(old.manifest.clone(), store.clone(), network.clone(), worker.clone());
    old_cache.install().await.unwrap();
    old_cache.activate().await.unwrap();

    // Settings share the database with the cache
    store.set("storedFullTime", "42").unwrap();

    let new = parse_config("config_version = 1\n[cache]\nversion = \"0.3\"\n").unwrap();
    serve_manifest(&network, &new, "new");
    let new_cache = OfflineCache::new(new.manifest.clone(), store.clone(), network.clone(), worker);
    new_cache.install().await.unwrap();
    let report = new_cache.activate().await.unwrap();

    assert_eq!(report.purged, vec!["bbtimer_0.2".to_string()]);
    assert!(report.clients_claimed);
    assert_eq!(
        bbtimer_store::CacheStorage::generation_keys(store.as_ref()).unwrap(),
        vec!["bbtimer_0.3".to_string()]
    );
    assert_eq!(store.get("storedFullTime").unwrap().as_deref(), Some("42"));

    network.set_offline(true);
    let page = new_cache.handle(&Request::get("/timer/index.html")).await;
    assert_eq!(page.body, b"new /timer/index.html".to_vec());
}

#[tokio::test]
async fn test_failed_install_keeps_serving_old_generation() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let network = Arc::new(MockNetwork::new());
    let worker = Arc::new(MockWorkerHost::new());

    let old = AppConfig::default();
    serve_manifest(&network, &old, "old");
    let old_cache = OfflineCache::new(old.manifest.clone(), store.clone(), network.clone(), worker.clone());
    old_cache.install().await.unwrap();
    old_cache.activate().await.unwrap();

    let new = parse_config("config_version = 1\n[cache]\nversion = \"0.3\"\n").unwrap();
    let new_cache = OfflineCache::new(new.manifest.clone(), store.clone(), network.clone(), worker);
    network.serve("/timer/help.html", Response::new(206, "partial"));

    assert!(matches!(new_cache.install().await, Err(CacheError::Precache(_))));
    assert!(matches!(new_cache.activate().await, Err(CacheError::NotInstalled(_))));

    network.set_offline(true);
    let page = old_cache.handle(&Request::get("/timer/help.html")).await;
    assert_eq!(page.body, b"old /timer/help.html".to_vec());

    let nothing = new_cache.handle(&Request::get("/timer/help.html")).await;
    assert_eq!(nothing.status, 408);
    assert_eq!(nothing.body, OFFLINE_BODY.as_bytes().to_vec());
}
