//! Timer engine
//!
//! Owns the settings profile, the countdown session and the view state the
//! settings surface needs. Every operation takes the current time from the
//! caller and returns the events the view should render.

use bbtimer_config::TimerDefaults;
use bbtimer_host_api::{AudioPlayer, PlatformInfo, SoundRef, SpeechEngine, Utterance};
use bbtimer_store::KeyValueStore;
use bbtimer_util::EpochMillis;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::session::TickHandles;
use crate::{
    BackupCounter, CoreEvent, DiscoveryPoll, SettingsDraft, SettingsProfile, SettingsRepository,
    SettingsResult, TickHandle, TimerSession, TimerState, VoiceCatalog, VoiceDiscovery,
};

/// Spoken when the countdown ends
pub const END_PHRASE: &str = "Time";

/// Spoken when the warning offset is reached
pub fn warn_phrase(warn_seconds: u32) -> String {
    format!("{} seconds", warn_seconds)
}

/// The countdown and settings state machine
pub struct TimerEngine {
    profile: SettingsProfile,
    draft: SettingsDraft,
    session: TimerSession,
    ticks: TickHandles,
    counter: BackupCounter,
    catalog: VoiceCatalog,
    discovery: VoiceDiscovery,
    end_utterance: Utterance,
    warn_utterance: Utterance,
    beep_sound: SoundRef,
    silence_sound: SoundRef,
    primed: bool,
    settings_visible: bool,
    dark_theme: bool,
    repository: SettingsRepository,
    audio: Arc<dyn AudioPlayer>,
    speech: Arc<dyn SpeechEngine>,
}

impl TimerEngine {
    /// Create an engine, loading stored settings over the configured defaults
    pub fn new(
        timer: &TimerDefaults,
        platform: PlatformInfo,
        store: Arc<dyn KeyValueStore>,
        audio: Arc<dyn AudioPlayer>,
        speech: Arc<dyn SpeechEngine>,
    ) -> Self {
        let repository = SettingsRepository::new(store);
        let profile = repository.load(&SettingsProfile::defaults(timer, &platform));
        let catalog = VoiceCatalog::default();

        let end_utterance = Utterance::new(END_PHRASE, &timer.locale, profile.speech_rate);
        let warn_utterance =
            Utterance::new(warn_phrase(profile.warn_seconds), &timer.locale, profile.speech_rate);

        info!(
            full = profile.full_seconds,
            warn = profile.warn_seconds,
            dark = profile.dark_theme,
            "Timer engine initialized"
        );

        Self {
            draft: SettingsDraft::from_profile(&profile, &catalog),
            session: TimerSession::ready(profile.full_seconds, profile.warn_seconds),
            ticks: TickHandles::default(),
            counter: BackupCounter::new(),
            catalog,
            discovery: VoiceDiscovery::new(),
            end_utterance,
            warn_utterance,
            beep_sound: SoundRef::new(&timer.beep_sound),
            silence_sound: SoundRef::new(&timer.silence_sound),
            primed: false,
            settings_visible: false,
            dark_theme: profile.dark_theme,
            profile,
            repository,
            audio,
            speech,
        }
    }

    pub fn profile(&self) -> &SettingsProfile {
        &self.profile
    }

    pub fn session(&self) -> &TimerSession {
        &self.session
    }

    pub fn state(&self) -> TimerState {
        self.session.state()
    }

    /// Whole seconds to display
    pub fn remaining(&self) -> u32 {
        self.session.remaining()
    }

    /// The tick the caller should be driving, if any
    pub fn active_tick(&self) -> Option<TickHandle> {
        self.session.tick()
    }

    pub fn counter_display(&self) -> String {
        self.counter.display()
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    pub fn voice_discovery_finished(&self) -> bool {
        self.discovery.is_finished()
    }

    pub fn settings_visible(&self) -> bool {
        self.settings_visible
    }

    /// Theme currently shown, which may be a preview
    pub fn dark_theme(&self) -> bool {
        self.dark_theme
    }

    pub fn draft(&self) -> &SettingsDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut SettingsDraft {
        &mut self.draft
    }

    /// Label of the jump-to-warning control
    pub fn jump_label(&self) -> String {
        warn_phrase(self.profile.warn_seconds)
    }

    /// Start a countdown from Ready, or reset a running or expired one
    pub fn tap(&mut self, now: EpochMillis) -> Vec<CoreEvent> {
        self.prime_sound();

        let from = self.session.state();
        match from {
            TimerState::Ready => {
                let tick = self.ticks.next();
                self.session = TimerSession::running(
                    self.profile.full_seconds,
                    self.profile.warn_seconds,
                    now,
                    tick,
                );
                info!(
                    run_id = %self.session.run_id(),
                    full = self.profile.full_seconds,
                    "Countdown started"
                );
                vec![
                    CoreEvent::StateChanged {
                        from,
                        to: TimerState::Running,
                    },
                    CoreEvent::RemainingChanged {
                        remaining: self.session.remaining(),
                    },
                ]
            }
            TimerState::Running | TimerState::Expired => {
                info!(run_id = %self.session.run_id(), ?from, "Countdown reset");
                self.session = TimerSession::ready(self.profile.full_seconds, self.profile.warn_seconds);
                vec![
                    CoreEvent::StateChanged {
                        from,
                        to: TimerState::Ready,
                    },
                    CoreEvent::RemainingChanged {
                        remaining: self.session.remaining(),
                    },
                ]
            }
        }
    }

    /// Run with only the warning time left, from any state
    pub fn jump_to_warning(&mut self, now: EpochMillis) -> Vec<CoreEvent> {
        self.prime_sound();

        let from = self.session.state();
        let full = self.profile.full_seconds;
        let warn = self.profile.warn_seconds;
        let start = now.backdated_by_secs(full.saturating_sub(warn));
        let tick = self.ticks.next();

        self.session = TimerSession::running(full, warn, start, tick);
        self.session.update_remaining(now);

        info!(run_id = %self.session.run_id(), warn, "Jumped to warning");

        let mut events = Vec::new();
        if from != TimerState::Running {
            events.push(CoreEvent::StateChanged {
                from,
                to: TimerState::Running,
            });
        }
        events.push(CoreEvent::RemainingChanged {
            remaining: self.session.remaining(),
        });
        events
    }

    /// Advance the countdown. Ticks from a canceled handle are ignored.
    pub fn tick(&mut self, handle: TickHandle, now: EpochMillis) -> Vec<CoreEvent> {
        if self.session.tick() != Some(handle) {
            debug!(handle = handle.id(), "Ignoring stale tick");
            return Vec::new();
        }

        let mut events = Vec::new();
        if self.session.update_remaining(now) {
            events.push(CoreEvent::RemainingChanged {
                remaining: self.session.remaining(),
            });
        }

        if self.session.should_warn() {
            self.session.mark_warning_fired();
            let warn_seconds = self.session.warn_seconds();
            info!(run_id = %self.session.run_id(), warn_seconds, "Warning issued");

            if self.profile.warn_mode.plays_voice() {
                self.announce(&self.warn_utterance);
            } else if self.profile.warn_mode.plays_beep() {
                self.play(&self.beep_sound);
            }
            events.push(CoreEvent::WarningIssued { warn_seconds });
        }

        if self.session.remaining() == 0 {
            self.session.mark_expired();
            info!(run_id = %self.session.run_id(), "Countdown expired");

            if self.profile.end_mode.plays_voice() {
                self.announce(&self.end_utterance);
            } else if self.profile.end_mode.plays_beep() {
                self.play(&self.beep_sound);
            }
            events.push(CoreEvent::StateChanged {
                from: TimerState::Running,
                to: TimerState::Expired,
            });
            events.push(CoreEvent::Expired);
        }

        events
    }

    /// Advance the backup counter (once per second, never stopped)
    pub fn counter_tick(&mut self) -> CoreEvent {
        self.counter.advance();
        CoreEvent::CounterChanged {
            display: self.counter.display(),
        }
    }

    /// Ask the speech engine for voices until the list settles
    pub fn poll_voices(&mut self) -> Vec<CoreEvent> {
        let catalog = match self.discovery.poll(self.speech.as_ref()) {
            DiscoveryPoll::Ready(catalog) => catalog,
            DiscoveryPoll::Pending | DiscoveryPoll::Finished => return Vec::new(),
        };
        self.catalog = catalog;

        let selected = self
            .catalog
            .resolve(self.profile.voice_id.as_deref())
            .and_then(|index| self.catalog.get(index).cloned());

        if let Some(voice) = &selected {
            let voice_id = voice.display_id();
            info!(voice = %voice_id, "Voice selected");
            self.end_utterance.set_voice(voice);
            self.warn_utterance.set_voice(voice);
            self.repository.save_voice(&voice_id);
            self.profile.voice_id = Some(voice_id);
        } else {
            warn!("No offline voices available");
        }

        self.draft.voice_index = self
            .profile
            .voice_id
            .as_deref()
            .and_then(|id| self.catalog.position_by_id(id));

        vec![CoreEvent::VoicesReady {
            count: self.catalog.len(),
            selected: selected.map(|v| v.display_id()),
        }]
    }

    /// Open the settings surface with a draft of the committed profile
    pub fn show_settings(&mut self) -> Vec<CoreEvent> {
        self.draft = SettingsDraft::from_profile(&self.profile, &self.catalog);
        self.settings_visible = true;
        debug!("Settings opened");
        vec![CoreEvent::SettingsOpened]
    }

    /// Show a theme without committing it
    pub fn preview_theme(&mut self, dark: bool) -> Vec<CoreEvent> {
        self.draft.dark_theme = dark;
        self.set_theme(dark)
    }

    /// Commit the draft.
    ///
    /// On error nothing changes and the settings surface stays open.
    pub fn settings_ok(&mut self) -> SettingsResult<Vec<CoreEvent>> {
        let profile = match self.draft.to_profile(&self.catalog, &self.profile) {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "Settings rejected");
                return Err(e);
            }
        };

        if let Some(voice) = self.draft.voice_index.and_then(|i| self.catalog.get(i)) {
            self.end_utterance.set_voice(voice);
            self.warn_utterance.set_voice(voice);
        }
        self.end_utterance.rate = profile.speech_rate;
        self.warn_utterance.rate = profile.speech_rate;
        self.warn_utterance.text = warn_phrase(profile.warn_seconds);

        let counter_changed = profile.show_counter != self.profile.show_counter;
        self.profile = profile;
        self.repository.save(&self.profile);
        self.settings_visible = false;

        let mut events = vec![CoreEvent::SettingsCommitted];

        if self.session.state() == TimerState::Ready {
            self.session
                .reset_display(self.profile.full_seconds, self.profile.warn_seconds);
            events.push(CoreEvent::RemainingChanged {
                remaining: self.session.remaining(),
            });
        }
        if counter_changed {
            events.push(CoreEvent::CounterVisibilityChanged {
                visible: self.profile.show_counter,
            });
        }
        events.extend(self.set_theme(self.profile.dark_theme));

        info!(
            full = self.profile.full_seconds,
            warn = self.profile.warn_seconds,
            end = ?self.profile.end_mode,
            warning = ?self.profile.warn_mode,
            "Settings committed"
        );

        Ok(events)
    }

    /// Discard edits and restore the committed theme
    pub fn settings_cancel(&mut self) -> Vec<CoreEvent> {
        self.draft = SettingsDraft::from_profile(&self.profile, &self.catalog);
        self.settings_visible = false;
        debug!("Settings cancelled");

        let mut events = vec![CoreEvent::SettingsCancelled];
        events.extend(self.set_theme(self.profile.dark_theme));
        events
    }

    fn set_theme(&mut self, dark: bool) -> Vec<CoreEvent> {
        if self.dark_theme == dark {
            return Vec::new();
        }
        self.dark_theme = dark;
        vec![CoreEvent::ThemeChanged { dark }]
    }

    /// Unlock audio on the first user gesture
    fn prime_sound(&mut self) {
        if self.primed {
            return;
        }
        self.primed = true;
        debug!("Priming sound output");

        let mut silent = self.end_utterance.clone();
        silent.text = String::new();
        if let Err(e) = self.speech.speak(&silent) {
            debug!(error = %e, "Speech priming failed");
        }
        self.play(&self.silence_sound);
    }

    fn announce(&self, utterance: &Utterance) {
        if let Err(e) = self.speech.cancel() {
            debug!(error = %e, "Speech cancel failed");
        }
        if let Err(e) = self.speech.speak(utterance) {
            warn!(error = %e, text = %utterance.text, "Speech failed");
        }
    }

    fn play(&self, sound: &SoundRef) {
        if let Err(e) = self.audio.play(sound) {
            warn!(error = %e, sound = %sound, "Playback failed");
        }
    }
}
