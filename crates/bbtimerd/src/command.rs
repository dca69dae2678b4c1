//! Terminal commands accepted on stdin

use bbtimer_config::NotificationMode;
use bbtimer_core::SettingsDraft;

/// One line typed by the user
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Tap,
    Jump,
    Settings,
    Ok,
    Cancel,
    Set(SettingChange),
    Theme(bool),
    Status,
    Voices,
    Help,
    Quit,
}

/// Edit to the settings draft
#[derive(Debug, Clone, PartialEq)]
pub enum SettingChange {
    Full(u32),
    Warn(u32),
    End(NotificationMode),
    Warning(NotificationMode),
    Voice(usize),
    Rate(f32),
    Counter(bool),
    Dark(bool),
}

impl SettingChange {
    pub fn apply(&self, draft: &mut SettingsDraft) {
        match *self {
            SettingChange::Full(secs) => draft.full_seconds = secs,
            SettingChange::Warn(secs) => draft.warn_seconds = secs,
            SettingChange::End(mode) => {
                draft.end_voice = mode.plays_voice();
                draft.end_beep = mode.plays_beep();
            }
            SettingChange::Warning(mode) => {
                draft.warn_voice = mode.plays_voice();
                draft.warn_beep = mode.plays_beep();
            }
            SettingChange::Voice(index) => draft.voice_index = Some(index),
            SettingChange::Rate(rate) => draft.speech_rate = rate,
            SettingChange::Counter(show) => draft.show_counter = show,
            SettingChange::Dark(dark) => draft.dark_theme = dark,
        }
    }
}

pub const HELP: &str = "\
commands:
  tap                 start, or reset a running/finished countdown
  jump                run with only the warning time left
  settings            open settings
  set <field> <value> edit a setting (full, warn, end, warning, voice, rate, counter, dark)
  ok | cancel         commit or discard settings
  theme on|off        preview the dark theme
  status | voices     show state or the voice list
  quit";

fn parse_mode(value: &str) -> Result<NotificationMode, String> {
    match value {
        "none" => Ok(NotificationMode::None),
        "voice" => Ok(NotificationMode::Voice),
        "beep" => Ok(NotificationMode::Beep),
        other => Err(format!("unknown mode '{}' (none, voice, beep)", other)),
    }
}

fn parse_switch(value: &str) -> Result<bool, String> {
    match value {
        "on" | "1" | "true" => Ok(true),
        "off" | "0" | "false" => Ok(false),
        other => Err(format!("expected on or off, got '{}'", other)),
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid value '{}' for {}", value, field))
}

fn parse_setting(field: &str, value: &str) -> Result<SettingChange, String> {
    Ok(match field {
        "full" => SettingChange::Full(parse_number(field, value)?),
        "warn" => SettingChange::Warn(parse_number(field, value)?),
        "end" => SettingChange::End(parse_mode(value)?),
        "warning" => SettingChange::Warning(parse_mode(value)?),
        "voice" => SettingChange::Voice(parse_number(field, value)?),
        "rate" => SettingChange::Rate(parse_number(field, value)?),
        "counter" => SettingChange::Counter(parse_switch(value)?),
        "dark" => SettingChange::Dark(parse_switch(value)?),
        other => return Err(format!("unknown setting '{}'", other)),
    })
}

/// Parse one input line. Blank lines are a tap, like a tap anywhere on the page.
pub fn parse_command(line: &str) -> Result<UserCommand, String> {
    let words: Vec<&str> = line.split_whitespace().collect();

    match words.as_slice() {
        [] | ["tap"] => Ok(UserCommand::Tap),
        ["jump"] => Ok(UserCommand::Jump),
        ["settings"] => Ok(UserCommand::Settings),
        ["ok"] => Ok(UserCommand::Ok),
        ["cancel"] => Ok(UserCommand::Cancel),
        ["set", field, value] => parse_setting(field, value).map(UserCommand::Set),
        ["theme", value] => parse_switch(value).map(UserCommand::Theme),
        ["status"] => Ok(UserCommand::Status),
        ["voices"] => Ok(UserCommand::Voices),
        ["help"] | ["?"] => Ok(UserCommand::Help),
        ["quit"] | ["exit"] => Ok(UserCommand::Quit),
        _ => Err(format!("unknown command '{}', try 'help'", line.trim())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbtimer_config::TimerDefaults;
    use bbtimer_core::{SettingsProfile, VoiceCatalog};
    use bbtimer_host_api::PlatformInfo;

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_command(""), Ok(UserCommand::Tap));
        assert_eq!(parse_command("  tap "), Ok(UserCommand::Tap));
        assert_eq!(parse_command("jump"), Ok(UserCommand::Jump));
        assert_eq!(parse_command("exit"), Ok(UserCommand::Quit));
        assert_eq!(parse_command("theme on"), Ok(UserCommand::Theme(true)));
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_set_commands() {
        assert_eq!(
            parse_command("set full 30"),
            Ok(UserCommand::Set(SettingChange::Full(30)))
        );
        assert_eq!(
            parse_command("set warning beep"),
            Ok(UserCommand::Set(SettingChange::Warning(NotificationMode::Beep)))
        );
        assert_eq!(
            parse_command("set rate 1.5"),
            Ok(UserCommand::Set(SettingChange::Rate(1.5)))
        );
        assert!(parse_command("set full soon").is_err());
        assert!(parse_command("set end loud").is_err());
        assert!(parse_command("set volume 3").is_err());
    }

    #[test]
    fn test_apply_mode_keeps_selection_exclusive() {
        let profile = SettingsProfile::defaults(&TimerDefaults::default(), &PlatformInfo::default());
        let mut draft = SettingsDraft::from_profile(&profile, &VoiceCatalog::default());

        SettingChange::End(NotificationMode::Beep).apply(&mut draft);
        assert!(!draft.end_voice);
        assert!(draft.end_beep);

        SettingChange::End(NotificationMode::None).apply(&mut draft);
        assert_eq!(draft.end_mode(), NotificationMode::None);
    }
}
