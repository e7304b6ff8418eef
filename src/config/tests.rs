use super::load::{default_config_path, default_log_path, resolve_config_path};
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_chordsync_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("CHORDSYNC_CONFIG_PATH", "/tmp/chordsync-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/chordsync-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("chordsync")
            .join("config.toml")
    );
}

#[test]
fn default_config_path_falls_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".config")
            .join("chordsync")
            .join("config.toml")
    );
}

#[test]
fn default_log_path_uses_state_dir() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_STATE_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");
    assert_eq!(
        default_log_path().unwrap(),
        std::path::PathBuf::from("/tmp/home-dir/.local/state/chordsync/chordsync.log")
    );

    let _g3 = EnvGuard::set("XDG_STATE_HOME", "/tmp/state");
    assert_eq!(
        default_log_path().unwrap(),
        std::path::PathBuf::from("/tmp/state/chordsync/chordsync.log")
    );
}

#[test]
fn configured_log_file_wins() {
    let mut s = Settings::default();
    s.logging.file = Some("/tmp/custom.log".into());
    assert_eq!(s.log_path(), Some(std::path::PathBuf::from("/tmp/custom.log")));
}

#[test]
fn defaults_are_valid() {
    let s = Settings::default();
    assert!(s.validate().is_ok());
    assert_eq!(s.waveform.points, 150);
    assert_eq!(s.audio.source_validity_secs, 3300);
    assert_eq!(s.catalog.sidecar_suffix, ".chords.json");
    assert_eq!(s.logging.level, "info");
}

#[test]
fn validate_rejects_degenerate_values() {
    let mut s = Settings::default();
    s.waveform.points = 0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.waveform.zoom_step = 1.0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.waveform.max_zoom = 0.5;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.ui.tick_ms = 0;
    assert!(s.validate().is_err());
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
volume = 0.5
source_validity_secs = 600
preload_on_select = false

[waveform]
points = 300
zoom_step = 2.0
max_zoom = 16.0

[controls]
skip_seconds = 9

[ui]
header_text = "hello"
tick_ms = 16
scroll_smoothing = 0.5

[catalog]
extensions = ["mp3"]
recursive = false
include_hidden = false
follow_links = false
sidecar_suffix = ".analysis.json"

[logging]
level = "debug"
file = "/tmp/chordsync.log"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("CHORDSYNC_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("CHORDSYNC__AUDIO__VOLUME");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.volume, 0.5);
    assert_eq!(s.audio.source_validity_secs, 600);
    assert!(!s.audio.preload_on_select);
    assert_eq!(s.waveform.points, 300);
    assert_eq!(s.waveform.zoom_step, 2.0);
    assert_eq!(s.waveform.max_zoom, 16.0);
    assert_eq!(s.controls.skip_seconds, 9);
    assert_eq!(s.ui.header_text, "hello");
    assert_eq!(s.ui.tick_ms, 16);
    assert_eq!(s.ui.idle_poll_ms, 100);
    assert_eq!(s.ui.scroll_smoothing, 0.5);
    assert_eq!(s.catalog.extensions, vec!["mp3".to_string()]);
    assert!(!s.catalog.recursive);
    assert!(!s.catalog.include_hidden);
    assert!(!s.catalog.follow_links);
    assert_eq!(s.catalog.sidecar_suffix, ".analysis.json");
    assert_eq!(s.logging.level, "debug");
    assert_eq!(
        s.logging.file,
        Some(std::path::PathBuf::from("/tmp/chordsync.log"))
    );
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[controls]
skip_seconds = 5
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("CHORDSYNC_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("CHORDSYNC__CONTROLS__SKIP_SECONDS", "12");

    let s = Settings::load().unwrap();
    assert_eq!(s.controls.skip_seconds, 12);
}
