use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use env_logger::{Env, Target};
use log::LevelFilter;

use crate::config::LoggingSettings;

/// Route the `log` facade into `path`. The terminal is in raw mode while the
/// UI runs, so nothing may be written to stderr; without a usable file,
/// logging is switched off.
///
/// `RUST_LOG` wins over `logging.level`.
pub fn init(settings: &LoggingSettings, path: Option<PathBuf>) -> Option<PathBuf> {
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(settings.level.as_str()));
    builder.format_timestamp_millis();

    let opened = path.and_then(|p| match open_log_file(&p) {
        Ok(file) => Some((p, file)),
        Err(_) => None,
    });

    let written_to = match opened {
        Some((p, file)) => {
            builder.target(Target::Pipe(Box::new(file)));
            Some(p)
        }
        None => {
            builder.filter_level(LevelFilter::Off);
            None
        }
    };

    // A logger may already be installed (tests); keep it.
    let _ = builder.try_init();
    written_to
}

fn open_log_file(path: &Path) -> std::io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_and_parents_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/chordsync/chordsync.log");
        open_log_file(&path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn unusable_path_disables_file_logging() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"").unwrap();
        let settings = LoggingSettings::default();
        assert_eq!(init(&settings, Some(blocker.join("x.log"))), None);
    }
}
