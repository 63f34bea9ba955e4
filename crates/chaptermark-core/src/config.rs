use std::path::PathBuf;

use crate::{
    chapters::TitleStyle, remux::ExistingOutputPolicy, runlog::DEFAULT_LOG_FILE, tools::Tools,
};

/// Everything a batch run needs to know.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Directory scanned for `*.mp4` files (not recursive).
    pub dir: PathBuf,
    /// Run log file name, resolved against `dir` when relative.
    pub log_file: PathBuf,
    pub on_existing: ExistingOutputPolicy,
    pub titles: TitleStyle,
    /// Compare stream hashes of source and output after remuxing.
    pub verify: bool,
    pub tools: Tools,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            on_existing: ExistingOutputPolicy::default(),
            titles: TitleStyle::default(),
            verify: false,
            tools: Tools::default(),
        }
    }
}

impl BatchSettings {
    pub fn log_path(&self) -> PathBuf {
        self.dir.join(&self.log_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_do_not_overwrite() {
        let settings = BatchSettings::default();
        assert_eq!(settings.on_existing, ExistingOutputPolicy::Fail);
        assert_eq!(settings.titles, TitleStyle::Numbered);
        assert!(!settings.verify);
    }

    #[test]
    fn log_path_is_relative_to_dir() {
        let settings = BatchSettings {
            dir: PathBuf::from("/footage"),
            ..Default::default()
        };
        assert_eq!(
            settings.log_path(),
            PathBuf::from("/footage/chapter_injection_log.txt")
        );

        let absolute = BatchSettings {
            log_file: PathBuf::from("/tmp/run.log"),
            ..settings
        };
        assert_eq!(absolute.log_path(), PathBuf::from("/tmp/run.log"));
    }
}
