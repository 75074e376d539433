use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::barcode::CodeCleaner;
use crate::error::ConfigError;
use crate::layout::LayoutRepair;
use crate::types::ScanContext;

/// Quiet-period profile of a scan field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceProfile {
    Standard,
    Fast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub quiet_period_ms: u64,
    pub fast_quiet_period_ms: u64,
    /// Fields whose scanners send bursts fast enough for the short window.
    pub fast_fields: Vec<ScanContext>,
    pub min_code_len: usize,
    pub repair: LayoutRepair,
    pub pickup_preview: bool,
    pub database_path: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 400,
            fast_quiet_period_ms: 150,
            fast_fields: Vec::new(),
            min_code_len: 2,
            repair: LayoutRepair::default(),
            pickup_preview: true,
            database_path: PathBuf::from("caisse.db"),
        }
    }
}

impl ScanConfig {
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn quiet_period(&self, profile: DebounceProfile) -> Duration {
        match profile {
            DebounceProfile::Standard => Duration::from_millis(self.quiet_period_ms),
            DebounceProfile::Fast => Duration::from_millis(self.fast_quiet_period_ms),
        }
    }

    pub fn profile_for(&self, context: ScanContext) -> DebounceProfile {
        if self.fast_fields.contains(&context) {
            DebounceProfile::Fast
        } else {
            DebounceProfile::Standard
        }
    }

    pub fn cleaner(&self) -> CodeCleaner {
        CodeCleaner::new(self.repair, self.min_code_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScanConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ScanConfig::default());
        assert_eq!(
            config.quiet_period(DebounceProfile::Standard),
            Duration::from_millis(400)
        );
        assert_eq!(
            config.quiet_period(DebounceProfile::Fast),
            Duration::from_millis(150)
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"quiet_period_ms": 250, "repair": {{"min_count": 4}}}}"#).unwrap();
        let config = ScanConfig::load(file.path()).unwrap();
        assert_eq!(config.quiet_period_ms, 250);
        assert_eq!(config.repair.min_count, 4);
        assert_eq!(config.repair.ratio, 0.2);
        assert_eq!(config.min_code_len, 2);
        assert_eq!(config.cleaner().min_len(), 2);
    }

    #[test]
    fn fast_fields_select_the_short_window() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fast_fields": ["point_of_sale"]}}"#).unwrap();
        let config = ScanConfig::load(file.path()).unwrap();
        assert_eq!(
            config.profile_for(ScanContext::PointOfSale),
            DebounceProfile::Fast
        );
        assert_eq!(
            config.profile_for(ScanContext::Pickup),
            DebounceProfile::Standard
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            ScanConfig::load(file.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
