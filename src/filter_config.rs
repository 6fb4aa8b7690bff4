//! This module defines the `FilterConfig` struct, which holds the parameters that decide
//! which raw reads survive preprocessing: the expected read length and the allowed deviation
//! from it, the literal primers every read must start and end with, and the minimum number
//! of occurrences a read needs to be kept. Parameters can be read from a TOML file and
//! overridden field by field.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub min_count: usize,
    pub tolerance: usize,
    pub target_length: usize,
    pub fwd_primer: String,
    pub rev_primer: String,
}

impl FilterConfig {
    pub fn new(
        min_count: usize,
        tolerance: usize,
        target_length: usize,
        fwd_primer: &str,
        rev_primer: &str,
    ) -> Self {
        FilterConfig {
            min_count,
            tolerance,
            target_length,
            fwd_primer: fwd_primer.to_string(),
            rev_primer: rev_primer.to_string(),
        }
    }

    /// Inclusive range of read lengths accepted by the length filter.
    pub fn length_window(&self) -> (usize, usize) {
        (
            self.target_length.saturating_sub(self.tolerance),
            self.target_length.saturating_add(self.tolerance),
        )
    }

    /// Return true if the read passes the length and primer filter.
    pub fn accepts(&self, read: &str) -> bool {
        let (min_len, max_len) = self.length_window();
        (min_len..=max_len).contains(&read.len())
            && read.starts_with(&self.fwd_primer)
            && read.ends_with(&self.rev_primer)
    }
}

/// Preprocessing parameters as they appear in a TOML file. Every field is optional so that
/// command-line flags can fill or override them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub min_count: Option<usize>,
    pub tolerance: Option<usize>,
    pub target_length: Option<usize>,
    pub fwd_primer: Option<String>,
    pub rev_primer: Option<String>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&content).context(format!("Invalid config file {}", path.display()))
    }

    /// Values set in `other` take precedence over values in `self`.
    pub fn merge(self, other: ConfigFile) -> ConfigFile {
        ConfigFile {
            min_count: other.min_count.or(self.min_count),
            tolerance: other.tolerance.or(self.tolerance),
            target_length: other.target_length.or(self.target_length),
            fwd_primer: other.fwd_primer.or(self.fwd_primer),
            rev_primer: other.rev_primer.or(self.rev_primer),
        }
    }

    /// Check the values that are set, normalizing adapters to upper case.
    pub fn validate(self) -> Result<ConfigFile> {
        Ok(ConfigFile {
            min_count: self.min_count.map(validate_min_count).transpose()?,
            fwd_primer: self.fwd_primer.as_deref().map(validate_adapter).transpose()?,
            rev_primer: self.rev_primer.as_deref().map(validate_adapter).transpose()?,
            ..self
        })
    }
}

pub fn validate_min_count(min_count: usize) -> Result<usize> {
    if min_count < 1 {
        bail!("Minimum count must be at least 1");
    }

    Ok(min_count)
}

pub fn validate_adapter(adapter: &str) -> Result<String> {
    if !adapter.bytes().all(|b| b"ACGTUacgtu".contains(&b)) {
        bail!("Adapter `{adapter}` may only contain A, C, G, T and U");
    }

    Ok(adapter.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_length_window_saturates() {
        let config = FilterConfig::new(1, 5, 3, "", "");
        assert_eq!(config.length_window(), (0, 8));
    }

    #[test]
    fn test_accepts() {
        let config = FilterConfig::new(1, 0, 3, "X", "Y");
        assert!(config.accepts("XAY"));
        assert!(!config.accepts("XAUY"));
        assert!(!config.accepts("AAY"));
        assert!(!config.accepts("XAA"));
    }

    #[test]
    fn test_load_and_merge() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "min_count = 2\ntarget_length = 50\nfwd_primer = \"AUCG\"")?;

        let from_file = ConfigFile::load(file.path())?;
        assert_eq!(from_file.min_count, Some(2));
        assert_eq!(from_file.tolerance, None);

        let from_cli = ConfigFile {
            min_count: Some(5),
            rev_primer: Some("UAGC".to_string()),
            ..Default::default()
        };

        let merged = from_file.merge(from_cli);
        assert_eq!(merged.min_count, Some(5));
        assert_eq!(merged.target_length, Some(50));
        assert_eq!(merged.fwd_primer.as_deref(), Some("AUCG"));
        assert_eq!(merged.rev_primer.as_deref(), Some("UAGC"));

        Ok(())
    }

    #[test]
    fn test_load_rejects_unknown_fields() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "min_cnt = 2")?;

        assert!(ConfigFile::load(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_validate() -> Result<()> {
        let params = ConfigFile {
            min_count: Some(2),
            fwd_primer: Some("aucg".to_string()),
            ..Default::default()
        };
        let params = params.validate()?;
        assert_eq!(params.min_count, Some(2));
        assert_eq!(params.fwd_primer.as_deref(), Some("AUCG"));

        let zero_count = ConfigFile {
            min_count: Some(0),
            ..Default::default()
        };
        assert!(zero_count.validate().is_err());

        let bad_adapter = ConfigFile {
            rev_primer: Some("XN".to_string()),
            ..Default::default()
        };
        assert!(bad_adapter.validate().is_err());

        Ok(())
    }
}
