//! Configuration structures for the extraction pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FiscalFlowError, Result};

/// Main configuration for the fiscalflow pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FiscalFlowConfig {
    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Batch processing configuration.
    pub batch: BatchConfig,

    /// Report output configuration.
    pub output: OutputConfig,
}

/// Invoice field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Substring of a technical-contact e-mail domain mapped to an issuing-system name.
    pub vendor_aliases: BTreeMap<String, String>,

    /// Appended to the title-cased domain label when no alias matches.
    pub vendor_suffix: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            vendor_aliases: BTreeMap::from([("narwal".to_string(), "Narwal Sistemas".to_string())]),
            vendor_suffix: " Sistemas".to_string(),
        }
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of worker threads (1 = sequential).
    pub jobs: usize,

    /// Keep going after a document fails to parse.
    pub continue_on_error: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: 4,
            continue_on_error: true,
        }
    }
}

/// Report output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report base name; `{date}` is replaced by the run date.
    pub filename_pattern: String,

    /// Default directory for reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            filename_pattern: "NFe_Report_{date}".to_string(),
            directory: None,
        }
    }
}

impl OutputConfig {
    /// Expand the filename pattern for the given `YYYY-MM-DD` date.
    pub fn file_stem(&self, date: &str) -> String {
        self.filename_pattern.replace("{date}", date)
    }
}

impl FiscalFlowConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| FiscalFlowError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| FiscalFlowError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
