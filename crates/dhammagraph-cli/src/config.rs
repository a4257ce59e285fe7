//! Runtime configuration: a JSON file, then command-line overrides.

use anyhow::{Context, Result};
use dhammagraph_ingest::LoaderConfig;
use dhammagraph_nav::{DEFAULT_MIN_QUERY_LEN, DEFAULT_TRAIL_LIMIT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Correction table shipped with the workbook.
pub const DEFAULT_CORRECTIONS: &str = "data/corrections.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Source workbook (JSON export of the spreadsheet).
    pub source: PathBuf,
    /// Correction table; `null` seeds the raw co-occurrence edges.
    pub corrections: Option<PathBuf>,
    /// Directory of `{slug}.md` essays.
    pub essays_dir: Option<PathBuf>,
    pub snapshot: PathBuf,
    pub breadcrumb_limit: usize,
    pub search_min_len: usize,
    pub detect_cross_references: bool,
    pub min_pali_fragment: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        let loader = LoaderConfig::default();
        Self {
            source: PathBuf::from("data/workbook.json"),
            corrections: Some(PathBuf::from(DEFAULT_CORRECTIONS)),
            essays_dir: None,
            snapshot: PathBuf::from("data/graph.json"),
            breadcrumb_limit: DEFAULT_TRAIL_LIMIT,
            search_min_len: DEFAULT_MIN_QUERY_LEN,
            detect_cross_references: loader.detect_cross_references,
            min_pali_fragment: loader.min_pali_fragment,
        }
    }
}

/// Flags that, when given, win over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub source: Option<PathBuf>,
    pub corrections: Option<PathBuf>,
    pub essays_dir: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
    pub no_corrections: bool,
    pub no_cross_references: bool,
}

impl GraphConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// File values (or defaults when `path` is `None`) with `overrides` applied.
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(source) = overrides.source {
            config.source = source;
        }
        if let Some(corrections) = overrides.corrections {
            config.corrections = Some(corrections);
        }
        if overrides.no_corrections {
            config.corrections = None;
        }
        if let Some(dir) = overrides.essays_dir {
            config.essays_dir = Some(dir);
        }
        if let Some(snapshot) = overrides.snapshot {
            config.snapshot = snapshot;
        }
        if overrides.no_cross_references {
            config.detect_cross_references = false;
        }
        Ok(config)
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            detect_cross_references: self.detect_cross_references,
            min_pali_fragment: self.min_pali_fragment,
            ..LoaderConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"snapshot": "out/graph.json", "breadcrumb_limit": 5}"#).unwrap();

        let config = GraphConfig::load(&path).unwrap();
        assert_eq!(config.snapshot, PathBuf::from("out/graph.json"));
        assert_eq!(config.breadcrumb_limit, 5);
        assert_eq!(config.search_min_len, DEFAULT_MIN_QUERY_LEN);
        assert!(config.detect_cross_references);
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"source": "a.json", "min_pali_fragment": 4}"#).unwrap();

        let config = GraphConfig::resolve(
            Some(&path),
            Overrides {
                source: Some(PathBuf::from("b.json")),
                no_cross_references: true,
                ..Overrides::default()
            },
        )
        .unwrap();
        assert_eq!(config.source, PathBuf::from("b.json"));
        let loader = config.loader_config();
        assert!(!loader.detect_cross_references);
        assert_eq!(loader.min_pali_fragment, 4);
        assert!(loader.column_cooccurrence);
    }

    #[test]
    fn test_shipped_corrections_are_the_default() {
        let config = GraphConfig::resolve(None, Overrides::default()).unwrap();
        assert_eq!(config.corrections, Some(PathBuf::from(DEFAULT_CORRECTIONS)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"corrections": null}"#).unwrap();
        assert_eq!(GraphConfig::load(&path).unwrap().corrections, None);

        let config = GraphConfig::resolve(
            None,
            Overrides {
                no_corrections: true,
                ..Overrides::default()
            },
        )
        .unwrap();
        assert_eq!(config.corrections, None);
    }

    #[test]
    fn test_shipped_table_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..").join(DEFAULT_CORRECTIONS);
        let table = dhammagraph_ingest::CorrectionTable::load(&path).unwrap();
        assert_eq!(table.narrowings.len(), 6);
        assert_eq!(table.skips.len(), 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = GraphConfig::load(Path::new("/nonexistent/dhammagraph.json")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
