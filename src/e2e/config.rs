//! Suite settings, read from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) runs the
//! suite in `full` mode against data under `./data`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::FileFormat;
use crate::types::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Compare the engine against the live reference engine.
    Full,
    /// Capture reference results for later `ci` runs.
    Generator,
    /// Compare the engine against captured reference results.
    Ci,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExecutionMode::Full => write!(f, "full"),
            ExecutionMode::Generator => write!(f, "generator"),
            ExecutionMode::Ci => write!(f, "ci"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub run: RunSettings,
    pub test: TestSettings,
    pub skip: Vec<SkipRule>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunSettings {
    pub execution_mode: ExecutionMode,
    /// In `full` mode, skip the reference engine and only run the engine.
    pub compare_results: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TestSettings {
    pub data_directory: PathBuf,
    pub log_directory: PathBuf,
    pub results_directory: PathBuf,
    /// Generate the TPC-H subset when the data directory has no tables.
    pub generate_data: bool,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub orders: usize,
    pub seed: u64,
}

/// Excludes a query type, a file format, or the pair, from a run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SkipRule {
    pub query_type: Option<String>,
    pub file_format: Option<FileFormat>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::Full,
            compare_results: true,
        }
    }
}

impl Default for TestSettings {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::from("data"),
            log_directory: PathBuf::from("logs"),
            results_directory: PathBuf::from("results"),
            generate_data: true,
            generator: GeneratorConfig::default(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            orders: 1500,
            seed: 0x7c_5e_ed,
        }
    }
}

impl SkipRule {
    fn matches(&self, query_type: &str, file_format: FileFormat) -> bool {
        if self.query_type.is_none() && self.file_format.is_none() {
            return false;
        }
        let type_matches = self
            .query_type
            .as_deref()
            .map_or(true, |t| t.eq_ignore_ascii_case(query_type));
        let format_matches = self.file_format.map_or(true, |f| f == file_format);
        type_matches && format_matches
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Settings> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Could not read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Settings> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Whether the suite should leave out `file_format` for `query_type`.
    pub fn skip_test(&self, file_format: FileFormat, query_type: &str) -> bool {
        self.skip.iter().any(|rule| rule.matches(query_type, file_format))
    }

    /// The reference engine is consulted unless a `full` run opted out.
    pub fn uses_reference(&self) -> bool {
        self.run.execution_mode != ExecutionMode::Full || self.run.compare_results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings.run.execution_mode, ExecutionMode::Full);
        assert!(settings.run.compare_results);
        assert_eq!(settings.test.data_directory, PathBuf::from("data"));
        assert_eq!(settings.test.generator.orders, 1500);
        assert!(settings.skip.is_empty());
    }

    #[test]
    fn parses_sections_and_skip_rules() {
        let settings = Settings::from_toml_str(
            r#"
            [run]
            execution_mode = "ci"

            [test]
            data_directory = "/tmp/tpch"

            [[skip]]
            query_type = "Timestampdiff"
            file_format = "csv"

            [[skip]]
            file_format = "parquet"
            "#,
        )
        .unwrap();

        assert_eq!(settings.run.execution_mode, ExecutionMode::Ci);
        assert_eq!(settings.test.data_directory, PathBuf::from("/tmp/tpch"));
        assert_eq!(settings.test.log_directory, PathBuf::from("logs"));
        assert!(settings.skip_test(FileFormat::Csv, "timestampdiff"));
        assert!(!settings.skip_test(FileFormat::Csv, "Other"));
        assert!(settings.skip_test(FileFormat::Parquet, "Other"));
    }

    #[test]
    fn empty_skip_rule_matches_nothing() {
        let settings = Settings {
            skip: vec![SkipRule::default()],
            ..Settings::default()
        };
        assert!(!settings.skip_test(FileFormat::Csv, "Timestampdiff"));
    }

    #[test]
    fn bundled_settings_match_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("e2e.toml");
        let settings = Settings::from_file(&path).unwrap();
        let defaults = Settings::default();
        assert_eq!(settings.run.execution_mode, defaults.run.execution_mode);
        assert_eq!(settings.test.generator.seed, defaults.test.generator.seed);
        assert_eq!(settings.test.results_directory, defaults.test.results_directory);
    }

    #[test]
    fn rejects_unknown_modes() {
        assert!(matches!(
            Settings::from_toml_str("[run]\nexecution_mode = \"nightly\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn full_mode_can_opt_out_of_comparison() {
        let mut settings = Settings::default();
        settings.run.compare_results = false;
        assert!(!settings.uses_reference());
        settings.run.execution_mode = ExecutionMode::Generator;
        assert!(settings.uses_reference());
    }
}
