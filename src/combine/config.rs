use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::combine::combine_errors::ConfigError;
use crate::combine::combiner::CombinationMode;
use crate::combine::geometry::SelectionPolicy;
use crate::combine::matcher::MatchingAlgorithm;

pub const DEFAULT_MIN_IOU: f64 = 0.7;
pub const DEFAULT_OUTPUT_PATH: &str = "./combined.report";

/// Settings of the combination filter.
///
/// `output_path` must already have any placeholders expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineConfig {
    pub min_iou: f64,
    pub combination: CombinationMode,
    pub output_path: PathBuf,
    pub matching: MatchingAlgorithm,
    pub selection: SelectionPolicy,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            min_iou: DEFAULT_MIN_IOU,
            combination: CombinationMode::Intersect,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            matching: MatchingAlgorithm::Greedy,
            selection: SelectionPolicy::First,
        }
    }
}

impl CombineConfig {
    pub fn new<P: Into<PathBuf>>(min_iou: f64, combination: CombinationMode, output_path: P) -> Self {
        Self {
            min_iou,
            combination,
            output_path: output_path.into(),
            ..Self::default()
        }
    }
    pub fn with_matching(mut self, matching: MatchingAlgorithm) -> Self {
        self.matching = matching;
        self
    }
    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_iou) {
            return Err(ConfigError::MinIouOutOfRange(self.min_iou));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputPath);
        }
        Ok(())
    }
    /// Parses and validates TOML settings. Missing keys take their defaults.
    ///
    /// ```
    /// use combine_annotations::combine::{CombineConfig, CombinationMode};
    /// let config = CombineConfig::from_toml_str("min_iou = 0.5\ncombination = \"union\"").unwrap();
    /// assert_eq!(config.combination, CombinationMode::Union);
    /// assert_eq!(config.min_iou, 0.5);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: CombineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CombineConfig::default();
        assert_eq!(config.min_iou, 0.7);
        assert_eq!(config.combination, CombinationMode::Intersect);
        assert_eq!(config.matching, MatchingAlgorithm::Greedy);
        assert_eq!(config.selection, SelectionPolicy::First);
        assert!(config.validate().is_ok());
        assert_eq!(CombineConfig::from_toml_str("").unwrap(), config);
    }

    #[test]
    fn test_validation() {
        let config = CombineConfig::new(1.5, CombinationMode::Union, "out.report");
        assert!(matches!(config.validate(), Err(ConfigError::MinIouOutOfRange(_))));
        let config = CombineConfig::new(f64::NAN, CombinationMode::Union, "out.report");
        assert!(matches!(config.validate(), Err(ConfigError::MinIouOutOfRange(_))));
        let config = CombineConfig::new(0.5, CombinationMode::Union, "");
        assert!(matches!(config.validate(), Err(ConfigError::EmptyOutputPath)));
        let config = CombineConfig::new(0.0, CombinationMode::Union, "out.report");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_combination() {
        let err = CombineConfig::from_toml_str("combination = \"xor\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
        let err = CombineConfig::from_toml_str("output_path = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyOutputPath));
    }

    #[test]
    fn test_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "min_iou = 0.3\ncombination = \"union\"\noutput_path = \"/tmp/out.json\"\nmatching = \"hungarian\"\nselection = \"largest_area\""
        )
        .unwrap();
        let config = CombineConfig::load(file.path()).unwrap();
        assert_eq!(config.min_iou, 0.3);
        assert_eq!(config.combination, CombinationMode::Union);
        assert_eq!(config.output_path, PathBuf::from("/tmp/out.json"));
        assert_eq!(config.matching, MatchingAlgorithm::Hungarian);
        assert_eq!(config.selection, SelectionPolicy::LargestArea);

        let err = CombineConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
