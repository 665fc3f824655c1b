use std::path::PathBuf;

/// Invalid combination settings. Raised once, before the first frame is processed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("min_iou must be within [0, 1], got {0}")]
    MinIouOutOfRange(f64),
    #[error("unknown combination: {0}")]
    UnknownCombination(String),
    #[error("unknown matching algorithm: {0}")]
    UnknownMatching(String),
    #[error("unknown selection policy: {0}")]
    UnknownSelection(String),
    #[error("no output file defined")]
    EmptyOutputPath,
    #[error("can't read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Geometry input that no set operation can work with.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("polygon has non-finite coordinate ({x}, {y})")]
    NonFinite { x: f64, y: f64 },
    #[error("polygon needs at least 3 points, got {0}")]
    TooFewPoints(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("can't write report {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CombineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("object {index} of the {side} set: {source}")]
    Geometry {
        side: SetSide,
        index: usize,
        source: GeometryError,
    },
    #[error("no object {index} in the {side} set")]
    NoObject { side: SetSide, index: usize },
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Which of the two combined sets an object came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetSide {
    Old,
    New,
}

impl std::fmt::Display for SetSide {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SetSide::Old => write!(f, "accumulated"),
            SetSide::New => write!(f, "incoming"),
        }
    }
}
