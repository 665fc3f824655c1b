use std::fmt;
use std::str::FromStr;

use geo::Polygon;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::combine::annotations::{AnnotationSet, LabeledObject};
use crate::combine::combine_errors::{CombineError, ConfigError, SetSide};
use crate::combine::geometry::{self, GeometryResult, SelectionPolicy};
use crate::combine::matcher::Correspondence;

/// How two matched outlines are folded into one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombinationMode {
    Union,
    #[default]
    Intersect,
}

impl FromStr for CombinationMode {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "union" => Ok(CombinationMode::Union),
            "intersect" => Ok(CombinationMode::Intersect),
            _ => Err(ConfigError::UnknownCombination(s.to_string())),
        }
    }
}

impl fmt::Display for CombinationMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CombinationMode::Union => write!(f, "union"),
            CombinationMode::Intersect => write!(f, "intersect"),
        }
    }
}

/// Per-step counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombineStats {
    pub merged: usize,
    pub dropped: usize,
    pub old_only: usize,
    pub new_only: usize,
}

#[derive(Debug, Clone)]
pub struct Combination {
    pub annotations: AnnotationSet,
    pub stats: CombineStats,
}

/// Builds the combined set out of two annotation sets and their correspondences.
///
/// Output order: merged pairs (in correspondence order), then accumulated objects without
/// a match, then incoming objects without a match (both by ascending index).
#[derive(Debug, Clone)]
pub struct Combiner {
    mode: CombinationMode,
    selection: SelectionPolicy,
}

impl Combiner {
    /// Creates default instance of Combiner
    ///
    /// Basic usage:
    ///
    /// ```
    /// use combine_annotations::combine::{CombinationMode, Combiner};
    /// let combiner = Combiner::default();
    /// assert_eq!(combiner.get_mode(), CombinationMode::Intersect);
    /// ```
    pub fn default() -> Self {
        Combiner {
            mode: CombinationMode::Intersect,
            selection: SelectionPolicy::First,
        }
    }
    pub fn new(_mode: CombinationMode, _selection: SelectionPolicy) -> Self {
        Combiner {
            mode: _mode,
            selection: _selection,
        }
    }
    pub fn get_mode(&self) -> CombinationMode {
        self.mode
    }
    pub fn combine_polygons(&self, old: &Polygon<f64>, new: &Polygon<f64>) -> GeometryResult {
        match self.mode {
            CombinationMode::Union => geometry::union(new, old),
            CombinationMode::Intersect => geometry::intersect(new, old),
        }
    }
    /// Merges matched pairs and passes unmatched objects through.
    ///
    /// `old_polygons`/`new_polygons` are the outlines of `old`/`new`, index for index.
    /// Incoming objects (merged or not) get `stream_index` stamped; accumulated objects
    /// without a match keep whatever they carried.
    pub fn combine(
        &self,
        old: &AnnotationSet,
        new: &AnnotationSet,
        old_polygons: &[Polygon<f64>],
        new_polygons: &[Polygon<f64>],
        matches: &[Correspondence],
        stream_index: usize,
    ) -> Result<Combination, CombineError> {
        let mut stats = CombineStats::default();
        let mut merged: Vec<LabeledObject> = Vec::new();
        let mut old_only: Vec<usize> = Vec::new();
        let mut new_only: Vec<usize> = Vec::new();

        for corr in matches {
            match (corr.old, corr.new) {
                (Some(o), Some(n)) => {
                    let old_object = lookup(old, SetSide::Old, o)?;
                    let new_object = lookup(new, SetSide::New, n)?;
                    let poly_old = lookup_polygon(old_polygons, SetSide::Old, o)?;
                    let poly_new = lookup_polygon(new_polygons, SetSide::New, n)?;
                    let result = self.combine_polygons(poly_old, poly_new);
                    let kind = result.kind();
                    match result.select(self.selection) {
                        Some(selected) => {
                            let mut object = geometry::polygon_to_object(&selected.polygon);
                            object.merge_metadata(old_object.get_metadata());
                            object.merge_metadata(new_object.get_metadata());
                            object.set_stream_index(stream_index);
                            merged.push(object);
                            stats.merged += 1;
                        }
                        None => {
                            warn!(
                                old = o,
                                new = n,
                                iou = corr.iou,
                                geometry = kind,
                                "No usable polygon from {} combination, dropping pair",
                                self.mode
                            );
                            stats.dropped += 1;
                        }
                    }
                }
                (Some(o), None) => old_only.push(o),
                (None, Some(n)) => new_only.push(n),
                (None, None) => {}
            }
        }
        old_only.sort_unstable();
        new_only.sort_unstable();
        stats.old_only = old_only.len();
        stats.new_only = new_only.len();

        let mut annotations = AnnotationSet::with_capacity(merged.len() + old_only.len() + new_only.len());
        for object in merged {
            annotations.push(object);
        }
        for o in old_only {
            annotations.push(lookup(old, SetSide::Old, o)?.clone());
        }
        for n in new_only {
            let mut object = lookup(new, SetSide::New, n)?.clone();
            object.set_stream_index(stream_index);
            annotations.push(object);
        }
        Ok(Combination { annotations, stats })
    }
}

fn lookup(set: &AnnotationSet, side: SetSide, index: usize) -> Result<&LabeledObject, CombineError> {
    set.get(index).ok_or(CombineError::NoObject { side, index })
}

fn lookup_polygon(
    polygons: &[Polygon<f64>],
    side: SetSide,
    index: usize,
) -> Result<&Polygon<f64>, CombineError> {
    polygons.get(index).ok_or(CombineError::NoObject { side, index })
}
