use std::collections::BTreeSet;
use std::str::FromStr;

use geo::Polygon;
use itertools::iproduct;
use pathfinding::{matrix::Matrix, prelude::kuhn_munkres};
use serde::{Deserialize, Serialize};

use crate::combine::combine_errors::ConfigError;
use crate::combine::geometry::iou;

const SCALE_FACTOR: f64 = 1_000_000.0;

/// Pairing of one accumulated object with one incoming object.
/// Unmatched objects have `None` on the other side and `iou == 0.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub old: Option<usize>,
    pub new: Option<usize>,
    pub iou: f64,
}

impl Correspondence {
    pub fn matched(old: usize, new: usize, iou: f64) -> Self {
        Correspondence {
            old: Some(old),
            new: Some(new),
            iou,
        }
    }
    pub fn old_only(old: usize) -> Self {
        Correspondence {
            old: Some(old),
            new: None,
            iou: 0.0,
        }
    }
    pub fn new_only(new: usize) -> Self {
        Correspondence {
            old: None,
            new: Some(new),
            iou: 0.0,
        }
    }
    pub fn is_matched(&self) -> bool {
        self.old.is_some() && self.new.is_some()
    }
}

/// Common interface for correspondence search between accumulated and incoming outlines.
///
/// Every old and every new index must show up in exactly one returned correspondence.
///
/// Implementations:
/// - `GreedyMatcher` - first pair above threshold wins (default)
/// - `HungarianMatcher` - maximum total IoU assignment
pub trait Matcher: Send + Sync {
    fn find_matches(&self, old: &[Polygon<f64>], new: &[Polygon<f64>]) -> Vec<Correspondence>;
    fn get_min_iou(&self) -> f64;
}

/// Algorithm type for matching accumulated objects to incoming ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingAlgorithm {
    /// Visit pairs in (new, old) index order and take the first one above threshold
    #[default]
    Greedy,
    /// Use the Hungarian algorithm (Kuhn-Munkres) for optimal assignment
    Hungarian,
}

impl FromStr for MatchingAlgorithm {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(MatchingAlgorithm::Greedy),
            "hungarian" => Ok(MatchingAlgorithm::Hungarian),
            _ => Err(ConfigError::UnknownMatching(s.to_string())),
        }
    }
}

pub fn build_matcher(algorithm: MatchingAlgorithm, min_iou: f64) -> Box<dyn Matcher> {
    match algorithm {
        MatchingAlgorithm::Greedy => Box::new(GreedyMatcher::new(min_iou)),
        MatchingAlgorithm::Hungarian => Box::new(HungarianMatcher::new(min_iou)),
    }
}

/// Greedy IoU matcher.
///
/// Pairs are visited new-index ascending, then old-index ascending. The first pair at or
/// above `min_iou` whose both sides are still free is committed. This is not a
/// maximum-weight matching: an earlier weaker pair can consume an object that a later
/// pair would have matched better. Use `HungarianMatcher` when that matters.
#[derive(Debug, Clone)]
pub struct GreedyMatcher {
    // Minimum IoU for two outlines to be considered the same object. Default is 0.7
    min_iou: f64,
}

impl GreedyMatcher {
    /// Creates default instance of GreedyMatcher
    ///
    /// Basic usage:
    ///
    /// ```
    /// use combine_annotations::combine::{GreedyMatcher, Matcher};
    /// let matcher = GreedyMatcher::default();
    /// assert_eq!(matcher.get_min_iou(), 0.7);
    /// ```
    pub fn default() -> Self {
        GreedyMatcher { min_iou: 0.7 }
    }
    pub fn new(_min_iou: f64) -> Self {
        GreedyMatcher { min_iou: _min_iou }
    }
}

impl Matcher for GreedyMatcher {
    fn find_matches(&self, old: &[Polygon<f64>], new: &[Polygon<f64>]) -> Vec<Correspondence> {
        let mut unmatched_new: BTreeSet<usize> = (0..new.len()).collect();
        let mut unmatched_old: BTreeSet<usize> = (0..old.len()).collect();
        let mut result = Vec::with_capacity(old.len() + new.len());
        for (n, o) in iproduct!(0..new.len(), 0..old.len()) {
            if !unmatched_new.contains(&n) || !unmatched_old.contains(&o) {
                continue;
            }
            let iou_value = iou(&new[n], &old[o]);
            if iou_value > 0.0 && iou_value >= self.min_iou {
                unmatched_new.remove(&n);
                unmatched_old.remove(&o);
                result.push(Correspondence::matched(o, n, iou_value));
            }
        }
        append_unmatched(&mut result, unmatched_old, unmatched_new);
        result
    }
    fn get_min_iou(&self) -> f64 {
        self.min_iou
    }
}

/// Optimal IoU matcher: maximizes the summed IoU of the committed pairs
#[derive(Debug, Clone)]
pub struct HungarianMatcher {
    min_iou: f64,
}

impl HungarianMatcher {
    pub fn default() -> Self {
        HungarianMatcher { min_iou: 0.7 }
    }
    pub fn new(_min_iou: f64) -> Self {
        HungarianMatcher { min_iou: _min_iou }
    }
    fn qualifies(&self, iou_value: f64) -> bool {
        iou_value > 0.0 && iou_value >= self.min_iou
    }
}

impl Matcher for HungarianMatcher {
    fn find_matches(&self, old: &[Polygon<f64>], new: &[Polygon<f64>]) -> Vec<Correspondence> {
        let mut unmatched_new: BTreeSet<usize> = (0..new.len()).collect();
        let mut unmatched_old: BTreeSet<usize> = (0..old.len()).collect();
        let mut result = Vec::with_capacity(old.len() + new.len());
        if old.is_empty() || new.is_empty() {
            append_unmatched(&mut result, unmatched_old, unmatched_new);
            return result;
        }
        // Rows = old objects, columns = new objects
        let iou_matrix: Vec<Vec<f64>> = old
            .iter()
            .map(|poly_old| new.iter().map(|poly_new| iou(poly_new, poly_old)).collect())
            .collect();
        let num_rows = old.len();
        let num_cols = new.len();
        // Kuhn-Munkres needs at least as many columns as rows
        let padded_cols = num_rows.max(num_cols);
        let weights_data: Vec<i64> = iproduct!(0..num_rows, 0..padded_cols)
            .map(|(o, n)| {
                if n < num_cols && self.qualifies(iou_matrix[o][n]) {
                    (iou_matrix[o][n] * SCALE_FACTOR) as i64
                } else {
                    // Dummy column or pair below threshold
                    0
                }
            })
            .collect();
        let weights = match Matrix::from_vec(num_rows, padded_cols, weights_data) {
            Ok(matrix) => matrix,
            Err(_) => {
                append_unmatched(&mut result, unmatched_old, unmatched_new);
                return result;
            }
        };
        let (_, assignments) = kuhn_munkres(&weights);
        let mut pairs: Vec<(usize, usize)> = assignments
            .into_iter()
            .enumerate()
            .filter(|&(o, n)| n < num_cols && self.qualifies(iou_matrix[o][n]))
            .collect();
        pairs.sort_by_key(|&(o, n)| (n, o));
        for (o, n) in pairs {
            unmatched_old.remove(&o);
            unmatched_new.remove(&n);
            result.push(Correspondence::matched(o, n, iou_matrix[o][n]));
        }
        append_unmatched(&mut result, unmatched_old, unmatched_new);
        result
    }
    fn get_min_iou(&self) -> f64 {
        self.min_iou
    }
}

fn append_unmatched(
    result: &mut Vec<Correspondence>,
    unmatched_old: BTreeSet<usize>,
    unmatched_new: BTreeSet<usize>,
) {
    result.extend(unmatched_old.into_iter().map(Correspondence::old_only));
    result.extend(unmatched_new.into_iter().map(Correspondence::new_only));
}
