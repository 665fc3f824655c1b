use geo::Polygon;
use tracing::debug;

use crate::combine::annotations::AnnotationSet;
use crate::combine::combine_errors::{CombineError, SetSide};
use crate::combine::combiner::{CombineStats, Combiner};
use crate::combine::config::CombineConfig;
use crate::combine::geometry::to_polygon;
use crate::combine::matcher::{build_matcher, GreedyMatcher, Matcher};

/// Lifetime of one stream's combined annotations
#[derive(Debug, Clone, PartialEq)]
pub enum AccumulatorState {
    /// No frame seen yet
    Empty,
    /// First frame taken as is; `stream_index` counts the frames merged since
    Seeded {
        annotations: AnnotationSet,
        stream_index: usize,
    },
}

/// Folds incoming frames into one annotation set.
///
/// Each merge step builds a brand new set and swaps it in only when the whole step
/// succeeded, so a failing frame leaves the previous state untouched.
pub struct AnnotationAccumulator {
    matcher: Box<dyn Matcher>,
    combiner: Combiner,
    state: AccumulatorState,
}

impl AnnotationAccumulator {
    /// Creates default instance of AnnotationAccumulator: greedy matching at IoU 0.7, intersection
    ///
    /// Basic usage:
    ///
    /// ```
    /// use combine_annotations::combine::{AnnotationAccumulator, AnnotationSet};
    /// let mut accumulator = AnnotationAccumulator::default();
    /// accumulator.add(&AnnotationSet::new()).unwrap();
    /// assert!(accumulator.is_seeded());
    /// ```
    pub fn default() -> Self {
        AnnotationAccumulator {
            matcher: Box::new(GreedyMatcher::default()),
            combiner: Combiner::default(),
            state: AccumulatorState::Empty,
        }
    }
    pub fn new(_matcher: Box<dyn Matcher>, _combiner: Combiner) -> Self {
        AnnotationAccumulator {
            matcher: _matcher,
            combiner: _combiner,
            state: AccumulatorState::Empty,
        }
    }
    pub fn from_config(config: &CombineConfig) -> Self {
        AnnotationAccumulator::new(
            build_matcher(config.matching, config.min_iou),
            Combiner::new(config.combination, config.selection),
        )
    }
    pub fn get_state(&self) -> &AccumulatorState {
        &self.state
    }
    pub fn is_seeded(&self) -> bool {
        matches!(self.state, AccumulatorState::Seeded { .. })
    }
    pub fn get_annotations(&self) -> Option<&AnnotationSet> {
        match &self.state {
            AccumulatorState::Empty => None,
            AccumulatorState::Seeded { annotations, .. } => Some(annotations),
        }
    }
    pub fn get_stream_index(&self) -> Option<usize> {
        match &self.state {
            AccumulatorState::Empty => None,
            AccumulatorState::Seeded { stream_index, .. } => Some(*stream_index),
        }
    }
    pub fn into_annotations(self) -> Option<AnnotationSet> {
        match self.state {
            AccumulatorState::Empty => None,
            AccumulatorState::Seeded { annotations, .. } => Some(annotations),
        }
    }
    /// Folds one frame in. The first frame only seeds the state and yields no stats.
    pub fn add(&mut self, frame: &AnnotationSet) -> Result<Option<CombineStats>, CombineError> {
        let (current, stream_index) = match &self.state {
            AccumulatorState::Empty => {
                debug!(objects = frame.len(), "Seeding combined annotations");
                self.state = AccumulatorState::Seeded {
                    annotations: frame.clone(),
                    stream_index: 0,
                };
                return Ok(None);
            }
            AccumulatorState::Seeded {
                annotations,
                stream_index,
            } => (annotations, stream_index + 1),
        };

        let polygons_old = outlines(current, SetSide::Old)?;
        let polygons_new = outlines(frame, SetSide::New)?;
        let matches = self.matcher.find_matches(&polygons_old, &polygons_new);
        let combination = self.combiner.combine(
            current,
            frame,
            &polygons_old,
            &polygons_new,
            &matches,
            stream_index,
        )?;
        let stats = combination.stats;
        debug!(
            stream_index,
            merged = stats.merged,
            dropped = stats.dropped,
            old_only = stats.old_only,
            new_only = stats.new_only,
            "Combined frame"
        );
        self.state = AccumulatorState::Seeded {
            annotations: combination.annotations,
            stream_index,
        };
        Ok(Some(stats))
    }
}

fn outlines(set: &AnnotationSet, side: SetSide) -> Result<Vec<Polygon<f64>>, CombineError> {
    set.iter()
        .enumerate()
        .map(|(index, object)| {
            to_polygon(object).map_err(|source| CombineError::Geometry { side, index, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::annotations::LabeledObject;
    use crate::combine::combiner::CombinationMode;
    use crate::combine::geometry::SelectionPolicy;
    use crate::combine::test_data::{get_parking_frames, rect_object};
    use crate::utils::{Point, Rect};

    fn single(object: LabeledObject) -> AnnotationSet {
        vec![object].into()
    }

    #[test]
    fn test_seed_is_verbatim() {
        let frame: AnnotationSet = vec![
            rect_object(0, 0, 10, 10).with_label("a"),
            rect_object(20, 20, 30, 30).with_label("b"),
        ]
        .into();
        let mut accumulator = AnnotationAccumulator::default();
        assert_eq!(accumulator.get_state(), &AccumulatorState::Empty);
        assert_eq!(accumulator.add(&frame).unwrap(), None);
        assert_eq!(accumulator.get_annotations(), Some(&frame));
        assert_eq!(accumulator.get_stream_index(), Some(0));
        assert!(accumulator.get_annotations().unwrap()[0].get_stream_index().is_none());
    }

    #[test]
    fn test_no_match_keeps_both() {
        let mut accumulator = AnnotationAccumulator::default();
        accumulator.add(&single(rect_object(0, 0, 10, 10))).unwrap();
        let stats = accumulator.add(&single(rect_object(5, 5, 15, 15))).unwrap().unwrap();
        assert_eq!(stats.merged, 0);
        let combined = accumulator.get_annotations().unwrap();
        assert_eq!(combined.len(), 2);
        let indices: Vec<Option<usize>> = combined.iter().map(|o| o.get_stream_index()).collect();
        assert_eq!(indices, vec![None, Some(1)]);
        assert_eq!(combined[0].get_bbox(), Rect::from_corners(0, 0, 10, 10));
        assert_eq!(combined[1].get_bbox(), Rect::from_corners(5, 5, 15, 15));
    }

    #[test]
    fn test_identical_union() {
        let config = CombineConfig::new(0.7, CombinationMode::Union, "out.report");
        let mut accumulator = AnnotationAccumulator::from_config(&config);
        accumulator.add(&single(rect_object(0, 0, 10, 10))).unwrap();
        accumulator.add(&single(rect_object(0, 0, 10, 10))).unwrap();
        let combined = accumulator.get_annotations().unwrap();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].get_bbox(), Rect::from_corners(0, 0, 10, 10));
        assert_eq!(combined[0].get_stream_index(), Some(1));
    }

    #[test]
    fn test_intersect_with_low_threshold() {
        let config = CombineConfig::new(0.1, CombinationMode::Intersect, "out.report");
        let mut accumulator = AnnotationAccumulator::from_config(&config);
        accumulator.add(&single(rect_object(0, 0, 10, 10))).unwrap();
        accumulator.add(&single(rect_object(5, 5, 15, 15))).unwrap();
        let combined = accumulator.get_annotations().unwrap();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].get_bbox(), Rect::from_corners(5, 5, 10, 10));
        let points = combined[0].get_polygon().unwrap();
        assert_eq!(points.len(), 4);
        for corner in [
            Point::new(5.0, 5.0),
            Point::new(10.0, 5.0),
            Point::new(10.0, 10.0),
            Point::new(5.0, 10.0),
        ] {
            assert!(points.contains(&corner));
        }
    }

    #[test]
    fn test_failed_step_keeps_state() {
        let mut accumulator = AnnotationAccumulator::default();
        accumulator.add(&single(rect_object(0, 0, 10, 10))).unwrap();
        accumulator.add(&single(rect_object(0, 0, 10, 10))).unwrap();
        let before = accumulator.get_state().clone();

        let broken = single(LabeledObject::new_with_polygon(vec![
            Point::new(0.0, 0.0),
            Point::new(f64::INFINITY, 0.0),
            Point::new(0.0, 5.0),
        ]));
        let err = accumulator.add(&broken).unwrap_err();
        assert!(matches!(
            err,
            CombineError::Geometry {
                side: SetSide::New,
                index: 0,
                ..
            }
        ));
        assert_eq!(accumulator.get_state(), &before);
        assert_eq!(accumulator.get_stream_index(), Some(1));
    }

    #[test]
    fn test_parking_scene() {
        let mut accumulator = AnnotationAccumulator::default();
        for frame in get_parking_frames() {
            accumulator.add(&frame).unwrap();
        }
        assert_eq!(accumulator.get_stream_index(), Some(3));
        let combined = accumulator.into_annotations().unwrap();
        let labels: Vec<_> = combined.iter().map(|o| o.get_label().unwrap()).collect();
        assert_eq!(labels, vec!["car", "car", "car", "person"]);
        let indices: Vec<_> = combined.iter().map(|o| o.get_stream_index()).collect();
        assert_eq!(indices, vec![Some(3), Some(3), Some(3), Some(2)]);
        assert_eq!(combined[0].get_bbox(), Rect::from_corners(11, 11, 59, 40));
        assert_eq!(combined[1].get_bbox(), Rect::from_corners(101, 12, 149, 42));
        assert_eq!(combined[2].get_bbox(), Rect::from_corners(201, 9, 251, 40));
        assert_eq!(combined[3].get_bbox(), Rect::from_corners(300, 50, 310, 80));
    }

    #[test]
    fn test_largest_area_selection_config() {
        let config = CombineConfig::new(0.0, CombinationMode::Union, "out.report")
            .with_selection(SelectionPolicy::LargestArea);
        let mut accumulator = AnnotationAccumulator::from_config(&config);
        accumulator.add(&single(rect_object(0, 0, 10, 10))).unwrap();
        accumulator.add(&single(rect_object(2, 2, 12, 12))).unwrap();
        let combined = accumulator.get_annotations().unwrap();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].get_bbox(), Rect::from_corners(0, 0, 12, 12));
    }
}
