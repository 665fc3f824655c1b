//! Folds a stream of object detection annotation sets into a single combined set.
//!
//! Objects from consecutive frames are paired by Intersection-over-Union and the
//! pairs are merged with polygon union or intersection. See [`combine::CombineAnnotations`].
pub mod combine;
pub mod utils;
