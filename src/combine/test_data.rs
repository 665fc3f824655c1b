//! Fixtures shared by the unit tests of `combine`
use geo::{Coord, LineString, Polygon};

use crate::combine::annotations::{AnnotationSet, LabeledObject};
use crate::utils::Rect;

pub fn rect_object(left: i32, top: i32, right: i32, bottom: i32) -> LabeledObject {
    LabeledObject::new(Rect::from_corners(left, top, right, bottom))
}

pub fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            Coord { x: x0, y: y0 },
            Coord { x: x1, y: y0 },
            Coord { x: x1, y: y1 },
            Coord { x: x0, y: y1 },
        ]),
        vec![],
    )
}

/// Scene with three parked cars observed over four frames. Detections jitter by a pixel or two;
/// a pedestrian shows up in the third frame only and the third car is missed in the second frame.
pub fn get_parking_frames() -> Vec<AnnotationSet> {
    vec![
        vec![
            rect_object(10, 10, 60, 40).with_label("car"),
            rect_object(100, 12, 150, 42).with_label("car"),
            rect_object(200, 8, 252, 40).with_label("car"),
        ]
        .into(),
        vec![
            rect_object(11, 10, 61, 41).with_label("car"),
            rect_object(101, 11, 150, 42).with_label("car"),
        ]
        .into(),
        vec![
            rect_object(200, 9, 251, 40).with_label("car"),
            rect_object(10, 11, 60, 41).with_label("car"),
            rect_object(300, 50, 310, 80).with_label("person"),
            rect_object(99, 12, 149, 43).with_label("car"),
        ]
        .into(),
        vec![
            rect_object(10, 10, 59, 40).with_label("car"),
            rect_object(100, 12, 151, 42).with_label("car"),
            rect_object(201, 8, 252, 41).with_label("car"),
        ]
        .into(),
    ]
}
