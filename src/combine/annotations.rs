use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::{Point, Rect};

/// Metadata key recording the stream position at which an object last entered the combined set.
/// Seed frame objects never carry it.
pub const STREAM_INDEX: &str = "stream_index";

/// Metadata key holding the object's class label
pub const LABEL: &str = "type";

/// Value stored in an object's metadata map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl MetaValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Integer(v) => Some(*v),
            MetaValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MetaValue::Bool(v) => write!(f, "{}", v),
            MetaValue::Integer(v) => write!(f, "{}", v),
            MetaValue::Float(v) => write!(f, "{}", v),
            MetaValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Integer(v)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

/// One detected region: bounding box, optional polygon outline and free-form metadata.
///
/// When no polygon is attached the bounding box itself is the object's outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledObject {
    bbox: Rect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    polygon: Option<Vec<Point>>,
    #[serde(default)]
    metadata: BTreeMap<String, MetaValue>,
}

impl LabeledObject {
    /// Creates rectangular object
    ///
    /// Basic usage:
    ///
    /// ```
    /// use combine_annotations::combine::LabeledObject;
    /// use combine_annotations::utils::Rect;
    /// let object = LabeledObject::new(Rect::from_corners(0, 0, 10, 10)).with_label("car");
    /// assert_eq!(object.get_label(), Some("car"));
    /// assert!(object.get_polygon().is_none());
    /// ```
    pub fn new(_bbox: Rect) -> Self {
        LabeledObject {
            bbox: _bbox,
            polygon: None,
            metadata: BTreeMap::new(),
        }
    }
    /// Creates object from explicit outline. Bounding box is derived from the points.
    pub fn new_with_polygon(points: Vec<Point>) -> Self {
        let bbox = Rect::enclosing(&points).unwrap_or_else(Rect::default);
        LabeledObject {
            bbox,
            polygon: Some(points),
            metadata: BTreeMap::new(),
        }
    }
    /// Builder pattern to attach metadata
    pub fn with_meta<V: Into<MetaValue>>(mut self, key: &str, value: V) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
    pub fn with_label(self, label: &str) -> Self {
        self.with_meta(LABEL, label)
    }
    pub fn get_bbox(&self) -> Rect {
        self.bbox
    }
    pub fn get_polygon(&self) -> Option<&[Point]> {
        self.polygon.as_deref()
    }
    pub fn get_metadata(&self) -> &BTreeMap<String, MetaValue> {
        &self.metadata
    }
    pub fn set_metadata(&mut self, key: &str, value: MetaValue) {
        self.metadata.insert(key.to_string(), value);
    }
    /// Replaces own metadata entries with those of `other` where keys collide
    pub fn merge_metadata(&mut self, other: &BTreeMap<String, MetaValue>) {
        for (key, value) in other {
            self.metadata.insert(key.clone(), value.clone());
        }
    }
    pub fn get_label(&self) -> Option<&str> {
        self.metadata.get(LABEL).and_then(MetaValue::as_str)
    }
    pub fn get_stream_index(&self) -> Option<usize> {
        self.metadata
            .get(STREAM_INDEX)
            .and_then(MetaValue::as_i64)
            .and_then(|v| usize::try_from(v).ok())
    }
    pub fn set_stream_index(&mut self, stream_index: usize) {
        self.metadata
            .insert(STREAM_INDEX.to_string(), MetaValue::Integer(stream_index as i64));
    }
}

/// All objects detected in one frame. Order is kept stable so matching is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationSet {
    objects: Vec<LabeledObject>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        AnnotationSet { objects: Vec::new() }
    }
    pub fn with_capacity(capacity: usize) -> Self {
        AnnotationSet {
            objects: Vec::with_capacity(capacity),
        }
    }
    pub fn len(&self) -> usize {
        self.objects.len()
    }
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
    pub fn get(&self, idx: usize) -> Option<&LabeledObject> {
        self.objects.get(idx)
    }
    pub fn push(&mut self, object: LabeledObject) {
        self.objects.push(object)
    }
    pub fn iter(&self) -> std::slice::Iter<'_, LabeledObject> {
        self.objects.iter()
    }
    pub fn objects(&self) -> &[LabeledObject] {
        &self.objects
    }
}

impl From<Vec<LabeledObject>> for AnnotationSet {
    fn from(objects: Vec<LabeledObject>) -> Self {
        AnnotationSet { objects }
    }
}

impl FromIterator<LabeledObject> for AnnotationSet {
    fn from_iter<I: IntoIterator<Item = LabeledObject>>(iter: I) -> Self {
        AnnotationSet {
            objects: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a LabeledObject;
    type IntoIter = std::slice::Iter<'a, LabeledObject>;
    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}

impl std::ops::Index<usize> for AnnotationSet {
    type Output = LabeledObject;
    fn index(&self, idx: usize) -> &Self::Output {
        &self.objects[idx]
    }
}

/// Anything flowing through the stream that carries one frame's annotations.
/// Enables generic filter: `CombineAnnotations::process<R: AnnotatedRecord>`
pub trait AnnotatedRecord {
    fn annotations(&self) -> &AnnotationSet;
}

impl AnnotatedRecord for AnnotationSet {
    fn annotations(&self) -> &AnnotationSet {
        self
    }
}

/// Annotations of a single named image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub annotations: AnnotationSet,
}

impl Frame {
    pub fn new(_name: &str, _annotations: AnnotationSet) -> Self {
        Frame {
            name: _name.to_string(),
            annotations: _annotations,
        }
    }
}

impl AnnotatedRecord for Frame {
    fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_derives_bbox() {
        let object = LabeledObject::new_with_polygon(vec![
            Point::new(2.0, 3.0),
            Point::new(8.5, 3.0),
            Point::new(5.0, 9.2),
        ]);
        assert_eq!(object.get_bbox(), Rect::from_corners(2, 3, 9, 10));
    }

    #[test]
    fn test_stream_index() {
        let mut object = LabeledObject::new(Rect::from_corners(0, 0, 4, 4));
        assert_eq!(object.get_stream_index(), None);
        object.set_stream_index(3);
        assert_eq!(object.get_stream_index(), Some(3));
        object.set_stream_index(7);
        assert_eq!(object.get_stream_index(), Some(7));
        // Float-valued indices (e.g. loaded from JSON written elsewhere) are accepted
        object.set_metadata(STREAM_INDEX, MetaValue::Float(2.0));
        assert_eq!(object.get_stream_index(), Some(2));
    }

    #[test]
    fn test_merge_metadata() {
        let mut object = LabeledObject::new(Rect::from_corners(0, 0, 4, 4))
            .with_label("car")
            .with_meta("score", 0.4);
        let other = LabeledObject::new(Rect::from_corners(0, 0, 4, 4))
            .with_label("truck")
            .with_meta("occluded", true);
        object.merge_metadata(other.get_metadata());
        assert_eq!(object.get_label(), Some("truck"));
        assert_eq!(object.get_metadata().get("score"), Some(&MetaValue::Float(0.4)));
        assert_eq!(object.get_metadata().get("occluded"), Some(&MetaValue::Bool(true)));
    }

    #[test]
    fn test_json_shape() {
        let set: AnnotationSet = vec![LabeledObject::new(Rect::from_corners(1, 2, 3, 4))
            .with_label("dog")
            .with_meta(STREAM_INDEX, 2i64)]
        .into();
        let text = serde_json::to_string(&set).unwrap();
        let back: AnnotationSet = serde_json::from_str(&text).unwrap();
        assert_eq!(back, set);
        assert_eq!(back[0].get_stream_index(), Some(2));
        assert!(text.starts_with('['));
    }
}
