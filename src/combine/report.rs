//! Persistence of the final combined annotations.
//!
//! `.report` files are Java-properties style, two lines per field:
//!
//! ```text
//! Object.1.width=11
//! Object.1.width\tDataType=N
//! ```
//!
//! Objects are numbered from 1 in combined-set order. `.json` files hold the
//! serde representation of the annotation set.
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::combine::annotations::{AnnotationSet, MetaValue};
use crate::combine::combine_errors::ReportError;

pub const OBJECT_PREFIX: &str = "Object.";

/// Common interface for writers of the combined annotation set
pub trait ReportSink {
    fn write(&self, annotations: &AnnotationSet, path: &Path) -> Result<(), ReportError>;
}

impl ReportSink for Box<dyn ReportSink> {
    fn write(&self, annotations: &AnnotationSet, path: &Path) -> Result<(), ReportError> {
        (**self).write(annotations, path)
    }
}

/// Picks a sink by file extension: `.json` gets JSON, anything else a `.report` file
pub fn sink_for_path(path: &Path) -> Box<dyn ReportSink> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Box::new(JsonReportSink),
        _ => Box::new(AdamsReportSink),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdamsReportSink;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataType {
    Numeric,
    Text,
    Boolean,
}

impl DataType {
    fn code(&self) -> char {
        match self {
            DataType::Numeric => 'N',
            DataType::Text => 'S',
            DataType::Boolean => 'B',
        }
    }
}

fn numeric(value: f64) -> (String, DataType) {
    (format!("{}", value), DataType::Numeric)
}

fn meta_field(value: &MetaValue) -> (String, DataType) {
    match value {
        MetaValue::Bool(v) => (v.to_string(), DataType::Boolean),
        MetaValue::Integer(v) => (v.to_string(), DataType::Numeric),
        MetaValue::Float(v) => numeric(*v),
        MetaValue::Text(v) => (v.clone(), DataType::Text),
    }
}

fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '\\' | '=' | ':' | ' ' | '#' | '!' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Flattens the annotation set into report fields, sorted by key
pub fn report_fields(annotations: &AnnotationSet) -> BTreeMap<String, (String, char)> {
    let mut fields: BTreeMap<String, (String, DataType)> = BTreeMap::new();
    for (idx, object) in annotations.iter().enumerate() {
        let prefix = format!("{}{}.", OBJECT_PREFIX, idx + 1);
        let bbox = object.get_bbox();
        fields.insert(format!("{}x", prefix), numeric(bbox.x as f64));
        fields.insert(format!("{}y", prefix), numeric(bbox.y as f64));
        fields.insert(format!("{}width", prefix), numeric(bbox.width as f64));
        fields.insert(format!("{}height", prefix), numeric(bbox.height as f64));
        if let Some(points) = object.get_polygon() {
            let xs: Vec<String> = points.iter().map(|pt| pt.x.to_string()).collect();
            let ys: Vec<String> = points.iter().map(|pt| pt.y.to_string()).collect();
            fields.insert(format!("{}poly_x", prefix), (xs.join(","), DataType::Text));
            fields.insert(format!("{}poly_y", prefix), (ys.join(","), DataType::Text));
        }
        for (key, value) in object.get_metadata() {
            fields.insert(format!("{}{}", prefix, key), meta_field(value));
        }
    }
    fields
        .into_iter()
        .map(|(key, (value, data_type))| (key, (value, data_type.code())))
        .collect()
}

fn create_output(path: &Path) -> Result<BufWriter<File>, ReportError> {
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let file = File::create(path).map_err(io_err)?;
    Ok(BufWriter::new(file))
}

impl ReportSink for AdamsReportSink {
    fn write(&self, annotations: &AnnotationSet, path: &Path) -> Result<(), ReportError> {
        let io_err = |source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut out = create_output(path)?;
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(out, "# Timestamp: {}", timestamp).map_err(io_err)?;
        for (key, (value, code)) in report_fields(annotations) {
            let key = escape_key(&key);
            writeln!(out, "{}={}", key, escape_value(&value)).map_err(io_err)?;
            writeln!(out, "{}\\tDataType={}", key, code).map_err(io_err)?;
        }
        out.flush().map_err(io_err)?;
        info!(path = %path.display(), objects = annotations.len(), "Wrote combined annotations report");
        Ok(())
    }
}

impl ReportSink for JsonReportSink {
    fn write(&self, annotations: &AnnotationSet, path: &Path) -> Result<(), ReportError> {
        let mut out = create_output(path)?;
        serde_json::to_writer_pretty(&mut out, annotations)?;
        out.flush().map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), objects = annotations.len(), "Wrote combined annotations as JSON");
        Ok(())
    }
}
