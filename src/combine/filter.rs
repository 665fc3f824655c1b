use std::path::PathBuf;

use tracing::info;

use crate::combine::accumulator::AnnotationAccumulator;
use crate::combine::annotations::AnnotatedRecord;
use crate::combine::combine_errors::CombineError;
use crate::combine::config::CombineConfig;
use crate::combine::report::{sink_for_path, ReportSink};

/// What happened when the stream was closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Written { path: PathBuf, objects: usize },
    /// Stream carried no frames
    NoOutput,
}

/// Stream filter combining the annotations of all records passing through.
///
/// Records are handed back unchanged; the combined set is written once, by `finalize`.
pub struct CombineAnnotations<S: ReportSink = Box<dyn ReportSink>> {
    config: CombineConfig,
    accumulator: AnnotationAccumulator,
    sink: S,
}

impl CombineAnnotations<Box<dyn ReportSink>> {
    /// Creates filter writing to `config.output_path`, format chosen by extension
    ///
    /// Basic usage:
    ///
    /// ```
    /// use combine_annotations::combine::{CombineAnnotations, CombineConfig, CombinationMode, FlushOutcome};
    /// let config = CombineConfig::new(0.7, CombinationMode::Intersect, "./combined.report");
    /// let filter = CombineAnnotations::new(config).unwrap();
    /// assert_eq!(filter.finalize().unwrap(), FlushOutcome::NoOutput);
    /// ```
    pub fn new(config: CombineConfig) -> Result<Self, CombineError> {
        let sink = sink_for_path(&config.output_path);
        CombineAnnotations::with_sink(config, sink)
    }
}

impl<S: ReportSink> CombineAnnotations<S> {
    pub fn with_sink(config: CombineConfig, sink: S) -> Result<Self, CombineError> {
        config.validate()?;
        let accumulator = AnnotationAccumulator::from_config(&config);
        Ok(CombineAnnotations {
            config,
            accumulator,
            sink,
        })
    }
    pub fn get_config(&self) -> &CombineConfig {
        &self.config
    }
    pub fn get_accumulator(&self) -> &AnnotationAccumulator {
        &self.accumulator
    }
    /// Folds the record's annotations into the combined set and returns the record as is
    pub fn process<R: AnnotatedRecord>(&mut self, record: R) -> Result<R, CombineError> {
        self.accumulator.add(record.annotations())?;
        Ok(record)
    }
    /// Runs a whole stream through `process`, stopping at the first error
    pub fn process_all<R, I>(&mut self, records: I) -> Result<Vec<R>, CombineError>
    where
        R: AnnotatedRecord,
        I: IntoIterator<Item = R>,
    {
        records.into_iter().map(|record| self.process(record)).collect()
    }
    /// Closes the stream and writes the combined set, if any frame was seen
    pub fn finalize(self) -> Result<FlushOutcome, CombineError> {
        let path = self.config.output_path;
        match self.accumulator.into_annotations() {
            None => {
                info!("No annotations received, no combined output produced");
                Ok(FlushOutcome::NoOutput)
            }
            Some(annotations) => {
                info!(path = %path.display(), "Writing combined annotations");
                self.sink.write(&annotations, &path)?;
                Ok(FlushOutcome::Written {
                    path,
                    objects: annotations.len(),
                })
            }
        }
    }
}
