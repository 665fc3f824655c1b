//! Export contents of `combine` folder
mod accumulator;
mod annotations;
mod combiner;
mod config;
mod filter;
mod matcher;
mod report;

pub mod combine_errors;
pub mod geometry;

#[cfg(test)]
mod test_data;

pub use self::{
    accumulator::*,
    annotations::*,
    combiner::*,
    combine_errors::*,
    config::*,
    filter::*,
    geometry::{GeometryResult, SelectedPolygon, SelectionPolicy},
    matcher::*,
    report::*,
};
