//! Audio plumbing around the analyzer: sample sources and the analysis tap.

pub mod source;
pub mod spectrum_tap;
