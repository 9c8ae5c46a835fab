pub mod charts;
pub mod data_source;
pub mod profiling;
