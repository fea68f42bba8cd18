//! I/O adapters used by the pipeline.

pub mod config;
pub mod gh;
pub mod git;
pub mod page;
pub mod process;
pub mod workspace;
