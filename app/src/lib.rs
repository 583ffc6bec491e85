//! # Cinema App
//!
//! Wiring for the `cinema` binary: environment configuration, backend
//! selection and the load experiment that exercises a seeded catalog.

pub mod config;
pub mod experiment;

pub use config::{Backend, Config};
pub use experiment::{ExperimentReport, run_experiment};
