//! # rctkit - Randomized Trial Analysis Library
//!
//! rctkit loads a tabular dataset from a randomized experiment, checks that
//! the treatment and control arms are balanced on pre-treatment covariates,
//! estimates the average treatment effect four ways and writes the results
//! as tables, a coefficient plot and a machine-readable summary.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rctkit::analyser::logic;
//! use rctkit::config::PipelineConfig;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = PipelineConfig::new("data/social_pressure.csv");
//! let outcome = logic::run_pipeline(&config)?;
//!
//! let effects = &outcome.results.effects;
//! println!("Difference in means: {:.3}", effects.difference_in_means.estimate);
//! for est in effects.regression_estimates() {
//!     println!("{}: {:.3} (SE {:?})", est.label(), est.estimate, est.std_error);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`analyser`]: Loading, variable selection, balance and estimation
//!   - [`analyser::logic`]: Core statistical routines and pipeline flows
//! - [`config`]: Variable roles and run settings
//! - [`report`]: Markdown/CSV tables, SVG coefficient plot, JSON results
//! - [`error`]: Error types and handling utilities
//! - [`logging`]: Console and file logging via `tracing`
//! - [`utils`]: Number formatting helpers
//!
//! ## Working With In-Memory Data
//!
//! Every stage after loading works on a Polars `DataFrame`, so a frame built
//! elsewhere can be analysed directly:
//!
//! ```no_run
//! use polars::prelude::*;
//! use rctkit::analyser::logic::analyze_frame;
//! use rctkit::config::VariableSpec;
//!
//! # fn example() -> anyhow::Result<()> {
//! let df = df!(
//!     "w" => &[1i64, 1, 1, 0, 0, 0],
//!     "y" => &[1i64, 1, 0, 0, 0, 1],
//!     "age" => &[30.0, 41.0, 52.0, 36.0, 45.0, 58.0]
//! )?;
//! let results = analyze_frame(&df, &VariableSpec::new("w", "y", ["age"]))?;
//! assert_eq!(results.balance.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, rust_2018_idioms)]

pub mod analyser;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod utils;
