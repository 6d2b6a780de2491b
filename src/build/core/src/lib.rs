/* src/build/core/src/lib.rs */

//! Production build pipeline for Strata apps: bundler config enforcement,
//! the client import guard, runtime manifest assembly, the isolated
//! prerender pass and adapter hand-off.

pub mod adapter;
pub mod bundle;
pub mod config;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod pipeline;
pub mod prerender;
pub mod ui;

pub use error::BuildError;
pub use pipeline::{BuildSession, CloseOutcome, Pipeline, Stage};
