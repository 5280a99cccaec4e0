//! # scm-runtime
//!
//! Declaratively-defined computation nodes composed into a dependency graph,
//! executed in topological order, optionally under agent oversight that can
//! halt a run and derive new versions of nodes from runtime metrics.
//!
//! ## Architecture
//!
//! - [`store`] loads node files from a directory; [`dag`] builds the
//!   dependency graph and plans it with Kahn's algorithm.
//! - [`engine`] runs one node: real model plugin when registered
//!   ([`plugins`]), typed simulation otherwise ([`simulation`]).
//! - [`composer`] runs a plan without oversight; [`controller`] runs it with
//!   pre/post checks, halting and adaptation ([`adaptation`]).
//! - [`tracer`] writes the JSON-lines trace and session summary. A
//!   [`Session`] carries the tracer, plugins, validator and random source
//!   through a run.
//!
//! Set `RUST_LOG=scm_runtime=trace` for span enter/exit of core operations.

pub mod adaptation;
pub mod chance;
pub mod composer;
#[cfg(test)]
mod composer_test;
pub mod config;
pub mod controller;
pub mod dag;
#[cfg(test)]
mod dag_test;
pub mod engine;
pub mod error;
pub mod models;
pub mod node_io;
#[cfg(test)]
mod node_io_test;
pub mod plugins;
pub mod schema;
pub mod session;
pub mod simulation;
pub mod store;
#[cfg(test)]
mod test_support;
pub mod tracer;
#[cfg(test)]
mod tracer_test;
pub mod triggers;
pub mod types;
pub mod version;

pub use adaptation::AdaptationManager;
pub use composer::{Composition, GraphComposer, compose};
pub use config::RunOptions;
pub use controller::AgentController;
pub use dag::{DependencyGraph, ExecutionPlan};
pub use engine::ExecutionEngine;
pub use error::ComposeError;
pub use schema::{NodeValidator, SchemaValidator};
pub use session::Session;
pub use store::NodeStore;
pub use tracer::Tracer;
pub use types::{Node, NodeResult, RunOutcome, RunStatus, StructureEvaluation};
