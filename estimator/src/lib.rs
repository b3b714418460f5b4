//! Per-position methylation-frequency estimation via a parametric linear program.
//!
//! Reads overlapping in a DAG give rise to an L1-penalized consistency LP:
//! [model](model) turns the graph and the normalized per-position statistics into
//! columns, an objective, and inequality rows, and [parametric](parametric)
//! re-parameterizes the lambda-dependent rows in place so an external search can
//! trace a regularization path without rebuilding the model. The LP engine itself,
//! the graph construction, and the statistics normalization are external; this
//! crate talks to them through the capabilities in [lp](lp) and [graph](graph).
pub mod graph;
pub mod lp;
pub mod mocks;
pub mod model;
pub mod parametric;
#[macro_use]
extern crate log;

/// Uniform consistency gap enforced by every row. A strictly positive margin
/// excludes the degenerate all-zero solution a plain `<= 0` bound would admit.
pub const CONSISTENCY_MARGIN: f64 = 0.1;
