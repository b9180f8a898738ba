//! # Engine Module
//!
//! Ground-state search engines for SiDB layouts and the types they share.
//!
//! ## Overview
//!
//! Every engine explores the charge configurations of a layout and returns the
//! physically valid ones. Exact engines return all of them; the heuristic engine
//! returns a sound subset. All engines are driven through the [`search::ChargeSearch`]
//! trait and selected at runtime with a [`config::EngineSelection`].
//!
//! ## Architecture
//!
//! - **Algorithms** ([`algorithms`]) - ExGS, QuickExact, QuickSim and ClusterComplete
//! - **Configuration** ([`config`]) - Engine parameter records and their builders
//! - **Results** ([`result`]) - Sorted valid configurations, status and statistics
//! - **Dispatch** ([`search`]) - Engine tags, the search trait and [`search::simulate`]
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - The umbrella [`error::EngineError`]
//!
//! ## Concurrency
//!
//! With the `parallel` feature, QuickSim restarts and ClusterComplete's cluster
//! pruning and top-level composition branches run on the rayon thread pool. The
//! layout geometry is shared read-only; each worker mutates its own surface clone.

pub mod algorithms;
pub mod config;
pub mod error;
pub mod progress;
pub mod result;
pub mod search;
pub(crate) mod utils;
