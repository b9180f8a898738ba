//! Ground-state search algorithms.
//!
//! - [`exgs`] - Exhaustive enumeration of the whole charge-index range
//! - [`quickexact`] - Exact depth-first search with potential-bound pruning
//! - [`quicksim`] - Randomized adjacent-search heuristic
//! - [`cluster_complete`] - Exact search composing per-cluster candidate assignments

pub mod cluster_complete;
pub mod exgs;
pub mod quickexact;
pub mod quicksim;
