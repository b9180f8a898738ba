//! Helpers shared by the search engines.

pub mod deadline;
