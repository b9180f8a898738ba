//! # Core Models Module
//!
//! Data structures describing *where* dangling bonds are and *what* they may hold.
//!
//! ## Key Components
//!
//! - [`coords`] - SiQAD and offset lattice coordinates, lattice constants and the
//!   [`coords::LatticeCoordinate`] abstraction shared by both coordinate systems
//! - [`sidb`] - Site role tags, single dangling bonds and charge states
//! - [`layout`] - Ordered dangling-bond layouts consumed by the simulation engines
//!
//! ## Usage
//!
//! ```ignore
//! use sidbsim::core::models::{coords::SiqadCoord, layout::SidbLayout, sidb::SiteKind};
//!
//! let mut layout = SidbLayout::new();
//! layout.assign_kind(SiqadCoord::new(0, 0, 0), SiteKind::Input);
//! layout.assign_kind(SiqadCoord::new(3, 0, 0), SiteKind::Normal);
//! ```

pub mod coords;
pub mod layout;
pub mod sidb;
