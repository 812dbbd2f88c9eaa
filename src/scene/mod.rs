//! Storyboard data model.
//!
//! Everything here is produced by the validator; the types are read-only outside the crate.

pub(crate) mod color;
pub(crate) mod model;
pub(crate) mod storyboard;
