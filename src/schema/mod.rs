//! Boundary schema validation.
//!
//! This module turns an untrusted JSON document into a typed, defaulted [`crate::Storyboard`].

pub(crate) mod validate;
