//! Storyboard → instruction compilation.

pub(crate) mod compiler;
pub(crate) mod fingerprint;
pub(crate) mod program;
