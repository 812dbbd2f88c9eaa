//! Render job lifecycle, fan-out of job snapshots and the worker pool that drives backends.

pub(crate) mod channel;
pub(crate) mod job;
pub(crate) mod manager;
