//! Shared services used across front ends.

mod tribe;

pub use tribe::TribeService;
