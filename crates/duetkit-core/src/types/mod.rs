//! Shared-state type aliases used across the session crates.

pub mod aliases;

pub use aliases::*;
