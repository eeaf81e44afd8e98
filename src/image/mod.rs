//! Container image identity
//!
//! Images are named by registry path strings. See [`RegistryPath`] for the
//! projections the rest of the crate relies on.

pub mod path;

pub use path::RegistryPath;
