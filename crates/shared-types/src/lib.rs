//! # Shared Types Crate
//!
//! This crate contains the domain types shared across validator subsystems:
//! hash newtypes, anchor classes, chain platforms, lifecycle states and the
//! error taxonomy.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Strict wire forms**: Enums that cross the wire (`AnchorClass`,
//!   `ChainPlatform`) serialize to their canonical snake_case identifiers and
//!   reject anything else on parse.
//! - **No crypto**: Hashing and signing live in `shared-crypto`; this crate
//!   stays dependency-light.

pub mod entities;
pub mod errors;
pub mod hash;

pub use entities::*;
pub use errors::*;
pub use hash::Hash32;
