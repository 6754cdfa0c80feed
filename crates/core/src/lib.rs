//! Shared domain types for the ACE command-line client.
//!
//! Holds the pieces both sides of a cluster removal agree on: the
//! correlation token, the removal request shape, the progress message
//! wire format and the progress subject naming scheme.

pub mod cluster;
pub mod error;
pub mod progress;
pub mod subjects;
pub mod types;
