//! `orgauth-core`: identifiers shared by the verification and client crates.
//!
//! This crate contains no I/O and no cryptography.

pub mod error;
pub mod id;

pub use error::IdError;
pub use id::{OrgId, UserId};
