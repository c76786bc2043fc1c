//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **Identity**: who a connection belongs to, or why it could not be resolved

mod identity;

pub use identity::*;
