//! # Domain Services
//!
//! Domain services encapsulate business rules that don't naturally belong to
//! a single entity.
//!
//! ## Services
//!
//! - **MediaPolicy**: which hosts story media may be served from

mod media_policy;

pub use media_policy::*;
