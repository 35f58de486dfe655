//! fitlog.snapshot.v1 boundary schema
//!
//! This module defines the raw snapshot layout handed over by the storage
//! collaborator and the adapter that normalizes it into validated engine types.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;
