//! Core definitions (error taxonomy and result plumbing), relied upon by all
//! windlass-* crates.

pub mod error;
pub mod result;

pub use result::Result;
