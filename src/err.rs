//! Error interface for this crate.
//!
//! Every error type in this crate implements [`Error`], which extends
//! [`std::error::Error`] with the diagnostic information a front end
//! needs to report the error to a user (the source line it occurred on and a hint).
//!
//! This module also re-exports the crate's error types.

use std::borrow::Cow;

pub use crate::parse::LexErr;
pub use crate::asm::{AsmErr, AsmErrKind};
pub use crate::sim::{SimErr, SimErrKind};

/// Unified error interface for all errors in this crate.
pub trait Error: std::error::Error {
    /// The 1-based source line where this error occurred (if known).
    fn line(&self) -> Option<usize> {
        None
    }

    /// A help message describing how to fix this error (if one exists).
    fn help(&self) -> Option<Cow<str>> {
        None
    }
}
