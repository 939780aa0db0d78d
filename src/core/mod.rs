//! Core types shared across the weft crate.
//!
//! Hosts the error taxonomy ([`WeftError`], [`ErrorContext`]) and the
//! [`UnitKind`] suffix dispatch every other module builds on.

pub mod error;
pub mod unit;

pub use error::{
    ErrorContext, ErrorKind, Result, Severity, SourceLocation, WeftError, user_friendly_error,
};
pub use unit::UnitKind;
