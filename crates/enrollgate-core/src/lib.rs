//! # enrollgate-core
//!
//! Core crate for EnrollGate. Contains the configuration schemas and the
//! unified error system shared by the worker and the server binary.
//!
//! This crate has **no** internal dependencies on other EnrollGate crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
