//! Core types and trait definitions for certrack.
//!
//! No HTTP, database or file-format code lives here. The SQLite backend, the
//! spreadsheet reader and the server build on these types.

// `CertStore` spells out `Send` futures itself.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod import;
pub mod model;
pub mod overview;
pub mod store;

pub use error::{Error, Result};
