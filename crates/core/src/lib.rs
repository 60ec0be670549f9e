//! Domain types and I/O primitives for Kinetics clip acquisition.
//!
//! - [`annotation`]: CSV annotation ingestion.
//! - [`naming`]: deterministic clip file naming and [`naming::ClipTask`].
//! - [`layout`]: per-split label directories and the label list file.
//! - [`status`]: per-clip outcomes and their report tuples.
//! - [`report`]: JSON report persistence.
//! - [`subprocess`]: external tool invocation with captured output and timeout.
//! - [`archive`]: annotation archive extraction.

pub mod annotation;
pub mod archive;
pub mod error;
pub mod layout;
pub mod naming;
pub mod report;
pub mod status;
pub mod subprocess;

pub use error::CoreError;
