//! `atareport` - Meeting minutes and client-profile reports
//!
//! This library stores meeting-minute forms as JSON documents, migrates
//! older document shapes on read, and assembles them into printable HTML
//! that is rendered to PDF and handed out as a ZIP archive.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod form;
pub mod logging;
pub mod report;
pub mod server;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use export::{Exporter, GeneratedArchive};
pub use form::{FormDocument, FormId, FormUpdate, IndexEntry};
pub use logging::init_logging;
pub use report::{assemble, Assembler, ReportInput};
pub use storage::{DeleteOutcome, FormStore, StorageStats};
