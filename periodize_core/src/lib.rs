#![forbid(unsafe_code)]

//! Core domain model and business logic for training periodization.
//!
//! This crate provides:
//! - Schedule model (programs, blocks, weekly phases, scheduled routines)
//! - Periodization resolver ("where am I today?")
//! - Template expander for compressed program imports
//! - Exercise name matching against a catalog
//! - Persistence gateway trait and a file-backed implementation
//! - Completed-session log and CSV schedule export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod dates;
pub mod catalog;
pub mod matching;
pub mod import;
pub mod parser;
pub mod resolver;
pub mod expander;
pub mod gateway;
pub mod sessions;
pub mod store;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, ImportConfig};
pub use import::ImportDoc;
pub use matching::{match_exercise, ExerciseMatcher, SubstringMatcher};
pub use parser::{CompressedJsonParser, TemplateParser};
pub use resolver::{resolve, Resolution, ResolveContext, Suggestion};
pub use expander::{expand, ExpandedProgram, ImportWarning};
pub use gateway::{current_suggestion, import_program, persist_expanded, ImportReport, PersistenceGateway};
pub use sessions::{JsonlSink, SessionSink};
pub use store::FileGateway;
pub use export::export_schedule_csv;
