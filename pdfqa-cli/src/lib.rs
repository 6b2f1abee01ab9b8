//! # pdfqa-cli
//!
//! The `pdfqa` command: ingest a PDF into pgvector, then ask questions about
//! it from an interactive shell.
//!
//! ```text
//! pdfqa ingest --pdf report.pdf
//! pdfqa chat
//! pdfqa search "quarterly revenue" -k 5
//! pdfqa selftest
//! ```
//!
//! Settings come from the environment, or a `.env` file in the working
//! directory. See [`pdfqa_rag::Settings`].

pub mod app;
pub mod cli;
pub mod command;
pub mod render;
pub mod setup;
pub mod shell;
pub mod telemetry;
