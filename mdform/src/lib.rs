//! # mdform
//!
//! Command-line host for the [`frontform`] engine.
//!
//! `mdform` opens a markdown document or a structured section file, pairs it
//! with its field schema and lets the user inspect, validate and edit the
//! front-matter from the terminal. Every edit is validated before it is
//! committed, and the previous version of the file is kept as a backup.
//!
//! ## Modules
//!
//! - [`commands`] - subcommand handlers and error presentation
//! - [`config`] - `.mdform.toml` workspace configuration
//! - [`ctx`] - application context and path resolution
//! - [`outline`] - plain-text rendering of a form

/// Subcommand handlers.
pub mod commands;

/// Workspace configuration.
pub mod config;

/// Application context and state management.
pub mod ctx;

/// Plain-text form outline.
pub mod outline;

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;
