//! tracksync - keep Asana tasks and GitHub issues in step
//!
//! This crate provides the core functionality for the `tracksync` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (Item, Comment, Project, RepoId)
//! - [`fields`] - `#key value` metadata lines embedded in free text
//! - [`service`] - Asana and GitHub REST clients behind two traits
//! - [`sync`] - Reconciliation, execution and orchestration
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod fields;
pub mod model;
pub mod service;
pub mod sync;

pub use error::{Error, Result};
