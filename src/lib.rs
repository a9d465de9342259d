//! Shop import library
//!
//! Bulk CSV importer for a small shop backend, plus the role model and the
//! catalog and order queries that run over the imported data.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod migrator;
pub mod services;

pub use errors::ServiceError;
pub use services::importer::{ImportSummary, Importer};
