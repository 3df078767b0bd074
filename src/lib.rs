#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(rust_2024_compatibility)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

pub mod adapter;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod healthcheck;
pub mod otlp;
pub mod pipeline;
pub mod port;
pub mod query;
pub mod telemetry;

pub use healthcheck::{healthcheck, healthcheck_with_port};
