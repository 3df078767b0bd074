//! OpenTelemetry Protocol (OTLP) ingress.
//!
//! This module provides:
//! - the decoder from OTLP protobuf to domain records
//! - OTLP HTTP/protobuf receiver endpoints
//! - OTLP gRPC collector services

pub mod converter;
pub mod grpc;
pub mod receiver;

pub use receiver::{OtlpState, otlp_routes};
