//! Structured logging and optional OpenTelemetry trace export.
//!
//! Every log line is JSON. When `OTEL_EXPORTER_OTLP_ENDPOINT` is set, spans
//! are also exported over OTLP/gRPC.
//!
//! # Telemetry invariants
//!
//! - Log fields carry identifiers and counts (`task`, `records`, `node`,
//!   `request_id`), never full upstream payloads.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};
