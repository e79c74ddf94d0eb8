//! HTTP event entrypoint.
//!
//! Accepts CloudEvents-wrapped storage notifications on `POST /`, runs one
//! pipeline per event, and answers liveness probes on `GET /` and
//! `GET /healthz`. Every route passes through the access-log middleware.

pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::ingest_router;
pub use server::{shutdown_signal, start_ingest_server, IngestServer};
pub use types::ApiContext;
