//! Vidmeta Core Library
//!
//! This library batch-resolves short-video share links into structured
//! metadata records: author, caption, engagement counts and publish time.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`link`] - Link normalization and short-link resolution
//! - [`fetch`] - HTTP client, failure classification and retry with backoff
//! - [`payload`] - Metadata page parsing into typed fields
//! - [`engine`] - Bounded-concurrency scheduler, aggregation and event sinks
//! - [`config`] - Run configuration and the run-scoped context
//! - [`record`] - Input items, output records and run summaries
//!
//! Data flows link list → [`link`] → [`fetch`] (with retry) → [`payload`] →
//! record → aggregator (ordered) and event sink (streamed).

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod fetch;
pub mod link;
pub mod payload;
pub mod record;
mod user_agent;

// Re-export commonly used types
pub use config::{
    ConfigError, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY, RunConfig, RunContext,
};
pub use engine::{
    ChannelSink, EngineError, EngineEvent, EventSink, FetchScheduler, ItemError, NullSink,
    TracingSink,
};
pub use fetch::{
    ClientError, DEFAULT_MAX_ATTEMPTS, FailureType, FetchError, HttpClient, MetadataSource,
    RetryDecision, RetryPolicy, classify_error,
};
pub use link::{LinkError, VideoId, normalize, resolve_video_id};
pub use payload::{PayloadError, VideoFields};
pub use record::{
    FailureKind, InputItem, ProgressEvent, RecordStatus, RunResult, RunSummary, VideoRecord,
};
