//! Media retrieval for Frigate Relay.
//!
//! - [`retry_until`] - bounded retry with a fixed delay under one deadline
//! - [`MediaFetcher`] - clip downloads with retries and a size ceiling
//! - [`FrigateClient`] - the Frigate HTTP API (snapshots, clips, manual events)

pub mod error;
pub mod fetcher;
pub mod frigate;
pub mod retry;

pub use error::{FetchError, MediaError, Result};
pub use fetcher::{BlobSource, MediaFetcher, DEFAULT_RETRY_DELAY, MEDIA_CEILING};
pub use frigate::{CreatedEvent, DetectionService, FrigateClient};
pub use retry::{retry_until, RetryError, RetryPolicy};
