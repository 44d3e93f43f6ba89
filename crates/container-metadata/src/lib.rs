#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ContainerMetadataError`, `FetchError`)
//! - [`config`]: Sync configuration (`ContainerMetadataConfig`, builder)
//! - [`event`]: Container lifecycle events (`ContainerEvent`, `ContainerEventKind`)
//! - [`docker`]: Docker API abstraction (`DockerClient` trait, `BollardDockerClient`)
//! - [`discovery`]: Metadata endpoint discovery (`EndpointDiscovery`, `EndpointSet`)
//! - [`fetch`]: Metadata document fetch (`MetadataFetcher`, `HttpMetadataFetcher`)
//! - [`cache`]: Container ID → document cache (`MetadataCache`)
//! - [`scheduler`]: Timer and event driven sync loop (`SyncScheduler`)
//!
//! # Architecture
//!
//! ```text
//! Docker events ──> SyncScheduler ──> EndpointDiscovery.endpoints()
//!                        |                        |
//!                        |                  EndpointSet
//!                        v                        v
//!               MetadataCache.reconcile() <── MetadataFetcher.fetch()
//!                        |
//!                        v
//!               MetadataCache.get()  (log enrichment hot path)
//! ```

pub mod cache;
pub mod config;
pub mod discovery;
pub mod docker;
pub mod error;
pub mod event;
pub mod fetch;
pub mod scheduler;

// --- Public API Re-exports ---

// Cache
pub use cache::{MetadataCache, ReconcileStats};

// Configuration
pub use config::{ContainerMetadataConfig, ContainerMetadataConfigBuilder};

// Error
pub use error::{ContainerMetadataError, FetchError};

// Events
pub use event::{ContainerEvent, ContainerEventKind};

// Docker API
pub use docker::{
    BollardDockerClient, ContainerDetails, ContainerSummary, DockerClient, ECS_AGENT_IMAGE,
};

// Discovery
pub use discovery::{DockerEndpointDiscovery, EndpointDiscovery, EndpointSet};

// Fetch
pub use fetch::{HttpMetadataFetcher, MetadataFetcher};

// Scheduler
pub use scheduler::{ContainerEventStream, SyncScheduler, SyncTrigger};
