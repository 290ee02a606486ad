// Conductor - transit data pipeline orchestrator
// Copyright (c) 2026 Conductor Contributors
// Licensed under the MIT License

//! # Conductor - transit data pipeline orchestrator
//!
//! Conductor ingests transit-data files (GTFS/NeTEx) per data provider,
//! drives them through a multi-stage external transformation pipeline
//! (import → validate → export → merge → graph-build), and republishes the
//! results.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Submitting** provider feeds to an external, asynchronous transform
//!   service as multipart jobs
//! - **Polling** job status with a fixed delay and a hard retry ceiling,
//!   so every job is resolved in bounded time
//! - **Classifying** terminal results fail-closed from the job's action
//!   report
//! - **Sequencing** the per-provider stage chain with at most one in-flight
//!   job per provider and stage
//! - **Merging** per-provider GTFS exports into a single feed, removing
//!   duplicate stop and transfer records
//!
//! ## Architecture
//!
//! Conductor follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (pipeline, events, merge)
//! - [`adapters`] - External integrations (transform service, storage,
//!   graph builder)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use conductor::adapters::graph::LogGraphBuilder;
//! use conductor::adapters::storage::LocalFeedStore;
//! use conductor::adapters::transform::TransformClient;
//! use conductor::config::ConductorConfig;
//! use conductor::core::events::TracingEventSink;
//! use conductor::core::pipeline::{PipelineSequencer, PollerConfig};
//! use conductor::domain::{ProviderId, ProviderRepository};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load configuration
//!     let config = conductor::config::load_config("conductor.toml")?;
//!
//!     // Wire up the sequencer
//!     let sequencer = PipelineSequencer::new(
//!         Arc::new(TransformClient::new(&config.transform)?),
//!         Arc::new(ProviderRepository::new(config.build_providers().unwrap())?),
//!         Arc::new(LocalFeedStore::new(&config.storage.root)),
//!         Arc::new(LogGraphBuilder),
//!         Arc::new(TracingEventSink),
//!         PollerConfig::from_config(&config.transform),
//!         config.pipeline.clone(),
//!     );
//!
//!     // Run one provider's delivery through the pipeline
//!     let outcome = sequencer.run(ProviderId::new(2), "feed.zip").await?;
//!     println!("Pipeline outcome: {outcome:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Conductor uses the [`domain::ConductorError`] type for all errors:
//!
//! ```rust,no_run
//! use conductor::domain::ConductorError;
//!
//! fn example() -> Result<(), ConductorError> {
//!     // Errors are automatically converted using the ? operator
//!     let config = conductor::config::load_config("conductor.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Conductor uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!("Starting pipeline run");
//! warn!(provider_id = 2, "No export archives to merge");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
