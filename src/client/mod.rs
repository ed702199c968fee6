//! Upload client for the portal API.
//!
//! [`PortalClient`] wraps the HTTP endpoints; [`UploadOrchestrator`] drives a
//! queue of files through an ordered list of [`UploadStrategy`]s (direct
//! presigned PUT first, server proxy as fallback).
//!
//! ```no_run
//! use edu_portal::client::{
//!     DirectUpload, LocalFile, PortalClient, ProxyUpload, UploadOrchestrator,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), edu_portal::client::UploadError> {
//! let client = PortalClient::builder("http://localhost:3000").build()?;
//! let orchestrator = UploadOrchestrator::new(vec![
//!     Arc::new(DirectUpload::new(client.clone())),
//!     Arc::new(ProxyUpload::new(client)),
//! ])
//! .with_category("pdfs");
//!
//! let file = LocalFile::new("notes.pdf", "application/pdf", std::fs::read("notes.pdf").unwrap_or_default());
//! for (id, result) in orchestrator.upload_all(vec![file]).await {
//!     println!("{id}: {result:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod error;
pub mod optimistic;
pub mod orchestrator;
pub mod strategy;
pub mod task;

pub use api::{PortalClient, PortalClientBuilder, ProgressFn};
pub use error::{UploadError, UploadErrorKind};
pub use optimistic::{Confirmation, Optimistic};
pub use orchestrator::{UploadEvent, UploadOrchestrator};
pub use strategy::{DirectUpload, ProxyUpload, UploadStrategy};
pub use task::{LocalFile, TaskId, UploadOutcome, UploadState, UploadTask};
