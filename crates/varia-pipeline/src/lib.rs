//! Varia pipeline library
//!
//! The control center of the media system: the upload orchestrator
//! (validate → classify → dispatch → aggregate-or-abort → persist), the
//! metadata repository behind a trait seam, the retrieval/optimization
//! service, and the [`MediaService`] facade that exposes the boundary
//! operations to callers.

pub mod memory;
pub mod orchestrator;
pub mod repository;
pub mod retrieval;
pub mod service;

pub use memory::InMemoryMediaRepository;
pub use orchestrator::{UploadOrchestrator, UploadRequest};
pub use repository::{MediaDetailsUpdate, MediaRepository, PgMediaRepository};
pub use retrieval::{resolve_variant, NetworkHint, OptimizedUrl, RetrievalService, DEFAULT_SIZE};
pub use service::MediaService;
