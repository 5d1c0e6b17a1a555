//! Users Domain
//!
//! This module provides a complete domain implementation for user
//! management with optional image attachments.
//!
//! # Features
//!
//! - User CRUD operations
//! - Image upload/replace/delete kept consistent with the user record
//! - Partial updates distinguishing absent keys from explicit nulls
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Lifecycle rules, image side effects
//! └──────┬──────┘
//!        │
//! ┌──────▼──────────────┐
//! │ Repository │ Blobs  │  ← Data access (traits + implementations)
//! └──────┬──────────────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, DTOs
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_users::{
//!     handlers,
//!     repository::InMemoryUserRepository,
//!     service::UserService,
//!     storage::InMemoryBlobStore,
//! };
//!
//! // Create collaborators and service
//! let repository = InMemoryUserRepository::new();
//! let storage = InMemoryBlobStore::new();
//! let service = UserService::new(repository, storage);
//!
//! // Create Axum router
//! let router = handlers::router(service);
//! ```

pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use error::{UserError, UserResult};
pub use models::{CreateUser, ImagePayload, Patch, UpdateUser, User, UserFilter, UserResponse};
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;
pub use storage::{BlobStore, FsBlobStore, InMemoryBlobStore, StorageError, StorageResult};
