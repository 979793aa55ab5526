//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Emit metadata-only log events for mutations.
//! - Keep outer layers independent of SQLite details.

pub mod article_service;
pub mod association_service;
pub mod tag_service;
