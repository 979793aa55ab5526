//! Domain model for articles, tags and their associations.
//!
//! # Responsibility
//! - Define read models returned by repositories and services.
//! - Define per-operation input shapes that cannot carry server-assigned
//!   fields (`id`, `slug`, timestamps).
//!
//! # Invariants
//! - Every entity is identified by a UUID assigned at creation.
//! - Deactivation is a flag (`is_active = false`), never a row delete.

pub mod article;
pub mod association;
pub mod tag;
pub mod validation;
