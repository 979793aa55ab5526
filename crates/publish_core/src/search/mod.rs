//! Article lookup by tag filter expressions.
//!
//! # Responsibility
//! - Turn free-text, comma-separated tag filters into article id sets.
//! - Keep "no filter" distinct from "filter matching nothing".

pub mod tag_query;
