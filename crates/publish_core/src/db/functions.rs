//! Application-defined SQL functions.
//!
//! # Invariants
//! - `fold_case(text)` lowercases with full Unicode rules; SQLite's
//!   built-in `lower()` and `LIKE` only fold ASCII.
//! - `NULL` input yields `NULL`.

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Name of the Unicode case-folding scalar function.
pub const FOLD_CASE_FN: &str = "fold_case";

/// Registers every application SQL function on `conn`.
///
/// Registration is per connection and safe to repeat.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_CASE_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|text| fold_case(&text)))
        },
    )
}

/// Case folding shared by the SQL function and Rust-side needles.
pub fn fold_case(value: &str) -> String {
    value.to_lowercase()
}
