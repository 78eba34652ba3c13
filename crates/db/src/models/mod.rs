//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A create DTO for inserts
//! - Where a table is patched, an update DTO with all `Option` fields

pub mod activity;
pub mod audit;
pub mod category;
pub mod listing;
pub mod login_attempt;
pub mod moderation;
pub mod notification;
pub mod report;
pub mod reputation;
pub mod review;
pub mod statistics;
pub mod user;
