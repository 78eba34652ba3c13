//! Pure domain rules for the bazaar marketplace.
//!
//! Nothing in this crate touches the database or the network; every function
//! is deterministic so it can be exercised directly from unit tests and reused
//! by the persistence and engine layers.

pub mod audit;
pub mod error;
pub mod listing;
pub mod login_guard;
pub mod moderation;
pub mod notification;
pub mod report;
pub mod reputation;
pub mod review;
pub mod roles;
pub mod search;
pub mod types;
