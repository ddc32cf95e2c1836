//! Request handling services.
//!
//! # Responsibility
//! - Turn typed requests into repository/schedule calls and replies.
//! - Keep transport details out of command semantics.

pub mod dispatcher;
