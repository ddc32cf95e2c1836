//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage contract the dispatcher depends on.
//! - Keep file format and locking details inside the persistence boundary.
//!
//! # Invariants
//! - All access to the event file goes through `EventRepository`.

pub mod event_repo;
