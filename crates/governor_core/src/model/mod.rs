//! Domain model for the governor node.
//!
//! # Responsibility
//! - Define the one-off `Event` record and the weekly `Slot` entry.
//! - Keep date/time argument parsing next to the types it produces.
//!
//! # Invariants
//! - Events are identified by a stable `ev<N>` ID assigned on creation.
//! - Slots are read-only after loading.

pub mod event;
pub mod slot;
