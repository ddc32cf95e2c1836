//! Core logic for the governor node.
//!
//! The node answers verb/noun commands about a weekly schedule and a set of
//! one-off events. This crate holds the event repository, the command
//! dispatcher and the calendar-window computation; transports only hand it
//! parsed requests.

pub mod config;
pub mod logging;
pub mod model;
pub mod period;
pub mod protocol;
pub mod repo;
pub mod schedule;
pub mod service;
pub mod wire;

pub use config::{ConfigError, NodeConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::event::{parse_event_at, Event, EventTimeError, NewEvent};
pub use model::slot::Slot;
pub use period::{period_bounds, DateRange, Period};
pub use protocol::{ErrorCode, Noun, Reply, ReplyVerb, Request, Responder, Verb};
pub use repo::event_repo::{EventRepository, JsonEventRepository, RepoError, RepoResult};
pub use schedule::{Schedule, ScheduleError};
pub use service::dispatcher::{Clock, Dispatcher, SystemClock};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
