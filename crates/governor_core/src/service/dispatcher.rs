//! Verb/noun command dispatcher.
//!
//! # Responsibility
//! - Validate inbound requests and route them to the event repository, the
//!   weekly schedule or the period calculator.
//! - Produce exactly one reply per request, or none for inbound replies.
//!
//! # Invariants
//! - No state is kept between requests.
//! - `NEW EVENT` validates argument count, then title, then date/time; the
//!   first failure short-circuits.
//! - Validation failures never escalate beyond a coded `ERR` reply.

use crate::model::event::{parse_event_at, Event, NewEvent};
use crate::period::{period_bounds, DateRange};
use crate::protocol::{ErrorCode, Noun, Reply, Request, Responder, Verb};
use crate::repo::event_repo::EventRepository;
use crate::schedule::Schedule;
use crate::wire::{encode_event, encode_slot, sanitize};
use chrono::{DateTime, Duration, Local};
use log::{debug, error, info, warn};

/// Default lookahead for `GET DEADLINES` without a period.
pub const DEFAULT_DEADLINE_LOOKAHEAD_DAYS: i64 = 7;

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Stateless command dispatcher over an event repository and schedule.
pub struct Dispatcher<R: EventRepository> {
    events: R,
    schedule: Schedule,
    clock: Box<dyn Clock>,
    booted_at: DateTime<Local>,
    deadline_lookahead: Duration,
}

impl<R: EventRepository> Dispatcher<R> {
    /// Creates a dispatcher on the system clock; uptime counts from now.
    pub fn new(events: R, schedule: Schedule) -> Self {
        Self::with_clock(events, schedule, SystemClock)
    }

    pub fn with_clock(events: R, schedule: Schedule, clock: impl Clock + 'static) -> Self {
        let booted_at = clock.now();
        Self {
            events,
            schedule,
            clock: Box::new(clock),
            booted_at,
            deadline_lookahead: Duration::days(DEFAULT_DEADLINE_LOOKAHEAD_DAYS),
        }
    }

    /// Overrides the lookahead used by `GET DEADLINES` without a period.
    pub fn with_deadline_lookahead(mut self, lookahead: Duration) -> Self {
        self.deadline_lookahead = lookahead;
        self
    }

    pub fn events(&self) -> &R {
        &self.events
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Handles one request and sends the reply through `responder`.
    ///
    /// Send failures are logged and not escalated.
    pub fn serve<T: Responder>(&self, request: &Request, responder: &T) {
        let Some(reply) = self.handle(request) else {
            return;
        };
        if let Err(err) = responder.reply(request, &reply) {
            warn!(
                "event=reply module=dispatcher status=error to={} verb={} noun={} error={}",
                request.from,
                reply.verb.as_str(),
                reply.noun,
                err
            );
        }
    }

    /// Computes the reply for one request; `None` means no reply is sent.
    pub fn handle(&self, request: &Request) -> Option<Reply> {
        debug!(
            "event=cmd module=dispatcher from={} verb={} noun={} args={:?}",
            request.from,
            request.verb.as_str(),
            request.noun.as_str(),
            request.args
        );

        let reply = match &request.verb {
            Verb::Ok | Verb::Err | Verb::Pong => {
                debug!(
                    "event=cmd_ignored module=dispatcher from={} verb={} noun={}",
                    request.from,
                    request.verb.as_str(),
                    request.noun.as_str()
                );
                return None;
            }
            Verb::Ping => Reply::pong(),
            Verb::New => self.cmd_new(request),
            Verb::Stop => self.cmd_stop(request),
            Verb::Get => self.cmd_get(request),
            Verb::Unknown(verb) => {
                warn!(
                    "event=cmd module=dispatcher status=rejected error_code=unknown_verb verb={} from={}",
                    verb, request.from
                );
                Reply::err(ErrorCode::Verb)
            }
        };
        Some(reply)
    }

    fn cmd_new(&self, request: &Request) -> Reply {
        match request.noun {
            Noun::Event => self.new_event(request),
            _ => unknown_noun(request),
        }
    }

    fn cmd_stop(&self, request: &Request) -> Reply {
        match request.noun {
            Noun::Event => self.stop_event(request),
            _ => unknown_noun(request),
        }
    }

    fn cmd_get(&self, request: &Request) -> Reply {
        match request.noun {
            Noun::Uptime => self.get_uptime(request),
            Noun::Schedule => self.get_schedule(request),
            Noun::Events => self.get_events(request),
            Noun::Event => self.get_event(request),
            Noun::Deadlines => self.get_deadlines(request),
            _ => unknown_noun(request),
        }
    }

    fn new_event(&self, request: &Request) -> Reply {
        if request.args.len() < 3 {
            return Reply::err(ErrorCode::Argc);
        }
        let title = request.arg(0).unwrap_or_default();
        if title.is_empty() {
            warn!(
                "event=new_event module=dispatcher status=rejected error_code=empty_title from={}",
                request.from
            );
            return Reply::err(ErrorCode::Title);
        }
        let date = request.args[1].as_str();
        let time = request.args[2].as_str();
        let at = match parse_event_at(date, time) {
            Ok(at) => at,
            Err(err) => {
                warn!(
                    "event=new_event module=dispatcher status=rejected error_code=bad_time date={} time={} from={} error={}",
                    date, time, request.from, err
                );
                return Reply::err_with(ErrorCode::Time, vec![date.to_string(), time.to_string()]);
            }
        };

        let mut event = NewEvent::new(title, at);
        event.location = request.arg(3).unwrap_or_default().to_string();
        event.notes = request.arg(4).unwrap_or_default().to_string();

        match self.events.add(event) {
            Ok(id) => {
                info!(
                    "event=new_event module=dispatcher status=ok id={} title={} at={} from={}",
                    id,
                    title,
                    at.format("%Y-%m-%d %H:%M"),
                    request.from
                );
                Reply::ok(&Noun::Event, vec![id])
            }
            Err(err) => {
                error!(
                    "event=new_event module=dispatcher status=error error_code=add_failed title={} from={} error={}",
                    title, request.from, err
                );
                Reply::err_with(ErrorCode::Add, vec![sanitize(&err.to_string())])
            }
        }
    }

    fn stop_event(&self, request: &Request) -> Reply {
        let Some(id) = request.arg(0) else {
            return Reply::err(ErrorCode::Argc);
        };
        if !self.events.delete(id) {
            debug!(
                "event=stop_event module=dispatcher status=not_found id={} from={}",
                id, request.from
            );
            return Reply::err(ErrorCode::Nac);
        }
        info!(
            "event=stop_event module=dispatcher status=ok id={} from={}",
            id, request.from
        );
        Reply::ok(&Noun::Event, vec![id.to_string()])
    }

    fn get_uptime(&self, request: &Request) -> Reply {
        let elapsed = (self.clock.now() - self.booted_at)
            .to_std()
            .unwrap_or_default();
        let uptime = std::time::Duration::from_secs(elapsed.as_secs());
        let rendered = humantime::format_duration(uptime).to_string();
        debug!(
            "event=get_uptime module=dispatcher uptime={} from={}",
            rendered, request.from
        );
        Reply::ok(&Noun::Uptime, vec![rendered])
    }

    fn get_schedule(&self, request: &Request) -> Reply {
        let Some(weekday) = request.arg(0) else {
            return Reply::err(ErrorCode::Argc);
        };
        let slots: Vec<String> = self.schedule.for_weekday(weekday).map(encode_slot).collect();
        debug!(
            "event=get_schedule module=dispatcher weekday={} slots={} from={}",
            weekday,
            slots.len(),
            request.from
        );
        Reply::ok(&Noun::Schedule, slots)
    }

    fn get_events(&self, request: &Request) -> Reply {
        let events = sorted(self.events.list());
        debug!(
            "event=get_events module=dispatcher count={} from={}",
            events.len(),
            request.from
        );
        Reply::ok(&Noun::Events, events.iter().map(encode_event).collect())
    }

    fn get_event(&self, request: &Request) -> Reply {
        let Some(id) = request.arg(0) else {
            return Reply::err(ErrorCode::Argc);
        };
        match self.events.get(id) {
            Some(event) => {
                debug!(
                    "event=get_event module=dispatcher id={} from={}",
                    id, request.from
                );
                Reply::ok(&Noun::Event, vec![encode_event(&event)])
            }
            None => Reply::err(ErrorCode::Nac),
        }
    }

    fn get_deadlines(&self, request: &Request) -> Reply {
        let now = self.clock.now();
        let window = match request.args.first() {
            Some(period) => match period_bounds(period, &now) {
                Some(window) => window,
                None => {
                    warn!(
                        "event=get_deadlines module=dispatcher status=rejected error_code=unknown_period period={} from={}",
                        period, request.from
                    );
                    return Reply::err(ErrorCode::Period);
                }
            },
            None => DateRange::lookahead(now, self.deadline_lookahead),
        };

        let due = sorted(
            self.events
                .list()
                .into_iter()
                .filter(|event| window.contains(&event.at))
                .collect(),
        );
        debug!(
            "event=get_deadlines module=dispatcher start={} end={} count={} from={}",
            window.start.format("%Y-%m-%d %H:%M"),
            window.end.format("%Y-%m-%d %H:%M"),
            due.len(),
            request.from
        );
        Reply::ok(&Noun::Deadlines, due.iter().map(encode_event).collect())
    }
}

fn unknown_noun(request: &Request) -> Reply {
    warn!(
        "event=cmd module=dispatcher status=rejected error_code=unknown_noun verb={} noun={} from={}",
        request.verb.as_str(),
        request.noun.as_str(),
        request.from
    );
    Reply::err(ErrorCode::Noun)
}

/// Orders events by time, then by ID for a stable reply.
fn sorted(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by(|a, b| a.at.cmp(&b.at).then_with(|| a.id.cmp(&b.id)));
    events
}
