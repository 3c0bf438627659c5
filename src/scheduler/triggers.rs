//! Weekly trigger table with per-occurrence de-duplication.

use std::{fmt, time::Duration};

use chrono::{Datelike, Days, NaiveDateTime, NaiveTime, Timelike, Weekday};

use crate::dao::models::TriggerLedgerEntity;

/// Actions the scheduler knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// Open the window and announce it.
    OpenRegistration,
    /// Ask the organizer whether the game happened.
    AskOrganizer,
    /// Close the window and remind players to pay.
    CloseAndRemind,
    /// Tell players the game is over, empty the roster, reopen the window.
    ClearRoster,
}

impl TriggerKind {
    /// Stable name used in logs and in the persisted ledger.
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerKind::OpenRegistration => "open_registration",
            TriggerKind::AskOrganizer => "ask_organizer",
            TriggerKind::CloseAndRemind => "close_and_remind",
            TriggerKind::ClearRoster => "clear_roster",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A local wall-clock minute that recurs every week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    weekday: Weekday,
    time: NaiveTime,
}

impl WeeklySchedule {
    /// `None` when `hour`/`minute` are out of range.
    pub fn new(weekday: Weekday, hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|time| Self { weekday, time })
    }

    /// Day of the week.
    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    /// Hour of the day.
    pub fn hour(&self) -> u32 {
        self.time.hour()
    }

    /// Minute of the hour.
    pub fn minute(&self) -> u32 {
        self.time.minute()
    }

    /// Latest occurrence at or before `now`.
    pub fn latest_occurrence(&self, now: NaiveDateTime) -> NaiveDateTime {
        let days_back = (7 + now.weekday().num_days_from_monday()
            - self.weekday.num_days_from_monday())
            % 7;
        let date = now.date() - Days::new(u64::from(days_back));
        let candidate = date.and_time(self.time);
        if candidate > now {
            candidate - Days::new(7)
        } else {
            candidate
        }
    }
}

/// One row of the trigger table.
#[derive(Debug, Clone)]
pub struct Trigger {
    kind: TriggerKind,
    schedule: WeeklySchedule,
    last_fired: Option<NaiveDateTime>,
}

impl Trigger {
    /// A trigger that has never fired.
    pub fn new(kind: TriggerKind, schedule: WeeklySchedule) -> Self {
        Self {
            kind,
            schedule,
            last_fired: None,
        }
    }

    /// What the trigger does.
    pub fn kind(&self) -> TriggerKind {
        self.kind
    }

    /// When the trigger recurs.
    pub fn schedule(&self) -> WeeklySchedule {
        self.schedule
    }

    /// Occurrence the trigger last fired for.
    pub fn last_fired(&self) -> Option<NaiveDateTime> {
        self.last_fired
    }
}

/// Occurrence of a trigger that should run now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueTrigger {
    /// Trigger to run.
    pub kind: TriggerKind,
    /// Scheduled minute being honoured.
    pub occurrence: NaiveDateTime,
}

/// Ordered weekly triggers plus their last-fired bookkeeping.
///
/// An occurrence is due while `now` is less than `catch_up` past it and the
/// trigger has not fired for it yet. A `catch_up` of one minute means "only
/// inside the scheduled minute"; larger values let a late tick still run it.
#[derive(Debug, Clone)]
pub struct TriggerTable {
    triggers: Vec<Trigger>,
    catch_up: chrono::Duration,
}

impl TriggerTable {
    /// Build a table from triggers in evaluation order.
    pub fn new(triggers: Vec<Trigger>, catch_up: Duration) -> Self {
        let catch_up = chrono::Duration::from_std(catch_up)
            .unwrap_or_else(|_| chrono::Duration::weeks(1))
            .max(chrono::Duration::minutes(1));
        Self { triggers, catch_up }
    }

    /// The fixed weekly cycle: open Monday 12:00, close Saturday 11:00, ask the
    /// organizer Sunday 17:00, clear Sunday 20:00.
    pub fn weekly(catch_up: Duration) -> Self {
        let rows = [
            (TriggerKind::OpenRegistration, Weekday::Mon, 12, 0),
            (TriggerKind::CloseAndRemind, Weekday::Sat, 11, 0),
            (TriggerKind::AskOrganizer, Weekday::Sun, 17, 0),
            (TriggerKind::ClearRoster, Weekday::Sun, 20, 0),
        ];
        let triggers = rows
            .into_iter()
            .filter_map(|(kind, weekday, hour, minute)| {
                WeeklySchedule::new(weekday, hour, minute).map(|schedule| Trigger::new(kind, schedule))
            })
            .collect();
        Self::new(triggers, catch_up)
    }

    /// Rows in evaluation order.
    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Occurrences to run at `now`, in table order.
    pub fn due(&self, now: NaiveDateTime) -> Vec<DueTrigger> {
        let now = truncate_to_minute(now);
        self.triggers
            .iter()
            .filter_map(|trigger| {
                let occurrence = trigger.schedule.latest_occurrence(now);
                let fresh = now - occurrence < self.catch_up;
                let unfired = trigger.last_fired.is_none_or(|fired| fired < occurrence);
                (fresh && unfired).then_some(DueTrigger {
                    kind: trigger.kind,
                    occurrence,
                })
            })
            .collect()
    }

    /// Record that `kind` ran for `occurrence`. Never moves the record backwards.
    pub fn mark_fired(&mut self, kind: TriggerKind, occurrence: NaiveDateTime) {
        for trigger in self.triggers.iter_mut().filter(|t| t.kind == kind) {
            if trigger.last_fired.is_none_or(|fired| fired < occurrence) {
                trigger.last_fired = Some(occurrence);
            }
        }
    }

    /// Apply last-fired records loaded from storage. Unknown names are ignored.
    pub fn restore(&mut self, ledger: &TriggerLedgerEntity) {
        for trigger in &mut self.triggers {
            if let Some(fired) = ledger.last_fired.get(trigger.kind.as_str()) {
                trigger.last_fired = Some(*fired);
            }
        }
    }

    /// Snapshot of the last-fired records for storage.
    pub fn ledger(&self) -> TriggerLedgerEntity {
        TriggerLedgerEntity {
            last_fired: self
                .triggers
                .iter()
                .filter_map(|t| t.last_fired.map(|fired| (t.kind.as_str().to_string(), fired)))
                .collect(),
        }
    }
}

fn truncate_to_minute(now: NaiveDateTime) -> NaiveDateTime {
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}
