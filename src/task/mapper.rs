//! Translation between the wire representation and the board view model.
//!
//! All functions here are pure and total. Enum values outside the known
//! range decode to a fixed default (`Todo` / `Low`) instead of failing; the
//! event is logged at `warn` so corrupted rows show up in the logs.
//!
//! Due dates travel as zone-less local wall-clock strings. [`ClientZone`]
//! holds the client's zone so that a due date survives a create → fetch
//! round trip without shifting by the client's offset.

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc,
};
use tracing::warn;

use super::types::{Priority, Task, TaskDraft, TaskId, TaskStatus};
use super::wire::{ApiTask, TaskPayload, WireEnum};
use crate::error::{KanbanError, Result};

/// Wire format of due dates: local wall clock, no zone designator.
pub const WALL_CLOCK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Tag delimiter used when joining tags for the wire.
const TAG_SEPARATOR: &str = ", ";

// ---------------------------------------------------------------------------
// Status / priority codes
// ---------------------------------------------------------------------------

/// Numeric wire code of a status.
pub fn status_code(status: TaskStatus) -> i64 {
    match status {
        TaskStatus::Todo => 0,
        TaskStatus::InProgress => 1,
        TaskStatus::Done => 2,
    }
}

/// Encode a status for the wire (always numeric).
pub fn status_to_wire(status: TaskStatus) -> WireEnum {
    WireEnum::Code(status_code(status))
}

/// Decode a wire status; unknown values become [`TaskStatus::Todo`].
pub fn status_from_wire(value: &WireEnum) -> TaskStatus {
    let decoded = match value {
        WireEnum::Code(0) => Some(TaskStatus::Todo),
        WireEnum::Code(1) => Some(TaskStatus::InProgress),
        WireEnum::Code(2) => Some(TaskStatus::Done),
        WireEnum::Code(_) => None,
        WireEnum::Symbol(symbol) => TaskStatus::parse(symbol),
    };
    decoded.unwrap_or_else(|| {
        warn!("unknown task status {value} on the wire, defaulting to todo");
        TaskStatus::Todo
    })
}

/// Numeric wire code of a priority.
pub fn priority_code(priority: Priority) -> i64 {
    match priority {
        Priority::Low => 1,
        Priority::Medium => 2,
        Priority::High => 3,
    }
}

/// Encode a priority for the wire (always numeric).
pub fn priority_to_wire(priority: Priority) -> WireEnum {
    WireEnum::Code(priority_code(priority))
}

/// Decode a wire priority; unknown values become [`Priority::Low`].
pub fn priority_from_wire(value: &WireEnum) -> Priority {
    let decoded = match value {
        WireEnum::Code(1) => Some(Priority::Low),
        WireEnum::Code(2) => Some(Priority::Medium),
        WireEnum::Code(3) => Some(Priority::High),
        WireEnum::Code(_) => None,
        WireEnum::Symbol(symbol) => Priority::parse(symbol),
    };
    decoded.unwrap_or_else(|| {
        warn!("unknown task priority {value} on the wire, defaulting to low");
        Priority::Low
    })
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Split a delimited tag string into trimmed, non-empty tags.
pub fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

/// Join tags for the wire; an empty list is omitted entirely.
pub fn join_tags(tags: &[String]) -> Option<String> {
    let cleaned: Vec<&str> = tags
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join(TAG_SEPARATOR))
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Parse a wire due date into its wall-clock value.
///
/// Accepts `YYYY-MM-DDTHH:MM:SS[.fff]`, a zoned RFC 3339 string (read by its
/// wall-clock part) and a bare `YYYY-MM-DD` (midnight).
pub fn parse_wall_clock(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive);
    }
    if let Ok(zoned) = DateTime::parse_from_rfc3339(raw) {
        return Some(zoned.naive_local());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Format a wall-clock value for the wire.
pub fn format_wall_clock(naive: &NaiveDateTime) -> String {
    naive.format(WALL_CLOCK_FORMAT).to_string()
}

/// Zone due dates are encoded and decoded in.
///
/// The system zone resolves the offset at each due date, so a date on the
/// other side of a daylight-saving change keeps its wall clock. A fixed
/// offset is used only when configured explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientZone {
    kind: ZoneKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZoneKind {
    System,
    Fixed(FixedOffset),
}

impl ClientZone {
    /// The system's local zone, including its daylight-saving rules.
    pub fn local() -> Self {
        Self {
            kind: ZoneKind::System,
        }
    }

    /// UTC (offset zero).
    pub fn utc() -> Self {
        Self {
            kind: ZoneKind::Fixed(Utc.fix()),
        }
    }

    /// A fixed offset east of UTC, in minutes. `None` when out of range.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(|offset| Self {
                kind: ZoneKind::Fixed(offset),
            })
    }

    /// Fixed offset east of UTC in minutes; `None` for the system zone.
    pub fn offset_minutes(&self) -> Option<i32> {
        match self.kind {
            ZoneKind::System => None,
            ZoneKind::Fixed(offset) => Some(offset.local_minus_utc() / 60),
        }
    }

    /// Encode a due date as the client's local wall clock.
    pub fn encode_due_date(&self, due: &DateTime<Utc>) -> String {
        match self.kind {
            ZoneKind::System => encode_in(&Local, due),
            ZoneKind::Fixed(offset) => encode_in(&offset, due),
        }
    }

    /// Decode a wire due date in the client's zone.
    pub fn decode_due_date(&self, raw: &str) -> Option<DateTime<Utc>> {
        let naive = parse_wall_clock(raw)?;
        match self.kind {
            ZoneKind::System => decode_in(&Local, &naive),
            ZoneKind::Fixed(offset) => decode_in(&offset, &naive),
        }
    }
}

fn encode_in<Tz: TimeZone>(zone: &Tz, due: &DateTime<Utc>) -> String {
    format_wall_clock(&due.with_timezone(zone).naive_local())
}

/// Resolve a wall clock in `zone` using the offset in effect at that date.
///
/// A repeated wall clock takes its first occurrence; one skipped by a
/// forward jump moves past the gap.
fn decode_in<Tz: TimeZone>(zone: &Tz, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(naive)
        .earliest()
        .or_else(|| {
            zone.from_local_datetime(&(*naive + TimeDelta::hours(1)))
                .earliest()
        })
        .map(|local| local.with_timezone(&Utc))
}

impl Default for ClientZone {
    fn default() -> Self {
        Self::local()
    }
}

// ---------------------------------------------------------------------------
// Whole-record mapping
// ---------------------------------------------------------------------------

/// Record-level mapper bound to the client's zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mapper {
    zone: ClientZone,
}

impl Mapper {
    pub fn new(zone: ClientZone) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> ClientZone {
        self.zone
    }

    /// Map a stored record into the view model.
    pub fn task_from_wire(&self, record: &ApiTask) -> Task {
        let due_date = record.due_date.as_deref().and_then(|raw| {
            let decoded = self.zone.decode_due_date(raw);
            if decoded.is_none() {
                warn!(task_id = record.id, "unparseable due date {raw:?}, ignoring");
            }
            decoded
        });
        Task {
            id: TaskId::from(record.id),
            title: record.title.clone(),
            description: record.description.clone(),
            status: status_from_wire(&record.status),
            priority: priority_from_wire(&record.priority),
            created_at: record.created_at,
            updated_at: record.updated_at,
            due_date,
            has_notification: record.has_notification.unwrap_or(false),
            tags: split_tags(record.tags.as_deref()),
        }
    }

    /// Build a request payload from a draft; `id` is set for updates.
    pub fn payload_from_draft(&self, draft: &TaskDraft, id: Option<i64>) -> TaskPayload {
        TaskPayload {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            status: status_to_wire(draft.status),
            priority: priority_to_wire(draft.priority),
            due_date: draft.due_date.map(|due| self.zone.encode_due_date(&due)),
            has_notification: Some(draft.has_notification),
            tags: join_tags(&draft.tags),
        }
    }

    /// Build an update payload from a stored task.
    ///
    /// Fails for provisional tasks, which have no store id yet.
    pub fn payload_from_task(&self, task: &Task) -> Result<TaskPayload> {
        let id = task
            .id
            .numeric()
            .ok_or_else(|| KanbanError::NotFound(task.id.to_string()))?;
        Ok(self.payload_from_draft(&task.to_draft(), Some(id)))
    }
}
