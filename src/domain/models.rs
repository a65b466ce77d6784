// =====================
// Domain models
// =====================

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{ScheduleError, ScheduleResult};
use crate::domain::time::{net_hours, Hours};

pub type EmployeeId = i64;
pub type ShiftId = i64;
pub type SwapId = i64;

/// Longest break a single shift may declare.
pub const MAX_BREAK_MINUTES: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    /// Job title shown next to the name (e.g. "barista"), unrelated to [`crate::domain::auth::Role`].
    pub role_label: Option<String>,
    pub department: Option<String>,
    pub weekly_hours: u32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    pub name: String,
    pub role_label: Option<String>,
    pub department: Option<String>,
    pub weekly_hours: u32,
}

impl NewEmployee {
    pub fn new(name: impl Into<String>, weekly_hours: u32) -> Self {
        Self {
            name: name.into(),
            role_label: None,
            department: None,
            weekly_hours,
        }
    }

    pub fn validate(&self) -> ScheduleResult<()> {
        if self.name.trim().is_empty() {
            return Err(ScheduleError::validation("name", "must not be blank"));
        }
        if self.weekly_hours > 7 * 24 {
            return Err(ScheduleError::validation("weekly_hours", "cannot exceed the hours in a week"));
        }
        Ok(())
    }
}

// =====================
// Shifts
// =====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub break_minutes: u32,
    pub break_paid: bool,
}

impl WorkingHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start,
            end,
            break_minutes: 0,
            break_paid: false,
        }
    }

    pub fn with_break(mut self, minutes: u32, paid: bool) -> Self {
        self.break_minutes = minutes;
        self.break_paid = paid;
        self
    }

    pub fn net_hours(&self) -> ScheduleResult<Hours> {
        Ok(net_hours(self.start, self.end, self.break_minutes)?)
    }
}

/// What a shift record books: either a time range or a day off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ShiftSlot {
    Off,
    Working(WorkingHours),
}

impl ShiftSlot {
    pub fn working(&self) -> Option<&WorkingHours> {
        match self {
            ShiftSlot::Working(hours) => Some(hours),
            ShiftSlot::Off => None,
        }
    }

    pub fn is_off(&self) -> bool {
        matches!(self, ShiftSlot::Off)
    }

    fn validate(&self) -> ScheduleResult<()> {
        if let ShiftSlot::Working(hours) = self {
            if hours.end <= hours.start {
                return Err(ScheduleError::InvalidRange {
                    start: hours.start,
                    end: hours.end,
                });
            }
            if hours.break_minutes > MAX_BREAK_MINUTES {
                return Err(ScheduleError::validation("break_minutes", "longer than a day"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: ShiftId,
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub slot: ShiftSlot,
    pub note: Option<String>,
}

impl Shift {
    pub fn is_off(&self) -> bool {
        self.slot.is_off()
    }

    /// Half-open `[start, end)` for working shifts.
    pub fn interval(&self) -> Option<(NaiveTime, NaiveTime)> {
        self.slot.working().map(|h| (h.start, h.end))
    }

    /// Key used for schedule ordering: date, then start (day-off records first), then id.
    pub fn sort_key(&self) -> (NaiveDate, Option<NaiveTime>, ShiftId) {
        (self.date, self.interval().map(|(start, _)| start), self.id)
    }
}

/// A shift that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShift {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub slot: ShiftSlot,
    pub note: Option<String>,
}

impl NewShift {
    pub fn working(employee_id: EmployeeId, date: NaiveDate, hours: WorkingHours) -> Self {
        Self {
            employee_id,
            date,
            slot: ShiftSlot::Working(hours),
            note: None,
        }
    }

    pub fn off(employee_id: EmployeeId, date: NaiveDate) -> Self {
        Self {
            employee_id,
            date,
            slot: ShiftSlot::Off,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn validate(&self) -> ScheduleResult<()> {
        self.slot.validate()
    }
}

/// Partial update of a shift; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftPatch {
    pub employee_id: Option<EmployeeId>,
    pub date: Option<NaiveDate>,
    pub slot: Option<ShiftSlot>,
    /// `Some(None)` clears the note.
    pub note: Option<Option<String>>,
}

impl ShiftPatch {
    pub fn apply_to(&self, shift: &Shift) -> NewShift {
        NewShift {
            employee_id: self.employee_id.unwrap_or(shift.employee_id),
            date: self.date.unwrap_or(shift.date),
            slot: self.slot.unwrap_or(shift.slot),
            note: self.note.clone().unwrap_or_else(|| shift.note.clone()),
        }
    }
}
