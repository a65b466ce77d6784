use chrono::{NaiveDate, NaiveTime};

use crate::domain::errors::{ScheduleError, ScheduleResult};
use crate::domain::models::{EmployeeId, NewShift, Shift, ShiftId};

/// A shift about to be written, reduced to what overlap checks need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapCandidate {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    /// `None` for a day off.
    pub interval: Option<(NaiveTime, NaiveTime)>,
    /// The record being replaced on update.
    pub exclude_shift_id: Option<ShiftId>,
}

impl OverlapCandidate {
    pub fn for_new(shift: &NewShift) -> Self {
        Self {
            employee_id: shift.employee_id,
            date: shift.date,
            interval: shift.slot.working().map(|h| (h.start, h.end)),
            exclude_shift_id: None,
        }
    }

    /// `shift` as it would look after being handed to `new_owner`.
    pub fn reassigned(shift: &Shift, new_owner: EmployeeId) -> Self {
        Self {
            employee_id: new_owner,
            date: shift.date,
            interval: shift.interval(),
            exclude_shift_id: Some(shift.id),
        }
    }

    pub fn excluding(mut self, shift_id: ShiftId) -> Self {
        self.exclude_shift_id = Some(shift_id);
        self
    }
}

/// Half-open `[start, end)` intersection; touching endpoints do not overlap.
pub fn intervals_overlap(a: (NaiveTime, NaiveTime), b: (NaiveTime, NaiveTime)) -> bool {
    a.0 < b.1 && a.1 > b.0
}

/// First persisted shift the candidate collides with, if any.
///
/// Days off never collide. `existing` may contain other employees and dates;
/// they are skipped.
pub fn find_conflict<'a, I>(candidate: &OverlapCandidate, existing: I) -> Option<&'a Shift>
where
    I: IntoIterator<Item = &'a Shift>,
{
    let wanted = candidate.interval?;
    existing.into_iter().find(|other| {
        other.employee_id == candidate.employee_id
            && other.date == candidate.date
            && Some(other.id) != candidate.exclude_shift_id
            && other
                .interval()
                .is_some_and(|taken| intervals_overlap(wanted, taken))
    })
}

/// [`find_conflict`] turned into a `Conflict` error.
pub fn ensure_no_conflict<'a, I>(candidate: &OverlapCandidate, existing: I) -> ScheduleResult<()>
where
    I: IntoIterator<Item = &'a Shift>,
{
    match find_conflict(candidate, existing) {
        Some(other) => Err(ScheduleError::Conflict {
            employee_id: candidate.employee_id,
            date: candidate.date,
            existing_shift_id: other.id,
        }),
        None => Ok(()),
    }
}
