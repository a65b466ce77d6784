use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::errors::ScheduleResult;
use crate::domain::models::{EmployeeId, Shift};
use crate::domain::time::{Hours, YearMonth};

/// Net hours of `employee_id`'s working shifts dated within `[from, to]`.
pub fn net_hours_between<'a, I>(shifts: I, employee_id: EmployeeId, from: NaiveDate, to: NaiveDate) -> ScheduleResult<Hours>
where
    I: IntoIterator<Item = &'a Shift>,
{
    shifts
        .into_iter()
        .filter(|s| s.employee_id == employee_id && from <= s.date && s.date <= to)
        .filter_map(|s| s.slot.working())
        .map(|h| h.net_hours())
        .sum()
}

pub fn monthly_total<'a, I>(shifts: I, employee_id: EmployeeId, month: YearMonth) -> ScheduleResult<Hours>
where
    I: IntoIterator<Item = &'a Shift>,
{
    net_hours_between(shifts, employee_id, month.first_day(), month.last_day())
}

/// Net hours per employee over `[from, to]`; employees without shifts are absent.
pub fn totals_by_employee<'a, I>(shifts: I, from: NaiveDate, to: NaiveDate) -> ScheduleResult<BTreeMap<EmployeeId, Hours>>
where
    I: IntoIterator<Item = &'a Shift>,
{
    let mut totals = BTreeMap::new();
    for shift in shifts {
        if shift.date < from || shift.date > to {
            continue;
        }
        if let Some(hours) = shift.slot.working() {
            *totals.entry(shift.employee_id).or_insert(Hours::ZERO) += hours.net_hours()?;
        }
    }
    Ok(totals)
}
