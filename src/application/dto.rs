// Records handed to the presentation layer, with hours pre-rendered in both
// formats the schedule screens use.

use serde::Serialize;

use crate::domain::models::EmployeeId;
use crate::domain::time::{Hours, YearMonth};

/// One employee's total for a calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyHours {
    pub employee_id: EmployeeId,
    pub month: YearMonth,
    pub hours: Hours,
    pub hours_decimal: String, // e.g. "8.5"
    pub hours_hhmm: String,    // e.g. "08:30"
}

impl MonthlyHours {
    pub fn new(employee_id: EmployeeId, month: YearMonth, hours: Hours) -> Self {
        Self {
            employee_id,
            month,
            hours,
            hours_decimal: hours.to_decimal_string(),
            hours_hhmm: hours.to_hhmm(),
        }
    }
}

/// A row of the per-employee hours report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeHours {
    pub employee_id: EmployeeId,
    pub name: String,
    pub hours: Hours,
    pub hours_decimal: String,
    pub hours_hhmm: String,
}

impl EmployeeHours {
    pub fn new(employee_id: EmployeeId, name: String, hours: Hours) -> Self {
        Self {
            employee_id,
            name,
            hours,
            hours_decimal: hours.to_decimal_string(),
            hours_hhmm: hours.to_hhmm(),
        }
    }
}
