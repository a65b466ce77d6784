use chrono::NaiveDate;

use crate::application::dto::{EmployeeHours, MonthlyHours};
use crate::application::{ensure_ordered_range, read_with_retry, ServiceContext};
use crate::domain::auth::Capability;
use crate::domain::errors::ScheduleResult;
use crate::domain::hours::{monthly_total, totals_by_employee};
use crate::domain::models::EmployeeId;
use crate::domain::time::YearMonth;
use crate::infrastructure::store::ShiftFilter;

pub struct HoursService {
    ctx: ServiceContext,
}

impl HoursService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Net hours worked by `employee_id` in `month`. Employees may only ask
    /// about themselves.
    pub async fn monthly_hours(&self, employee_id: EmployeeId, month: YearMonth) -> ScheduleResult<MonthlyHours> {
        let caller = self.ctx.caller().await?;
        caller.schedule_scope(Some(employee_id))?;

        let filter = ShiftFilter::for_employee(employee_id).between(month.first_day(), month.last_day());
        let store = &self.ctx.store;
        let filter = &filter;
        let shifts = read_with_retry("monthly hours", move || store.list_shifts(filter)).await?;

        let hours = monthly_total(&shifts, employee_id, month)?;
        tracing::debug!(employee_id, %month, minutes = hours.minutes(), "monthly hours computed");
        Ok(MonthlyHours::new(employee_id, month, hours))
    }

    /// Totals for every active employee over `[from, to]`, ordered by name.
    /// Employees without shifts in range are reported with zero hours.
    pub async fn hours_by_employee(&self, from: NaiveDate, to: NaiveDate) -> ScheduleResult<Vec<EmployeeHours>> {
        self.ctx.authorize(Capability::ViewReports).await?;
        ensure_ordered_range(Some(from), Some(to))?;

        let store = &self.ctx.store;
        let employees = read_with_retry("list employees", move || store.list_employees(true)).await?;
        let filter = ShiftFilter::default().between(from, to);
        let filter = &filter;
        let shifts = read_with_retry("hours report", move || store.list_shifts(filter)).await?;

        let totals = totals_by_employee(&shifts, from, to)?;
        Ok(employees
            .into_iter()
            .map(|e| {
                let hours = totals.get(&e.id).copied().unwrap_or_default();
                EmployeeHours::new(e.id, e.name, hours)
            })
            .collect())
    }
}
