//! Shift reads and manager edits.
//!
//! Every write is checked against the employee's existing shifts before it is
//! sent to the store. The store repeats the check atomically with the write,
//! so the early check only serves to fail fast and log.

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::application::{ensure_ordered_range, read_with_retry, ServiceContext};
use crate::domain::auth::Capability;
use crate::domain::errors::{Entity, ScheduleError, ScheduleResult};
use crate::domain::models::{NewShift, Shift, ShiftId, ShiftPatch};
use crate::domain::overlap::{ensure_no_conflict, OverlapCandidate};
use crate::domain::time::local_today;
use crate::infrastructure::store::ShiftFilter;

pub struct ShiftService {
    ctx: ServiceContext,
    timezone: Tz,
}

impl ShiftService {
    pub fn new(ctx: ServiceContext, timezone: Tz) -> Self {
        Self { ctx, timezone }
    }

    /// The civil date in the configured zone.
    pub fn today(&self) -> NaiveDate {
        local_today(&self.timezone)
    }

    /// Shifts matching `filter`, ordered by date and start time.
    ///
    /// Employees only ever see their own shifts; an unscoped filter is
    /// narrowed to the caller.
    pub async fn list(&self, filter: ShiftFilter) -> ScheduleResult<Vec<Shift>> {
        let caller = self.ctx.caller().await?;
        let employee_id = caller.schedule_scope(filter.employee_id)?;
        ensure_ordered_range(filter.date_from, filter.date_to)?;

        let filter = ShiftFilter { employee_id, ..filter };
        tracing::debug!(?filter, caller = caller.employee_id, "listing shifts");
        self.fetch(&filter).await
    }

    pub async fn get(&self, id: ShiftId) -> ScheduleResult<Shift> {
        let caller = self.ctx.caller().await?;
        let shift = self.load(id).await?;
        caller.schedule_scope(Some(shift.employee_id))?;
        Ok(shift)
    }

    /// Everyone's shifts on `date`.
    pub async fn roster(&self, date: NaiveDate) -> ScheduleResult<Vec<Shift>> {
        self.ctx.authorize(Capability::ReadAnySchedule).await?;
        self.fetch(&ShiftFilter::default().on(date)).await
    }

    pub async fn today_roster(&self) -> ScheduleResult<Vec<Shift>> {
        self.roster(self.today()).await
    }

    pub async fn create(&self, shift: NewShift) -> ScheduleResult<Shift> {
        let caller = self.ctx.authorize(Capability::ManageShifts).await?;
        shift.validate()?;
        self.ctx.ensure_active_employee(shift.employee_id).await?;
        self.precheck_overlap(OverlapCandidate::for_new(&shift)).await?;

        let created = self.ctx.store.insert_shift(&shift).await?;
        tracing::info!(
            shift_id = created.id,
            employee_id = created.employee_id,
            date = %created.date,
            by = caller.employee_id,
            "shift created"
        );
        self.ctx.notifier.notify_shifts_changed(Some(created.employee_id));
        Ok(created)
    }

    pub async fn update(&self, id: ShiftId, patch: ShiftPatch) -> ScheduleResult<Shift> {
        let caller = self.ctx.authorize(Capability::ManageShifts).await?;
        let current = self.load(id).await?;

        let next = patch.apply_to(&current);
        next.validate()?;
        if next.employee_id != current.employee_id {
            self.ctx.ensure_active_employee(next.employee_id).await?;
        }
        self.precheck_overlap(OverlapCandidate::for_new(&next).excluding(id)).await?;

        let updated = self.ctx.store.update_shift(id, &next).await?;
        tracing::info!(
            shift_id = id,
            employee_id = updated.employee_id,
            date = %updated.date,
            by = caller.employee_id,
            "shift updated"
        );
        self.ctx.notifier.notify_shifts_changed(Some(updated.employee_id));
        if current.employee_id != updated.employee_id {
            self.ctx.notifier.notify_shifts_changed(Some(current.employee_id));
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: ShiftId) -> ScheduleResult<()> {
        let caller = self.ctx.authorize(Capability::ManageShifts).await?;
        let current = self.load(id).await?;

        self.ctx.store.delete_shift(id).await?;
        tracing::info!(shift_id = id, employee_id = current.employee_id, by = caller.employee_id, "shift deleted");
        self.ctx.notifier.notify_shifts_changed(Some(current.employee_id));
        Ok(())
    }

    async fn fetch(&self, filter: &ShiftFilter) -> ScheduleResult<Vec<Shift>> {
        let store = &self.ctx.store;
        read_with_retry("list shifts", move || store.list_shifts(filter)).await
    }

    async fn load(&self, id: ShiftId) -> ScheduleResult<Shift> {
        let store = &self.ctx.store;
        read_with_retry("get shift", move || store.get_shift(id))
            .await?
            .ok_or(ScheduleError::NotFound { entity: Entity::Shift, id })
    }

    async fn precheck_overlap(&self, candidate: OverlapCandidate) -> ScheduleResult<()> {
        if candidate.interval.is_none() {
            return Ok(());
        }

        let same_day = ShiftFilter::for_employee(candidate.employee_id).on(candidate.date);
        let existing = self.fetch(&same_day).await?;
        ensure_no_conflict(&candidate, &existing).inspect_err(|e| {
            tracing::warn!(employee_id = candidate.employee_id, date = %candidate.date, error = %e, "shift rejected");
        })
    }
}
