//! Store contract consumed by the scheduling core.
//!
//! Adapters decide how records are kept; the core only relies on the
//! guarantees documented here. In particular `insert_shift`/`update_shift`
//! must re-check overlaps atomically with the write, and `transact` must be
//! all-or-nothing.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::errors::ScheduleResult;
use crate::domain::models::{Employee, EmployeeId, NewEmployee, NewShift, Shift, ShiftId, SwapId};
use crate::domain::swap_model::{NewSwapRequest, SwapRequest, SwapStatus};

/// Shift query; unset fields do not filter. Date bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShiftFilter {
    pub employee_id: Option<EmployeeId>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl ShiftFilter {
    pub fn for_employee(employee_id: EmployeeId) -> Self {
        Self {
            employee_id: Some(employee_id),
            ..Default::default()
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self.date_to = Some(date);
        self
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }
}

/// Swap query; results come back most recently updated first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapFilter {
    /// Requests where this employee is requester or partner.
    pub involving: Option<EmployeeId>,
    pub status: Option<SwapStatus>,
}

/// One guarded write inside [`ScheduleStore::transact`].
///
/// Each op carries the value it expects to find; a mismatch aborts the whole
/// batch with `StaleReference`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    ReassignShift {
        shift_id: ShiftId,
        expected_owner: EmployeeId,
        new_owner: EmployeeId,
    },
    SetSwapStatus {
        swap_id: SwapId,
        expected: SwapStatus,
        next: SwapStatus,
    },
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    // --- Employees ---

    /// Ordered by name, then id.
    async fn list_employees(&self, active_only: bool) -> ScheduleResult<Vec<Employee>>;
    async fn get_employee(&self, id: EmployeeId) -> ScheduleResult<Option<Employee>>;
    async fn insert_employee(&self, employee: &NewEmployee) -> ScheduleResult<Employee>;
    /// `NotFound` when the employee does not exist.
    async fn set_employee_active(&self, id: EmployeeId, active: bool) -> ScheduleResult<Employee>;

    // --- Shifts ---

    /// Ordered by date, start time (days off first), id.
    async fn list_shifts(&self, filter: &ShiftFilter) -> ScheduleResult<Vec<Shift>>;
    async fn get_shift(&self, id: ShiftId) -> ScheduleResult<Option<Shift>>;
    /// `Conflict` if an overlapping working shift exists at write time.
    async fn insert_shift(&self, shift: &NewShift) -> ScheduleResult<Shift>;
    /// `NotFound`, or `Conflict` against shifts other than `id`.
    async fn update_shift(&self, id: ShiftId, shift: &NewShift) -> ScheduleResult<Shift>;
    /// `NotFound` when nothing was deleted.
    async fn delete_shift(&self, id: ShiftId) -> ScheduleResult<()>;

    // --- Swap requests ---

    async fn list_swaps(&self, filter: &SwapFilter) -> ScheduleResult<Vec<SwapRequest>>;
    async fn get_swap(&self, id: SwapId) -> ScheduleResult<Option<SwapRequest>>;
    /// Stored as `Pending`.
    async fn insert_swap(&self, swap: &NewSwapRequest) -> ScheduleResult<SwapRequest>;

    /// Applies every op or none of them.
    async fn transact(&self, ops: Vec<WriteOp>) -> ScheduleResult<()>;
}
