//! In-process [`ScheduleStore`] for tests and embedding.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::errors::{Entity, ScheduleError, ScheduleResult};
use crate::domain::models::{Employee, EmployeeId, NewEmployee, NewShift, Shift, ShiftId, SwapId};
use crate::domain::overlap::{ensure_no_conflict, OverlapCandidate};
use crate::domain::swap_model::{NewSwapRequest, SwapRequest, SwapStatus};
use crate::infrastructure::store::{ScheduleStore, ShiftFilter, SwapFilter, WriteOp};
use crate::infrastructure::timestamp_now;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    employees: BTreeMap<EmployeeId, Employee>,
    shifts: BTreeMap<ShiftId, Shift>,
    swaps: BTreeMap<SwapId, SwapRequest>,
    last_id: i64,
    /// Reads that will fail with a database error before succeeding again.
    failing_reads: u32,
    /// Added to `failing_reads` by the next committed `transact`.
    failing_reads_after_commit: u32,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn take_read_failure(&mut self) -> ScheduleResult<()> {
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(sqlx::Error::PoolTimedOut.into());
        }
        Ok(())
    }

    fn check_overlap(&self, candidate: &OverlapCandidate) -> ScheduleResult<()> {
        ensure_no_conflict(candidate, self.shifts.values())
    }

    fn apply(&mut self, op: &WriteOp) -> ScheduleResult<()> {
        match *op {
            WriteOp::ReassignShift { shift_id, expected_owner, new_owner } => {
                let shift = self
                    .shifts
                    .get_mut(&shift_id)
                    .filter(|s| s.employee_id == expected_owner)
                    .ok_or_else(|| ScheduleError::StaleReference {
                        entity: Entity::Shift,
                        id: shift_id,
                        reason: format!("no longer owned by employee {}", expected_owner),
                    })?;
                shift.employee_id = new_owner;
            }
            WriteOp::SetSwapStatus { swap_id, expected, next } => {
                let swap = self
                    .swaps
                    .get_mut(&swap_id)
                    .filter(|s| s.status == expected)
                    .ok_or_else(|| ScheduleError::StaleReference {
                        entity: Entity::SwapRequest,
                        id: swap_id,
                        reason: format!("no longer {}", expected),
                    })?;
                swap.status = next;
                swap.updated_at = timestamp_now();
            }
        }
        Ok(())
    }
}

/// Everything lives behind one mutex, so each call is its own critical section.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` read calls fail with a transient database error.
    pub async fn fail_next_reads(&self, count: u32) {
        self.state.lock().await.failing_reads = count;
    }

    /// Like [`MemoryStore::fail_next_reads`], armed only once the next
    /// `transact` has committed.
    pub async fn fail_reads_after_commit(&self, count: u32) {
        self.state.lock().await.failing_reads_after_commit = count;
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn list_employees(&self, active_only: bool) -> ScheduleResult<Vec<Employee>> {
        let mut state = self.state.lock().await;
        state.take_read_failure()?;

        let mut employees: Vec<Employee> = state
            .employees
            .values()
            .filter(|e| !active_only || e.active)
            .cloned()
            .collect();
        employees.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(employees)
    }

    async fn get_employee(&self, id: EmployeeId) -> ScheduleResult<Option<Employee>> {
        let mut state = self.state.lock().await;
        state.take_read_failure()?;
        Ok(state.employees.get(&id).cloned())
    }

    async fn insert_employee(&self, employee: &NewEmployee) -> ScheduleResult<Employee> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let record = Employee {
            id,
            name: employee.name.clone(),
            role_label: employee.role_label.clone(),
            department: employee.department.clone(),
            weekly_hours: employee.weekly_hours,
            active: true,
        };
        state.employees.insert(id, record.clone());
        Ok(record)
    }

    async fn set_employee_active(&self, id: EmployeeId, active: bool) -> ScheduleResult<Employee> {
        let mut state = self.state.lock().await;
        let employee = state
            .employees
            .get_mut(&id)
            .ok_or(ScheduleError::NotFound { entity: Entity::Employee, id })?;
        employee.active = active;
        Ok(employee.clone())
    }

    async fn list_shifts(&self, filter: &ShiftFilter) -> ScheduleResult<Vec<Shift>> {
        let mut state = self.state.lock().await;
        state.take_read_failure()?;

        let mut shifts: Vec<Shift> = state
            .shifts
            .values()
            .filter(|s| filter.employee_id.map_or(true, |id| s.employee_id == id))
            .filter(|s| filter.date_from.map_or(true, |from| s.date >= from))
            .filter(|s| filter.date_to.map_or(true, |to| s.date <= to))
            .cloned()
            .collect();
        shifts.sort_by_key(Shift::sort_key);
        Ok(shifts)
    }

    async fn get_shift(&self, id: ShiftId) -> ScheduleResult<Option<Shift>> {
        let mut state = self.state.lock().await;
        state.take_read_failure()?;
        Ok(state.shifts.get(&id).cloned())
    }

    async fn insert_shift(&self, shift: &NewShift) -> ScheduleResult<Shift> {
        let mut state = self.state.lock().await;
        state.check_overlap(&OverlapCandidate::for_new(shift))?;

        let id = state.next_id();
        let record = Shift {
            id,
            employee_id: shift.employee_id,
            date: shift.date,
            slot: shift.slot,
            note: shift.note.clone(),
        };
        state.shifts.insert(id, record.clone());
        Ok(record)
    }

    async fn update_shift(&self, id: ShiftId, shift: &NewShift) -> ScheduleResult<Shift> {
        let mut state = self.state.lock().await;
        if !state.shifts.contains_key(&id) {
            return Err(ScheduleError::NotFound { entity: Entity::Shift, id });
        }
        state.check_overlap(&OverlapCandidate::for_new(shift).excluding(id))?;

        let record = Shift {
            id,
            employee_id: shift.employee_id,
            date: shift.date,
            slot: shift.slot,
            note: shift.note.clone(),
        };
        state.shifts.insert(id, record.clone());
        Ok(record)
    }

    async fn delete_shift(&self, id: ShiftId) -> ScheduleResult<()> {
        let mut state = self.state.lock().await;
        state
            .shifts
            .remove(&id)
            .map(|_| ())
            .ok_or(ScheduleError::NotFound { entity: Entity::Shift, id })
    }

    async fn list_swaps(&self, filter: &SwapFilter) -> ScheduleResult<Vec<SwapRequest>> {
        let mut state = self.state.lock().await;
        state.take_read_failure()?;

        let mut swaps: Vec<SwapRequest> = state
            .swaps
            .values()
            .filter(|s| filter.involving.map_or(true, |id| s.involves(id)))
            .filter(|s| filter.status.map_or(true, |status| s.status == status))
            .cloned()
            .collect();
        swaps.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(swaps)
    }

    async fn get_swap(&self, id: SwapId) -> ScheduleResult<Option<SwapRequest>> {
        let mut state = self.state.lock().await;
        state.take_read_failure()?;
        Ok(state.swaps.get(&id).cloned())
    }

    async fn insert_swap(&self, swap: &NewSwapRequest) -> ScheduleResult<SwapRequest> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let now = timestamp_now();
        let record = SwapRequest {
            id,
            from_shift_id: swap.from_shift_id,
            to_shift_id: swap.to_shift_id,
            requester_id: swap.requester_id,
            partner_id: swap.partner_id,
            note: swap.note.clone(),
            status: SwapStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        state.swaps.insert(id, record.clone());
        Ok(record)
    }

    async fn transact(&self, ops: Vec<WriteOp>) -> ScheduleResult<()> {
        let mut state = self.state.lock().await;

        // work on a copy and publish it only if every op succeeded
        let mut next = state.clone();
        for op in &ops {
            next.apply(op)?;
        }
        for op in &ops {
            if let WriteOp::ReassignShift { shift_id, new_owner, .. } = *op {
                if let Some(shift) = next.shifts.get(&shift_id) {
                    next.check_overlap(&OverlapCandidate::reassigned(shift, new_owner))?;
                }
            }
        }

        next.failing_reads += next.failing_reads_after_commit;
        next.failing_reads_after_commit = 0;
        *state = next;
        Ok(())
    }
}
