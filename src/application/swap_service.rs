//! Shift-swap negotiation between two employees, closed by a manager.
//!
//! Status moves are decided by [`SwapStateMachine`]; this service loads the
//! records, checks that the shifts involved still look the way they did when
//! the request was made, and commits everything through one `transact` call.

use crate::application::{read_with_retry, ServiceContext};
use crate::domain::auth::{Caller, Capability};
use crate::domain::errors::{Entity, ScheduleError, ScheduleResult};
use crate::domain::models::{EmployeeId, Shift, ShiftId, SwapId};
use crate::domain::overlap::{ensure_no_conflict, OverlapCandidate};
use crate::domain::swap_model::{NewSwapRequest, SwapAction, SwapRequest, SwapStatus};
use crate::domain::swap_state_machine::SwapStateMachine;
use crate::infrastructure::store::{ShiftFilter, SwapFilter, WriteOp};
use crate::infrastructure::timestamp_now;

pub struct SwapService {
    ctx: ServiceContext,
}

impl SwapService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Offers the caller's `from_shift_id` in exchange for `to_shift_id`.
    /// The partner is whoever currently owns `to_shift_id`.
    pub async fn propose(
        &self,
        from_shift_id: ShiftId,
        to_shift_id: ShiftId,
        note: Option<String>,
    ) -> ScheduleResult<SwapRequest> {
        let caller = self.ctx.authorize(Capability::ProposeSwap).await?;

        let from_shift = self.load_shift(from_shift_id).await?;
        let to_shift = self.load_shift(to_shift_id).await?;

        if from_shift.employee_id != caller.employee_id {
            return Err(ScheduleError::forbidden("offer a shift they do not own", caller.employee_id));
        }
        if to_shift.employee_id == caller.employee_id {
            return Err(ScheduleError::validation("to_shift_id", "cannot swap with your own shift"));
        }
        if from_shift.is_off() || to_shift.is_off() {
            return Err(ScheduleError::validation("shift", "days off cannot be swapped"));
        }
        self.ctx.ensure_active_employee(to_shift.employee_id).await?;

        let request = NewSwapRequest {
            from_shift_id,
            to_shift_id,
            requester_id: caller.employee_id,
            partner_id: to_shift.employee_id,
            note: note.filter(|n| !n.trim().is_empty()),
        };
        let swap = self.ctx.store.insert_swap(&request).await?;

        tracing::info!(
            swap_id = swap.id,
            requester_id = swap.requester_id,
            partner_id = swap.partner_id,
            from_shift_id,
            to_shift_id,
            "swap proposed"
        );
        self.notify_swap(&swap);
        Ok(swap)
    }

    pub async fn accept(&self, swap_id: SwapId) -> ScheduleResult<SwapRequest> {
        self.respond(swap_id, SwapAction::Accept).await
    }

    pub async fn reject(&self, swap_id: SwapId) -> ScheduleResult<SwapRequest> {
        self.respond(swap_id, SwapAction::Reject).await
    }

    /// Performs the swap: each employee takes over the other's shift.
    ///
    /// Fails with `StaleReference` when either shift was deleted or changed
    /// hands since the request was made, with `Conflict` when the new owner
    /// is already busy at that time, and with `Validation` when either
    /// employee has been deactivated. The request stays `PartnerAccepted`.
    pub async fn approve(&self, swap_id: SwapId) -> ScheduleResult<SwapRequest> {
        let caller = self.ctx.authorize(Capability::ApproveSwap).await?;
        let swap = self.load(swap_id).await?;
        let next = self.transition(&swap, SwapAction::Approve, &caller)?;

        for employee_id in [swap.requester_id, swap.partner_id] {
            self.ctx.ensure_active_employee(employee_id).await.inspect_err(|e| {
                tracing::warn!(swap_id, employee_id, error = %e, "swap cannot be approved");
            })?;
        }

        let from_shift = self.live_shift(swap.from_shift_id, swap.requester_id).await?;
        let to_shift = self.live_shift(swap.to_shift_id, swap.partner_id).await?;

        self.ensure_fits(&from_shift, swap.partner_id, to_shift.id).await?;
        self.ensure_fits(&to_shift, swap.requester_id, from_shift.id).await?;

        self.ctx
            .store
            .transact(vec![
                WriteOp::ReassignShift {
                    shift_id: from_shift.id,
                    expected_owner: swap.requester_id,
                    new_owner: swap.partner_id,
                },
                WriteOp::ReassignShift {
                    shift_id: to_shift.id,
                    expected_owner: swap.partner_id,
                    new_owner: swap.requester_id,
                },
                WriteOp::SetSwapStatus {
                    swap_id,
                    expected: swap.status,
                    next,
                },
            ])
            .await
            .inspect_err(|e| tracing::warn!(swap_id, error = %e, "swap approval rolled back"))?;

        tracing::info!(
            swap_id,
            requester_id = swap.requester_id,
            partner_id = swap.partner_id,
            by = caller.employee_id,
            "swap approved"
        );
        self.ctx.notifier.notify_shifts_changed(Some(swap.requester_id));
        self.ctx.notifier.notify_shifts_changed(Some(swap.partner_id));
        self.notify_swap(&swap);
        Ok(self.reload_committed(swap, next).await)
    }

    /// A request the caller takes part in. Managers may read any.
    pub async fn get(&self, swap_id: SwapId) -> ScheduleResult<SwapRequest> {
        let caller = self.ctx.authorize(Capability::ProposeSwap).await?;
        let swap = self.load(swap_id).await?;
        if !swap.involves(caller.employee_id) && !caller.can(Capability::ApproveSwap) {
            return Err(ScheduleError::forbidden("read someone else's swap request", caller.employee_id));
        }
        Ok(swap)
    }

    /// Requests the caller made or received, most recently updated first.
    pub async fn list_mine(&self) -> ScheduleResult<Vec<SwapRequest>> {
        let caller = self.ctx.authorize(Capability::ProposeSwap).await?;
        let filter = SwapFilter {
            involving: Some(caller.employee_id),
            status: None,
        };
        self.fetch(&filter).await
    }

    /// Requests the partner accepted, oldest first.
    pub async fn list_awaiting_approval(&self) -> ScheduleResult<Vec<SwapRequest>> {
        self.ctx.authorize(Capability::ApproveSwap).await?;
        let filter = SwapFilter {
            involving: None,
            status: Some(SwapStatus::PartnerAccepted),
        };
        let mut swaps = self.fetch(&filter).await?;
        swaps.reverse();
        Ok(swaps)
    }

    async fn respond(&self, swap_id: SwapId, action: SwapAction) -> ScheduleResult<SwapRequest> {
        let caller = self.ctx.authorize(Capability::RespondToSwap).await?;
        let swap = self.load(swap_id).await?;
        let next = self.transition(&swap, action, &caller)?;

        self.ctx
            .store
            .transact(vec![WriteOp::SetSwapStatus {
                swap_id,
                expected: swap.status,
                next,
            }])
            .await?;

        tracing::info!(swap_id, from = %swap.status, to = %next, by = caller.employee_id, "swap {}", action);
        self.notify_swap(&swap);
        Ok(self.reload_committed(swap, next).await)
    }

    /// The request as stored after a committed move to `next`. The write is
    /// already durable, so a failed re-read is answered from the write itself.
    async fn reload_committed(&self, swap: SwapRequest, next: SwapStatus) -> SwapRequest {
        match self.load(swap.id).await {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(swap_id = swap.id, status = %next, error = %e, "re-read after commit failed");
                SwapRequest {
                    status: next,
                    updated_at: timestamp_now(),
                    ..swap
                }
            }
        }
    }

    fn transition(&self, swap: &SwapRequest, action: SwapAction, caller: &Caller) -> ScheduleResult<SwapStatus> {
        SwapStateMachine::transition(swap, action, caller).inspect_err(|e| {
            tracing::warn!(swap_id = swap.id, %action, caller = caller.employee_id, error = %e, "swap transition refused");
        })
    }

    /// The shift as it is now, provided `owner` still holds it.
    async fn live_shift(&self, id: ShiftId, owner: EmployeeId) -> ScheduleResult<Shift> {
        let store = &self.ctx.store;
        let shift = read_with_retry("get shift", move || store.get_shift(id))
            .await?
            .ok_or_else(|| ScheduleError::StaleReference {
                entity: Entity::Shift,
                id,
                reason: "it was deleted".to_string(),
            })?;

        if shift.employee_id != owner {
            return Err(ScheduleError::StaleReference {
                entity: Entity::Shift,
                id,
                reason: format!("it now belongs to employee {}", shift.employee_id),
            });
        }
        Ok(shift)
    }

    /// Checks that `new_owner` can take `shift` once `leaving` is gone from
    /// their schedule.
    async fn ensure_fits(&self, shift: &Shift, new_owner: EmployeeId, leaving: ShiftId) -> ScheduleResult<()> {
        let candidate = OverlapCandidate::reassigned(shift, new_owner);
        if candidate.interval.is_none() {
            return Ok(());
        }

        let filter = ShiftFilter::for_employee(new_owner).on(shift.date);
        let store = &self.ctx.store;
        let filter = &filter;
        let existing = read_with_retry("list shifts", move || store.list_shifts(filter)).await?;

        ensure_no_conflict(&candidate, existing.iter().filter(|s| s.id != leaving)).inspect_err(|e| {
            tracing::warn!(shift_id = shift.id, new_owner, error = %e, "swap would double-book");
        })
    }

    async fn load(&self, id: SwapId) -> ScheduleResult<SwapRequest> {
        let store = &self.ctx.store;
        read_with_retry("get swap", move || store.get_swap(id))
            .await?
            .ok_or(ScheduleError::NotFound { entity: Entity::SwapRequest, id })
    }

    async fn load_shift(&self, id: ShiftId) -> ScheduleResult<Shift> {
        let store = &self.ctx.store;
        read_with_retry("get shift", move || store.get_shift(id))
            .await?
            .ok_or(ScheduleError::NotFound { entity: Entity::Shift, id })
    }

    async fn fetch(&self, filter: &SwapFilter) -> ScheduleResult<Vec<SwapRequest>> {
        let store = &self.ctx.store;
        read_with_retry("list swaps", move || store.list_swaps(filter)).await
    }

    fn notify_swap(&self, swap: &SwapRequest) {
        self.ctx.notifier.notify_swaps_changed(Some(swap.requester_id));
        self.ctx.notifier.notify_swaps_changed(Some(swap.partner_id));
    }
}
