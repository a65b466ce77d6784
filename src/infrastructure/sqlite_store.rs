use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    FromRow, SqliteConnection, SqlitePool,
};

use crate::domain::errors::{Entity, ScheduleError, ScheduleResult, StoreError};
use crate::domain::models::{
    Employee, EmployeeId, NewEmployee, NewShift, Shift, ShiftId, ShiftSlot, SwapId, WorkingHours,
};
use crate::domain::swap_model::{NewSwapRequest, SwapRequest, SwapStatus};
use crate::infrastructure::store::{ScheduleStore, ShiftFilter, SwapFilter, WriteOp};
use crate::infrastructure::timestamp_now;

/// [`ScheduleStore`] over a SQLite database managed by sqlx.
///
/// Overlap guards are part of the write statements themselves, so two
/// connections racing to book the same slot cannot both succeed.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

// =====================
// Row types
// =====================

#[derive(FromRow)]
struct EmployeeRow {
    id: i64,
    name: String,
    role_label: Option<String>,
    department: Option<String>,
    weekly_hours: i64,
    is_active: bool,
}

#[derive(FromRow)]
struct ShiftRow {
    id: i64,
    employee_id: i64,
    date: NaiveDate,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    break_minutes: i64,
    break_paid: bool,
    off: bool,
    notes: Option<String>,
}

#[derive(FromRow)]
struct SwapRow {
    id: i64,
    from_shift_id: i64,
    to_shift_id: i64,
    requester_id: i64,
    partner_id: i64,
    note: Option<String>,
    status: String,
    partner_accepted: bool,
    manager_approved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = StoreError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        let weekly_hours = u32::try_from(row.weekly_hours).map_err(|_| StoreError::InvalidRecord {
            table: "employees",
            id: row.id,
            reason: format!("weekly_hours out of range: {}", row.weekly_hours),
        })?;
        Ok(Employee {
            id: row.id,
            name: row.name,
            role_label: row.role_label,
            department: row.department,
            weekly_hours,
            active: row.is_active,
        })
    }
}

impl TryFrom<ShiftRow> for Shift {
    type Error = StoreError;

    fn try_from(row: ShiftRow) -> Result<Self, Self::Error> {
        let invalid = |reason: String| StoreError::InvalidRecord {
            table: "shifts",
            id: row.id,
            reason,
        };

        let slot = match (row.off, row.start_time, row.end_time) {
            (true, None, None) => ShiftSlot::Off,
            (true, _, _) => return Err(invalid("day off with a time range".into())),
            (false, Some(start), Some(end)) if end > start => {
                let break_minutes = u32::try_from(row.break_minutes)
                    .map_err(|_| invalid(format!("negative break: {}", row.break_minutes)))?;
                ShiftSlot::Working(WorkingHours::new(start, end).with_break(break_minutes, row.break_paid))
            }
            (false, Some(start), Some(end)) => {
                return Err(invalid(format!("end {} is not after start {}", end, start)))
            }
            (false, _, _) => return Err(invalid("working shift without start/end".into())),
        };

        Ok(Shift {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            slot,
            note: row.notes,
        })
    }
}

impl TryFrom<SwapRow> for SwapRequest {
    type Error = StoreError;

    fn try_from(row: SwapRow) -> Result<Self, Self::Error> {
        let status = SwapStatus::from_stored(&row.status, row.partner_accepted, row.manager_approved)
            .map_err(|reason| StoreError::InvalidRecord {
                table: "shift_swaps",
                id: row.id,
                reason,
            })?;
        Ok(SwapRequest {
            id: row.id,
            from_shift_id: row.from_shift_id,
            to_shift_id: row.to_shift_id,
            requester_id: row.requester_id,
            partner_id: row.partner_id,
            note: row.note,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =====================
// SQL
// =====================

const SELECT_EMPLOYEE: &str = "SELECT id, name, role_label, department, weekly_hours, is_active FROM employees";

const SELECT_SHIFT: &str =
    "SELECT id, employee_id, date, start_time, end_time, break_minutes, break_paid, off, notes FROM shifts";

const SELECT_SWAP: &str = "SELECT id, from_shift_id, to_shift_id, requester_id, partner_id, note, status,
    partner_accepted, manager_approved, created_at, updated_at FROM shift_swaps";

/// Column values for a slot: (start, end, break_minutes, break_paid, off).
fn slot_columns(slot: &ShiftSlot) -> (Option<NaiveTime>, Option<NaiveTime>, i64, bool, bool) {
    match slot {
        ShiftSlot::Off => (None, None, 0, false, true),
        ShiftSlot::Working(h) => (Some(h.start), Some(h.end), i64::from(h.break_minutes), h.break_paid, false),
    }
}

/// Id of a working shift that `shift` would overlap, ignoring `exclude`.
async fn overlapping_shift_id(
    conn: &mut SqliteConnection,
    shift: &NewShift,
    exclude: Option<ShiftId>,
) -> Result<Option<ShiftId>, sqlx::Error> {
    let (start, end, ..) = slot_columns(&shift.slot);
    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM shifts
         WHERE employee_id = ?1 AND date = ?2 AND off = 0
           AND start_time < ?4 AND end_time > ?3
           AND (?5 IS NULL OR id <> ?5)
         ORDER BY start_time ASC LIMIT 1",
    )
    .bind(shift.employee_id)
    .bind(shift.date)
    .bind(start)
    .bind(end)
    .bind(exclude)
    .fetch_optional(&mut *conn)
    .await
}

/// Another working shift of the same owner and date that `shift_id` now overlaps.
async fn reassignment_conflict(
    conn: &mut SqliteConnection,
    shift_id: ShiftId,
) -> Result<Option<(EmployeeId, NaiveDate, ShiftId)>, sqlx::Error> {
    sqlx::query_as::<_, (i64, NaiveDate, i64)>(
        "SELECT s.employee_id, s.date, other.id
         FROM shifts AS s
         JOIN shifts AS other
           ON other.employee_id = s.employee_id AND other.date = s.date
          AND other.id <> s.id AND other.off = 0
          AND other.start_time < s.end_time AND other.end_time > s.start_time
         WHERE s.id = ?1 AND s.off = 0
         ORDER BY other.start_time ASC LIMIT 1",
    )
    .bind(shift_id)
    .fetch_optional(&mut *conn)
    .await
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if missing) the database at `url` and applies migrations.
    pub async fn open(url: &str, max_connections: u32) -> ScheduleResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> ScheduleResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    async fn conflict_for(
        conn: &mut SqliteConnection,
        shift: &NewShift,
        exclude: Option<ShiftId>,
    ) -> ScheduleResult<ScheduleError> {
        // the failed guarded write holds the write lock, so the blocker is still visible
        let existing_shift_id = overlapping_shift_id(conn, shift, exclude).await?.unwrap_or_default();
        Ok(ScheduleError::Conflict {
            employee_id: shift.employee_id,
            date: shift.date,
            existing_shift_id,
        })
    }

    async fn fetch_shift(&self, id: ShiftId) -> ScheduleResult<Shift> {
        self.get_shift(id)
            .await?
            .ok_or(ScheduleError::NotFound { entity: Entity::Shift, id })
    }
}

#[async_trait]
impl ScheduleStore for SqliteStore {
    // =================================================================
    // 1. Employees
    // =================================================================

    async fn list_employees(&self, active_only: bool) -> ScheduleResult<Vec<Employee>> {
        let sql = format!("{SELECT_EMPLOYEE} WHERE (?1 = 0 OR is_active = 1) ORDER BY name ASC, id ASC");
        let rows: Vec<EmployeeRow> = sqlx::query_as(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| Employee::try_from(row).map_err(ScheduleError::from))
            .collect()
    }

    async fn get_employee(&self, id: EmployeeId) -> ScheduleResult<Option<Employee>> {
        let sql = format!("{SELECT_EMPLOYEE} WHERE id = ?1");
        let row: Option<EmployeeRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Employee::try_from).transpose()?)
    }

    async fn insert_employee(&self, employee: &NewEmployee) -> ScheduleResult<Employee> {
        let id = sqlx::query(
            "INSERT INTO employees (name, role_label, department, weekly_hours, is_active)
             VALUES (?1, ?2, ?3, ?4, 1)",
        )
        .bind(&employee.name)
        .bind(&employee.role_label)
        .bind(&employee.department)
        .bind(i64::from(employee.weekly_hours))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_employee(id)
            .await?
            .ok_or(ScheduleError::NotFound { entity: Entity::Employee, id })
    }

    async fn set_employee_active(&self, id: EmployeeId, active: bool) -> ScheduleResult<Employee> {
        let result = sqlx::query("UPDATE employees SET is_active = ?1 WHERE id = ?2")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ScheduleError::NotFound { entity: Entity::Employee, id });
        }
        self.get_employee(id)
            .await?
            .ok_or(ScheduleError::NotFound { entity: Entity::Employee, id })
    }

    // =================================================================
    // 2. Shifts
    // =================================================================

    async fn list_shifts(&self, filter: &ShiftFilter) -> ScheduleResult<Vec<Shift>> {
        // NULL start_time (days off) sorts first within a day
        let sql = format!(
            "{SELECT_SHIFT}
             WHERE (?1 IS NULL OR employee_id = ?1)
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
             ORDER BY date ASC, start_time ASC, id ASC"
        );
        let rows: Vec<ShiftRow> = sqlx::query_as(&sql)
            .bind(filter.employee_id)
            .bind(filter.date_from)
            .bind(filter.date_to)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| Shift::try_from(row).map_err(ScheduleError::from))
            .collect()
    }

    async fn get_shift(&self, id: ShiftId) -> ScheduleResult<Option<Shift>> {
        let sql = format!("{SELECT_SHIFT} WHERE id = ?1");
        let row: Option<ShiftRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Shift::try_from).transpose()?)
    }

    async fn insert_shift(&self, shift: &NewShift) -> ScheduleResult<Shift> {
        let (start, end, break_minutes, break_paid, off) = slot_columns(&shift.slot);

        // 1. Guarded insert: nothing is written if a working shift overlaps
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO shifts (employee_id, date, start_time, end_time, break_minutes, break_paid, off, notes)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8
             WHERE ?7 = 1 OR NOT EXISTS (
                 SELECT 1 FROM shifts
                 WHERE employee_id = ?1 AND date = ?2 AND off = 0
                   AND start_time < ?4 AND end_time > ?3
             )",
        )
        .bind(shift.employee_id)
        .bind(shift.date)
        .bind(start)
        .bind(end)
        .bind(break_minutes)
        .bind(break_paid)
        .bind(off)
        .bind(&shift.note)
        .execute(&mut *tx)
        .await?;

        // 2. Nothing inserted means the guard tripped
        if result.rows_affected() == 0 {
            return Err(Self::conflict_for(&mut *tx, shift, None).await?);
        }

        let id = result.last_insert_rowid();
        tx.commit().await?;

        self.fetch_shift(id).await
    }

    async fn update_shift(&self, id: ShiftId, shift: &NewShift) -> ScheduleResult<Shift> {
        let (start, end, break_minutes, break_paid, off) = slot_columns(&shift.slot);
        let mut tx = self.pool.begin().await?;

        // 1. The record must exist
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM shifts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(ScheduleError::NotFound { entity: Entity::Shift, id });
        }

        // 2. Guarded update against every other shift
        let result = sqlx::query(
            "UPDATE shifts
             SET employee_id = ?1, date = ?2, start_time = ?3, end_time = ?4,
                 break_minutes = ?5, break_paid = ?6, off = ?7, notes = ?8
             WHERE id = ?9 AND (?7 = 1 OR NOT EXISTS (
                 SELECT 1 FROM shifts AS other
                 WHERE other.employee_id = ?1 AND other.date = ?2 AND other.id <> ?9
                   AND other.off = 0
                   AND other.start_time < ?4 AND other.end_time > ?3
             ))",
        )
        .bind(shift.employee_id)
        .bind(shift.date)
        .bind(start)
        .bind(end)
        .bind(break_minutes)
        .bind(break_paid)
        .bind(off)
        .bind(&shift.note)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::conflict_for(&mut *tx, shift, Some(id)).await?);
        }
        tx.commit().await?;

        self.fetch_shift(id).await
    }

    async fn delete_shift(&self, id: ShiftId) -> ScheduleResult<()> {
        let result = sqlx::query("DELETE FROM shifts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ScheduleError::NotFound { entity: Entity::Shift, id });
        }
        Ok(())
    }

    // =================================================================
    // 3. Swap requests
    // =================================================================

    async fn list_swaps(&self, filter: &SwapFilter) -> ScheduleResult<Vec<SwapRequest>> {
        let sql = format!(
            "{SELECT_SWAP}
             WHERE (?1 IS NULL OR requester_id = ?1 OR partner_id = ?1)
               AND (?2 IS NULL OR status = ?2)
             ORDER BY updated_at DESC, id DESC"
        );
        let rows: Vec<SwapRow> = sqlx::query_as(&sql)
            .bind(filter.involving)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| SwapRequest::try_from(row).map_err(ScheduleError::from))
            .collect()
    }

    async fn get_swap(&self, id: SwapId) -> ScheduleResult<Option<SwapRequest>> {
        let sql = format!("{SELECT_SWAP} WHERE id = ?1");
        let row: Option<SwapRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(SwapRequest::try_from).transpose()?)
    }

    async fn insert_swap(&self, swap: &NewSwapRequest) -> ScheduleResult<SwapRequest> {
        let now = timestamp_now();
        let status = SwapStatus::Pending;
        let id = sqlx::query(
            "INSERT INTO shift_swaps (
                from_shift_id, to_shift_id, requester_id, partner_id, note,
                status, partner_accepted, manager_approved, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        )
        .bind(swap.from_shift_id)
        .bind(swap.to_shift_id)
        .bind(swap.requester_id)
        .bind(swap.partner_id)
        .bind(&swap.note)
        .bind(status.as_str())
        .bind(status.partner_accepted())
        .bind(status.manager_approved())
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_swap(id)
            .await?
            .ok_or(ScheduleError::NotFound { entity: Entity::SwapRequest, id })
    }

    async fn transact(&self, ops: Vec<WriteOp>) -> ScheduleResult<()> {
        let now = timestamp_now();
        // dropping `tx` on an early return rolls everything back
        let mut tx = self.pool.begin().await?;

        // 1. Guarded writes
        for op in &ops {
            match *op {
                WriteOp::ReassignShift { shift_id, expected_owner, new_owner } => {
                    let result = sqlx::query("UPDATE shifts SET employee_id = ?1 WHERE id = ?2 AND employee_id = ?3")
                        .bind(new_owner)
                        .bind(shift_id)
                        .bind(expected_owner)
                        .execute(&mut *tx)
                        .await?;
                    if result.rows_affected() == 0 {
                        return Err(ScheduleError::StaleReference {
                            entity: Entity::Shift,
                            id: shift_id,
                            reason: format!("no longer owned by employee {}", expected_owner),
                        });
                    }
                }
                WriteOp::SetSwapStatus { swap_id, expected, next } => {
                    let result = sqlx::query(
                        "UPDATE shift_swaps
                         SET status = ?1, partner_accepted = ?2, manager_approved = ?3, updated_at = ?4
                         WHERE id = ?5 AND status = ?6",
                    )
                    .bind(next.as_str())
                    .bind(next.partner_accepted())
                    .bind(next.manager_approved())
                    .bind(now)
                    .bind(swap_id)
                    .bind(expected.as_str())
                    .execute(&mut *tx)
                    .await?;
                    if result.rows_affected() == 0 {
                        return Err(ScheduleError::StaleReference {
                            entity: Entity::SwapRequest,
                            id: swap_id,
                            reason: format!("no longer {}", expected),
                        });
                    }
                }
            }
        }

        // 2. Owners must not end up double-booked once every reassignment is in
        for op in &ops {
            if let WriteOp::ReassignShift { shift_id, .. } = *op {
                if let Some((employee_id, date, existing_shift_id)) = reassignment_conflict(&mut *tx, shift_id).await? {
                    return Err(ScheduleError::Conflict {
                        employee_id,
                        date,
                        existing_shift_id,
                    });
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
