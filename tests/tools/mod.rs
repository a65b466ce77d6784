#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use shift_desk::domain::auth::Caller;
use shift_desk::domain::models::{Employee, EmployeeId, NewEmployee, NewShift, Shift, WorkingHours};
use shift_desk::infrastructure::auth_context::StaticAuth;
use shift_desk::infrastructure::memory_store::MemoryStore;
use shift_desk::infrastructure::notifier::BroadcastNotifier;
use shift_desk::infrastructure::sqlite_store::SqliteStore;
use shift_desk::infrastructure::store::ScheduleStore;
use shift_desk::AppServices;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn working(employee_id: EmployeeId, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> NewShift {
    NewShift::working(employee_id, date, WorkingHours::new(start, end))
}

/// One in-memory database. A single connection keeps every query on it.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create memory pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// A store plus a notifier shared by every caller built from it.
pub struct Harness {
    pub store: Arc<dyn ScheduleStore>,
    pub notifier: Arc<BroadcastNotifier>,
}

impl Harness {
    pub fn memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub async fn sqlite() -> Self {
        Self::with_store(Arc::new(SqliteStore::new(setup_test_db().await)))
    }

    pub fn with_store(store: Arc<dyn ScheduleStore>) -> Self {
        Self {
            store,
            notifier: Arc::new(BroadcastNotifier::new(256)),
        }
    }

    pub fn as_caller(&self, caller: Option<Caller>) -> AppServices {
        AppServices::new(
            self.store.clone(),
            Arc::new(StaticAuth::from(caller)),
            self.notifier.clone(),
            chrono_tz::Europe::Rome,
        )
    }

    pub fn as_manager(&self, id: EmployeeId) -> AppServices {
        self.as_caller(Some(Caller::manager(id)))
    }

    pub fn as_employee(&self, id: EmployeeId) -> AppServices {
        self.as_caller(Some(Caller::employee(id)))
    }

    pub fn anonymous(&self) -> AppServices {
        self.as_caller(None)
    }

    /// Inserts straight into the store, bypassing authorization.
    pub async fn seed_employee(&self, name: &str) -> Employee {
        self.store.insert_employee(&NewEmployee::new(name, 40)).await.unwrap()
    }

    pub async fn seed_shift(&self, employee_id: EmployeeId, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Shift {
        self.store.insert_shift(&working(employee_id, date, start, end)).await.unwrap()
    }
}
