mod tools;

#[cfg(test)]
mod sqlite_store_tests {
    use shift_desk::domain::errors::{ScheduleError, StoreError};
    use shift_desk::domain::models::{NewEmployee, NewShift, ShiftSlot, WorkingHours};
    use shift_desk::domain::swap_model::{NewSwapRequest, SwapStatus};
    use shift_desk::infrastructure::sqlite_store::SqliteStore;
    use shift_desk::infrastructure::store::{ScheduleStore, ShiftFilter, SwapFilter, WriteOp};

    use crate::tools::{d, setup_test_db, t, working};

    async fn setup_store() -> SqliteStore {
        SqliteStore::new(setup_test_db().await)
    }

    #[tokio::test]
    async fn test_employee_lifecycle() {
        let store = setup_store().await;

        let mut bianca = NewEmployee::new("Bianca", 30);
        bianca.department = Some("kitchen".to_string());
        let bianca = store.insert_employee(&bianca).await.unwrap();
        let aldo = store.insert_employee(&NewEmployee::new("Aldo", 40)).await.unwrap();
        assert!(bianca.active);
        assert_eq!(bianca.department.as_deref(), Some("kitchen"));

        // ordered by name
        let names: Vec<String> = store.list_employees(true).await.unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Aldo", "Bianca"]);

        // deactivating twice is fine
        store.set_employee_active(aldo.id, false).await.unwrap();
        let again = store.set_employee_active(aldo.id, false).await.unwrap();
        assert!(!again.active);

        assert_eq!(store.list_employees(true).await.unwrap().len(), 1);
        assert_eq!(store.list_employees(false).await.unwrap().len(), 2);

        let err = store.set_employee_active(999, false).await.unwrap_err();
        assert!(matches!(err, ScheduleError::NotFound { id: 999, .. }));
    }

    #[tokio::test]
    async fn test_shift_round_trip_keeps_every_field() {
        let store = setup_store().await;
        let emp = store.insert_employee(&NewEmployee::new("Aldo", 40)).await.unwrap();

        let hours = WorkingHours::new(t(9, 0), t(18, 0)).with_break(30, true);
        let created = store
            .insert_shift(&NewShift::working(emp.id, d(2024, 6, 3), hours).with_note("opening"))
            .await
            .unwrap();

        let loaded = store.get_shift(created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.slot, ShiftSlot::Working(hours));
        assert_eq!(loaded.note.as_deref(), Some("opening"));

        let off = store.insert_shift(&NewShift::off(emp.id, d(2024, 6, 4))).await.unwrap();
        assert!(store.get_shift(off.id).await.unwrap().unwrap().is_off());
    }

    #[tokio::test]
    async fn test_guarded_insert_rejects_overlap() {
        let store = setup_store().await;
        let emp = store.insert_employee(&NewEmployee::new("Aldo", 40)).await.unwrap();
        let day = d(2024, 6, 3);

        let first = store.insert_shift(&working(emp.id, day, t(9, 0), t(17, 0))).await.unwrap();

        let err = store.insert_shift(&working(emp.id, day, t(16, 0), t(20, 0))).await.unwrap_err();
        match err {
            ScheduleError::Conflict { existing_shift_id, employee_id, date } => {
                assert_eq!(existing_shift_id, first.id);
                assert_eq!(employee_id, emp.id);
                assert_eq!(date, day);
            }
            other => panic!("expected a conflict, got {other:?}"),
        }

        // touching endpoints and days off are fine
        store.insert_shift(&working(emp.id, day, t(17, 0), t(20, 0))).await.unwrap();
        store.insert_shift(&NewShift::off(emp.id, day)).await.unwrap();

        assert_eq!(store.list_shifts(&ShiftFilter::for_employee(emp.id)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_guarded_update_ignores_itself() {
        let store = setup_store().await;
        let emp = store.insert_employee(&NewEmployee::new("Aldo", 40)).await.unwrap();
        let day = d(2024, 6, 3);

        let morning = store.insert_shift(&working(emp.id, day, t(8, 0), t(12, 0))).await.unwrap();
        store.insert_shift(&working(emp.id, day, t(14, 0), t(18, 0))).await.unwrap();

        // growing within the free gap
        let moved = store.update_shift(morning.id, &working(emp.id, day, t(7, 0), t(14, 0))).await.unwrap();
        assert_eq!(moved.interval(), Some((t(7, 0), t(14, 0))));

        // but not into the afternoon shift
        let err = store
            .update_shift(morning.id, &working(emp.id, day, t(7, 0), t(15, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Conflict { .. }));

        let err = store.update_shift(999, &working(emp.id, day, t(7, 0), t(8, 0))).await.unwrap_err();
        assert!(matches!(err, ScheduleError::NotFound { id: 999, .. }));
    }

    #[tokio::test]
    async fn test_list_shifts_ordering_and_filters() {
        let store = setup_store().await;
        let a = store.insert_employee(&NewEmployee::new("Aldo", 40)).await.unwrap();
        let b = store.insert_employee(&NewEmployee::new("Bianca", 40)).await.unwrap();

        let late = store.insert_shift(&working(a.id, d(2024, 6, 2), t(14, 0), t(18, 0))).await.unwrap();
        let early = store.insert_shift(&working(b.id, d(2024, 6, 2), t(6, 0), t(10, 0))).await.unwrap();
        let off = store.insert_shift(&NewShift::off(b.id, d(2024, 6, 2))).await.unwrap();
        let first_day = store.insert_shift(&working(a.id, d(2024, 6, 1), t(9, 0), t(17, 0))).await.unwrap();
        store.insert_shift(&working(a.id, d(2024, 7, 1), t(9, 0), t(17, 0))).await.unwrap();

        let june = ShiftFilter::default().between(d(2024, 6, 1), d(2024, 6, 30));
        let ids: Vec<i64> = store.list_shifts(&june).await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![first_day.id, off.id, early.id, late.id]);

        let aldo_june = ShiftFilter::for_employee(a.id).between(d(2024, 6, 1), d(2024, 6, 30));
        assert_eq!(store.list_shifts(&aldo_june).await.unwrap().len(), 2);

        // same query twice, same answer
        assert_eq!(store.list_shifts(&june).await.unwrap(), store.list_shifts(&june).await.unwrap());
    }

    #[tokio::test]
    async fn test_transact_is_all_or_nothing() {
        let store = setup_store().await;
        let a = store.insert_employee(&NewEmployee::new("Aldo", 40)).await.unwrap();
        let b = store.insert_employee(&NewEmployee::new("Bianca", 40)).await.unwrap();
        let shift_a = store.insert_shift(&working(a.id, d(2024, 6, 3), t(9, 0), t(13, 0))).await.unwrap();
        let shift_b = store.insert_shift(&working(b.id, d(2024, 6, 4), t(9, 0), t(13, 0))).await.unwrap();

        let swap = store
            .insert_swap(&NewSwapRequest {
                from_shift_id: shift_a.id,
                to_shift_id: shift_b.id,
                requester_id: a.id,
                partner_id: b.id,
                note: None,
            })
            .await
            .unwrap();
        assert_eq!(swap.status, SwapStatus::Pending);

        // second op has the wrong expected owner
        let err = store
            .transact(vec![
                WriteOp::ReassignShift { shift_id: shift_a.id, expected_owner: a.id, new_owner: b.id },
                WriteOp::ReassignShift { shift_id: shift_b.id, expected_owner: a.id, new_owner: a.id },
                WriteOp::SetSwapStatus { swap_id: swap.id, expected: SwapStatus::Pending, next: SwapStatus::Approved },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::StaleReference { .. }));

        assert_eq!(store.get_shift(shift_a.id).await.unwrap().unwrap().employee_id, a.id);
        assert_eq!(store.get_swap(swap.id).await.unwrap().unwrap().status, SwapStatus::Pending);

        store
            .transact(vec![WriteOp::SetSwapStatus {
                swap_id: swap.id,
                expected: SwapStatus::Pending,
                next: SwapStatus::PartnerAccepted,
            }])
            .await
            .unwrap();
        let accepted = store.get_swap(swap.id).await.unwrap().unwrap();
        assert!(accepted.partner_accepted());
        assert!(!accepted.manager_approved());

        let mine = store
            .list_swaps(&SwapFilter { involving: Some(b.id), status: Some(SwapStatus::PartnerAccepted) })
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn test_transact_refuses_to_double_book_the_new_owner() {
        let store = setup_store().await;
        let a = store.insert_employee(&NewEmployee::new("Aldo", 40)).await.unwrap();
        let b = store.insert_employee(&NewEmployee::new("Bianca", 40)).await.unwrap();
        let day = d(2024, 6, 3);
        let long_day = store.insert_shift(&working(a.id, day, t(9, 0), t(17, 0))).await.unwrap();
        let short_day = store.insert_shift(&working(b.id, day, t(10, 0), t(12, 0))).await.unwrap();

        let err = store
            .transact(vec![WriteOp::ReassignShift { shift_id: short_day.id, expected_owner: b.id, new_owner: a.id }])
            .await
            .unwrap_err();
        match err {
            ScheduleError::Conflict { employee_id, date, existing_shift_id } => {
                assert_eq!(employee_id, a.id);
                assert_eq!(date, day);
                assert_eq!(existing_shift_id, long_day.id);
            }
            other => panic!("expected a conflict, got {other:?}"),
        }
        assert_eq!(store.get_shift(short_day.id).await.unwrap().unwrap().employee_id, b.id);

        // a straight trade leaves each owner with one shift that day
        store
            .transact(vec![
                WriteOp::ReassignShift { shift_id: short_day.id, expected_owner: b.id, new_owner: a.id },
                WriteOp::ReassignShift { shift_id: long_day.id, expected_owner: a.id, new_owner: b.id },
            ])
            .await
            .unwrap();
        assert_eq!(store.get_shift(short_day.id).await.unwrap().unwrap().employee_id, a.id);
        assert_eq!(store.get_shift(long_day.id).await.unwrap().unwrap().employee_id, b.id);
    }

    #[tokio::test]
    async fn test_drifted_swap_flags_are_rejected_on_load() {
        let pool = setup_test_db().await;
        let store = SqliteStore::new(pool.clone());
        let a = store.insert_employee(&NewEmployee::new("Aldo", 40)).await.unwrap();
        let b = store.insert_employee(&NewEmployee::new("Bianca", 40)).await.unwrap();

        let swap = store
            .insert_swap(&NewSwapRequest {
                from_shift_id: 1,
                to_shift_id: 2,
                requester_id: a.id,
                partner_id: b.id,
                note: Some("doctor's appointment".to_string()),
            })
            .await
            .unwrap();

        // a pending request can't already be approved by a manager
        sqlx::query("UPDATE shift_swaps SET manager_approved = 1 WHERE id = ?1")
            .bind(swap.id)
            .execute(&pool)
            .await
            .unwrap();

        let err = store.get_swap(swap.id).await.unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Store(StoreError::InvalidRecord { table: "shift_swaps", .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_shift() {
        let store = setup_store().await;
        let emp = store.insert_employee(&NewEmployee::new("Aldo", 40)).await.unwrap();
        let shift = store.insert_shift(&working(emp.id, d(2024, 6, 3), t(9, 0), t(13, 0))).await.unwrap();

        store.delete_shift(shift.id).await.unwrap();
        assert!(store.get_shift(shift.id).await.unwrap().is_none());

        let err = store.delete_shift(shift.id).await.unwrap_err();
        assert!(matches!(err, ScheduleError::NotFound { .. }));
    }
}
