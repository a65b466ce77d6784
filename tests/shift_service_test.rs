mod tools;

#[cfg(test)]
mod shift_service_tests {
    use std::sync::Arc;

    use shift_desk::domain::errors::{Entity, ScheduleError};
    use shift_desk::domain::models::{NewShift, ShiftPatch, ShiftSlot, WorkingHours};
    use shift_desk::infrastructure::memory_store::MemoryStore;
    use shift_desk::infrastructure::notifier::ChangeEvent;
    use shift_desk::infrastructure::store::ShiftFilter;

    use crate::tools::{d, t, working, Harness};

    #[tokio::test]
    async fn test_overlapping_shift_is_rejected_and_adjacent_one_accepted() {
        for harness in [Harness::memory(), Harness::sqlite().await] {
            let boss = harness.seed_employee("Marta").await;
            let emp = harness.seed_employee("Aldo").await;
            let manager = harness.as_manager(boss.id);
            let day = d(2024, 6, 3);

            manager.shifts.create(working(emp.id, day, t(9, 0), t(17, 0))).await.unwrap();

            let err = manager.shifts.create(working(emp.id, day, t(16, 0), t(20, 0))).await.unwrap_err();
            assert!(matches!(err, ScheduleError::Conflict { .. }), "got {err:?}");

            manager.shifts.create(working(emp.id, day, t(17, 0), t(20, 0))).await.unwrap();

            let listed = manager.shifts.list(ShiftFilter::for_employee(emp.id)).await.unwrap();
            assert_eq!(listed.len(), 2);
        }
    }

    #[tokio::test]
    async fn test_same_hours_for_different_employees_do_not_conflict() {
        let harness = Harness::memory();
        let boss = harness.seed_employee("Marta").await;
        let a = harness.seed_employee("Aldo").await;
        let b = harness.seed_employee("Bianca").await;
        let manager = harness.as_manager(boss.id);
        let day = d(2024, 6, 3);

        manager.shifts.create(working(a.id, day, t(9, 0), t(17, 0))).await.unwrap();
        manager.shifts.create(working(b.id, day, t(9, 0), t(17, 0))).await.unwrap();
        manager.shifts.create(NewShift::off(a.id, day)).await.unwrap();

        assert_eq!(manager.shifts.roster(day).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_today_roster_uses_the_configured_zone() {
        let harness = Harness::memory();
        let boss = harness.seed_employee("Marta").await;
        let emp = harness.seed_employee("Aldo").await;
        let manager = harness.as_manager(boss.id);
        let today = manager.shifts.today();

        let shift = harness.seed_shift(emp.id, today, t(9, 0), t(13, 0)).await;
        harness.seed_shift(emp.id, today.succ_opt().unwrap(), t(9, 0), t(13, 0)).await;

        assert_eq!(manager.shifts.today_roster().await.unwrap(), vec![shift]);
        let err = harness.as_employee(emp.id).shifts.today_roster().await.unwrap_err();
        assert!(matches!(err, ScheduleError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_invalid_range_is_rejected_before_any_write() {
        let harness = Harness::memory();
        let boss = harness.seed_employee("Marta").await;
        let emp = harness.seed_employee("Aldo").await;
        let manager = harness.as_manager(boss.id);

        let err = manager
            .shifts
            .create(working(emp.id, d(2024, 6, 3), t(9, 0), t(9, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidRange { .. }));
        assert!(manager.shifts.list(ShiftFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_or_inactive_employee_cannot_be_scheduled() {
        let harness = Harness::memory();
        let boss = harness.seed_employee("Marta").await;
        let emp = harness.seed_employee("Aldo").await;
        let manager = harness.as_manager(boss.id);

        let err = manager.shifts.create(working(999, d(2024, 6, 3), t(9, 0), t(12, 0))).await.unwrap_err();
        assert!(matches!(err, ScheduleError::NotFound { entity: Entity::Employee, id: 999 }));

        manager.employees.deactivate(emp.id).await.unwrap();
        let err = manager
            .shifts
            .create(working(emp.id, d(2024, 6, 3), t(9, 0), t(12, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Validation { field: "employee_id", .. }));
    }

    #[tokio::test]
    async fn test_employees_only_see_their_own_shifts() {
        let harness = Harness::memory();
        let boss = harness.seed_employee("Marta").await;
        let a = harness.seed_employee("Aldo").await;
        let b = harness.seed_employee("Bianca").await;
        let manager = harness.as_manager(boss.id);
        let day = d(2024, 6, 3);

        let mine = manager.shifts.create(working(a.id, day, t(9, 0), t(13, 0))).await.unwrap();
        let theirs = manager.shifts.create(working(b.id, day, t(9, 0), t(13, 0))).await.unwrap();

        let aldo = harness.as_employee(a.id);

        // no filter means "mine"
        let listed = aldo.shifts.list(ShiftFilter::default()).await.unwrap();
        assert_eq!(listed, vec![mine.clone()]);
        assert_eq!(aldo.shifts.get(mine.id).await.unwrap(), mine);

        let err = aldo.shifts.list(ShiftFilter::for_employee(b.id)).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Forbidden { .. }));
        let err = aldo.shifts.get(theirs.id).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Forbidden { .. }));
        let err = aldo.shifts.roster(day).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_mutations_require_a_manager() {
        let harness = Harness::memory();
        let emp = harness.seed_employee("Aldo").await;
        let shift = harness.seed_shift(emp.id, d(2024, 6, 3), t(9, 0), t(13, 0)).await;
        let aldo = harness.as_employee(emp.id);

        let err = aldo.shifts.create(working(emp.id, d(2024, 6, 4), t(9, 0), t(13, 0))).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Forbidden { .. }));
        let err = aldo.shifts.delete(shift.id).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Forbidden { .. }));

        let err = harness.anonymous().shifts.list(ShiftFilter::default()).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_update_applies_patch_and_checks_overlap() {
        let harness = Harness::sqlite().await;
        let boss = harness.seed_employee("Marta").await;
        let emp = harness.seed_employee("Aldo").await;
        let manager = harness.as_manager(boss.id);
        let day = d(2024, 6, 3);

        let morning = manager.shifts.create(working(emp.id, day, t(8, 0), t(12, 0))).await.unwrap();
        manager.shifts.create(working(emp.id, day, t(13, 0), t(17, 0))).await.unwrap();

        let patch = ShiftPatch {
            slot: Some(ShiftSlot::Working(WorkingHours::new(t(8, 0), t(13, 0)).with_break(15, false))),
            note: Some(Some("covers lunch".to_string())),
            ..Default::default()
        };
        let updated = manager.shifts.update(morning.id, patch).await.unwrap();
        assert_eq!(updated.interval(), Some((t(8, 0), t(13, 0))));
        assert_eq!(updated.note.as_deref(), Some("covers lunch"));

        let overlapping = ShiftPatch {
            slot: Some(ShiftSlot::Working(WorkingHours::new(t(8, 0), t(14, 0)))),
            ..Default::default()
        };
        let err = manager.shifts.update(morning.id, overlapping).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Conflict { .. }));
        assert_eq!(manager.shifts.get(morning.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_list_is_idempotent() {
        let harness = Harness::sqlite().await;
        let boss = harness.seed_employee("Marta").await;
        let emp = harness.seed_employee("Aldo").await;
        harness.seed_shift(emp.id, d(2024, 6, 3), t(9, 0), t(13, 0)).await;
        harness.seed_shift(emp.id, d(2024, 6, 1), t(9, 0), t(13, 0)).await;
        let manager = harness.as_manager(boss.id);

        let filter = ShiftFilter::default().between(d(2024, 6, 1), d(2024, 6, 30));
        let first = manager.shifts.list(filter).await.unwrap();
        let second = manager.shifts.list(filter).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].date, d(2024, 6, 1));
    }

    #[tokio::test]
    async fn test_reversed_date_range_is_rejected() {
        let harness = Harness::memory();
        let boss = harness.seed_employee("Marta").await;
        let manager = harness.as_manager(boss.id);

        let filter = ShiftFilter::default().between(d(2024, 6, 30), d(2024, 6, 1));
        let err = manager.shifts.list(filter).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Validation { field: "date_to", .. }));
    }

    #[tokio::test]
    async fn test_reads_are_retried_once() {
        let store = MemoryStore::new();
        let harness = Harness::with_store(Arc::new(store.clone()));
        let emp = harness.seed_employee("Aldo").await;
        harness.seed_shift(emp.id, d(2024, 6, 3), t(9, 0), t(13, 0)).await;
        let aldo = harness.as_employee(emp.id);

        store.fail_next_reads(1).await;
        assert_eq!(aldo.shifts.list(ShiftFilter::default()).await.unwrap().len(), 1);

        store.fail_next_reads(2).await;
        let err = aldo.shifts.list(ShiftFilter::default()).await.unwrap_err();
        assert!(err.is_retryable_read());
    }

    #[tokio::test]
    async fn test_committed_changes_are_announced() {
        let harness = Harness::memory();
        let boss = harness.seed_employee("Marta").await;
        let emp = harness.seed_employee("Aldo").await;
        let manager = harness.as_manager(boss.id);
        let mut events = harness.notifier.subscribe();

        let shift = manager.shifts.create(working(emp.id, d(2024, 6, 3), t(9, 0), t(13, 0))).await.unwrap();
        manager.shifts.delete(shift.id).await.unwrap();

        // a rejected write announces nothing
        manager.shifts.delete(shift.id).await.unwrap_err();

        assert_eq!(events.recv().await.unwrap(), ChangeEvent::ShiftsChanged { scope: Some(emp.id) });
        assert_eq!(events.recv().await.unwrap(), ChangeEvent::ShiftsChanged { scope: Some(emp.id) });
        assert!(events.try_recv().is_err());
    }
}
