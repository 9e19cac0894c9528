use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Bicycle, BicycleCondition, BicycleStatus, Engine, EngineError, Member, MemberStatus, Money,
    RentCmd, RentalPolicy, ReturnCmd,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    engine_with_policy(RentalPolicy::default()).await
}

async fn engine_with_policy(policy: RentalPolicy) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .policy(policy)
        .build()
        .await
        .unwrap();
    seed(&engine).await;
    (engine, db)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Day `n` of the test calendar, at 10:00 UTC.
fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap() + Duration::days(n)
}

/// Bicycles 5..=8 available, 9 under maintenance. Member 1 may hold three
/// bicycles, member 2 one, member 3 is suspended.
async fn seed(engine: &Engine) {
    let fleet = [
        (5, "Trek", "Road"),
        (6, "Giant", "Mountain"),
        (7, "Trek", "Hybrid"),
        (8, "Cannondale", "Road"),
    ];
    for (id, brand, kind) in fleet {
        let bicycle = Bicycle::new(id, brand, kind, "M", Money::new(15_00)).unwrap();
        engine.add_bicycle(&bicycle).await.unwrap();
    }
    let maintenance = Bicycle::new(9, "Giant", "Road", "L", Money::new(12_00))
        .unwrap()
        .with_status(BicycleStatus::UnderMaintenance);
    engine.add_bicycle(&maintenance).await.unwrap();

    let members = [
        Member::new(1, "Alice", date(2024, 1, 10), date(2026, 1, 10))
            .unwrap()
            .rental_limit(3),
        Member::new(2, "Bob", date(2024, 2, 1), date(2026, 2, 1)).unwrap(),
        Member::new(3, "Carol", date(2023, 5, 5), date(2024, 5, 5))
            .unwrap()
            .status(MemberStatus::Suspended)
            .rental_limit(2),
    ];
    for member in &members {
        engine.upsert_member(member).await.unwrap();
    }
}

async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "n").unwrap()
}

async fn assert_consistent(engine: &Engine) {
    for id in 5..=9 {
        assert!(
            engine.bicycle_state_is_consistent(id).await.unwrap(),
            "bicycle {id} status disagrees with its open rentals"
        );
    }
}

#[tokio::test]
async fn rent_then_return_restores_the_bicycle() {
    let (engine, db) = engine_with_db().await;

    let rental = engine
        .initiate_rental(RentCmd::new(1, 5, day(0)))
        .await
        .unwrap();
    assert_eq!(rental.bicycle_id, 5);
    assert_eq!(rental.member_id, 1);
    assert_eq!(rental.rental_date, day(0));
    assert_eq!(rental.expected_return_date, day(7));
    assert!(rental.is_open());
    assert_eq!(
        engine.get_bicycle(5).await.unwrap().status,
        BicycleStatus::Rented
    );
    assert_eq!(engine.rental_fee(rental.id).await.unwrap(), None);
    assert_consistent(&engine).await;

    let receipt = engine
        .complete_return(ReturnCmd::new(5, 1, BicycleCondition::Good, day(3)))
        .await
        .unwrap();
    assert_eq!(receipt.transaction_id, rental.id);
    assert_eq!(receipt.days_rented, 3);
    assert_eq!(receipt.late_fee, Money::ZERO);
    assert_eq!(receipt.damage_fee, Money::ZERO);
    assert_eq!(receipt.total_fee, Money::ZERO);
    assert_eq!(receipt.return_date, day(3));

    let bicycle = engine.get_bicycle(5).await.unwrap();
    assert_eq!(bicycle.status, BicycleStatus::Available);
    assert_eq!(bicycle.condition, BicycleCondition::Good);

    let closed = engine.get_rental(rental.id).await.unwrap();
    assert_eq!(closed.return_date, Some(day(3)));
    let fee = engine.rental_fee(rental.id).await.unwrap().unwrap();
    assert_eq!(fee.damage_fee, Money::ZERO);
    assert_eq!(count_rows(&db, "rental_transactions").await, 1);
    assert_eq!(count_rows(&db, "rental_fees").await, 1);
    assert_eq!(engine.count_open_rentals(1).await.unwrap(), 0);
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn late_return_costs_ten_per_day_past_the_week() {
    let (engine, _db) = engine_with_db().await;

    engine
        .initiate_rental(RentCmd::new(1, 5, day(0)))
        .await
        .unwrap();
    engine
        .initiate_rental(RentCmd::new(1, 6, day(0)))
        .await
        .unwrap();

    let late = engine
        .complete_return(ReturnCmd::new(5, 1, BicycleCondition::Good, day(10)))
        .await
        .unwrap();
    assert_eq!(late.days_rented, 10);
    assert_eq!(late.late_fee, Money::new(30_00));
    assert_eq!(late.total_fee, Money::new(30_00));

    let on_time = engine
        .complete_return(ReturnCmd::new(6, 1, BicycleCondition::Good, day(5)))
        .await
        .unwrap();
    assert_eq!(on_time.days_rented, 5);
    assert_eq!(on_time.late_fee, Money::ZERO);
}

#[tokio::test]
async fn policy_drives_due_date_and_allowance() {
    let policy = RentalPolicy::new(5, Money::new(2_00)).unwrap();
    let (engine, _db) = engine_with_policy(policy).await;

    let rental = engine
        .initiate_rental(RentCmd::new(1, 5, day(0)))
        .await
        .unwrap();
    assert_eq!(rental.expected_return_date, day(5));

    let receipt = engine
        .complete_return(ReturnCmd::new(5, 1, BicycleCondition::Fair, day(8)))
        .await
        .unwrap();
    assert_eq!(receipt.late_fee, Money::new(6_00));
}

#[tokio::test]
async fn damage_is_added_and_condition_recorded() {
    let (engine, _db) = engine_with_db().await;

    engine
        .initiate_rental(RentCmd::new(2, 7, day(0)))
        .await
        .unwrap();
    let receipt = engine
        .complete_return(
            ReturnCmd::new(7, 2, BicycleCondition::Damaged, day(9)).damage(Money::new(45_50)),
        )
        .await
        .unwrap();
    assert_eq!(receipt.late_fee, Money::new(20_00));
    assert_eq!(receipt.damage_fee, Money::new(45_50));
    assert_eq!(receipt.total_fee, Money::new(65_50));
    assert_eq!(receipt.condition, BicycleCondition::Damaged);

    let bicycle = engine.get_bicycle(7).await.unwrap();
    assert_eq!(bicycle.status, BicycleStatus::Available);
    assert_eq!(bicycle.condition, BicycleCondition::Damaged);
}

#[tokio::test]
async fn second_return_is_rejected_and_keeps_one_fee_row() {
    let (engine, db) = engine_with_db().await;

    engine
        .initiate_rental(RentCmd::new(1, 5, day(0)))
        .await
        .unwrap();
    engine
        .complete_return(ReturnCmd::new(5, 1, BicycleCondition::Good, day(2)))
        .await
        .unwrap();

    let err = engine
        .complete_return(ReturnCmd::new(5, 1, BicycleCondition::Fair, day(4)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyClosed(_)), "{err:?}");
    assert_eq!(count_rows(&db, "rental_fees").await, 1);
    assert_eq!(
        engine.get_bicycle(5).await.unwrap().condition,
        BicycleCondition::Good
    );
}

#[tokio::test]
async fn return_without_rental_is_not_found() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .complete_return(ReturnCmd::new(6, 2, BicycleCondition::Good, day(1)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::NotFound(
            "No active rental found for Bicycle ID 6 and Member ID 2".to_string()
        )
    );

    // Rented by somebody else.
    engine
        .initiate_rental(RentCmd::new(1, 6, day(0)))
        .await
        .unwrap();
    let err = engine
        .complete_return(ReturnCmd::new(6, 2, BicycleCondition::Good, day(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)), "{err:?}");
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn unconfirmed_return_changes_nothing() {
    let (engine, db) = engine_with_db().await;

    let rental = engine
        .initiate_rental(RentCmd::new(1, 5, day(0)))
        .await
        .unwrap();
    let err = engine
        .complete_return(
            ReturnCmd::new(5, 1, BicycleCondition::Damaged, day(12)).confirmed(false),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Canceled("Return canceled by user".to_string())
    );

    assert!(engine.get_rental(rental.id).await.unwrap().is_open());
    let bicycle = engine.get_bicycle(5).await.unwrap();
    assert_eq!(bicycle.status, BicycleStatus::Rented);
    assert_eq!(bicycle.condition, BicycleCondition::Good);
    assert_eq!(count_rows(&db, "rental_fees").await, 0);
}

#[tokio::test]
async fn negative_damage_is_invalid_input() {
    let (engine, db) = engine_with_db().await;

    let rental = engine
        .initiate_rental(RentCmd::new(1, 5, day(0)))
        .await
        .unwrap();
    let err = engine
        .complete_return(
            ReturnCmd::new(5, 1, BicycleCondition::Good, day(1)).damage(Money::new(-1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)), "{err:?}");
    assert!(engine.get_rental(rental.id).await.unwrap().is_open());
    assert_eq!(count_rows(&db, "rental_fees").await, 0);
}

#[tokio::test]
async fn fourth_rental_over_a_limit_of_three_is_ineligible() {
    let (engine, _db) = engine_with_db().await;

    for bicycle_id in [5, 6, 7] {
        engine
            .initiate_rental(RentCmd::new(1, bicycle_id, day(0)))
            .await
            .unwrap();
    }
    assert_eq!(engine.count_open_rentals(1).await.unwrap(), 3);

    let eligibility = engine.is_eligible(1).await.unwrap();
    assert!(!eligibility.eligible);

    let err = engine
        .initiate_rental(RentCmd::new(1, 8, day(1)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Ineligible("Rental limit exceeded: limit 3, current 3".to_string())
    );
    assert_eq!(
        engine.get_bicycle(8).await.unwrap().status,
        BicycleStatus::Available
    );
    assert_eq!(engine.count_open_rentals(1).await.unwrap(), 3);

    // A return frees a slot.
    engine
        .complete_return(ReturnCmd::new(6, 1, BicycleCondition::Good, day(2)))
        .await
        .unwrap();
    engine
        .initiate_rental(RentCmd::new(1, 8, day(2)))
        .await
        .unwrap();
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn inactive_or_missing_member_is_ineligible() {
    let (engine, _db) = engine_with_db().await;

    for member_id in [3, 404] {
        let err = engine
            .initiate_rental(RentCmd::new(member_id, 5, day(0)))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Ineligible("Invalid or inactive membership".to_string())
        );
    }
    assert_eq!(engine.get_active_member(3).await.unwrap(), None);
    assert_eq!(
        engine.get_bicycle(5).await.unwrap().status,
        BicycleStatus::Available
    );

    let eligibility = engine.is_eligible(2).await.unwrap();
    assert!(eligibility.eligible);
    assert_eq!(eligibility.reason, "Member validated and eligible to rent");
}

#[tokio::test]
async fn unknown_bicycle_is_not_found_and_changes_nothing() {
    let (engine, db) = engine_with_db().await;

    let err = engine
        .initiate_rental(RentCmd::new(1, 999, day(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)), "{err:?}");
    assert_eq!(engine.count_open_rentals(1).await.unwrap(), 0);
    assert_eq!(count_rows(&db, "rental_transactions").await, 0);
}

#[tokio::test]
async fn rented_or_maintained_bicycle_is_not_available() {
    let (engine, _db) = engine_with_db().await;

    engine
        .initiate_rental(RentCmd::new(1, 5, day(0)))
        .await
        .unwrap();
    let err = engine
        .initiate_rental(RentCmd::new(2, 5, day(0)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::NotAvailable(
            "Bicycle with ID 5 is not available for rent, current status: Rented".to_string()
        )
    );

    let err = engine
        .initiate_rental(RentCmd::new(2, 9, day(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotAvailable(_)), "{err:?}");
    assert_eq!(engine.count_open_rentals(2).await.unwrap(), 0);
}

/// Two desks on separate pooled connections to one database file.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_rents_of_one_bicycle_have_one_winner() {
    let path = std::env::temp_dir().join(format!(
        "bike_rental_concurrent_rents_{}.db",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    let db = Database::connect(format!("sqlite:{}?mode=rwc", path.display()))
        .await
        .unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .policy(RentalPolicy::default())
        .build()
        .await
        .unwrap();
    seed(&engine).await;
    let engine = std::sync::Arc::new(engine);

    let tasks = [(1, 5), (2, 5)].map(|(member_id, bicycle_id)| {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .initiate_rental(RentCmd::new(member_id, bicycle_id, day(0)))
                .await
        })
    });
    let mut outcomes = Vec::new();
    for task in tasks {
        outcomes.push(task.await.unwrap());
    }

    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "{outcomes:?}");
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(EngineError::NotAvailable(_)))),
        "{outcomes:?}"
    );
    assert_eq!(count_rows(&db, "rental_transactions").await, 1);
    assert_consistent(&engine).await;

    db.close().await.unwrap();
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn failed_fee_write_rolls_back_the_return() {
    let (engine, db) = engine_with_db().await;

    let rental = engine
        .initiate_rental(RentCmd::new(1, 5, day(0)))
        .await
        .unwrap();
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "CREATE TRIGGER fail_fee_insert BEFORE INSERT ON rental_fees \
         BEGIN SELECT RAISE(ABORT, 'disk full'); END",
    ))
    .await
    .unwrap();

    let err = engine
        .complete_return(ReturnCmd::new(5, 1, BicycleCondition::Fair, day(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Database(_)), "{err:?}");
    assert!(!err.is_rejection());

    assert_eq!(engine.get_rental(rental.id).await.unwrap().return_date, None);
    assert_eq!(engine.open_rentals().await.unwrap().len(), 1);
    let bicycle = engine.get_bicycle(5).await.unwrap();
    assert_eq!(bicycle.status, BicycleStatus::Rented);
    assert_eq!(bicycle.condition, BicycleCondition::Good);
    assert_eq!(count_rows(&db, "rental_fees").await, 0);
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn failed_rental_insert_rolls_back_the_status_flip() {
    let (engine, db) = engine_with_db().await;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "CREATE TRIGGER fail_rental_insert BEFORE INSERT ON rental_transactions \
         BEGIN SELECT RAISE(ABORT, 'disk full'); END",
    ))
    .await
    .unwrap();

    let err = engine
        .initiate_rental(RentCmd::new(1, 5, day(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Database(_)), "{err:?}");

    assert_eq!(
        engine.get_bicycle(5).await.unwrap().status,
        BicycleStatus::Available
    );
    assert_eq!(count_rows(&db, "rental_transactions").await, 0);
    assert_eq!(engine.count_open_rentals(1).await.unwrap(), 0);
    assert_consistent(&engine).await;
}

#[tokio::test]
async fn return_dated_before_the_rental_is_rejected() {
    let (engine, db) = engine_with_db().await;

    let rental = engine
        .initiate_rental(RentCmd::new(1, 5, day(3)))
        .await
        .unwrap();
    let err = engine
        .complete_return(ReturnCmd::new(5, 1, BicycleCondition::Fair, day(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)), "{err:?}");

    assert_eq!(engine.get_rental(rental.id).await.unwrap().return_date, None);
    let bicycle = engine.get_bicycle(5).await.unwrap();
    assert_eq!(bicycle.status, BicycleStatus::Rented);
    assert_eq!(bicycle.condition, BicycleCondition::Good);
    assert_eq!(count_rows(&db, "rental_fees").await, 0);

    // Same-day return is fine.
    let receipt = engine
        .complete_return(ReturnCmd::new(5, 1, BicycleCondition::Good, day(3)))
        .await
        .unwrap();
    assert_eq!(receipt.days_rented, 0);
}

#[tokio::test]
async fn fee_total_out_of_range_is_rejected_before_closing() {
    let (engine, db) = engine_with_db().await;

    let rental = engine
        .initiate_rental(RentCmd::new(1, 5, day(0)))
        .await
        .unwrap();
    let err = engine
        .complete_return(
            ReturnCmd::new(5, 1, BicycleCondition::Damaged, day(10))
                .damage(Money::new(i64::MAX)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)), "{err:?}");

    assert_eq!(engine.get_rental(rental.id).await.unwrap().return_date, None);
    assert_eq!(
        engine.get_bicycle(5).await.unwrap().status,
        BicycleStatus::Rented
    );
    assert_eq!(count_rows(&db, "rental_fees").await, 0);
    assert_consistent(&engine).await;

    // Without late days the same damage still fits.
    let receipt = engine
        .complete_return(
            ReturnCmd::new(5, 1, BicycleCondition::Damaged, day(2))
                .damage(Money::new(i64::MAX)),
        )
        .await
        .unwrap();
    assert_eq!(receipt.total_fee, Money::new(i64::MAX));
}

#[tokio::test]
async fn open_and_overdue_listings() {
    let (engine, _db) = engine_with_db().await;

    engine
        .initiate_rental(RentCmd::new(1, 6, day(2)))
        .await
        .unwrap();
    engine
        .initiate_rental(RentCmd::new(1, 5, day(0)))
        .await
        .unwrap();
    engine
        .initiate_rental(RentCmd::new(2, 7, day(1)))
        .await
        .unwrap();
    engine
        .complete_return(ReturnCmd::new(7, 2, BicycleCondition::Good, day(3)))
        .await
        .unwrap();

    let open = engine.open_rentals().await.unwrap();
    let ids: Vec<i32> = open.iter().map(|o| o.rental.bicycle_id).collect();
    assert_eq!(ids, vec![5, 6]);
    assert_eq!(open[0].brand, "Trek");
    assert_eq!(open[1].kind, "Mountain");

    let overdue = engine.overdue_rentals(day(8)).await.unwrap();
    let ids: Vec<i32> = overdue.iter().map(|o| o.rental.bicycle_id).collect();
    assert_eq!(ids, vec![5]);
    assert!(engine.overdue_rentals(day(6)).await.unwrap().is_empty());
}

#[tokio::test]
async fn history_pages_newest_first() {
    let (engine, _db) = engine_with_db().await;

    for (bicycle_id, start) in [(5, 0), (6, 1), (7, 2)] {
        engine
            .initiate_rental(RentCmd::new(1, bicycle_id, day(start)))
            .await
            .unwrap();
    }
    engine
        .complete_return(ReturnCmd::new(5, 1, BicycleCondition::Good, day(9)))
        .await
        .unwrap();
    engine
        .initiate_rental(RentCmd::new(2, 8, day(3)))
        .await
        .unwrap();

    let (page, cursor) = engine.rental_history(Some(1), 2, None).await.unwrap();
    let ids: Vec<i32> = page.iter().map(|e| e.rental.bicycle_id).collect();
    assert_eq!(ids, vec![7, 6]);
    assert!(page.iter().all(|e| e.fee.is_none()));
    let cursor = cursor.expect("a second page");

    let (page, cursor) = engine
        .rental_history(Some(1), 2, Some(&cursor))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].rental.bicycle_id, 5);
    assert_eq!(
        page[0].fee.map(|f| f.late_fee),
        Some(Money::new(20_00))
    );
    assert_eq!(cursor, None);

    let (all, _) = engine.rental_history(None, 10, None).await.unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[0].rental.member_id, 2);

    let err = engine.rental_history(None, 0, None).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}
