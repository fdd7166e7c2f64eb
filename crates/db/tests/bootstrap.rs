use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify schema.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    ledgerwell_db::health_check(&pool).await.unwrap();

    let statuses: Vec<(i16, String)> =
        sqlx::query_as("SELECT id, name FROM booking_statuses ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
    let names: Vec<_> = statuses.iter().map(|(_, n)| n.as_str()).collect();
    assert_eq!(names, vec!["scheduled", "confirmed", "completed", "cancelled"]);
}

/// Every table carrying `updated_at` must have the shared trigger attached.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_updated_at_triggers_present(pool: PgPool) {
    let tables = [
        "users",
        "therapists",
        "booking_sessions",
        "documents",
        "intake_forms",
        "client_notes",
    ];

    for table in tables {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM information_schema.triggers
             WHERE event_object_table = $1 AND trigger_name = 'set_updated_at'",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap_or_else(|e| panic!("{table} trigger query failed: {e}"));
        assert!(count.0 > 0, "{table} should have a set_updated_at trigger");
    }
}
