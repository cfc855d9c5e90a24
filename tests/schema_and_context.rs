// Schema bootstrap idempotency and transaction context lifecycle.

mod common;

use common::{all_types, bootstrapped_store, temp_store, Order, Person};
use rust_sqlite_mapper::sqlite::{
    ContextState, EntityRef, SchemaBootstrapper, SqliteError, UnitOfWorkState,
};

fn schema_objects(path: &std::path::Path) -> anyhow::Result<Vec<(String, String)>> {
    let conn = rusqlite::Connection::open(path)?;
    let mut stmt = conn.prepare(
        "SELECT type, name FROM sqlite_master WHERE name NOT LIKE 'sqlite_%' ORDER BY type, name",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<(String, String)>>>()?;
    Ok(rows)
}

#[tokio::test]
async fn test_bootstrap_is_idempotent() -> anyhow::Result<()> {
    let (store, file) = temp_store();
    store.bootstrap(&all_types()).await?;
    let first = schema_objects(file.path())?;
    store.bootstrap(&all_types()).await?;
    let second = schema_objects(file.path())?;

    assert_eq!(first, second);
    let expected = [
        ("index", "ix_order_person_id"),
        ("index", "ix_samples_name_created_at"),
        ("table", "audit_note"),
        ("table", "order"),
        ("table", "person"),
        ("table", "samples"),
    ];
    let actual: Vec<(&str, &str)> = first
        .iter()
        .map(|(t, n)| (t.as_str(), n.as_str()))
        .collect();
    assert_eq!(actual, expected);
    Ok(())
}

#[tokio::test]
async fn test_bootstrap_statements_follow_declared_order() -> anyhow::Result<()> {
    let (store, _file) = temp_store();
    let bootstrapper = SchemaBootstrapper::new(store.builder().clone());
    let statements =
        bootstrapper.statements(&[EntityRef::of::<Person>(), EntityRef::of::<Order>()])?;
    assert_eq!(statements.len(), 3);
    assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS \"person\""));
    assert!(statements[1].starts_with("CREATE TABLE IF NOT EXISTS \"order\""));
    assert!(statements[1].contains("FOREIGN KEY (\"person_id\") REFERENCES \"person\" (\"id\") ON DELETE CASCADE);"));
    assert!(statements[2].starts_with("CREATE INDEX IF NOT EXISTS \"ix_order_person_id\""));
    for sql in &statements {
        assert_eq!(sql.matches(';').count(), 1, "{sql}");
        assert!(sql.ends_with(';'));
    }
    Ok(())
}

#[tokio::test]
async fn test_context_commit_gates_repositories() -> anyhow::Result<()> {
    let (store, _file) = bootstrapped_store().await?;
    let ctx = store.begin().await?;
    let people = ctx.repo::<Person>()?;
    let mut p = Person::new("Barbara", "Liskov", None);
    people.insert(&mut p).await?;

    ctx.commit().await?;
    assert_eq!(ctx.state(), ContextState::Completed);
    assert_eq!(ctx.unit_of_work().state().await, UnitOfWorkState::Committed);
    assert!(matches!(
        ctx.repo::<Order>(),
        Err(SqliteError::InvalidOperationOnCompletedScope { .. })
    ));
    assert!(matches!(
        people.find_all().await,
        Err(SqliteError::InvalidOperationOnCompletedScope { .. })
    ));
    ctx.dispose().await;
    assert_eq!(ctx.state(), ContextState::Disposed);
    assert!(matches!(ctx.commit().await, Err(SqliteError::ObjectDisposed)));

    let check = store.begin().await?;
    assert_eq!(check.repo::<Person>()?.find_all().await?, vec![p]);
    Ok(())
}

#[tokio::test]
async fn test_context_dispose_rolls_back() -> anyhow::Result<()> {
    let (store, _file) = bootstrapped_store().await?;
    let ctx = store.begin().await?;
    let mut p = Person::new("Never", "Saved", None);
    ctx.repo::<Person>()?.insert(&mut p).await?;
    ctx.dispose().await;
    assert!(matches!(
        ctx.repo::<Person>(),
        Err(SqliteError::InvalidOperationOnCompletedScope { .. })
    ));

    let check = store.begin().await?;
    assert_eq!(check.repo::<Person>()?.count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_context_rollback_then_schema_in_same_scope() -> anyhow::Result<()> {
    let (store, _file) = temp_store();
    let ctx = store.begin().await?;
    ctx.ensure_schema(&[EntityRef::of::<Person>()]).await?;
    let mut p = Person::new("Rolled", "Back", None);
    ctx.repo::<Person>()?.insert(&mut p).await?;
    ctx.rollback().await?;
    assert_eq!(ctx.state(), ContextState::Completed);
    assert!(ctx.ensure_schema(&[EntityRef::of::<Person>()]).await.is_err());
    ctx.dispose().await;

    // DDL is transactional in SQLite: the table is gone with the rollback.
    let check = store.unit_of_work().await?;
    let err = store
        .repository::<Person>(&check)?
        .find_all()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no such table"), "{err}");
    Ok(())
}
