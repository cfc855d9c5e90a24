// Person/Order scenario: insert, query by foreign key, cascade delete.

mod common;

use common::{bootstrapped_store, Order, Person};
use rust_decimal::Decimal;
use rust_sqlite_mapper::sqlite::Query;

#[tokio::test]
async fn test_person_orders_query_and_cascade() -> anyhow::Result<()> {
    let (store, _file) = bootstrapped_store().await?;

    let uow = store.unit_of_work().await?;
    let people = store.repository::<Person>(&uow)?;
    let orders = store.repository::<Order>(&uow)?;

    let mut ada = Person::new("Ada", "Lovelace", None);
    let person_id = people.insert(&mut ada).await?;
    assert!(person_id > 0);
    assert_eq!(ada.id, person_id);

    let mut inserted = Vec::new();
    for total in ["19.99", "42.50", "5.00"] {
        let mut order = Order::new(person_id, total);
        order.id = orders.insert(&mut order).await?;
        inserted.push(order);
    }

    let found = orders
        .query(&Query::new().where_equals("person_id", person_id).order_by("id", false))
        .await?;
    assert_eq!(found.len(), 3);
    assert_eq!(found, inserted);
    let totals: Vec<Decimal> = found.iter().map(|o| o.total).collect();
    assert_eq!(
        totals,
        vec![
            "19.99".parse::<Decimal>()?,
            "42.50".parse::<Decimal>()?,
            "5.00".parse::<Decimal>()?,
        ]
    );
    assert!(found.windows(2).all(|w| w[0].id < w[1].id));

    assert_eq!(people.delete(person_id).await?, 1);
    assert!(orders.find_all().await?.is_empty());

    uow.commit().await?;
    uow.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_insert_then_find_by_generated_key() -> anyhow::Result<()> {
    let (store, _file) = bootstrapped_store().await?;
    let uow = store.unit_of_work().await?;
    let people = store.repository::<Person>(&uow)?;

    let mut grace = Person::new("Grace", "Hopper", Some("grace@navy.mil"));
    let key = people.insert(&mut grace).await?;

    let loaded = people.find_by_key(key).await?;
    assert_eq!(loaded, Some(grace));
    assert_eq!(people.find_by_key(key + 1000).await?, None);
    Ok(())
}

#[tokio::test]
async fn test_committed_rows_are_visible_to_later_scopes() -> anyhow::Result<()> {
    let (store, _file) = bootstrapped_store().await?;

    let first = store.unit_of_work().await?;
    let mut alan = Person::new("Alan", "Turing", None);
    store.repository::<Person>(&first)?.insert(&mut alan).await?;
    first.commit().await?;
    first.dispose().await;

    let second = store.unit_of_work().await?;
    let people = store.repository::<Person>(&second)?;
    assert_eq!(people.find_all().await?, vec![alan]);
    assert_eq!(people.count().await?, 1);
    Ok(())
}
