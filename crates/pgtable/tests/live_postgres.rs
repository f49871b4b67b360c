use pgtable::{QbError, QbResult, Value, record, table};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_postgres::NoTls;

async fn try_connect() -> Option<tokio_postgres::Client> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let (client, connection) = tokio_postgres::connect(&database_url, NoTls)
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("tokio-postgres connection error: {e}");
        }
    });
    Some(client)
}

async fn scratch_table(client: &tokio_postgres::Client, prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    let name = format!("pgtable_{prefix}_{}_{nanos}", std::process::id());
    client
        .batch_execute(&format!(
            "CREATE TEMP TABLE {name} (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE,
                age INT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )"
        ))
        .await
        .expect("create scratch table");
    name
}

#[tokio::test]
async fn insert_find_count_roundtrip() -> QbResult<()> {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return Ok(());
    };
    let name = scratch_table(&client, "roundtrip").await;
    let mut people = table(&client, &name)?;

    let inserted = people
        .insert(vec![
            record! { "name" => "ada", "email" => "ada@example.com", "age" => 36 },
            record! { "name" => "grace", "email" => "grace@example.com", "age" => 45 },
            record! { "name" => "linus", "email" => Value::Null, "age" => 28 },
        ])
        .await?;
    assert_eq!(inserted, 3);

    let id = people
        .insert_get_id(record! { "name" => "barbara", "age" => 50 })
        .await?;
    let found = people.find(&id).await?.expect("inserted row is found");
    assert_eq!(found.get("name"), Some(&Value::from("barbara")));
    assert_eq!(found.get("age"), Some(&Value::Int(50)));

    assert_eq!(people.count().await?, 4);
    assert_eq!(people.where_op("age", ">", 40).count().await?, 2);
    assert_eq!(people.where_null("email").count().await?, 2);

    let oldest = people.max("age").await?;
    assert_eq!(oldest, Some(Value::Int(50)));
    let avg = people.where_in("name", ["ada", "linus"]).avg("age").await?;
    assert_eq!(avg, Some(Value::Float(32.0)));

    let names = people.select(&["name"]).order_by("age").get().await?;
    let names: Vec<_> = names
        .iter()
        .filter_map(|r| r.get("name").and_then(Value::as_str))
        .collect();
    assert_eq!(names, ["linus", "ada", "grace", "barbara"]);
    Ok(())
}

#[tokio::test]
async fn update_and_delete_respect_filters() -> QbResult<()> {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return Ok(());
    };
    let name = scratch_table(&client, "writes").await;
    let mut people = table(&client, &name)?;
    people
        .insert(vec![
            record! { "name" => "a", "age" => 10 },
            record! { "name" => "b", "age" => 20 },
            record! { "name" => "c", "age" => 30 },
        ])
        .await?;

    let err = people.update(record! { "age" => 0 }).await.unwrap_err();
    assert!(err.is_precondition());
    assert_eq!(people.where_("age", 0).count().await?, 0);

    let updated = people
        .where_between("age", [15, 35])
        .update(record! { "name" => "adult" })
        .await?;
    assert_eq!(updated, 2);

    let deleted = people.where_("name", "adult").delete().await?;
    assert_eq!(deleted, 2);
    assert_eq!(people.count().await?, 1);

    people.insert(record! { "name" => "d", "age" => 40 }).await?;
    assert_eq!(people.delete().await?, 2);
    assert_eq!(people.count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn upsert_and_constraint_errors() -> QbResult<()> {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return Ok(());
    };
    let name = scratch_table(&client, "upsert").await;
    let mut people = table(&client, &name)?;

    people
        .insert(record! { "name" => "ada", "email" => "ada@example.com" })
        .await?;
    let err = people
        .insert(record! { "name" => "ada2", "email" => "ada@example.com" })
        .await
        .unwrap_err();
    assert!(err.is_unique_violation(), "{err}");

    people
        .upsert(
            record! { "name" => "Ada Lovelace", "email" => "ada@example.com" },
            &["email"],
            &["name"],
        )
        .await?;
    let renamed = people
        .where_("email", "ada@example.com")
        .value("name")
        .await?;
    assert_eq!(renamed, Some(Value::from("Ada Lovelace")));
    Ok(())
}

#[tokio::test]
async fn invalid_identifiers_never_reach_the_server() -> QbResult<()> {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return Ok(());
    };
    let name = scratch_table(&client, "invalid").await;
    let mut people = table(&client, &name)?;

    let err = people
        .select(&["name", "(SELECT 1)"])
        .get()
        .await
        .unwrap_err();
    assert!(matches!(err, QbError::InvalidArgument(_)));

    assert!(table(&client, "people; DROP TABLE people").is_err());
    Ok(())
}

#[tokio::test]
async fn enum_columns_bind_and_decode_as_text() -> QbResult<()> {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return Ok(());
    };
    let name = scratch_table(&client, "enums").await;
    client
        .batch_execute(&format!(
            "CREATE TYPE pg_temp.{name}_mood AS ENUM ('happy', 'sad');
             ALTER TABLE {name} ADD COLUMN mood pg_temp.{name}_mood"
        ))
        .await
        .expect("add enum column");
    let mut people = table(&client, &name)?;

    people
        .insert(vec![
            record! { "name" => "ada", "mood" => "happy" },
            record! { "name" => "grace", "mood" => "sad" },
        ])
        .await?;
    assert_eq!(people.where_("mood", "sad").count().await?, 1);

    let ada = people.where_("name", "ada").first().await?.expect("ada exists");
    assert_eq!(ada.get("mood"), Some(&Value::from("happy")));

    let err = people.insert(record! { "name" => "x", "mood" => "angry" }).await.unwrap_err();
    assert!(matches!(err, QbError::Execution { .. }), "{err}");
    Ok(())
}
