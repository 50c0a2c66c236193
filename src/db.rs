use sqlx::{Pool, Postgres};

pub type Db = Pool<Postgres>;

pub async fn connect(url: &str) -> anyhow::Result<Db> {
    Ok(Pool::<Postgres>::connect(url).await?)
}

/// Atomic find-and-increment on the counters table. The first call for a
/// name returns 1.
pub async fn next_sequence(db: &Db, name: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO counters (name, value) VALUES ($1, 1)
        ON CONFLICT (name) DO UPDATE SET value = counters.value + 1
        RETURNING value
        "#,
    )
    .bind(name)
    .fetch_one(db)
    .await
}
