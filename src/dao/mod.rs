pub mod forest_fires;

/**
 * In-memory database for tests. A single connection is kept alive, since every new
 * in-memory connection would see an empty database.
 */
#[cfg(test)]
pub async fn init_test_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}
