use sqlx::PgPool;
use time::OffsetDateTime;

use crate::punches::repo_types::Punch;

impl Punch {
    /// Opens a punch unless the user already has one open, returning None in
    /// that case. The no-open-punch guard and the insert run in one
    /// transaction under a per-username advisory lock, so concurrent
    /// punch-ins cannot both pass the guard.
    pub async fn create_open(
        db: &PgPool,
        username: &str,
        lat: f64,
        lon: f64,
    ) -> anyhow::Result<Option<Punch>> {
        let mut tx = db.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(username)
            .execute(&mut *tx)
            .await?;
        let punch = sqlx::query_as::<_, Punch>(
            r#"
            INSERT INTO punches (username, punch_in_at, lat, lon)
            SELECT $1, $2, $3, $4
            WHERE NOT EXISTS (
                SELECT 1 FROM punches
                WHERE username = $1 AND punch_out_at IS NULL
            )
            RETURNING id, username, punch_in_at, punch_out_at, lat, lon
            "#,
        )
        .bind(username)
        .bind(OffsetDateTime::now_utc())
        .bind(lat)
        .bind(lon)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(punch)
    }

    /// Sets the punch-out timestamp on the newest open punch. Returns None
    /// when no open punch exists.
    pub async fn close_open(db: &PgPool, username: &str) -> anyhow::Result<Option<Punch>> {
        let punch = sqlx::query_as::<_, Punch>(
            r#"
            UPDATE punches
            SET punch_out_at = $2
            WHERE id = (
                SELECT id FROM punches
                WHERE username = $1 AND punch_out_at IS NULL
                ORDER BY punch_in_at DESC
                LIMIT 1
            )
            RETURNING id, username, punch_in_at, punch_out_at, lat, lon
            "#,
        )
        .bind(username)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(db)
        .await?;
        Ok(punch)
    }

    pub async fn list_for_user(db: &PgPool, username: &str) -> anyhow::Result<Vec<Punch>> {
        let rows = sqlx::query_as::<_, Punch>(
            r#"
            SELECT id, username, punch_in_at, punch_out_at, lat, lon
            FROM punches
            WHERE username = $1
            ORDER BY punch_in_at DESC
            "#,
        )
        .bind(username)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Punch>> {
        let rows = sqlx::query_as::<_, Punch>(
            r#"
            SELECT id, username, punch_in_at, punch_out_at, lat, lon
            FROM punches
            ORDER BY punch_in_at DESC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

// These tests need a live Postgres; point DATABASE_URL at a scratch database
// and run `cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL for db tests");
        let db = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .expect("connect");
        sqlx::migrate!("./migrations").run(&db).await.expect("migrate");
        db
    }

    fn fresh_username() -> String {
        format!("user-{}", Uuid::new_v4())
    }

    #[tokio::test]
    #[ignore = "needs a running Postgres"]
    async fn concurrent_punch_ins_leave_one_open_punch() {
        let db = pool().await;
        let username = fresh_username();

        let (a, b) = tokio::join!(
            Punch::create_open(&db, &username, 11.274_570, 77.607_235),
            Punch::create_open(&db, &username, 11.274_570, 77.607_235),
        );
        let opened = [a.unwrap(), b.unwrap()].into_iter().flatten().count();
        assert_eq!(opened, 1);

        let open_rows: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM punches WHERE username = $1 AND punch_out_at IS NULL",
        )
        .bind(&username)
        .fetch_one(&db)
        .await
        .unwrap();
        assert_eq!(open_rows, 1);
    }

    #[tokio::test]
    #[ignore = "needs a running Postgres"]
    async fn second_punch_in_is_rejected_until_punch_out() {
        let db = pool().await;
        let username = fresh_username();

        let first = Punch::create_open(&db, &username, 11.274_570, 77.607_235)
            .await
            .unwrap();
        assert!(first.is_some());

        let second = Punch::create_open(&db, &username, 11.274_570, 77.607_235)
            .await
            .unwrap();
        assert!(second.is_none());

        let closed = Punch::close_open(&db, &username).await.unwrap();
        assert!(closed.unwrap().punch_out_at.is_some());

        let third = Punch::create_open(&db, &username, 11.274_570, 77.607_235)
            .await
            .unwrap();
        assert!(third.is_some());
    }
}
