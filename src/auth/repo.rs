use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::auth::repo_types::{Session, User};

impl User {
    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn create(db: &PgPool, username: &str, password_hash: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}

impl Session {
    pub async fn create(db: &PgPool, user_id: Uuid, ttl_minutes: i64) -> anyhow::Result<Session> {
        let token = Uuid::new_v4();
        let expires_at = OffsetDateTime::now_utc() + Duration::minutes(ttl_minutes);
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (token, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING token, user_id, created_at, expires_at
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(db)
        .await?;
        Ok(session)
    }

    /// Resolve a session token to its user. Expired sessions are treated as
    /// absent.
    pub async fn find_user(db: &PgPool, token: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.password_hash, u.created_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > now()
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn delete(db: &PgPool, token: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Removes sessions past their expiry. Run opportunistically on login so
    /// the table does not grow without bound.
    pub async fn delete_expired(db: &PgPool) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

// These tests need a live Postgres; point DATABASE_URL at a scratch database
// and run `cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::handlers::is_unique_violation;
    use sqlx::postgres::PgPoolOptions;

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
    async fn duplicate_username_create_is_a_unique_violation() {
        let db = pool().await;
        let username = fresh_username();

        User::create(&db, &username, "$argon2id$hash").await.unwrap();
        let err = User::create(&db, &username, "$argon2id$hash")
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    #[ignore = "needs a running Postgres"]
    async fn expired_sessions_are_invisible_and_swept() {
        let db = pool().await;
        let username = fresh_username();
        let user = User::create(&db, &username, "$argon2id$hash").await.unwrap();

        // Negative TTL backdates the expiry
        let session = Session::create(&db, user.id, -1).await.unwrap();
        assert!(Session::find_user(&db, session.token)
            .await
            .unwrap()
            .is_none());

        let swept = Session::delete_expired(&db).await.unwrap();
        assert!(swept >= 1);

        let remaining: i64 =
            sqlx::query_scalar("SELECT count(*) FROM sessions WHERE token = $1")
                .bind(session.token)
                .fetch_one(&db)
                .await
                .unwrap();
        assert_eq!(remaining, 0);
    }
}
