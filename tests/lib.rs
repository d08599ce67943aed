//! PostgreSQL fixtures for storage-level tests. Every test gets a throwaway
//! database derived from `TEST_DATABASE_URL`; without that variable the
//! tests return early.

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};
use url::Url;
use uuid::Uuid;

pub struct PgTestContext {
    pub db: DatabaseConnection,
    admin_url: String,
    db_name: String,
}

impl PgTestContext {
    pub async fn new() -> Option<Self> {
        let base = std::env::var("TEST_DATABASE_URL").ok()?;
        let (admin_url, db_name, test_url) = build_urls(&base)?;
        let admin = Database::connect(&admin_url).await.ok()?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("CREATE DATABASE \"{db_name}\";"),
            ))
            .await
            .ok()?;
        let db = Database::connect(&test_url).await.ok()?;
        Migrator::up(&db, None).await.ok()?;
        Some(Self {
            db,
            admin_url,
            db_name,
        })
    }

    pub async fn cleanup(self) {
        let Self {
            db,
            admin_url,
            db_name,
        } = self;
        let _ = db.close().await;
        if let Ok(admin) = Database::connect(&admin_url).await {
            let drop_sql = format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE);");
            let _ = admin
                .execute(Statement::from_string(DatabaseBackend::Postgres, drop_sql))
                .await;
        }
    }
}

fn build_urls(base: &str) -> Option<(String, String, String)> {
    let url = Url::parse(base).ok()?;
    let db_path = url.path().trim_start_matches('/');
    let base_name = if db_path.is_empty() { "yamdb_test" } else { db_path };
    let db_name = format!("{base_name}_{}", Uuid::new_v4().simple());
    let mut admin_url = url.clone();
    admin_url.set_path("/postgres");
    let mut test_url = url;
    test_url.set_path(&format!("/{db_name}"));
    Some((admin_url.to_string(), db_name, test_url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_name_is_unique_per_run() {
        let (admin, first, url) = build_urls("postgres://u:p@localhost:5432/yamdb").unwrap();
        let (_, second, _) = build_urls("postgres://u:p@localhost:5432/yamdb").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert!(first.starts_with("yamdb_"));
        assert_ne!(first, second);
        assert!(url.ends_with(&first));
    }
}
