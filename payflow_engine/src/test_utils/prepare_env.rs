use log::*;
use tempfile::TempDir;

use crate::SqliteDatabase;

/// A migrated database in a temporary directory. The directory, and the database with it, is deleted when this is
/// dropped.
pub struct TestDatabase {
    pub db: SqliteDatabase,
    _dir: TempDir,
}

pub async fn prepare_test_env() -> TestDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    let (dir, url) = random_db_path();
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Created test database {url}");
    TestDatabase { db, _dir: dir }
}

pub fn random_db_path() -> (TempDir, String) {
    let dir = tempfile::tempdir().expect("Could not create a temporary directory");
    let url = format!("sqlite://{}/test_store_{}.db", dir.path().display(), rand::random::<u64>());
    (dir, url)
}
