use bookshelf::Database;
use bookshelf::config::{DbConfig, ENV_DB, ENV_SLOW_QUERY_MS};
use bookshelf::query::Filter;

#[test]
fn from_config_opens_a_wal_database() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("bookshelf.toml");
    let wal = dir.path().join("data").join("books.wal");
    std::fs::write(&file, "slow_query_ms = 1000\nlog_level = \"warn\"\n").unwrap();
    let wal_str = wal.display().to_string();
    let cfg = DbConfig::from_file(&file)
        .unwrap()
        .apply_env_with(|k| match k {
            ENV_DB => Some(wal_str.clone()),
            ENV_SLOW_QUERY_MS => Some("250".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(cfg.slow_query_ms, 250);
    assert_eq!(cfg.log_level, "warn");

    {
        let db = Database::from_config(&cfg).unwrap();
        db.books().unwrap().insert(&super::support::catalogue()[0]).unwrap();
    }
    assert!(wal.exists());
    let db = Database::from_config(&cfg).unwrap();
    assert_eq!(db.count("books", &Filter::True).unwrap(), 1);
}

#[test]
fn default_config_is_in_memory() {
    let cfg = DbConfig::default();
    assert!(cfg.path.is_none());
    let db = Database::from_config(&cfg).unwrap();
    assert_eq!(db.engine().describe_storage(), "memory");
}

#[test]
fn log_dir_installs_rolling_files() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = DbConfig { log_dir: Some(dir.path().join("logs")), ..DbConfig::default() };
    Database::from_config(&cfg).unwrap();
    assert!(dir.path().join("logs").join("app.log").exists());
    assert!(dir.path().join("logs").join("audit.log").exists());
    assert!(dir.path().join("logs").join("metrics.log").exists());
}
