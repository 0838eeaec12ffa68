//! Command handler tests: WordPress root, wp-config.php and settings handling

#![cfg(feature = "cli")]

use std::path::Path;

use tempfile::tempdir;
use wp_hugo_exporter::cli::CliError;
use wp_hugo_exporter::cli::commands::export::{ExportArgs, handle_export};
use wp_hugo_exporter::{ConfigError, DbHost, WpConfig};

fn write_wp_config(root: &Path, host: &str, prefix: &str) {
    let content = format!(
        r#"<?php
define( 'DB_NAME', 'wordpress' );
define( 'DB_USER', 'wp' );
define( 'DB_PASSWORD', '' );
define( 'DB_HOST', '{host}' );
define( 'DB_CHARSET', 'utf8mb4' );

$table_prefix = '{prefix}';

require_once ABSPATH . 'wp-settings.php';
"#
    );
    std::fs::write(root.join("wp-config.php"), content).unwrap();
}

#[test]
fn test_load_wp_config_from_root() {
    let dir = tempdir().unwrap();
    write_wp_config(dir.path(), "db.local:3307", "site_");

    let config = WpConfig::load(dir.path()).unwrap();
    assert_eq!(config.db_name, "wordpress");
    assert_eq!(config.db_password, "");
    assert_eq!(
        config.db_host,
        DbHost::Tcp {
            host: "db.local".to_string(),
            port: 3307
        }
    );
    assert_eq!(config.charset.as_deref(), Some("utf8mb4"));
    assert_eq!(config.queries().unwrap().table("posts"), "site_posts");
}

#[test]
fn test_missing_root_fails_before_anything_else() {
    let dir = tempdir().unwrap();
    let args = ExportArgs::new(dir.path().join("not-a-wordpress"));
    assert!(matches!(handle_export(&args), Err(CliError::RootNotFound(_))));
}

#[test]
fn test_invalid_prefix_is_config_error() {
    let dir = tempdir().unwrap();
    write_wp_config(dir.path(), "localhost", "wp_; DROP TABLE x");

    let args = ExportArgs::new(dir.path());
    assert!(matches!(
        handle_export(&args),
        Err(CliError::Config(ConfigError::InvalidPrefix(_)))
    ));
}

#[test]
fn test_invalid_settings_file_is_config_error() {
    let dir = tempdir().unwrap();
    write_wp_config(dir.path(), "localhost", "wp_");
    std::fs::write(dir.path().join("wp-hugo-export.toml"), "content_dir = \"../up\"\n").unwrap();

    let args = ExportArgs::new(dir.path());
    assert!(matches!(
        handle_export(&args),
        Err(CliError::Config(ConfigError::InvalidValue(_)))
    ));
}

#[cfg(feature = "mysql-backend")]
#[test]
fn test_connection_failure_writes_nothing() {
    let dir = tempdir().unwrap();
    write_wp_config(dir.path(), "127.0.0.1:1", "wp_");
    let output = dir.path().join("out");

    let args = ExportArgs {
        output: Some(output.clone()),
        ..ExportArgs::new(dir.path())
    };
    assert!(matches!(handle_export(&args), Err(CliError::Database(_))));
    assert!(!output.exists());
}

#[cfg(feature = "duckdb-backend")]
#[test]
fn test_export_from_duckdb_snapshot() {
    use wp_hugo_exporter::DuckDbStore;

    let dir = tempdir().unwrap();
    write_wp_config(dir.path(), "localhost", "wp_");
    let snapshot = dir.path().join("snapshot.duckdb");
    {
        let store = DuckDbStore::in_memory().unwrap();
        store
            .execute_batch(&format!(
                "ATTACH '{}' AS snap;
                 CREATE TABLE snap.wp_posts (ID BIGINT, post_type VARCHAR, post_title VARCHAR,
                     post_name VARCHAR, post_date TIMESTAMP, post_status VARCHAR,
                     post_content VARCHAR, guid VARCHAR);
                 INSERT INTO snap.wp_posts VALUES (1, 'post', 'Hi', 'hi',
                     TIMESTAMP '2024-05-06 07:08:09', 'publish', 'Body', '');
                 DETACH snap;",
                snapshot.display()
            ))
            .unwrap();
    }

    let args = ExportArgs {
        duckdb: Some(snapshot),
        ..ExportArgs::new(dir.path())
    };
    let summary = handle_export(&args).unwrap();

    assert_eq!(summary.exported, 1);
    // Sub-query tables are absent from the snapshot; their lookups resolve empty
    let written = dir.path().join("wp-content/md/content/posts/2024-05-06-hi.md");
    let content = std::fs::read_to_string(written).unwrap();
    assert!(content.contains("categories: []\n"));
    assert!(content.ends_with("---\n\nBody"));
}
