use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::Connection;

struct Migration {
    version: &'static str,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001",
        name: "initial",
        sql: include_str!("migrations/001_initial.sql"),
    },
    Migration {
        version: "002",
        name: "levels_missions",
        sql: include_str!("migrations/002_levels_missions.sql"),
    },
];

pub fn run_migrations(conn: &Connection) -> Result<()> {
    apply_pending(conn, MIGRATIONS)
}

/// Apply every migration in `migrations` whose version is not yet recorded.
/// Each migration and its `schema_migrations` row commit together, so a
/// failed migration leaves neither behind.
fn apply_pending(conn: &Connection, migrations: &[Migration]) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .context("Failed to create schema_migrations table")?;

    let applied = applied_versions(conn)?;
    let pending = migrations
        .iter()
        .filter(|m| !applied.contains(m.version));

    for migration in pending {
        tracing::info!(version = migration.version, name = migration.name, "Applying migration");

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)
            .and_then(|_| {
                tx.execute(
                    "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
                    (migration.version, migration.name, chrono::Utc::now().to_rfc3339()),
                )
            })
            .with_context(|| {
                format!("Failed to apply migration {}: {}", migration.version, migration.name)
            })?;
        tx.commit()?;
    }

    Ok(())
}

fn applied_versions(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<HashSet<String>, _>>()?;
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_migrations_run_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["courses", "levels", "missions", "nodes", "progress"] {
            assert!(table_exists(&conn, table), "missing table {}", table);
        }

        let versions = applied_versions(&conn).unwrap();
        assert_eq!(versions, HashSet::from(["001".to_string(), "002".to_string()]));
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let versions = applied_versions(&conn).unwrap();
        assert_eq!(versions, HashSet::from(["001".to_string(), "002".to_string()]));
    }

    #[test]
    fn test_failed_migration_records_nothing() {
        let conn = Connection::open_in_memory().unwrap();
        let migrations = [
            Migration {
                version: "001",
                name: "ok",
                sql: "CREATE TABLE a (id TEXT PRIMARY KEY);",
            },
            Migration {
                version: "002",
                name: "broken",
                sql: "CREATE TABLE b (id TEXT PRIMARY KEY); INSERT INTO missing VALUES (1);",
            },
        ];

        let err = apply_pending(&conn, &migrations).unwrap_err();
        assert!(format!("{:#}", err).contains("002"));

        assert!(table_exists(&conn, "a"));
        assert!(!table_exists(&conn, "b"));
        let versions = applied_versions(&conn).unwrap();
        assert_eq!(versions, HashSet::from(["001".to_string()]));
    }

    #[test]
    fn test_progress_key_rejects_duplicates() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO courses (id, title, created_at, updated_at) VALUES ('c', 'Course', ?, ?)",
            (&now, &now),
        )
        .unwrap();
        conn.execute(
            "INSERT INTO nodes (id, course_id, title, position_index, created_at) VALUES ('n', 'c', 'Node', 0, ?)",
            [&now],
        )
        .unwrap();

        let insert = "INSERT INTO progress (user_id, node_id, status, created_at, updated_at)
                      VALUES ('u', 'n', 'unlocked', ?, ?)";
        conn.execute(insert, (&now, &now)).unwrap();
        assert!(conn.execute(insert, (&now, &now)).is_err());
    }
}
