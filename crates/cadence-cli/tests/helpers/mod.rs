use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test harness for running CLI commands with temporary databases
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    /// Create a new test harness with a temporary database
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self { temp_dir, db_path }
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("cadence").expect("Failed to find cadence binary");

        // Run inside the temp dir so no stray cadence.toml is picked up
        cmd.current_dir(self.temp_dir.path());
        cmd.env("CADENCE_DATABASE_PATH", &self.db_path);
        cmd.env("CADENCE_TIMEZONE", "UTC");
        cmd.env_remove("RUST_LOG");

        cmd
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert a specific exit code
    pub fn run_with_code(&self, args: &[&str], code: i32) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().code(code)
    }

    /// Runs raw SQL against the test database, bypassing the binary
    pub fn execute_sql(&self, sql: &str) {
        let runtime = tokio::runtime::Runtime::new().expect("Failed to start runtime");
        runtime.block_on(async {
            let pool = self.pool().await;
            sqlx::query(sql).execute(&pool).await.expect("SQL statement failed");
            pool.close().await;
        });
    }

    pub fn count_rows(&self, table: &str) -> i64 {
        let runtime = tokio::runtime::Runtime::new().expect("Failed to start runtime");
        runtime.block_on(async {
            let pool = self.pool().await;
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .expect("count query failed");
            pool.close().await;
            count
        })
    }

    async fn pool(&self) -> sqlx::SqlitePool {
        let options = sqlx::sqlite::SqliteConnectOptions::new().filename(&self.db_path);
        sqlx::SqlitePool::connect_with(options)
            .await
            .expect("Failed to open test database")
    }

    /// Runs a command and returns its stdout
    pub fn stdout_of(&self, args: &[&str]) -> String {
        let output = self.run_success(args).get_output().stdout.clone();
        String::from_utf8(output).expect("stdout is not UTF-8")
    }
}

/// Common test fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Daily standup producing three occurrences on 2024-01-01..03
    pub fn daily_standup_args() -> Vec<&'static str> {
        vec![
            "schedule",
            "Standup",
            "--start",
            "2024-01-01 09:00",
            "--end",
            "2024-01-03 09:00",
            "--duration",
            "60",
            "--every",
            "1",
        ]
    }

    /// Same shape as the daily standup, far enough ahead to stay pending
    pub fn future_standup_args() -> Vec<&'static str> {
        vec![
            "schedule",
            "Standup",
            "--start",
            "2099-01-01 09:00",
            "--end",
            "2099-01-03 09:00",
            "--duration",
            "60",
            "--every",
            "1",
        ]
    }
}

/// Short IDs from the first column of a rendered occurrence table.
pub fn short_ids(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let cell = line.split(['│', '|']).nth(1)?.trim();
            (cell.len() == 8 && cell.chars().all(|c| c.is_ascii_hexdigit())).then(|| cell.to_string())
        })
        .collect()
}

/// Utility functions for test assertions
pub mod assertions {
    use predicates::prelude::*;

    pub fn has_occurrence_table_headers() -> impl Predicate<str> {
        predicate::str::contains("ID")
            .and(predicate::str::contains("Name"))
            .and(predicate::str::contains("Start"))
    }

    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error")
    }
}
