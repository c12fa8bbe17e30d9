#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test harness running the CLI inside a temporary working directory
pub struct CliTestHarness {
    temp_dir: TempDir,
    data_path: PathBuf,
}

impl CliTestHarness {
    /// Create a new test harness with an empty working directory
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let data_path = temp_dir.path().join("rota.json");

        Self {
            temp_dir,
            data_path,
        }
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("rota").expect("Failed to find rota binary");

        // Run where rota.toml would be looked up, with a fixed display timezone
        cmd.current_dir(self.temp_dir.path());
        cmd.env("ROTA_DISPLAY_TIMEZONE", "UTC");
        cmd.env("ROTA_DATA_FILE", &self.data_path);
        cmd.env_remove("RUST_LOG");

        cmd
    }

    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Write the agenda document used by `rota agenda`
    pub fn write_data(&self, json: &str) {
        std::fs::write(&self.data_path, json).expect("Failed to write data file");
    }

    /// Write rota.toml into the working directory
    pub fn write_config(&self, toml: &str) {
        std::fs::write(self.temp_dir.path().join("rota.toml"), toml)
            .expect("Failed to write config file");
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Helper to run a command and capture stdout
    pub fn stdout(&self, args: &[&str]) -> String {
        let output = self.run_success(args).get_output().stdout.clone();
        String::from_utf8(output).expect("stdout is UTF-8")
    }
}

/// Common test fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const LIST_ID: &'static str = "0191f0a0-0000-7000-8000-000000000001";
    pub const TASK_ID: &'static str = "0191f0a0-0000-7000-8000-000000000002";
    pub const DAILY_ID: &'static str = "0191f0a0-0000-7000-8000-000000000003";

    /// Window covering September 2025
    pub fn september_window() -> Vec<&'static str> {
        vec!["--from", "2025-09-01T00:00:00Z", "--to", "2025-09-30T23:59:59Z"]
    }

    /// A list with a weekly rule, a dated task and a daily task
    pub fn agenda_document() -> String {
        format!(
            r#"{{
                "items": [
                    {{
                        "id": "{list}",
                        "kind": "list",
                        "text": "Groceries every saturday",
                        "created_at": "2025-08-01T10:00:00Z",
                        "rule": "FREQ=WEEKLY;INTERVAL=1;BYDAY=SA",
                        "dtstart": "2025-09-06T00:00:00Z"
                    }},
                    {{
                        "id": "{task}",
                        "kind": "task",
                        "text": "Dentist 18/9/2025",
                        "created_at": "2025-08-01T10:00:00Z"
                    }},
                    {{
                        "id": "{daily}",
                        "kind": "task",
                        "text": "Stretch",
                        "created_at": "2025-08-01T10:00:00Z",
                        "rule": "FREQ=DAILY;INTERVAL=1",
                        "dtstart": "2025-09-01T00:00:00Z"
                    }}
                ],
                "completions": [],
                "ignores": []
            }}"#,
            list = Self::LIST_ID,
            task = Self::TASK_ID,
            daily = Self::DAILY_ID,
        )
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use predicates::prelude::*;

    /// Predicate to check if output contains the agenda table headers
    pub fn has_agenda_table_headers() -> impl Predicate<str> {
        predicate::str::contains("When")
            .and(predicate::str::contains("Title"))
            .and(predicate::str::contains("Source"))
    }

    /// Predicate to check for error messages
    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error")
    }
}
