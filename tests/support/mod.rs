#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A throwaway data directory for one test
pub struct TestBoard {
    dir: TempDir,
}

impl TestBoard {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store_file(&self) -> PathBuf {
        self.dir.path().join("store.json")
    }

    /// `tb` pointed at this board, with env overrides cleared
    pub fn tb(&self) -> Command {
        let mut cmd = Command::cargo_bin("tb").expect("binary");
        cmd.env("TB_DATA_DIR", self.dir.path())
            .env_remove("TB_CONFIG")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run with `--json`, expect success, return the `data` payload.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.tb().args(args).arg("--json").output().expect("run tb");
        assert!(
            output.status.success(),
            "tb {:?} failed: {}{}",
            args,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let envelope: Value = serde_json::from_slice(&output.stdout).expect("json envelope");
        assert_eq!(envelope["status"], "success");
        envelope["data"].clone()
    }

    /// Run with `--json`, expect failure with `code`, return the envelope.
    pub fn json_error(&self, args: &[&str], code: i32) -> Value {
        let output = self.tb().args(args).arg("--json").output().expect("run tb");
        assert_eq!(output.status.code(), Some(code), "tb {:?}", args);
        let envelope: Value = serde_json::from_slice(&output.stdout).expect("json envelope");
        assert_eq!(envelope["status"], "error");
        envelope
    }

    /// Add a task and return its id.
    pub fn add(&self, text: &str, column: &str, within: &str) -> String {
        let data = self.json(&["add", text, "--column", column, "--in", within]);
        data["id"].as_str().expect("task id").to_string()
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.dir.path().join("config.toml");
        fs::write(&path, contents).expect("write config");
        path
    }

    /// Raw key-value map from `store.json`
    pub fn read_store(&self) -> serde_json::Map<String, Value> {
        let raw = fs::read_to_string(self.store_file()).expect("read store");
        serde_json::from_str(&raw).expect("store is a JSON object")
    }

    /// The board blob stored under `todoTasks`
    pub fn read_board(&self) -> Value {
        let store = self.read_store();
        let raw = store
            .get("todoTasks")
            .and_then(Value::as_str)
            .expect("todoTasks key");
        serde_json::from_str(raw).expect("board blob")
    }

    pub fn write_store(&self, entries: &[(&str, String)]) {
        let map: serde_json::Map<String, Value> = entries
            .iter()
            .map(|(key, value)| (key.to_string(), Value::String(value.clone())))
            .collect();
        fs::write(
            self.store_file(),
            serde_json::to_string_pretty(&map).expect("encode store"),
        )
        .expect("write store");
    }
}
