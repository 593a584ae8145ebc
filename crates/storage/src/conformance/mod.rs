//! Conformance test suite for `ParaphStorage` implementations.
//!
//! A backend-agnostic suite that any `ParaphStorage` implementation
//! can run to verify correctness. The suite covers:
//!
//! - **Initialization**: agreement creation, duplicate detection
//! - **Snapshot isolation**: uncommitted writes invisible, committed writes visible
//! - **Atomic commit**: all-or-nothing semantics for multi-record snapshots
//! - **Version validation / OCC**: stale-version conflict detection
//! - **Error handling**: correct error variants for invalid operations
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory
//! function that creates a fresh, empty storage instance for each test:
//!
//! ```ignore
//! use paraph_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn postgres_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_postgres_storage().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod commit;
mod error;
mod init;
mod snapshot;
mod version;

use std::fmt;
use std::future::Future;

use crate::record::{AgreementRecord, DocumentRecord, SessionExecutionRecord};
use crate::ParaphStorage;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "init", "snapshot", "commit").
    pub category: String,
    /// Test name (e.g. "create_starts_at_version_0").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self {
                category: category.to_string(),
                name: name.to_string(),
                passed: true,
                message: None,
            },
            Err(msg) => Self {
                category: category.to_string(),
                name: name.to_string(),
                passed: false,
                message: Some(msg),
            },
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh,
/// empty storage instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(init::run_init_tests(&factory).await);
    results.extend(error::run_error_tests(&factory).await);
    results.extend(snapshot::run_snapshot_tests(&factory).await);
    results.extend(commit::run_commit_tests(&factory).await);
    results.extend(version::run_version_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn make_agreement(id: &str) -> AgreementRecord {
    AgreementRecord {
        agreement_id: id.to_string(),
        kind: "contract".to_string(),
        property_id: "prop-1".to_string(),
        status: "draft".to_string(),
        version: 0,
        owner_signed_at: None,
        counterparty_signed_at: None,
        updated_at: "2026-03-01T00:00:00Z".to_string(),
        last_session_id: None,
        body: serde_json::json!({"id": id}),
    }
}

fn make_execution(id: &str, agreement_id: &str) -> SessionExecutionRecord {
    SessionExecutionRecord {
        id: id.to_string(),
        agreement_id: agreement_id.to_string(),
        party: "owner".to_string(),
        outcome: "completed".to_string(),
        started_at: "2026-03-01T00:00:00Z".to_string(),
        completed_at: Some("2026-03-01T00:01:00Z".to_string()),
        certificate_alias: Some("alias-1".to_string()),
        step_trace: serde_json::json!([]),
    }
}

fn make_document(key: &str, agreement_id: &str) -> DocumentRecord {
    DocumentRecord {
        blob_key: key.to_string(),
        agreement_id: agreement_id.to_string(),
        content_digest: "0".repeat(64),
        content_type: "application/pdf".to_string(),
        byte_length: 4,
    }
}
