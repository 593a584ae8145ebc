use std::future::Future;

use super::{make_agreement, TestResult};
use crate::{ParaphStorage, StorageError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "error",
            "get_missing_agreement_not_found",
            get_missing_agreement_not_found(factory).await,
        ),
        TestResult::from_result(
            "error",
            "update_missing_agreement_not_found",
            update_missing_agreement_not_found(factory).await,
        ),
        TestResult::from_result(
            "error",
            "get_missing_execution_not_found",
            get_missing_execution_not_found(factory).await,
        ),
    ]
}

async fn get_missing_agreement_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    match storage.get_agreement("nope").await {
        Err(StorageError::AgreementNotFound { agreement_id }) if agreement_id == "nope" => Ok(()),
        Err(e) => Err(format!("expected AgreementNotFound, got: {e}")),
        Ok(_) => Err("missing agreement returned a record".to_string()),
    }
}

async fn update_missing_agreement_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let mut snap = storage.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = storage
        .update_agreement(&mut snap, make_agreement("ghost"), 0)
        .await;
    storage.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    match result {
        Err(StorageError::AgreementNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected AgreementNotFound, got: {e}")),
        Ok(v) => Err(format!("update of missing agreement returned version {v}")),
    }
}

async fn get_missing_execution_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    match storage.get_session_execution("nope").await {
        Err(StorageError::ExecutionNotFound { execution_id }) if execution_id == "nope" => Ok(()),
        Err(e) => Err(format!("expected ExecutionNotFound, got: {e}")),
        Ok(_) => Err("missing execution returned a record".to_string()),
    }
}
