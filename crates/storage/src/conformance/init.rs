use std::future::Future;

use super::{make_agreement, TestResult};
use crate::{ParaphStorage, StorageError};

pub(super) async fn run_init_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "init",
            "create_starts_at_version_0",
            create_starts_at_version_0(factory).await,
        ),
        TestResult::from_result(
            "init",
            "duplicate_create_rejected",
            duplicate_create_rejected(factory).await,
        ),
        TestResult::from_result(
            "init",
            "create_visible_in_own_snapshot",
            create_visible_in_own_snapshot(factory).await,
        ),
    ]
}

async fn create_starts_at_version_0<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let mut snap = storage.begin_snapshot().await.map_err(|e| e.to_string())?;
    storage
        .create_agreement(&mut snap, make_agreement("a1"))
        .await
        .map_err(|e| e.to_string())?;
    storage.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = storage.get_agreement("a1").await.map_err(|e| e.to_string())?;
    if rec.version != 0 {
        return Err(format!("expected version 0, got {}", rec.version));
    }
    if rec.status != "draft" {
        return Err(format!("expected status 'draft', got '{}'", rec.status));
    }
    Ok(())
}

async fn duplicate_create_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let mut snap = storage.begin_snapshot().await.map_err(|e| e.to_string())?;
    storage
        .create_agreement(&mut snap, make_agreement("a1"))
        .await
        .map_err(|e| e.to_string())?;
    storage.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let mut snap2 = storage.begin_snapshot().await.map_err(|e| e.to_string())?;
    // The duplicate may surface at create time or at commit time.
    let created = storage.create_agreement(&mut snap2, make_agreement("a1")).await;
    match created {
        Err(StorageError::AlreadyExists { .. }) => Ok(()),
        Err(e) => Err(format!("expected AlreadyExists, got: {e}")),
        Ok(()) => match storage.commit_snapshot(snap2).await {
            Err(StorageError::AlreadyExists { .. }) => Ok(()),
            Err(e) => Err(format!("expected AlreadyExists at commit, got: {e}")),
            Ok(()) => Err("duplicate create was accepted".to_string()),
        },
    }
}

async fn create_visible_in_own_snapshot<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let mut snap = storage.begin_snapshot().await.map_err(|e| e.to_string())?;
    storage
        .create_agreement(&mut snap, make_agreement("a1"))
        .await
        .map_err(|e| e.to_string())?;

    let rec = storage
        .get_agreement_for_update(&mut snap, "a1")
        .await
        .map_err(|e| format!("own staged create not readable: {e}"))?;
    if rec.agreement_id != "a1" {
        return Err("read wrong record".to_string());
    }
    storage.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    Ok(())
}
