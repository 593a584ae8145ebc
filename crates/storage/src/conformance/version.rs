use std::future::Future;

use super::{make_agreement, TestResult};
use crate::{ParaphStorage, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "version",
            "stale_expected_version_conflicts",
            stale_expected_version_conflicts(factory).await,
        ),
        TestResult::from_result(
            "version",
            "racing_snapshots_second_writer_conflicts",
            racing_snapshots_second_writer_conflicts(factory).await,
        ),
        TestResult::from_result(
            "version",
            "sequential_updates_in_one_snapshot_stack",
            sequential_updates_in_one_snapshot_stack(factory).await,
        ),
    ]
}

async fn seeded<S, F, Fut>(factory: &F) -> Result<S, String>
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
    Ok(storage)
}

async fn stale_expected_version_conflicts<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = seeded(factory).await?;
    let mut snap = storage.begin_snapshot().await.map_err(|e| e.to_string())?;
    let rec = storage
        .get_agreement_for_update(&mut snap, "a1")
        .await
        .map_err(|e| e.to_string())?;

    // Current version is 0; expecting 5 must conflict.
    match storage.update_agreement(&mut snap, rec, 5).await {
        Err(StorageError::ConcurrentConflict { .. }) => {}
        Ok(v) => return Err(format!("stale update accepted, new version {v}")),
        Err(e) => return Err(format!("expected ConcurrentConflict, got: {e}")),
    }
    storage.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    Ok(())
}

async fn racing_snapshots_second_writer_conflicts<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = seeded(factory).await?;

    // Both snapshots read version 0.
    let mut s1 = storage.begin_snapshot().await.map_err(|e| e.to_string())?;
    let mut s2 = storage.begin_snapshot().await.map_err(|e| e.to_string())?;
    let rec1 = storage
        .get_agreement_for_update(&mut s1, "a1")
        .await
        .map_err(|e| e.to_string())?;
    let rec2 = storage
        .get_agreement_for_update(&mut s2, "a1")
        .await
        .map_err(|e| e.to_string())?;

    // First writer wins.
    storage
        .update_agreement(&mut s1, rec1, 0)
        .await
        .map_err(|e| e.to_string())?;
    storage.commit_snapshot(s1).await.map_err(|e| e.to_string())?;

    // Second writer must fail: at update time (lock-based backends) or
    // at commit time (validate-on-commit backends).
    let second = match storage.update_agreement(&mut s2, rec2, 0).await {
        Err(StorageError::ConcurrentConflict { .. }) => {
            storage.abort_snapshot(s2).await.map_err(|e| e.to_string())?;
            return Ok(());
        }
        Err(e) => return Err(format!("expected ConcurrentConflict, got: {e}")),
        Ok(_) => storage.commit_snapshot(s2).await,
    };
    match second {
        Err(StorageError::ConcurrentConflict { .. }) => Ok(()),
        Err(e) => Err(format!("expected ConcurrentConflict at commit, got: {e}")),
        Ok(()) => Err("second racing writer committed".to_string()),
    }
}

async fn sequential_updates_in_one_snapshot_stack<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = seeded(factory).await?;
    let mut snap = storage.begin_snapshot().await.map_err(|e| e.to_string())?;

    let mut rec = storage
        .get_agreement_for_update(&mut snap, "a1")
        .await
        .map_err(|e| e.to_string())?;
    rec.status = "partially_signed".to_string();
    let v1 = storage
        .update_agreement(&mut snap, rec, 0)
        .await
        .map_err(|e| e.to_string())?;

    let mut rec = storage
        .get_agreement_for_update(&mut snap, "a1")
        .await
        .map_err(|e| e.to_string())?;
    rec.status = "active".to_string();
    let v2 = storage
        .update_agreement(&mut snap, rec, v1)
        .await
        .map_err(|e| e.to_string())?;

    storage.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = storage.get_agreement("a1").await.map_err(|e| e.to_string())?;
    if v2 != 2 || rec.version != 2 || rec.status != "active" {
        return Err(format!(
            "expected version 2 / 'active', got {} / '{}'",
            rec.version, rec.status
        ));
    }
    Ok(())
}
