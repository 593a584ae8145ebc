use std::future::Future;

use super::{make_agreement, TestResult};
use crate::{ParaphStorage, StorageError};

pub(super) async fn run_snapshot_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "snapshot",
            "uncommitted_create_invisible",
            uncommitted_create_invisible(factory).await,
        ),
        TestResult::from_result(
            "snapshot",
            "uncommitted_update_invisible",
            uncommitted_update_invisible(factory).await,
        ),
        TestResult::from_result(
            "snapshot",
            "abort_discards_update",
            abort_discards_update(factory).await,
        ),
        TestResult::from_result(
            "snapshot",
            "update_readable_in_own_snapshot",
            update_readable_in_own_snapshot(factory).await,
        ),
    ]
}

/// Seed one committed agreement and return the storage.
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

async fn uncommitted_create_invisible<S, F, Fut>(factory: &F) -> Result<(), String>
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

    match storage.get_agreement("a1").await {
        Err(StorageError::AgreementNotFound { .. }) => {}
        Ok(_) => return Err("uncommitted create visible outside snapshot".to_string()),
        Err(e) => return Err(format!("expected AgreementNotFound, got: {e}")),
    }
    storage.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    Ok(())
}

async fn uncommitted_update_invisible<S, F, Fut>(factory: &F) -> Result<(), String>
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
    rec.status = "active".to_string();
    storage
        .update_agreement(&mut snap, rec, 0)
        .await
        .map_err(|e| e.to_string())?;

    let outside = storage.get_agreement("a1").await.map_err(|e| e.to_string())?;
    if outside.status != "draft" {
        return Err(format!(
            "uncommitted update visible: status '{}'",
            outside.status
        ));
    }
    storage.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    Ok(())
}

async fn abort_discards_update<S, F, Fut>(factory: &F) -> Result<(), String>
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
    storage
        .update_agreement(&mut snap, rec, 0)
        .await
        .map_err(|e| e.to_string())?;
    storage.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = storage.get_agreement("a1").await.map_err(|e| e.to_string())?;
    if rec.status != "draft" || rec.version != 0 {
        return Err(format!(
            "abort leaked: status '{}', version {}",
            rec.status, rec.version
        ));
    }
    Ok(())
}

async fn update_readable_in_own_snapshot<S, F, Fut>(factory: &F) -> Result<(), String>
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
    storage
        .update_agreement(&mut snap, rec, 0)
        .await
        .map_err(|e| e.to_string())?;

    let again = storage
        .get_agreement_for_update(&mut snap, "a1")
        .await
        .map_err(|e| e.to_string())?;
    if again.status != "partially_signed" || again.version != 1 {
        return Err(format!(
            "own write not readable: status '{}', version {}",
            again.status, again.version
        ));
    }
    storage.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    Ok(())
}
