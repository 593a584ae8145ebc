use std::future::Future;

use super::{make_agreement, make_document, make_execution, TestResult};
use crate::ParaphStorage;

pub(super) async fn run_commit_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "commit",
            "update_committed_with_incremented_version",
            update_committed_with_incremented_version(factory).await,
        ),
        TestResult::from_result(
            "commit",
            "execution_and_update_both_visible_after_commit",
            execution_and_update_both_visible_after_commit(factory).await,
        ),
        TestResult::from_result(
            "commit",
            "execution_and_update_neither_visible_after_abort",
            execution_and_update_neither_visible_after_abort(factory).await,
        ),
        TestResult::from_result(
            "commit",
            "document_committed_and_listed",
            document_committed_and_listed(factory).await,
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

async fn update_committed_with_incremented_version<S, F, Fut>(factory: &F) -> Result<(), String>
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
    rec.owner_signed_at = Some("2026-03-01T12:00:00Z".to_string());
    let new_version = storage
        .update_agreement(&mut snap, rec, 0)
        .await
        .map_err(|e| e.to_string())?;
    if new_version != 1 {
        return Err(format!("expected new version 1, got {new_version}"));
    }
    storage.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = storage.get_agreement("a1").await.map_err(|e| e.to_string())?;
    if rec.version != 1 || rec.status != "partially_signed" {
        return Err(format!(
            "commit lost update: status '{}', version {}",
            rec.status, rec.version
        ));
    }
    if rec.owner_signed_at.as_deref() != Some("2026-03-01T12:00:00Z") {
        return Err("owner_signed_at not preserved".to_string());
    }
    Ok(())
}

async fn execution_and_update_both_visible_after_commit<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
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
    storage
        .insert_session_execution(&mut snap, make_execution("ex1", "a1"))
        .await
        .map_err(|e| e.to_string())?;
    storage.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = storage.get_agreement("a1").await.map_err(|e| e.to_string())?;
    if rec.status != "partially_signed" {
        return Err("agreement update missing after commit".to_string());
    }
    let ex = storage
        .get_session_execution("ex1")
        .await
        .map_err(|e| format!("execution missing after commit: {e}"))?;
    if ex.agreement_id != "a1" {
        return Err("execution record corrupted".to_string());
    }
    Ok(())
}

async fn execution_and_update_neither_visible_after_abort<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
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
    storage
        .insert_session_execution(&mut snap, make_execution("ex1", "a1"))
        .await
        .map_err(|e| e.to_string())?;
    storage.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = storage.get_agreement("a1").await.map_err(|e| e.to_string())?;
    if rec.status != "draft" {
        return Err("aborted agreement update leaked".to_string());
    }
    if storage.get_session_execution("ex1").await.is_ok() {
        return Err("aborted execution record leaked".to_string());
    }
    Ok(())
}

async fn document_committed_and_listed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ParaphStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = seeded(factory).await?;
    let mut snap = storage.begin_snapshot().await.map_err(|e| e.to_string())?;
    storage
        .insert_document(&mut snap, make_document("agreements/a1/photo", "a1"))
        .await
        .map_err(|e| e.to_string())?;
    storage.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let docs = storage.list_documents("a1").await.map_err(|e| e.to_string())?;
    if docs.len() != 1 || docs[0].blob_key != "agreements/a1/photo" {
        return Err(format!("expected 1 document, got {}", docs.len()));
    }
    Ok(())
}
