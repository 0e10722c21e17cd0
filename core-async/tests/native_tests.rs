//! Integration tests for the runtime facade.

use core_async::{fs, process, sync, task, time};
use std::sync::Arc;

#[tokio::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    assert_eq!(handle.await.unwrap(), 42);
}

#[tokio::test]
async fn test_task_spawn_blocking() {
    let handle = task::spawn_blocking(|| {
        std::thread::sleep(std::time::Duration::from_millis(10));
        100
    });
    assert_eq!(handle.await.unwrap(), 100);
}

#[tokio::test]
async fn test_panicking_task_surfaces_join_error() {
    let handle = task::spawn(async {
        panic!("boom");
    });
    let err = handle.await.unwrap_err();
    assert!(err.is_panic());
}

#[tokio::test]
async fn test_timeout_failure() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(200)).await;
        42
    })
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_cancellation_token_wakes_waiters() {
    let token = sync::CancellationToken::new();
    let waiter = token.clone();

    let handle = task::spawn(async move {
        waiter.cancelled().await;
        true
    });

    token.cancel();
    assert!(handle.await.unwrap());
}

#[tokio::test]
async fn test_mutex() {
    let mutex = Arc::new(sync::Mutex::new(0));
    let mutex_clone = mutex.clone();

    task::spawn(async move {
        *mutex_clone.lock().await += 1;
    })
    .await
    .unwrap();

    assert_eq!(*mutex.lock().await, 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_entry_exists_counts_dangling_symlink() {
    let dir = tempfile::tempdir().unwrap();
    let link = dir.path().join("dangling");
    fs::symlink(dir.path().join("missing-target"), &link)
        .await
        .unwrap();

    assert!(fs::entry_exists(&link).await.unwrap());
    assert!(!fs::try_exists(&link).await.unwrap());
    assert!(!fs::entry_exists(&dir.path().join("absent")).await.unwrap());
}

#[cfg(unix)]
#[tokio::test]
async fn test_process_reports_missing_program() {
    let result = process::Command::new("definitely-not-a-real-program-name")
        .stdout(process::Stdio::null())
        .output()
        .await;

    assert!(result.is_err());
}
