//! Integration tests for multi-source library runs

mod common;

use common::Fixture;
use core_sync::{
    CollectingSink, DiscardSink, Library, LibraryKind, Resolution, SyncError, SyncRun,
};

fn two_source_tv(fx: &Fixture) -> Library {
    Library::new(
        fx.orchestrator(LibraryKind::Tv, None, 1_000),
        vec![
            fx.source("tv-1080", Resolution::Hd1080).with_priority(1),
            fx.source("tv-4k", Resolution::Uhd2160).with_priority(0),
        ],
    )
}

#[tokio::test]
async fn test_sources_run_in_priority_order() {
    let fx = Fixture::new();
    let library = two_source_tv(&fx);
    let names: Vec<_> = library.sources().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["tv-4k", "tv-1080"]);
}

#[tokio::test]
async fn test_resolutions_coexist_as_siblings() {
    let fx = Fixture::new();
    fx.add_link("tv-4k", "Foo/S01/Foo.S01E01.mkv", "4k/foo.mkv", 100);
    fx.add_link("tv-1080", "Foo/S01/Foo.S01E01.mkv", "hd/foo.mkv", 100);

    let outcome = two_source_tv(&fx)
        .run(&SyncRun::incremental(), &DiscardSink)
        .await
        .unwrap();

    assert!(outcome.changed);
    assert!(outcome.is_clean());
    assert_eq!(outcome.stats.published, 2);
    assert!(fx.exists("media/Foo/S01/Foo.S01E01 - 2160p.mkv"));
    assert!(fx.exists("media/Foo/S01/Foo.S01E01 - 1080p.mkv"));
}

#[tokio::test]
async fn test_changed_is_or_across_sources() {
    let fx = Fixture::new();
    fx.add_link("tv-1080", "Foo/S01/Foo.S01E01 - 1080p.mkv", "hd/foo.mkv", 100);

    let library = two_source_tv(&fx);
    let first = library.run(&SyncRun::incremental(), &DiscardSink).await.unwrap();
    assert!(first.changed);

    let second = library.run(&SyncRun::incremental(), &DiscardSink).await.unwrap();
    assert!(!second.changed);
}

#[tokio::test]
async fn test_wipe_applies_once_and_only_to_target_show() {
    let fx = Fixture::new();
    fx.add_link("tv-4k", "Foo/S01/Foo.S01E01.mkv", "4k/foo.mkv", 100);
    fx.add_link("tv-1080", "Foo/S01/Foo.S01E01.mkv", "hd/foo.mkv", 100);
    std::fs::create_dir_all(fx.path("media/Foo/S01")).unwrap();
    std::fs::write(fx.path("media/Foo/S01/Foo.S01E01 - 720p.mkv"), b"stale").unwrap();
    std::fs::create_dir_all(fx.path("media/Bar/S01")).unwrap();
    std::fs::write(fx.path("media/Bar/S01/Bar.S01E01 - 1080p.mkv"), b"keep").unwrap();

    let run = SyncRun::show("Foo").unwrap().with_wipe(true);
    let sink = CollectingSink::new();
    let outcome = two_source_tv(&fx).run(&run, &sink).await.unwrap();

    assert!(outcome.is_clean());
    assert!(!fx.exists("media/Foo/S01/Foo.S01E01 - 720p.mkv"));
    // The second source must not wipe what the first one just published
    assert!(fx.exists("media/Foo/S01/Foo.S01E01 - 2160p.mkv"));
    assert!(fx.exists("media/Foo/S01/Foo.S01E01 - 1080p.mkv"));
    assert!(fx.exists("media/Bar/S01/Bar.S01E01 - 1080p.mkv"));

    let wipes = sink
        .messages()
        .iter()
        .filter(|m| m.starts_with("Removing destination folder"))
        .count();
    assert_eq!(wipes, 1);
}

#[tokio::test]
async fn test_failing_source_does_not_stop_the_next() {
    let fx = Fixture::new();
    fx.add_link("tv-1080", "Foo/S01/Foo.S01E01 - 1080p.mkv", "hd/foo.mkv", 100);
    let library = two_source_tv(&fx);
    // A directory where the 4K watermark file should be
    std::fs::create_dir_all(&library.sources()[0].watermark_path).unwrap();

    let outcome = library.run(&SyncRun::incremental(), &DiscardSink).await.unwrap();

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].source, "tv-4k");
    assert!(matches!(outcome.failures[0].error, SyncError::WatermarkIo { .. }));
    assert!(outcome.changed);
    assert!(fx.exists("media/Foo/S01/Foo.S01E01 - 1080p.mkv"));
}

#[tokio::test]
async fn test_run_single_source() {
    let fx = Fixture::new();
    fx.add_link("tv-4k", "Foo/S01/Foo.S01E01.mkv", "4k/foo.mkv", 100);
    fx.add_link("tv-1080", "Foo/S01/Foo.S01E01.mkv", "hd/foo.mkv", 100);
    let library = two_source_tv(&fx);

    let outcome = library
        .run_source("tv-1080", &SyncRun::incremental(), &DiscardSink)
        .await
        .unwrap();
    assert_eq!(outcome.stats.published, 1);
    assert!(!fx.exists("media/Foo/S01/Foo.S01E01 - 2160p.mkv"));

    let missing = library
        .run_source("tv-720", &SyncRun::incremental(), &DiscardSink)
        .await;
    assert!(matches!(missing, Err(SyncError::UnknownSource(_))));
}

#[tokio::test]
async fn test_invalid_run_rejected_up_front() {
    let fx = Fixture::new();
    let run = SyncRun::full().with_wipe(true);
    let result = two_source_tv(&fx).run(&run, &DiscardSink).await;
    assert!(matches!(result, Err(SyncError::InvalidFilter(_))));
}
