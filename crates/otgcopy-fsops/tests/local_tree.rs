use std::fs;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use otgcopy_events::topics::COPY_PROGRESS;
use otgcopy_events::{Event, EventBus};
use otgcopy_fsops::{CopyEngine, CopyError, CopyOptions, CopyRequest};
use otgcopy_storage::{DocumentProvider, LocalTreeProvider};
use otgcopy_test_support::events::collect_batch;
use otgcopy_test_support::fixtures::{TempTree, payload};

fn engine_for(tree: &TempTree) -> CopyEngine {
    CopyEngine::new(Arc::new(tree.provider()), EventBus::new())
}

#[tokio::test]
async fn copies_files_byte_for_byte_and_skips_directories() -> Result<()> {
    let tree = TempTree::new()?;
    tree.write_file("usb/fileA.txt", &payload(10))?;
    tree.mkdir("usb/dirB")?;
    tree.write_file("usb/fileC.bin", &payload(20_000))?;
    tree.mkdir("backup")?;

    let engine = engine_for(&tree);
    let mut stream = engine.events().subscribe();
    let request = CopyRequest::new(
        [
            tree.uri("usb/fileA.txt")?,
            tree.uri("usb/dirB")?,
            tree.uri("usb/fileC.bin")?,
        ],
        tree.uri("backup")?,
    );
    let result = engine.copy(request).await?;

    assert_eq!(result.success_count, 2);
    assert_eq!(result.total, 3);
    assert_eq!(fs::read(tree.path().join("backup/fileA.txt"))?, payload(10));
    assert_eq!(fs::read(tree.path().join("backup/fileC.bin"))?, payload(20_000));
    assert!(!tree.path().join("backup/dirB").exists());

    let events = collect_batch(&mut stream).await?;
    let handled: Vec<usize> = events
        .iter()
        .filter_map(Event::progress)
        .map(|progress| progress.handled)
        .collect();
    assert_eq!(handled, [0, 1, 2]);
    Ok(())
}

#[tokio::test]
async fn block_boundaries_round_trip() -> Result<()> {
    let tree = TempTree::new()?;
    tree.mkdir("out")?;
    let sizes = [0, 8 * 1024, 3 * 8 * 1024 + 1];
    let mut sources = Vec::new();
    for size in sizes {
        let name = format!("in/{size}.bin");
        tree.write_file(&name, &payload(size))?;
        sources.push(tree.uri(&name)?);
    }

    let copied = engine_for(&tree)
        .copy_files(sources, &tree.uri("out")?)
        .await?;
    assert_eq!(copied, sizes.len());
    for size in sizes {
        let bytes = fs::read(tree.path().join(format!("out/{size}.bin")))?;
        assert_eq!(bytes, payload(size));
    }
    Ok(())
}

#[tokio::test]
async fn running_twice_yields_two_destination_entries() -> Result<()> {
    let tree = TempTree::new()?;
    tree.write_file("photo.jpg", &payload(64))?;
    tree.mkdir("out")?;
    let engine = CopyEngine::with_options(
        Arc::new(tree.provider()),
        EventBus::new(),
        CopyOptions {
            block_size: 16,
            ..CopyOptions::default()
        },
    );
    let sources = vec![tree.uri("photo.jpg")?];
    let target = tree.uri("out")?;

    engine.copy_files(sources.clone(), &target).await?;
    engine.copy_files(sources, &target).await?;

    let mut names: Vec<String> = tree
        .provider()
        .list_children(&target)?
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    names.sort();
    assert_eq!(names, ["photo (1).jpg", "photo.jpg"]);
    Ok(())
}

#[tokio::test]
async fn destination_outside_the_grant_is_rejected_without_events() -> Result<()> {
    let granted = TempTree::new()?;
    let elsewhere = TempTree::new()?;
    granted.write_file("a.txt", b"a")?;

    let engine = CopyEngine::new(
        Arc::new(LocalTreeProvider::new([granted.path()])),
        EventBus::new(),
    );
    let progress = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&progress);
    let _subscription = engine.events().listen(COPY_PROGRESS, move |envelope| {
        if let Ok(mut seen) = sink.lock() {
            seen.push(envelope.id);
        }
    });

    let err = engine
        .copy_files(vec![granted.uri("a.txt")?], &elsewhere.uri("")?)
        .await
        .expect_err("target outside grant");
    assert!(matches!(err, CopyError::InvalidTarget { .. }));
    tokio::task::yield_now().await;
    assert!(progress.lock().expect("progress lock").is_empty());
    assert_eq!(fs::read_dir(elsewhere.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn sources_outside_the_grant_fail_individually() -> Result<()> {
    let granted = TempTree::new()?;
    let elsewhere = TempTree::new()?;
    granted.mkdir("out")?;
    granted.write_file("inside.txt", b"inside")?;
    elsewhere.write_file("outside.txt", b"outside")?;

    let engine = CopyEngine::new(Arc::new(granted.provider()), EventBus::new());
    let result = engine
        .copy(CopyRequest::new(
            [elsewhere.uri("outside.txt")?, granted.uri("inside.txt")?],
            granted.uri("out")?,
        ))
        .await?;

    assert_eq!(result.success_count, 1);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].index, 0);
    assert_eq!(fs::read(granted.path().join("out/inside.txt"))?, b"inside");
    Ok(())
}
