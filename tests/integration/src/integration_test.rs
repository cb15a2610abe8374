//! End-to-end integration test for the storage stack
//!
//! This test exercises the complete flow: registry connect -> seeding ->
//! baseline sync -> localised review -> mirror publish.

use std::fs;
use std::thread::sleep;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use depot_core::{
    Artefact, Baseline, ConflictPolicy, HashAlgorithm, Manager, MirrorOptions, Registry,
    StoreConfig, SyncEngine, SyncOptions, VirtualPath, mirror,
};

/// Every file under the root, in listing order.
fn file_names(manager: &Manager) -> Vec<String> {
    manager
        .list("/", true)
        .unwrap()
        .into_iter()
        .filter_map(|artefact| match artefact {
            Artefact::File(file) => Some(file.path().unwrap().as_str().to_string()),
            Artefact::Directory(_) => None,
        })
        .collect()
}

/// Seed a small project tree.
fn seed_site(manager: &Manager) {
    manager
        .put(b"ref board", "/project/ref/board.png", false)
        .unwrap();
    manager
        .put(b"plate v1", "/project/shots/s010/plate.exr", false)
        .unwrap();
    manager
        .put(b"first pass", "/project/shots/s010/notes.txt", false)
        .unwrap();
}

#[test]
fn full_pipeline_across_disk_and_memory() {
    let temp = TempDir::new().unwrap();
    let registry = Registry::new();

    // 1. Connect both sites through one registry
    let site_a = registry
        .connect(&StoreConfig::filesystem(temp.path().join("site-a")))
        .unwrap();
    let site_b = registry.resolve("memory://site-b").unwrap();

    // 2. Seed site A and push everything to the empty site B
    seed_site(&site_a);
    let baseline_path = temp.path().join("baseline.toml");
    let mut engine = SyncEngine::new(
        site_a.clone(),
        site_b.clone(),
        Baseline::empty(),
        ConflictPolicy::Stop,
    );
    let report = engine.sync(&SyncOptions::default()).unwrap();
    assert_eq!(report.uploaded.len(), 3);
    engine.baseline().save(&baseline_path).unwrap();
    assert_eq!(file_names(&site_b), file_names(&site_a));

    // 3. Review happens on site B through a localised scope
    sleep(Duration::from_millis(15));
    site_b
        .with_localised("/project/shots/s010/notes.txt", |local| {
            fs::write(local, b"second pass approved")?;
            Ok(())
        })
        .unwrap();
    site_b
        .put(b"render v1", "/project/shots/s010/render.exr", false)
        .unwrap();

    // 4. The next run picks the baseline back up and pulls the review home
    let baseline = Baseline::load_or_default(&baseline_path).unwrap();
    let mut engine = SyncEngine::new(
        site_a.clone(),
        site_b.clone(),
        baseline,
        ConflictPolicy::Stop,
    );
    let report = engine.sync(&SyncOptions::default()).unwrap();
    assert_eq!(
        report.downloaded,
        vec![
            VirtualPath::new("/project/shots/s010/notes.txt"),
            VirtualPath::new("/project/shots/s010/render.exr"),
        ]
    );
    assert_eq!(
        site_a
            .get_bytes("/project/shots/s010/notes.txt")
            .unwrap(),
        b"second pass approved"
    );
    engine.baseline().save(&baseline_path).unwrap();

    // 5. Publish a read-only copy of site B
    let publish = registry.resolve("memory://publish").unwrap();
    let options = MirrorOptions {
        delete: true,
        dry_run: false,
    };
    let report = mirror(&site_b, &publish, &options).unwrap();
    assert_eq!(report.copied.len(), 4);
    assert_eq!(file_names(&publish), file_names(&site_b));

    // 6. A repeated publish with nothing new moves nothing
    let report = mirror(&site_b, &publish, &options).unwrap();
    assert!(report.copied.is_empty());
    assert_eq!(report.skipped, 4);
}

#[test]
fn a_registry_hands_out_one_manager_per_store() {
    let registry = Registry::new();
    let first = registry.resolve("memory://shared").unwrap();
    let again = registry.connect(&StoreConfig::memory("shared")).unwrap();
    assert_eq!(registry.len(), 1);

    first.put(b"seen by both", "/note.txt", false).unwrap();
    assert_eq!(again.get_bytes("/note.txt").unwrap(), b"seen by both");

    registry.resolve("memory://other").unwrap();
    assert_eq!(registry.len(), 2);
}

#[test]
fn staged_transfers_preserve_content_digests() {
    let temp = TempDir::new().unwrap();
    let registry = Registry::new();
    let disk = registry
        .connect(&StoreConfig::filesystem(temp.path().join("disk")))
        .unwrap();
    let cache = registry.resolve("memory://cache").unwrap();

    disk.put(b"frame data", "/renders/f0001.exr", false).unwrap();
    disk.put(b"frame data 2", "/renders/f0002.exr", false)
        .unwrap();

    let renders = disk.directory("/renders").unwrap();
    cache.put(&renders, "/renders", false).unwrap();

    assert_eq!(
        file_names(&cache),
        vec!["/renders/f0001.exr", "/renders/f0002.exr"]
    );
    assert_eq!(
        disk.digest("/renders/f0001.exr", HashAlgorithm::Md5).unwrap(),
        cache
            .digest("/renders/f0001.exr", HashAlgorithm::Md5)
            .unwrap(),
    );
}
