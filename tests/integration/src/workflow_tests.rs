//! Scenario tests for production workflows
//!
//! Each test walks one operator workflow end to end against real stores:
//! vendor deliveries staged into a project, shot work inside localised
//! scopes, reorganisation under live handles, and disagreeing sites.

use std::fs;
use std::thread::sleep;
use std::time::Duration;

use pretty_assertions::assert_eq;

use depot_core::{
    Artefact, Baseline, ConflictPolicy, Error, HashAlgorithm, Manager, SyncEngine, SyncOptions,
};
use depot_test_utils::{TestStore, memory_store};

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

#[test]
fn vendor_delivery_is_staged_and_versioned() {
    let vendor = memory_store("vendor");
    vendor
        .put(b"rock albedo", "/delivery_0423/textures/rock_albedo.png", false)
        .unwrap();
    vendor
        .put(b"rock normal", "/delivery_0423/textures/rock_normal.png", false)
        .unwrap();
    vendor.put(b"notes", "/delivery_0423/README.txt", false).unwrap();

    // The whole delivery lands in the project store in one transfer
    let project = TestStore::new();
    let manager = project.manager();
    let delivery = vendor.directory("/delivery_0423").unwrap();
    manager.put(&delivery, "/vendor/incoming", false).unwrap();
    project.assert_content("/vendor/incoming/textures/rock_albedo.png", b"rock albedo");

    assert_eq!(
        vendor
            .digest("/delivery_0423/textures/rock_albedo.png", HashAlgorithm::Sha256)
            .unwrap(),
        manager
            .digest("/vendor/incoming/textures/rock_albedo.png", HashAlgorithm::Sha256)
            .unwrap(),
    );

    // Accepted deliveries move to a versioned home; live handles follow
    let albedo = manager
        .file("/vendor/incoming/textures/rock_albedo.png")
        .unwrap();
    manager
        .rename("/vendor/incoming", "/vendor/maps_v001", false)
        .unwrap();
    assert_eq!(
        albedo.path().unwrap().as_str(),
        "/vendor/maps_v001/textures/rock_albedo.png"
    );
    assert_eq!(albedo.read().unwrap(), b"rock albedo");
    assert!(!manager.exists("/vendor/incoming").unwrap());
}

#[test]
fn shot_work_round_trips_through_a_localised_scope() {
    let project = memory_store("project");
    project
        .put(b"plate frames", "/shots/s010/plate.exr", false)
        .unwrap();
    project
        .put(b"notes v1", "/shots/s010/notes.txt", false)
        .unwrap();

    project
        .with_localised("/shots/s010", |dir| {
            assert_eq!(fs::read(dir.join("plate.exr"))?, b"plate frames");
            fs::write(dir.join("comp_v001.exr"), b"comped frames")?;
            fs::write(dir.join("notes.txt"), b"notes v2")?;
            Ok(())
        })
        .unwrap();

    assert_eq!(
        project.get_bytes("/shots/s010/comp_v001.exr").unwrap(),
        b"comped frames"
    );
    assert_eq!(
        project.get_bytes("/shots/s010/notes.txt").unwrap(),
        b"notes v2"
    );
    assert_eq!(
        project.get_bytes("/shots/s010/plate.exr").unwrap(),
        b"plate frames"
    );
}

#[test]
fn submanager_views_scope_team_access() {
    let store = TestStore::new();
    let project = store.manager();
    project.put(b"fx setup", "/shots/s010/fx.hip", false).unwrap();
    project.put(b"anim scene", "/shots/s020/anim.ma", false).unwrap();

    let fx_team = project.submanager("/shots/s010").unwrap();
    let anim_team = project.submanager("/shots/s020").unwrap();
    assert_eq!(file_names(&fx_team), vec!["/fx.hip"]);

    // A handle from the other team's view is not addressable here
    let foreign = anim_team.file("/anim.ma").unwrap();
    assert!(matches!(
        fx_team.remove(&foreign, false),
        Err(Error::NotAMember { .. })
    ));

    // Its content can still be brought across explicitly
    fx_team.put(&foreign, "/reference/anim.ma", false).unwrap();
    store.assert_content("/shots/s010/reference/anim.ma", b"anim scene");
}

#[test]
fn sites_disagree_and_the_operator_decides() {
    let site_a = memory_store("site-a");
    let site_b = memory_store("site-b");
    site_a.put(b"comp v1", "/shot/comp.nk", false).unwrap();

    let mut engine = SyncEngine::new(
        site_a.clone(),
        site_b.clone(),
        Baseline::empty(),
        ConflictPolicy::Stop,
    );
    engine.sync(&SyncOptions::default()).unwrap();
    sleep(Duration::from_millis(15));

    site_a.put(b"local tweak", "/shot/comp.nk", false).unwrap();
    site_b.put(b"remote tweak", "/shot/comp.nk", false).unwrap();

    let error = engine.sync(&SyncOptions::default()).unwrap_err();
    assert!(matches!(error, Error::SyncAborted { .. }));

    // The operator rules in favour of the remote site and retries with the
    // same baseline
    let mut retry = SyncEngine::new(
        site_a.clone(),
        site_b.clone(),
        engine.baseline().clone(),
        ConflictPolicy::TrustRemote,
    );
    let report = retry.sync(&SyncOptions::default()).unwrap();
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(site_a.get_bytes("/shot/comp.nk").unwrap(), b"remote tweak");

    let settled = retry.sync(&SyncOptions::default()).unwrap();
    assert!(settled.is_noop());
}
