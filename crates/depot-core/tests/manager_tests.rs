//! Tests for manager operations and artefact handles

use pretty_assertions::assert_eq;
use std::fs;

use depot_core::{Artefact, Error, HashAlgorithm, Manager, MemoryDriver};
use depot_test_utils::{TestStore, memory_store};

fn names(artefacts: &[Artefact]) -> Vec<String> {
    artefacts
        .iter()
        .map(|a| a.path().unwrap().as_str().to_string())
        .collect()
}

#[test]
fn identify_missing_is_none_not_an_error() {
    let manager = memory_store("m");
    assert!(manager.identify("/absent.txt").unwrap().is_none());
    assert!(!manager.exists("/absent.txt").unwrap());
}

#[test]
fn handles_to_one_path_observe_the_same_artefact() {
    let manager = memory_store("m");
    manager.put(b"v1", "/a.txt", false).unwrap();

    let first = manager.file("/a.txt").unwrap();
    let second = manager.file("/a.txt").unwrap();
    manager.put(b"version two", "/a.txt", false).unwrap();

    assert_eq!(first.read().unwrap(), b"version two");
    assert_eq!(second.read().unwrap(), b"version two");
    assert_eq!(first.size().unwrap(), 11);
}

#[test]
fn handles_compare_by_identity_not_by_view() {
    let manager = memory_store("m");
    manager.put(b"x", "/proj/asset.txt", false).unwrap();
    let sub = manager.submanager("/proj").unwrap();

    let through_root = manager.file("/proj/asset.txt").unwrap();
    let through_sub = sub.file("/asset.txt").unwrap();
    assert_eq!(through_root, through_sub);
    assert_ne!(through_root.path().unwrap(), through_sub.path().unwrap());

    // a fresh artefact at the same path is a different identity
    manager.remove("/proj/asset.txt", false).unwrap();
    manager.put(b"x", "/proj/asset.txt", false).unwrap();
    assert_ne!(through_root, manager.file("/proj/asset.txt").unwrap());
}

#[test]
fn directory_emptiness_reflects_the_live_listing() {
    let manager = memory_store("m");
    let dir = manager.mkdir("/inbox").unwrap();
    assert!(dir.is_empty().unwrap());

    manager.put(b"x", "/inbox/delivery.txt", false).unwrap();
    assert!(!dir.is_empty().unwrap());
}

#[test]
fn bytes_round_trip_through_a_filesystem_store() {
    let store = TestStore::new();
    let manager = store.manager();

    manager.put(b"payload", "/docs/readme.md", false).unwrap();
    assert_eq!(manager.get_bytes("/docs/readme.md").unwrap(), b"payload");
    store.assert_content("/docs/readme.md", b"payload");
}

#[test]
fn native_trees_round_trip() {
    let staging = tempfile::tempdir().unwrap();
    let tree = staging.path().join("bundle");
    fs::create_dir_all(tree.join("nested")).unwrap();
    fs::write(tree.join("top.txt"), b"top").unwrap();
    fs::write(tree.join("nested/deep.txt"), b"deep").unwrap();

    let manager = memory_store("m");
    manager.put(&tree, "/bundle", false).unwrap();

    let out = staging.path().join("out");
    manager.get("/bundle", &out, false).unwrap();
    assert_eq!(fs::read(out.join("top.txt")).unwrap(), b"top");
    assert_eq!(fs::read(out.join("nested/deep.txt")).unwrap(), b"deep");
}

#[test]
fn removed_artefacts_turn_handles_stale() {
    let manager = memory_store("m");
    manager.put(b"x", "/a.txt", false).unwrap();
    let file = manager.file("/a.txt").unwrap();

    manager.remove("/a.txt", false).unwrap();

    assert!(!file.exists());
    assert!(matches!(file.read(), Err(Error::NoLongerExists { .. })));
    assert!(matches!(file.path(), Err(Error::NoLongerExists { .. })));
}

#[test]
fn identify_evicts_vanished_artefacts() {
    let store = TestStore::new();
    let manager = store.manager();
    manager.put(b"x", "/a.txt", false).unwrap();
    let file = manager.file("/a.txt").unwrap();

    // a second actor deletes the file behind the manager's back
    store.remove_native("/a.txt");
    assert!(manager.identify("/a.txt").unwrap().is_none());

    assert!(matches!(file.stat(), Err(Error::NoLongerExists { .. })));
}

#[test]
fn rename_carries_handles_along() {
    let manager = memory_store("m");
    manager.put(b"x", "/old.txt", false).unwrap();
    let file = manager.file("/old.txt").unwrap();

    let placeholder = manager.rename("/old.txt", "/new.txt", false).unwrap();

    assert_eq!(file.path().unwrap().as_str(), "/new.txt");
    assert_eq!(file.read().unwrap(), b"x");
    assert_eq!(placeholder.file().unwrap().read().unwrap(), b"x");
    assert!(!manager.exists("/old.txt").unwrap());
}

#[test]
fn rename_onto_a_file_replaces_it_and_retires_its_handle() {
    let manager = memory_store("m");
    manager.put(b"winner", "/src.txt", false).unwrap();
    manager.put(b"loser", "/dest.txt", false).unwrap();
    let moved = manager.file("/src.txt").unwrap();
    let displaced = manager.file("/dest.txt").unwrap();

    manager.rename("/src.txt", "/dest.txt", false).unwrap();

    assert_eq!(moved.path().unwrap().as_str(), "/dest.txt");
    assert_eq!(moved.read().unwrap(), b"winner");
    assert!(matches!(displaced.read(), Err(Error::NoLongerExists { .. })));
    assert!(!manager.exists("/src.txt").unwrap());
}

#[test]
fn renaming_a_directory_carries_descendant_handles() {
    let manager = memory_store("m");
    manager.put(b"x", "/sub/inner/file.txt", false).unwrap();
    let file = manager.file("/sub/inner/file.txt").unwrap();
    let dir = manager.directory("/sub").unwrap();

    manager.rename("/sub", "/moved", false).unwrap();

    assert_eq!(dir.path().unwrap().as_str(), "/moved");
    assert_eq!(file.path().unwrap().as_str(), "/moved/inner/file.txt");
    assert_eq!(file.read().unwrap(), b"x");
}

#[test]
fn get_refuses_to_clobber_a_directory_without_overwrite() {
    let manager = memory_store("m");
    manager.put(b"x", "/a.txt", false).unwrap();

    let staging = tempfile::tempdir().unwrap();
    let dest = staging.path().join("occupied");
    fs::create_dir_all(dest.join("junk")).unwrap();

    assert!(matches!(
        manager.get("/a.txt", &dest, false),
        Err(Error::OperationNotPermitted { .. })
    ));

    manager.get("/a.txt", &dest, true).unwrap();
    assert_eq!(fs::read(&dest).unwrap(), b"x");
}

#[test]
fn put_over_a_directory_needs_overwrite_and_evicts_descendants() {
    let manager = memory_store("m");
    manager.put(b"x", "/dir/child.txt", false).unwrap();
    let child = manager.file("/dir/child.txt").unwrap();

    assert!(matches!(
        manager.put(b"flat", "/dir", false),
        Err(Error::OperationNotPermitted { .. })
    ));

    manager.put(b"flat", "/dir", true).unwrap();
    assert_eq!(manager.get_bytes("/dir").unwrap(), b"flat");
    assert!(matches!(child.read(), Err(Error::NoLongerExists { .. })));
}

#[test]
fn remove_refuses_a_populated_directory_without_recursive() {
    let manager = memory_store("m");
    manager.put(b"x", "/dir/child.txt", false).unwrap();
    let child = manager.file("/dir/child.txt").unwrap();

    assert!(matches!(
        manager.remove("/dir", false),
        Err(Error::OperationNotPermitted { .. })
    ));

    manager.remove("/dir", true).unwrap();
    assert!(!manager.exists("/dir").unwrap());
    assert!(!child.exists());
}

#[test]
fn empty_directories_remove_without_recursive() {
    let manager = memory_store("m");
    manager.mkdir("/empty").unwrap();
    manager.remove("/empty", false).unwrap();
    assert!(!manager.exists("/empty").unwrap());
}

#[test]
fn listings_are_cached_until_refresh() {
    let store = TestStore::new();
    let manager = store.manager();
    manager.put(b"x", "/seen.txt", false).unwrap();

    assert_eq!(names(&manager.list("/", false).unwrap()), ["/seen.txt"]);

    // a second actor adds a file; the cached listing does not notice
    store.write_native("/unseen.txt", b"y");
    assert_eq!(names(&manager.list("/", false).unwrap()), ["/seen.txt"]);

    manager.refresh("/").unwrap();
    assert_eq!(
        names(&manager.list("/", false).unwrap()),
        ["/seen.txt", "/unseen.txt"]
    );
}

#[test]
fn refresh_drops_records_of_vanished_children() {
    let store = TestStore::new();
    let manager = store.manager();
    manager.put(b"x", "/doomed.txt", false).unwrap();
    manager.list("/", false).unwrap();

    store.remove_native("/doomed.txt");
    manager.refresh("/").unwrap();

    assert!(names(&manager.list("/", false).unwrap()).is_empty());
}

#[test]
fn recursive_listing_walks_the_tree_in_order() {
    let manager = memory_store("m");
    manager.put(b"1", "/a/one.txt", false).unwrap();
    manager.put(b"2", "/a/b/two.txt", false).unwrap();
    manager.put(b"3", "/zz.txt", false).unwrap();

    let all = names(&manager.list("/", true).unwrap());
    assert_eq!(all, ["/a", "/a/b", "/a/b/two.txt", "/a/one.txt", "/zz.txt"]);

    let shallow = names(&manager.list("/", false).unwrap());
    assert_eq!(shallow, ["/a", "/zz.txt"]);
}

#[test]
fn directory_handles_list_their_subtree() {
    let manager = memory_store("m");
    manager.put(b"1", "/a/one.txt", false).unwrap();
    manager.put(b"2", "/a/b/two.txt", false).unwrap();

    let dir = manager.directory("/a").unwrap();
    assert_eq!(
        names(&dir.list(true).unwrap()),
        ["/a/b", "/a/b/two.txt", "/a/one.txt"]
    );
    assert!(dir.collected().unwrap());
}

#[test]
fn copy_duplicates_without_coupling() {
    let manager = memory_store("m");
    manager.put(b"original", "/src.txt", false).unwrap();

    let copy = manager.copy("/src.txt", "/dup.txt", false).unwrap();
    assert_eq!(copy.file().unwrap().read().unwrap(), b"original");

    manager.put(b"edited", "/src.txt", false).unwrap();
    assert_eq!(manager.get_bytes("/dup.txt").unwrap(), b"original");
}

#[test]
fn cross_store_put_stages_through_the_source_manager() {
    let store = TestStore::new();
    let local = store.manager();
    local.put(b"travels", "/out/file.txt", false).unwrap();

    let remote = memory_store("remote");
    let artefact = local.artefact("/out").unwrap();
    remote.put(&artefact, "/in", false).unwrap();

    assert_eq!(remote.get_bytes("/in/file.txt").unwrap(), b"travels");
}

#[test]
fn cross_store_copy_degrades_to_put() {
    let a = memory_store("a");
    let b = memory_store("b");
    a.put(b"x", "/f.txt", false).unwrap();
    let file = a.file("/f.txt").unwrap();

    b.copy(&file, "/copied.txt", false).unwrap();

    assert_eq!(b.get_bytes("/copied.txt").unwrap(), b"x");
    assert!(a.exists("/f.txt").unwrap());
}

#[test]
fn cross_store_rename_degrades_to_put_then_remove() {
    let a = memory_store("a");
    let b = memory_store("b");
    a.put(b"x", "/f.txt", false).unwrap();
    let file = a.file("/f.txt").unwrap();

    b.rename(&file, "/taken.txt", false).unwrap();

    assert_eq!(b.get_bytes("/taken.txt").unwrap(), b"x");
    assert!(!a.exists("/f.txt").unwrap());
}

#[test]
fn digests_are_cached_per_algorithm_until_eviction() {
    let store = TestStore::new();
    let manager = store.manager();
    manager.put(b"hello world", "/a.txt", false).unwrap();

    let first = manager.digest("/a.txt", HashAlgorithm::Md5).unwrap();
    assert_eq!(first, "5eb63bbbe01eeed093cb22bb8f5acdc3");

    // the cached digest survives an out-of-band edit
    store.write_native("/a.txt", b"changed");
    assert_eq!(manager.digest("/a.txt", HashAlgorithm::Md5).unwrap(), first);

    // removal evicts; re-identifying computes fresh
    manager.remove("/a.txt", false).unwrap();
    manager.put(b"changed", "/a.txt", false).unwrap();
    assert_ne!(manager.digest("/a.txt", HashAlgorithm::Md5).unwrap(), first);
}

#[test]
fn sha256_and_md5_digests_are_tracked_independently() {
    let manager = memory_store("m");
    manager.put(b"hello world", "/a.txt", false).unwrap();
    let file = manager.file("/a.txt").unwrap();

    assert_eq!(
        file.digest(HashAlgorithm::Md5).unwrap(),
        "5eb63bbbe01eeed093cb22bb8f5acdc3"
    );
    assert_eq!(
        file.digest(HashAlgorithm::Sha256).unwrap(),
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    );
}

#[test]
fn touch_and_mkdir_create_on_demand() {
    let manager = memory_store("m");

    let file = manager.touch("/notes/todo.txt").unwrap();
    assert_eq!(file.size().unwrap(), 0);

    // touching again is a no-op returning the existing file
    manager.put(b"content", "/notes/todo.txt", false).unwrap();
    let again = manager.touch("/notes/todo.txt").unwrap();
    assert_eq!(again.read().unwrap(), b"content");

    let dir = manager.mkdir("/deep/nested/tree").unwrap();
    assert_eq!(dir.path().unwrap().as_str(), "/deep/nested/tree");
    assert!(manager.exists("/deep/nested").unwrap());
}

#[test]
fn mkdir_on_a_file_is_a_type_mismatch() {
    let manager = memory_store("m");
    manager.put(b"x", "/a.txt", false).unwrap();
    assert!(matches!(
        manager.mkdir("/a.txt"),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        manager.touch("/a.txt/impossible"),
        Err(Error::Transport { .. }) | Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn get_bytes_on_a_directory_is_a_type_mismatch() {
    let manager = memory_store("m");
    manager.mkdir("/dir").unwrap();
    assert!(matches!(
        manager.get_bytes("/dir"),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn placeholders_resolve_lazily_and_fail_when_superseded() {
    let manager = memory_store("m");
    let placeholder = manager.put(b"x", "/a.txt", false).unwrap();
    assert_eq!(placeholder.path().as_str(), "/a.txt");

    let file = placeholder.file().unwrap();
    assert_eq!(file.read().unwrap(), b"x");

    let doomed = manager.put(b"y", "/b.txt", false).unwrap();
    manager.remove("/b.txt", false).unwrap();
    assert!(matches!(
        doomed.resolve(),
        Err(Error::NoLongerExists { .. })
    ));
}

#[test]
fn native_path_is_backend_dependent() {
    let store = TestStore::new();
    let native = store.manager().native_path("/a.txt").unwrap();
    assert_eq!(native, Some(store.native("/a.txt")));

    let memory = memory_store("m");
    assert_eq!(memory.native_path("/a.txt").unwrap(), None);
}

#[test]
fn submanager_shares_state_with_the_parent() {
    let manager = memory_store("m");
    manager.put(b"x", "/proj/asset.txt", false).unwrap();
    let sub = manager.submanager("/proj").unwrap();

    sub.put(b"y", "/fresh.txt", false).unwrap();
    assert_eq!(manager.get_bytes("/proj/fresh.txt").unwrap(), b"y");

    // a handle from the sub view is valid through the parent
    let file = sub.file("/asset.txt").unwrap();
    assert_eq!(manager.get_bytes(&file).unwrap(), b"x");
}

#[test]
fn submanager_requires_an_existing_directory() {
    let manager = memory_store("m");
    manager.put(b"x", "/a.txt", false).unwrap();

    assert!(matches!(
        manager.submanager("/absent"),
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        manager.submanager("/a.txt"),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn foreign_artefacts_are_accepted_only_by_transfer_operations() {
    let a = memory_store("a");
    let b = Manager::new(Box::new(MemoryDriver::new("b")));
    a.put(b"x", "/f.txt", false).unwrap();
    let file = a.file("/f.txt").unwrap();

    // transfers degrade gracefully
    b.put(&file, "/ok.txt", false).unwrap();
    assert_eq!(b.get_bytes("/ok.txt").unwrap(), b"x");

    // addressing operations refuse the foreign handle
    assert!(matches!(b.remove(&file, false), Err(Error::NotAMember { .. })));
    assert!(matches!(b.exists(&file), Err(Error::NotAMember { .. })));
}
