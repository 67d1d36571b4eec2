use docvault::backup::BackupOptions;
use docvault::errors::ErrorKind;
use docvault::restore::RestoreOptions;
use docvault::store::StoreOpener;
use docvault::vault::Docvault;
use docvault_fjall_adapter::FjallStoreOpener;
use docvault_int_test::test_util::{assert_same_documents, cleanup, seeded_remote, TestContext};
use docvault::remote::InMemoryRemote;
use std::sync::Arc;

#[ctor::ctor]
fn init() {
    colog::init();
}

fn vault_for(ctx: &TestContext, source: Arc<InMemoryRemote>, sink: Arc<InMemoryRemote>) -> Docvault {
    Docvault::builder()
        .source(source)
        .sink(sink)
        .opener(Arc::new(FjallStoreOpener::new()))
        .base_dir(ctx.root())
        .build()
        .unwrap()
}

#[test]
fn backup_then_restore_reproduces_remote_through_persistent_store() {
    let ctx = TestContext::new();
    let source = Arc::new(seeded_remote());
    let target = Arc::new(InMemoryRemote::new());
    let vault = vault_for(&ctx, source.clone(), target.clone());

    let report = vault
        .create_backup(Some("snap"), BackupOptions::new())
        .unwrap();
    assert_eq!(report.summary.document_count, 5);
    assert_eq!(
        report.summary.collection_names,
        vec!["audit", "orders", "users"]
    );

    let summary = vault.restore_backup("snap", RestoreOptions::new()).unwrap();
    assert_eq!(summary.document_count, 5);
    assert_same_documents(&source, &target, &["users", "orders", "audit"]);

    cleanup(ctx);
}

#[test]
fn restore_reads_snapshot_written_by_a_previous_vault() {
    // the store outlives the vault that wrote it
    let ctx = TestContext::new();
    let source = Arc::new(seeded_remote());
    {
        let vault = vault_for(&ctx, source.clone(), Arc::new(InMemoryRemote::new()));
        vault
            .create_backup(Some("snap"), BackupOptions::new())
            .unwrap();
    }

    let target = Arc::new(InMemoryRemote::new());
    let vault = vault_for(&ctx, Arc::new(InMemoryRemote::new()), target.clone());
    let summary = vault.restore_backup("snap", RestoreOptions::new()).unwrap();

    assert_eq!(summary.document_count, 5);
    assert_same_documents(&source, &target, &["users", "orders"]);

    cleanup(ctx);
}

#[test]
fn batch_size_does_not_change_restored_contents() {
    let ctx = TestContext::new();
    let source = Arc::new(seeded_remote());

    let small_target = Arc::new(InMemoryRemote::new());
    let vault = vault_for(&ctx, source.clone(), small_target.clone());
    vault
        .create_backup(Some("small"), BackupOptions::new().with_batch_size(2))
        .unwrap();
    vault
        .restore_backup("small", RestoreOptions::new().with_batch_size(2))
        .unwrap();

    let large_target = Arc::new(InMemoryRemote::new());
    let vault = vault_for(&ctx, source.clone(), large_target.clone());
    vault
        .create_backup(Some("large"), BackupOptions::new().with_batch_size(100))
        .unwrap();
    vault
        .restore_backup("large", RestoreOptions::new().with_batch_size(100))
        .unwrap();

    assert_same_documents(&small_target, &large_target, &["users", "orders"]);
    assert_same_documents(&source, &small_target, &["users", "orders"]);

    cleanup(ctx);
}

#[test]
fn restore_refuses_store_without_metadata() {
    let ctx = TestContext::new();

    // simulate an interrupted backup: records exist but no metadata
    let opener = FjallStoreOpener::new();
    let store = opener.open(&ctx.store_path("partial")).unwrap();
    store
        .put(
            "u1",
            docvault::StoreValue::Document(docvault::Document::new(
                "u1",
                "users",
                docvault_int_test::test_util::payload(1),
            )),
        )
        .unwrap();
    store.close().unwrap();

    let target = Arc::new(InMemoryRemote::new());
    let vault = vault_for(&ctx, Arc::new(InMemoryRemote::new()), target.clone());
    let err = vault
        .restore_backup("partial", RestoreOptions::new())
        .unwrap_err();

    assert_eq!(err.kind(), &ErrorKind::NotFound);
    assert!(target.documents_in("users").is_empty());

    cleanup(ctx);
}

#[test]
fn second_backup_to_same_name_replaces_previous_snapshot() {
    let ctx = TestContext::new();
    let source = Arc::new(seeded_remote());
    let vault = vault_for(&ctx, source, Arc::new(InMemoryRemote::new()));
    vault
        .create_backup(Some("snap"), BackupOptions::new())
        .unwrap();

    // shrink the remote, back up again under the same name
    let smaller = Arc::new(InMemoryRemote::new());
    smaller.insert("users", "u9", docvault_int_test::test_util::payload(9));
    let target = Arc::new(InMemoryRemote::new());
    let vault = vault_for(&ctx, smaller.clone(), target.clone());
    vault
        .create_backup(Some("snap"), BackupOptions::new())
        .unwrap();
    vault.restore_backup("snap", RestoreOptions::new()).unwrap();

    assert_same_documents(&smaller, &target, &["users"]);
    assert!(target.documents_in("orders").is_empty());

    cleanup(ctx);
}

#[test]
fn backup_with_include_and_exclude_filters() {
    let ctx = TestContext::new();
    let source = Arc::new(seeded_remote());
    let target = Arc::new(InMemoryRemote::new());
    let vault = vault_for(&ctx, source.clone(), target.clone());

    let report = vault
        .create_backup(
            Some("filtered"),
            BackupOptions::new().with_excluded(vec!["users".to_string()]),
        )
        .unwrap();
    assert_eq!(report.summary.collection_names, vec!["audit", "orders"]);

    vault
        .restore_backup("filtered", RestoreOptions::new())
        .unwrap();
    assert!(target.documents_in("users").is_empty());
    assert_same_documents(&source, &target, &["orders"]);

    cleanup(ctx);
}
