//! End-to-end behaviour of the weaver: writes never block the caller, and
//! every rejected write reaches every listener exactly once.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use proptest::prelude::*;

use codeweaver::store::{DenyAll, DocumentStore, MemoryStore, OwnerRules, SqliteStore};
use codeweaver::{
    ErrorBus, FieldValue, ImageUpload, Payload, PermissionError, SetOptions, Weaver,
    WeaverConfig, WriteOperationKind,
};
use codeweaver_testkit::generators::WriteParams;
use codeweaver_testkit::{init_tracing, GatedStore, RecordingListener, TestFixture};

fn quiet() -> WeaverConfig {
    WeaverConfig {
        log_permission_errors: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn rejected_create_reaches_listener() -> Result<()> {
    init_tracing();
    let weaver = Weaver::new(MemoryStore::with_rules(DenyAll), WeaverConfig::default())?;
    let mut listener = RecordingListener::attach(weaver.bus());
    let images = weaver.images().collection().clone();

    let data = Payload::new()
        .with("fileName", "a.png")
        .with("url", "data:image/png;base64,AAAA");
    let _ = weaver.initiate_create(&images, data.clone());

    let err = listener.recv().await.expect("permission error published");
    assert_eq!(err.resource_path(), "images");
    assert_eq!(err.operation(), WriteOperationKind::Create);
    assert_eq!(err.attempted_payload(), Some(&data));
    assert!(err.message().contains("images"));
    Ok(())
}

#[tokio::test]
async fn successful_delete_publishes_nothing() -> Result<()> {
    let fixture = TestFixture::new();
    let doc = fixture.image_doc("doc1");
    fixture
        .store
        .set(&doc, &Payload::new().with("fileName", "a.png"), SetOptions::Overwrite)
        .await?;

    let weaver = Weaver::with_bus(Arc::clone(&fixture.store), fixture.bus.clone(), quiet())?;
    let mut listener = RecordingListener::attach(&fixture.bus);

    assert_eq!(weaver.initiate_delete(&doc).await, Some(()));
    weaver.flush().await;

    assert!(listener.drain().is_empty());
    assert!(fixture.store.get(&doc).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn every_subscriber_gets_the_same_error_until_unsubscribed() -> Result<()> {
    let weaver = Weaver::new(MemoryStore::with_rules(DenyAll), quiet())?;
    let bus = weaver.bus().clone();
    let doc = weaver.images().collection().doc("doc1")?;

    let first_seen: Arc<Mutex<Vec<Arc<PermissionError>>>> = Arc::default();
    let second_seen: Arc<Mutex<Vec<Arc<PermissionError>>>> = Arc::default();
    let first = {
        let seen = Arc::clone(&first_seen);
        bus.on_permission_error(move |err| seen.lock().unwrap().push(Arc::clone(err)))
    };
    {
        let seen = Arc::clone(&second_seen);
        bus.on_permission_error(move |err| seen.lock().unwrap().push(Arc::clone(err)));
    }

    weaver
        .initiate_update(&doc, Payload::new().with("caption", "x"))
        .await;
    {
        let first_seen = first_seen.lock().unwrap();
        let second_seen = second_seen.lock().unwrap();
        assert_eq!(first_seen.len(), 1);
        assert_eq!(second_seen.len(), 1);
        assert!(Arc::ptr_eq(&first_seen[0], &second_seen[0]));
    }

    assert!(bus.unsubscribe(first));
    weaver
        .initiate_update(&doc, Payload::new().with("caption", "y"))
        .await;

    assert_eq!(first_seen.lock().unwrap().len(), 1);
    assert_eq!(second_seen.lock().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn caller_continues_while_store_is_stuck() -> Result<()> {
    let store = Arc::new(GatedStore::new(MemoryStore::with_rules(DenyAll)));
    store.close();
    let bus = ErrorBus::new();
    let mut listener = RecordingListener::attach(&bus);
    let weaver = Weaver::with_bus(Arc::clone(&store), bus, quiet())?;
    let doc = weaver.images().collection().doc("doc1")?;

    let mut pending = weaver.initiate_set(&doc, Payload::new().with("a", 1), SetOptions::Merge);
    // The caller is back with the store still holding the write.
    assert_eq!(pending.try_outcome(), None);
    assert!(listener
        .recv_timeout(Duration::from_millis(30))
        .await
        .is_none());

    store.open();
    let err = listener.recv().await.expect("published after release");
    assert_eq!(err.operation(), WriteOperationKind::Update);
    assert_eq!(pending.await, None);
    Ok(())
}

#[tokio::test]
async fn panicking_listener_does_not_starve_others() -> Result<()> {
    let weaver = Weaver::new(MemoryStore::with_rules(DenyAll), quiet())?;
    weaver.bus().on_permission_error(|_| panic!("listener bug"));
    let mut listener = RecordingListener::attach(weaver.bus());

    let doc = weaver.images().collection().doc("doc1")?;
    weaver.initiate_delete(&doc);
    weaver.initiate_delete(&doc);

    assert!(listener.recv().await.is_some());
    assert!(listener.recv().await.is_some());
    Ok(())
}

#[tokio::test]
async fn image_upload_round_trip_with_owner_rules() -> Result<()> {
    let fixture = TestFixture::owner_rules();
    let weaver = Weaver::with_bus(Arc::clone(&fixture.store), fixture.bus.clone(), quiet())?;
    let mut listener = RecordingListener::attach(&fixture.bus);

    // Signed out: refused up front.
    let refused = weaver
        .images()
        .add_image_metadata(None, ImageUpload::new("a.png", "https://cdn/a.png"));
    assert_eq!(refused.await, None);
    let err = listener.recv().await.expect("refusal published");
    assert_eq!(err.operation(), WriteOperationKind::Create);
    assert!(err
        .attempted_payload()
        .is_some_and(|p| !p.has_server_timestamp()));

    // Signed in: stored, then readable by id.
    let uid = fixture.sign_in("alice");
    let doc = weaver
        .images()
        .add_image_metadata(Some(&uid), ImageUpload::new("a.png", "https://cdn/a.png"))
        .await
        .expect("create allowed for owner");
    assert_eq!(
        weaver.images().image_url(doc.id()).await?.as_deref(),
        Some("https://cdn/a.png")
    );

    // Someone else may not modify it.
    fixture.sign_in("mallory");
    assert_eq!(
        weaver
            .initiate_update(&doc, Payload::new().with("fileName", "b.png"))
            .await,
        None
    );
    let err = listener.recv().await.expect("update rejection published");
    assert_eq!(err.resource_path(), doc.to_string());
    assert_eq!(err.operation(), WriteOperationKind::Update);
    assert!(listener.drain().is_empty());
    Ok(())
}

#[tokio::test]
async fn sqlite_backed_weaver_persists_and_reports() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("weaver.db");

    let store = SqliteStore::open(&path)?.with_rules(OwnerRules::new("images", "ownerUid"));
    store.sign_in(codeweaver::Uid::new("alice"));
    let weaver = Weaver::new(store, quiet())?;
    let mut listener = RecordingListener::attach(weaver.bus());

    let uid = codeweaver::Uid::new("alice");
    let doc = weaver
        .images()
        .add_image_metadata(Some(&uid), ImageUpload::new("a.png", "https://cdn/a.png"))
        .await
        .expect("stored");

    let record = weaver.images().image(doc.id()).await?.expect("readable");
    assert!(record.created_at.is_some());
    assert_eq!(record.owner_uid.as_ref(), Some(&uid));

    weaver.store().sign_out();
    weaver.initiate_delete(&doc);
    let err = listener.recv().await.expect("delete rejected once signed out");
    assert_eq!(err.operation(), WriteOperationKind::Delete);
    assert_eq!(err.attempted_payload(), None);
    assert!(weaver.images().image(doc.id()).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn server_timestamp_placeholder_survives_into_error() -> Result<()> {
    let weaver = Weaver::new(MemoryStore::with_rules(DenyAll), quiet())?;
    let mut listener = RecordingListener::attach(weaver.bus());
    let doc = weaver.images().collection().doc("doc1")?;

    let data = Payload::new().with("updatedAt", FieldValue::ServerTimestamp);
    weaver.initiate_set(&doc, data.clone(), SetOptions::Overwrite);

    let err = listener.recv().await.expect("published");
    assert_eq!(err.operation(), WriteOperationKind::Create);
    assert_eq!(err.attempted_payload(), Some(&data));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_rejected_write_publishes_its_inputs(params: WriteParams) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let err = runtime.block_on(async {
            let weaver = Weaver::new(MemoryStore::with_rules(DenyAll), quiet()).unwrap();
            let mut listener = RecordingListener::attach(weaver.bus());

            let settled = match &params {
                WriteParams::Create { collection, data } => {
                    weaver.initiate_create(collection, data.clone()).await.map(|_| ())
                }
                WriteParams::Set { doc, data, options } => {
                    weaver.initiate_set(doc, data.clone(), *options).await
                }
                WriteParams::Update { doc, data } => weaver.initiate_update(doc, data.clone()).await,
                WriteParams::Delete { doc } => weaver.initiate_delete(doc).await,
            };
            assert_eq!(settled, None);

            let err = listener.recv().await.unwrap();
            assert!(listener.drain().is_empty());
            err
        });

        prop_assert_eq!(err.resource_path(), params.expected_path());
        prop_assert_eq!(err.operation(), params.expected_operation());
        prop_assert_eq!(err.attempted_payload(), params.expected_payload());
    }
}
