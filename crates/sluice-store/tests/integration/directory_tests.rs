use sluice_core::models::{ExtractedItem, RoundBatch};
use sluice_core::sink::ResultSink;
use sluice_core::traits::BatchStore;
use sluice_core::AppError;

use crate::common::{file_names, setup_store};

fn item(id: &str) -> ExtractedItem {
    ExtractedItem {
        id: id.to_string(),
        url: format!("https://classicdb.ch/?item={id}"),
        html: format!("<div id=\"tooltip{id}-generic\">{id}</div>"),
    }
}

#[tokio::test]
async fn open_creates_missing_directories() {
    let (store, _root) = setup_store().await;
    assert!(store.dir().is_dir());
    assert!(file_names(&store).is_empty());
}

#[tokio::test]
async fn open_is_idempotent() {
    let (store, _root) = setup_store().await;
    let config = sluice_store::StoreConfig::new(store.dir());
    let again = sluice_store::DirectoryStore::open(&config).await.unwrap();
    assert_eq!(again.dir(), store.dir());
}

#[tokio::test]
async fn write_creates_named_file() {
    let (store, _root) = setup_store().await;
    store.write("one.json", b"{\"a\":1}").await.unwrap();

    assert_eq!(file_names(&store), vec!["one.json"]);
    let contents = std::fs::read(store.dir().join("one.json")).unwrap();
    assert_eq!(contents, b"{\"a\":1}");
}

#[tokio::test]
async fn existing_file_is_never_overwritten() {
    let (store, _root) = setup_store().await;
    store.write("same.json", b"first").await.unwrap();

    let err = store.write("same.json", b"second").await.unwrap_err();
    assert!(matches!(err, AppError::StorageError(_)));

    let contents = std::fs::read(store.dir().join("same.json")).unwrap();
    assert_eq!(contents, b"first");
}

#[tokio::test]
async fn traversal_names_are_refused() {
    let (store, root) = setup_store().await;
    let err = store.write("../escape.json", b"x").await.unwrap_err();
    assert!(matches!(err, AppError::StorageError(_)));
    assert!(!root.path().join("runs").join("escape.json").exists());
}

#[tokio::test]
async fn sink_writes_one_file_per_non_empty_batch() {
    let (store, _root) = setup_store().await;
    let sink = ResultSink::new(store.clone());

    let first = RoundBatch {
        round: 1,
        items: vec![item("1"), item("2")],
    };
    let second = RoundBatch {
        round: 2,
        items: vec![item("3")],
    };

    let a = sink.persist(first).await.unwrap().unwrap();
    assert!(sink.persist(RoundBatch::new(3)).await.unwrap().is_none());
    let b = sink.persist(second).await.unwrap().unwrap();

    let mut expected = vec![a.name.clone(), b.name.clone()];
    expected.sort();
    assert_eq!(file_names(&store), expected);

    let doc: serde_json::Value =
        serde_json::from_slice(&std::fs::read(store.dir().join(&a.name)).unwrap()).unwrap();
    assert_eq!(doc["round"], 1);
    assert_eq!(doc["items"][1]["id"], "2");
    assert_eq!(doc["items"][1]["url"], "https://classicdb.ch/?item=2");
}
