use std::time::Duration;

use sluice_client::{FragmentExtractor, MarkerPredicate, ReqwestTransport};
use sluice_core::{
    CongestionController, Driver, FetchTimeout, FetchWorker, ResultSink, RoundExecutor,
    SchedulerConfig, Target, TargetQueue,
};
use sluice_store::{DirectoryStore, StoreConfig};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const NOT_FOUND_PAGE: &str =
    "<html><head><title>Not Found - Item - Classic wow database</title></head></html>";

pub type LiveDriver =
    Driver<ReqwestTransport, MarkerPredicate, FragmentExtractor, DirectoryStore>;

pub fn item_page(id: u32) -> String {
    format!(
        "<html><head><title>Item {id}</title></head><body>\
         <div id=\"tooltip{id}-generic\"><b>Item {id}</b></div></body></html>"
    )
}

/// Serve `/?item={id}` with the given status and body.
pub async fn mount_item(server: &MockServer, id: u32, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("item", id.to_string()))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

pub fn targets(server: &MockServer, ids: &[u32]) -> Vec<Target> {
    ids.iter()
        .map(|id| Target::new(format!("{}/?item={id}", server.uri())))
        .collect()
}

/// Wire the production collaborators over a fresh temporary directory.
pub async fn live_driver(targets: Vec<Target>, max_wait_secs: f64) -> (LiveDriver, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let timeout = FetchTimeout::new(Duration::from_millis(500), Duration::from_secs(2));
    let config = SchedulerConfig::default()
        .with_max_wait(max_wait_secs)
        .with_max_concurrency(4)
        .with_fetch_timeout(timeout);

    let store = DirectoryStore::open(&StoreConfig::new(dir.path().join("out")))
        .await
        .unwrap();
    let worker = FetchWorker::new(
        ReqwestTransport::with_timeout(timeout).unwrap(),
        MarkerPredicate::default(),
        timeout,
    );
    let executor = RoundExecutor::new(
        targets.into_iter().collect::<TargetQueue>(),
        CongestionController::new(&config),
        worker,
        FragmentExtractor::default(),
    );

    (Driver::new(executor, ResultSink::new(store)), dir)
}

pub fn batch_documents(dir: &TempDir) -> Vec<serde_json::Value> {
    std::fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|entry| {
            let bytes = std::fs::read(entry.unwrap().path()).unwrap();
            serde_json::from_slice(&bytes).unwrap()
        })
        .collect()
}
