//! In-memory fakes of the capability traits, for tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tandem_client::{ClientError, Result};
use tandem_core::domain::poller::{
    ArtifactPollerConfig, CommitPollerConfig, DEFAULT_RUN_WINDOW, DEFAULT_TRIGGER_EVENT_TYPE,
    Schedule,
};
use tandem_core::domain::repo::RepoCoordinate;
use tandem_core::domain::workflow::{Artifact, RunStatus, WorkflowRun};
use tandem_core::dto::github::{RepositoryInfo, TriggerPayload};
use tandem_core::dto::storage::{StorageRef, StoreTarget};
use tandem_core::dto::tagging::TagRequest;

use crate::repository::{ContentStore, RepositoryHost, ServiceConnector, TagService};
use crate::state::{StateError, StateStore};

pub const STORE_URL: &str = "http://store.test";
pub const TAGS_URL: &str = "http://tags.test";

pub fn commit_config(name: &str) -> CommitPollerConfig {
    CommitPollerConfig {
        name: name.to_string(),
        source: RepoCoordinate::new("acme", "proton"),
        source_branch: "main".to_string(),
        schedule: Schedule::new(Duration::from_secs(60), Duration::from_secs(10)),
        trigger_artifact_poller: "proton-build".to_string(),
        trigger_dry_run: false,
        trigger_event_type: DEFAULT_TRIGGER_EVENT_TYPE.to_string(),
    }
}

pub fn artifact_config(name: &str) -> ArtifactPollerConfig {
    ArtifactPollerConfig {
        name: name.to_string(),
        build: RepoCoordinate::new("acme", "proton-builder"),
        source_branch: "main".to_string(),
        schedule: Schedule::new(Duration::from_secs(60), Duration::from_secs(10)),
        artifact_name_patterns: vec!["proton-dist-win".to_string(), "python-*-pkgs".to_string()],
        build_download_limit: None,
        run_window: DEFAULT_RUN_WINDOW,
        stagger_tag: "untested".to_string(),
        storage_url: STORE_URL.to_string(),
        tagging_url: TAGS_URL.to_string(),
    }
}

pub fn run(run_number: u64, status: RunStatus, artifacts: Vec<Artifact>) -> WorkflowRun {
    WorkflowRun {
        id: 9000 + run_number,
        run_number,
        status,
        html_url: Some(format!(
            "https://github.com/acme/proton-builder/actions/runs/{}",
            run_number
        )),
        updated_at: None,
        artifacts,
    }
}

pub fn artifact(id: u64, name: &str) -> Artifact {
    Artifact {
        id,
        name: name.to_string(),
        expired: false,
        created_at: None,
    }
}

fn status_error(status: u16) -> ClientError {
    ClientError::api_error(status, "injected failure")
}

/// A repository dispatch the fake received
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub repo: RepoCoordinate,
    pub event_type: String,
    pub payload: TriggerPayload,
}

#[derive(Default)]
struct HostState {
    disabled: bool,
    /// Scripted `get_latest_commit` answers; an empty script answers 503
    commits: VecDeque<std::result::Result<String, u16>>,
    dispatch_failures: VecDeque<u16>,
    dispatches: Vec<Dispatch>,
    runs: Vec<WorkflowRun>,
    listing_failure: Option<u16>,
    run_listings: usize,
    artifact_listing_failures: HashMap<u64, u16>,
    artifact_listings: Vec<u64>,
    download_failures: HashSet<u64>,
    downloads: Vec<u64>,
}

#[derive(Default)]
pub struct FakeHost {
    inner: Mutex<HostState>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.inner.lock().unwrap().disabled = disabled;
    }

    pub fn push_commit(&self, hash: &str) {
        self.inner
            .lock()
            .unwrap()
            .commits
            .push_back(Ok(hash.to_string()));
    }

    pub fn push_commits(&self, hashes: &[&str]) {
        for hash in hashes {
            self.push_commit(hash);
        }
    }

    pub fn push_commit_error(&self, status: u16) {
        self.inner.lock().unwrap().commits.push_back(Err(status));
    }

    pub fn fail_next_dispatch(&self, status: u16) {
        self.inner
            .lock()
            .unwrap()
            .dispatch_failures
            .push_back(status);
    }

    pub fn dispatches(&self) -> Vec<Dispatch> {
        self.inner.lock().unwrap().dispatches.clone()
    }

    /// Runs to report, newest first as the hosting service does
    pub fn set_runs(&self, runs: Vec<WorkflowRun>) {
        self.inner.lock().unwrap().runs = runs;
    }

    pub fn fail_listing(&self, status: u16) {
        self.inner.lock().unwrap().listing_failure = Some(status);
    }

    pub fn run_listings(&self) -> usize {
        self.inner.lock().unwrap().run_listings
    }

    /// Makes listing the artifacts of run `run_number` fail with `status`
    pub fn fail_artifact_listing(&self, run_number: u64, status: u16) {
        self.inner
            .lock()
            .unwrap()
            .artifact_listing_failures
            .insert(run_number, status);
    }

    /// Run numbers whose artifacts were listed, in call order
    pub fn artifact_listings(&self) -> Vec<u64> {
        self.inner.lock().unwrap().artifact_listings.clone()
    }

    pub fn fail_download(&self, artifact_id: u64) {
        self.inner
            .lock()
            .unwrap()
            .download_failures
            .insert(artifact_id);
    }

    pub fn clear_download_failures(&self) {
        self.inner.lock().unwrap().download_failures.clear();
    }

    /// Ids of successfully downloaded artifacts, in call order
    pub fn downloads(&self) -> Vec<u64> {
        self.inner.lock().unwrap().downloads.clone()
    }
}

#[async_trait]
impl RepositoryHost for FakeHost {
    async fn repository(&self, repo: &RepoCoordinate) -> Result<RepositoryInfo> {
        Ok(RepositoryInfo {
            full_name: repo.full_name(),
            disabled: self.inner.lock().unwrap().disabled,
            archived: false,
        })
    }

    async fn get_latest_commit(&self, _repo: &RepoCoordinate, _branch: &str) -> Result<String> {
        match self.inner.lock().unwrap().commits.pop_front() {
            Some(Ok(hash)) => Ok(hash),
            Some(Err(status)) => Err(status_error(status)),
            None => Err(status_error(503)),
        }
    }

    async fn dispatch_workflow(
        &self,
        repo: &RepoCoordinate,
        event_type: &str,
        payload: &TriggerPayload,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(status) = inner.dispatch_failures.pop_front() {
            return Err(status_error(status));
        }
        inner.dispatches.push(Dispatch {
            repo: repo.clone(),
            event_type: event_type.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }

    async fn list_workflow_runs(&self, _repo: &RepoCoordinate, limit: usize) -> Result<Vec<WorkflowRun>> {
        let mut inner = self.inner.lock().unwrap();
        inner.run_listings += 1;
        if let Some(status) = inner.listing_failure {
            return Err(status_error(status));
        }
        Ok(inner
            .runs
            .iter()
            .take(limit)
            .map(|run| WorkflowRun {
                artifacts: Vec::new(),
                ..run.clone()
            })
            .collect())
    }

    async fn list_run_artifacts(&self, _repo: &RepoCoordinate, run: &WorkflowRun) -> Result<Vec<Artifact>> {
        let mut inner = self.inner.lock().unwrap();
        inner.artifact_listings.push(run.run_number);
        if let Some(status) = inner.artifact_listing_failures.get(&run.run_number) {
            return Err(status_error(*status));
        }
        Ok(inner
            .runs
            .iter()
            .find(|r| r.id == run.id)
            .map(|r| r.artifacts.clone())
            .unwrap_or_default())
    }

    async fn download_artifact(&self, _repo: &RepoCoordinate, artifact_id: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.download_failures.contains(&artifact_id) {
            return Err(status_error(502));
        }
        inner.downloads.push(artifact_id);
        Ok(format!("archive-{}", artifact_id).into_bytes())
    }
}

pub struct FakeContentStore {
    available: AtomicBool,
    failing: AtomicBool,
    targets: Mutex<Vec<StoreTarget>>,
}

impl FakeContentStore {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            targets: Mutex::new(Vec::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn fail_stores(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn url_for(&self, target: &StoreTarget) -> String {
        format!("{}/{}", STORE_URL, target.segments().join("/"))
    }

    pub fn targets(&self) -> Vec<StoreTarget> {
        self.targets.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentStore for FakeContentStore {
    fn location(&self) -> &str {
        STORE_URL
    }

    async fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(status_error(503))
        }
    }

    async fn store(&self, target: &StoreTarget, content: Vec<u8>) -> Result<StorageRef> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(status_error(500));
        }
        assert!(!content.is_empty());
        self.targets.lock().unwrap().push(target.clone());
        Ok(StorageRef {
            url: self.url_for(target),
        })
    }
}

pub struct FakeTagService {
    available: AtomicBool,
    failing: AtomicBool,
    requests: Mutex<Vec<TagRequest>>,
}

impl FakeTagService {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn fail_tags(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<TagRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TagService for FakeTagService {
    fn location(&self) -> &str {
        TAGS_URL
    }

    async fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(status_error(503))
        }
    }

    async fn tag(&self, request: &TagRequest) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(status_error(500));
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// State store kept in memory, with injectable save failures
#[derive(Default)]
pub struct MemoryStateStore {
    records: Mutex<HashMap<String, Value>>,
    fail_saves: AtomicBool,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }
}

impl StateStore for MemoryStateStore {
    fn load_raw(&self, key: &str) -> std::result::Result<Option<Value>, StateError> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    fn save_raw(&self, key: &str, record: &Value) -> std::result::Result<(), StateError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StateError::Write {
                path: key.into(),
                source: std::io::Error::other("injected failure"),
            });
        }
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), record.clone());
        Ok(())
    }
}

/// Hands the same fakes to every poller the registry builds
pub struct FakeConnector {
    pub host: Arc<FakeHost>,
    pub content: Arc<FakeContentStore>,
    pub tagger: Arc<FakeTagService>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self {
            host: Arc::new(FakeHost::new()),
            content: Arc::new(FakeContentStore::new()),
            tagger: Arc::new(FakeTagService::new()),
        }
    }
}

impl ServiceConnector for FakeConnector {
    fn repository_host(&self) -> Arc<dyn RepositoryHost> {
        self.host.clone()
    }

    fn content_store(&self, _base_url: &str) -> Arc<dyn ContentStore> {
        self.content.clone()
    }

    fn tag_service(&self, _base_url: &str) -> Arc<dyn TagService> {
        self.tagger.clone()
    }
}

/// A local HTTP server answering GitHub API paths from a fixed table and
/// recording every path it is asked for
pub struct MockGitHub {
    routes: HashMap<String, (u16, Value)>,
    requests: Mutex<Vec<String>>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers `GET path` with `status` and a JSON `body`. Unknown paths
    /// answer 404.
    pub fn route(mut self, path: &str, status: u16, body: Value) -> Self {
        self.routes.insert(path.to_string(), (status, body));
        self
    }

    /// Starts serving on an ephemeral port and returns the base URL
    pub async fn serve(self) -> (String, Arc<Self>) {
        let mock = Arc::new(self);
        let app = axum::Router::new()
            .fallback(answer)
            .with_state(mock.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), mock)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn answer(
    axum::extract::State(mock): axum::extract::State<Arc<MockGitHub>>,
    uri: axum::http::Uri,
) -> (axum::http::StatusCode, axum::Json<Value>) {
    let path = uri.path().to_string();
    mock.requests.lock().unwrap().push(path.clone());

    match mock.routes.get(&path) {
        Some((status, body)) => (
            axum::http::StatusCode::from_u16(*status).unwrap(),
            axum::Json(body.clone()),
        ),
        None => (
            axum::http::StatusCode::NOT_FOUND,
            axum::Json(serde_json::json!({ "message": "Not Found" })),
        ),
    }
}
