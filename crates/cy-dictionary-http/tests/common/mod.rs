// crates/cy-dictionary-http/tests/common/mod.rs
// =============================================================================
// Module: HTTP Test Helpers
// Description: Spawn a dictionary server on a loopback port for tests.
// Purpose: Share server, audit capture, and store doubles across suites.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::sync::Arc;
use std::sync::Mutex;

use cy_dictionary_config::DictionaryConfig;
use cy_dictionary_core::DictionaryEntry;
use cy_dictionary_core::EntryPage;
use cy_dictionary_core::EntryPersistence;
use cy_dictionary_core::EntryWrite;
use cy_dictionary_core::InMemoryEntryPersistence;
use cy_dictionary_core::PageRequest;
use cy_dictionary_core::PersistenceError;
use cy_dictionary_core::SharedEntryPersistence;
use cy_dictionary_http::AuditSink;
use cy_dictionary_http::DictionaryServer;
use cy_dictionary_http::PhraseFailureAuditEvent;
use cy_dictionary_http::RequestAuditEvent;
use cy_dictionary_http::SecurityAuditEvent;
use cy_dictionary_http::WriteAuthzAuditEvent;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Manage role used by the default config.
pub const MANAGE_ROLE: &str = "manage-translations";

/// Audit sink capturing every event as JSON.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Value>>,
}

impl RecordingSink {
    fn push(&self, event: &impl serde::Serialize) {
        if let (Ok(value), Ok(mut events)) = (serde_json::to_value(event), self.events.lock()) {
            events.push(value);
        }
    }

    /// Returns captured events with the given `event` name.
    pub fn events(&self, name: &str) -> Vec<Value> {
        self.events
            .lock()
            .map(|events| events.iter().filter(|event| event["event"] == name).cloned().collect())
            .unwrap_or_default()
    }
}

impl AuditSink for RecordingSink {
    fn record(&self, event: &RequestAuditEvent) {
        self.push(event);
    }

    fn record_authz(&self, event: &WriteAuthzAuditEvent) {
        self.push(event);
    }

    fn record_phrase_failure(&self, event: &PhraseFailureAuditEvent) {
        self.push(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        self.push(event);
    }
}

/// Store whose writes always fail with an I/O error carrying internal detail.
pub struct FailingWrites;

/// Internal detail that must never reach a response body.
pub const FAILING_WRITE_CAUSE: &str = "disk full at /var/lib/cy-dictionary/dictionary.sqlite";

impl EntryPersistence for FailingWrites {
    fn save_and_flush(&self, _write: &EntryWrite) -> Result<DictionaryEntry, PersistenceError> {
        Err(PersistenceError::Io(FAILING_WRITE_CAUSE.to_string()))
    }

    fn find_all(&self) -> Result<Vec<DictionaryEntry>, PersistenceError> {
        Ok(Vec::new())
    }

    fn find_page(&self, _page: PageRequest) -> Result<EntryPage, PersistenceError> {
        Ok(EntryPage {
            items: Vec::new(),
            total: 0,
        })
    }

    fn find_by_phrase(&self, _phrase: &str) -> Result<Option<DictionaryEntry>, PersistenceError> {
        Ok(None)
    }

    fn delete_by_phrase_prefix(&self, _prefix: &str) -> Result<u64, PersistenceError> {
        Ok(0)
    }
}

/// Running server bound to a loopback port.
pub struct TestServer {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
    pub audit: Arc<RecordingSink>,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Returns an absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Stops the server and waits for it to exit.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

/// Builds a validated config from extra TOML appended to a loopback bind.
pub fn config_with(extra: &str) -> DictionaryConfig {
    let toml = format!("[server]\nbind = \"127.0.0.1:0\"\nmax_body_bytes = 4096\n{extra}");
    DictionaryConfig::from_toml(&toml).expect("test config")
}

/// Spawns a server over an in-memory store.
pub async fn spawn_server(config: &DictionaryConfig) -> TestServer {
    spawn_server_with_store(
        config,
        SharedEntryPersistence::from_persistence(InMemoryEntryPersistence::new()),
    )
    .await
}

/// Spawns a server over the given store.
pub async fn spawn_server_with_store(
    config: &DictionaryConfig,
    store: SharedEntryPersistence,
) -> TestServer {
    let audit = Arc::new(RecordingSink::default());
    let server =
        DictionaryServer::from_parts(config, store, Arc::clone(&audit) as Arc<dyn AuditSink>)
            .expect("server init");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let join = tokio::spawn(async move {
        let _ = server
            .serve_listener(listener, async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    TestServer {
        base_url: format!("http://{addr}"),
        shutdown: Some(shutdown_tx),
        join: Some(join),
        audit,
        client: reqwest::Client::new(),
    }
}
