//! In-memory collection used by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use backfill_mongodb::{
    BackfillError, BackfillTarget, Connector, DocumentStream, MigrationConfig, MigrationSettings,
    Result,
};
use backfill_mongodb::query::display_id;
use bson::{Bson, Document as BsonDocument};
use futures::StreamExt;
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::subscriber::DefaultGuard;

#[derive(Default)]
struct State {
    documents: Mutex<Vec<BsonDocument>>,
    /// 1-based update attempt that fails
    fail_update_on: Option<usize>,
    /// Number of documents the cursor yields before erroring
    fail_cursor_after: Option<usize>,
    update_attempts: AtomicUsize,
    closes: AtomicUsize,
    /// "fetch <id>" when the cursor yields a document, "update <id>" when a write lands
    events: Mutex<Vec<String>>,
}

/// Collection kept in memory, with optional injected failures
#[derive(Clone, Default)]
pub struct MemoryCollection {
    state: Arc<State>,
}

impl MemoryCollection {
    pub fn new(documents: Vec<BsonDocument>) -> Self {
        Self::build(documents, None, None)
    }

    pub fn failing_update(documents: Vec<BsonDocument>, attempt: usize) -> Self {
        Self::build(documents, Some(attempt), None)
    }

    pub fn failing_cursor(documents: Vec<BsonDocument>, after: usize) -> Self {
        Self::build(documents, None, Some(after))
    }

    fn build(
        documents: Vec<BsonDocument>,
        fail_update_on: Option<usize>,
        fail_cursor_after: Option<usize>,
    ) -> Self {
        Self {
            state: Arc::new(State {
                documents: Mutex::new(documents),
                fail_update_on,
                fail_cursor_after,
                ..State::default()
            }),
        }
    }

    pub fn documents(&self) -> Vec<BsonDocument> {
        self.state.documents.lock().clone()
    }

    pub fn update_attempts(&self) -> usize {
        self.state.update_attempts.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<String> {
        self.state.events.lock().clone()
    }
}

#[async_trait]
impl BackfillTarget for MemoryCollection {
    async fn find_missing(&self, field: &str) -> Result<DocumentStream> {
        let matches: Vec<BsonDocument> = self
            .state
            .documents
            .lock()
            .iter()
            .filter(|doc| !doc.contains_key(field))
            .cloned()
            .collect();

        let mut items: Vec<Result<BsonDocument>> = matches.into_iter().map(Ok).collect();
        if let Some(after) = self.state.fail_cursor_after {
            items.truncate(after);
            items.push(Err(BackfillError::Operation("cursor killed".to_string())));
        }

        // Documents are handed out one poll at a time, so the event log shows
        // exactly when the migrator pulls from the cursor.
        let state = Arc::clone(&self.state);
        Ok(futures::stream::iter(items)
            .inspect(move |item| {
                if let Ok(doc) = item {
                    let id = doc.get("_id").map(display_id).unwrap_or_default();
                    state.events.lock().push(format!("fetch {}", id));
                }
            })
            .boxed())
    }

    async fn set_field(&self, id: &Bson, field: &str, value: &Bson) -> Result<()> {
        let attempt = self.state.update_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.state.fail_update_on == Some(attempt) {
            return Err(BackfillError::Operation("simulated write failure".to_string()));
        }

        let mut documents = self.state.documents.lock();
        if let Some(doc) = documents.iter_mut().find(|doc| doc.get("_id") == Some(id)) {
            doc.insert(field, value.clone());
        }
        self.state.events.lock().push(format!("update {}", display_id(id)));
        Ok(())
    }

    async fn close(&self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connector handing out a shared [`MemoryCollection`]
pub struct MemoryConnector {
    collection: MemoryCollection,
    refuse: bool,
    connects: AtomicUsize,
}

impl MemoryConnector {
    pub fn new(collection: MemoryCollection) -> Self {
        Self {
            collection,
            refuse: false,
            connects: AtomicUsize::new(0),
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new(MemoryCollection::default())
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Target = MemoryCollection;

    async fn connect(&self, _config: &MigrationConfig) -> Result<MemoryCollection> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(BackfillError::Connection("connection refused".to_string()));
        }
        Ok(self.collection.clone())
    }
}

pub fn settings(field: &str, value: &str) -> MigrationSettings {
    MigrationSettings {
        mongo_uri: Some("mongodb://localhost:27017".to_string()),
        db_name: Some("app".to_string()),
        collection_name: Some("users".to_string()),
        target_field: Some(field.to_string()),
        new_value: Some(value.to_string()),
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Log output collected in memory
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Route this thread's events into the capture until the guard drops
    ///
    /// `#[tokio::test]` runs on a current-thread runtime, so every event of
    /// the test body lands here.
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_target(false)
            .without_time()
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Captured lines with the level prefix stripped
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock())
            .lines()
            .map(|line| {
                let line = line.trim_start();
                line.split_once(' ')
                    .map(|(_, rest)| rest.trim_start().to_string())
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Captured lines at ERROR level
    pub fn error_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock())
            .lines()
            .filter(|line| line.trim_start().starts_with("ERROR"))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
