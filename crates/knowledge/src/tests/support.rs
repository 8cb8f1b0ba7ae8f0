//! Fakes and fixtures shared by the knowledge tests.

use crate::handle::RetrieverHandle;
use crate::index::embedding_to_bytes;
use crate::rag::{AnswerSynthesizer, QaOptions};
use crate::retriever::{Retriever, RetrieverLoader};
use crate::types::RetrievedPassage;
use docqa_core::{AppError, AppResult};
use docqa_llm::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use docqa_prompt::PromptSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Index fixtures
// ---------------------------------------------------------------------------

pub(crate) struct FixtureRow {
    id: String,
    text: String,
    source_file: Option<String>,
    page_number: Option<u32>,
    embedding: Option<Vec<f32>>,
}

impl FixtureRow {
    pub(crate) fn new(id: &str, text: &str, embedding: &[f32]) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            source_file: None,
            page_number: None,
            embedding: Some(embedding.to_vec()),
        }
    }

    pub(crate) fn without_embedding(id: &str, text: &str) -> Self {
        Self {
            embedding: None,
            ..Self::new(id, text, &[])
        }
    }

    pub(crate) fn source(mut self, file: &str, page: Option<u32>) -> Self {
        self.source_file = Some(file.to_string());
        self.page_number = page;
        self
    }
}

/// Write a passage index the way the ingestion pipeline lays it out.
pub(crate) fn write_index(path: &Path, rows: &[FixtureRow]) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE passages (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            source_file TEXT,
            page_number INTEGER,
            embedding BLOB
        );",
    )
    .unwrap();

    for row in rows {
        conn.execute(
            "INSERT INTO passages (id, text, source_file, page_number, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                row.id,
                row.text,
                row.source_file,
                row.page_number,
                row.embedding.as_deref().map(embedding_to_bytes),
            ],
        )
        .unwrap();
    }
}

pub(crate) fn passage(text: &str, score: Option<f32>) -> RetrievedPassage {
    RetrievedPassage {
        text: text.to_string(),
        score,
        source_file: Some("contract.pdf".to_string()),
        page_number: Some(3),
    }
}

// ---------------------------------------------------------------------------
// Generation fake
// ---------------------------------------------------------------------------

/// How the fake answers one kind of request.
#[derive(Clone)]
pub(crate) enum Reply {
    Text(String),
    Fail,
    Hang,
}

impl Reply {
    pub(crate) fn text(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

/// Scripted generation collaborator.
///
/// Rewrite and answer requests are told apart by their rendered prompts.
pub(crate) struct FakeLlm {
    rewrite: Reply,
    answer: Reply,
    tokens: Vec<String>,
    fail_after: Option<usize>,
    token_delay: Option<Duration>,
    requests: Mutex<Vec<LlmRequest>>,
    pub(crate) pulled: Arc<AtomicUsize>,
    pub(crate) stream_dropped: Arc<AtomicBool>,
}

impl FakeLlm {
    pub(crate) fn new() -> Self {
        Self {
            rewrite: Reply::text(""),
            answer: Reply::text(""),
            tokens: Vec::new(),
            fail_after: None,
            token_delay: None,
            requests: Mutex::new(Vec::new()),
            pulled: Arc::new(AtomicUsize::new(0)),
            stream_dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn rewrite(mut self, reply: Reply) -> Self {
        self.rewrite = reply;
        self
    }

    pub(crate) fn answer(mut self, reply: Reply) -> Self {
        self.answer = reply;
        self
    }

    pub(crate) fn tokens(mut self, tokens: &[&str]) -> Self {
        self.tokens = tokens.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Fail the token stream in place of token `index`.
    pub(crate) fn fail_stream_at(mut self, index: usize) -> Self {
        self.fail_after = Some(index);
        self
    }

    pub(crate) fn token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = Some(delay);
        self
    }

    /// Prompts of every answer (non-rewrite) request so far.
    pub(crate) fn answer_prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !is_rewrite(r))
            .map(|r| r.prompt.clone())
            .collect()
    }

    fn record(&self, request: &LlmRequest) {
        self.requests.lock().unwrap().push(request.clone());
    }
}

fn is_rewrite(request: &LlmRequest) -> bool {
    request.prompt.contains("Rewritten query:")
}

async fn respond(reply: &Reply) -> AppResult<LlmResponse> {
    match reply {
        Reply::Text(text) => Ok(LlmResponse {
            content: text.clone(),
            model: "fake".to_string(),
            usage: LlmUsage::default(),
        }),
        Reply::Fail => Err(AppError::Llm("upstream returned 503".to_string())),
        Reply::Hang => std::future::pending().await,
    }
}

/// Sets its flag when the token stream is dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl LlmClient for FakeLlm {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.record(request);
        if is_rewrite(request) {
            respond(&self.rewrite).await
        } else {
            respond(&self.answer).await
        }
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        self.record(request);
        match self.answer {
            Reply::Fail => return Err(AppError::Llm("stream refused".to_string())),
            Reply::Hang => std::future::pending::<()>().await,
            Reply::Text(_) => {}
        }

        let tokens = self.tokens.clone();
        let fail_after = self.fail_after;
        let delay = self.token_delay;
        let pulled = Arc::clone(&self.pulled);
        let flag = DropFlag(Arc::clone(&self.stream_dropped));

        let stream = futures::stream::unfold((0usize, flag), move |(i, flag)| {
            let tokens = tokens.clone();
            let pulled = Arc::clone(&pulled);
            async move {
                if i == usize::MAX || i > tokens.len() {
                    return None;
                }
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if fail_after == Some(i) {
                    let err = AppError::Llm("connection reset".to_string());
                    return Some((Err(err), (usize::MAX, flag)));
                }
                if i == tokens.len() {
                    return Some((Ok(LlmStreamChunk::finished("fake", None)), (i + 1, flag)));
                }
                pulled.fetch_add(1, Ordering::SeqCst);
                Some((Ok(LlmStreamChunk::delta(tokens[i].clone(), "fake")), (i + 1, flag)))
            }
        });

        Ok(Box::pin(stream))
    }
}

// ---------------------------------------------------------------------------
// Retrieval fakes
// ---------------------------------------------------------------------------

/// Retriever returning a fixed ranked list.
pub(crate) struct FakeRetriever {
    passages: Vec<RetrievedPassage>,
    fail: bool,
    delay: Option<Duration>,
    queries: Mutex<Vec<String>>,
    pub(crate) completed: AtomicUsize,
}

impl FakeRetriever {
    pub(crate) fn new(passages: Vec<RetrievedPassage>) -> Self {
        Self {
            passages,
            fail: false,
            delay: None,
            queries: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Retriever for FakeRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedPassage>> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(AppError::Knowledge("index file vanished".to_string()));
        }
        Ok(self.passages.iter().take(top_k).cloned().collect())
    }
}

/// What the next load produces.
#[derive(Clone)]
pub(crate) enum LoadOutcome {
    Ready(Arc<dyn Retriever>),
    Missing,
    Fail,
}

/// Loader with a switchable outcome that counts its builds.
pub(crate) struct FakeLoader {
    outcome: Mutex<LoadOutcome>,
    delay: Option<Duration>,
    pub(crate) builds: AtomicUsize,
}

impl FakeLoader {
    pub(crate) fn new(outcome: LoadOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            delay: None,
            builds: AtomicUsize::new(0),
        }
    }

    pub(crate) fn ready(retriever: Arc<dyn Retriever>) -> Self {
        Self::new(LoadOutcome::Ready(retriever))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn set(&self, outcome: LoadOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub(crate) fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RetrieverLoader for FakeLoader {
    async fn load(&self) -> AppResult<Option<Arc<dyn Retriever>>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self.outcome.lock().unwrap().clone();
        match outcome {
            LoadOutcome::Ready(retriever) => Ok(Some(retriever)),
            LoadOutcome::Missing => Ok(None),
            LoadOutcome::Fail => Err(AppError::Knowledge("file is not a database".to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline wiring
// ---------------------------------------------------------------------------

pub(crate) fn synthesizer_with(
    llm: Arc<FakeLlm>,
    loader: Arc<FakeLoader>,
    options: QaOptions,
) -> AnswerSynthesizer {
    let handle = Arc::new(RetrieverHandle::new(loader));
    let prompts = Arc::new(PromptSet::builtin().unwrap());
    AnswerSynthesizer::new(llm, handle, prompts, options)
}

pub(crate) fn synthesizer(llm: Arc<FakeLlm>, loader: Arc<FakeLoader>) -> AnswerSynthesizer {
    synthesizer_with(llm, loader, QaOptions::default())
}
