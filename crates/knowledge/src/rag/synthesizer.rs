//! End-to-end answer synthesis.
//!
//! Both modes share the same front half: rewrite the question, fetch the
//! live retriever, keep passages above the similarity floor, and assemble
//! the context. The synchronous mode then asks for one complete answer
//! and checks it; the streaming mode forwards tokens as they arrive
//! through a one-slot channel and finishes with a confidence frame.

use super::confidence;
use super::context::assemble;
use super::guardrail::GuardrailGate;
use super::rewrite::QueryRewriter;
use super::stream::{AnswerStream, StreamFrame};
use super::types::{AnswerOutcome, QaAnswer, QaOptions, NOT_INITIALIZED, NO_ANSWER};
use super::{generation_request, within};
use crate::handle::RetrieverHandle;
use docqa_core::{AppError, AppResult};
use docqa_llm::{LlmClient, LlmStream};
use docqa_prompt::PromptSet;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;

/// What retrieval produced for one question.
enum Evidence {
    /// No retriever is available
    Unavailable,
    /// Nothing reached the similarity floor
    Empty,
    Found { context: String, confidence: f64 },
}

/// Drives the question-answering pipeline.
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmClient>,
    retriever: Arc<RetrieverHandle>,
    prompts: Arc<PromptSet>,
    rewriter: QueryRewriter,
    gate: GuardrailGate,
    options: QaOptions,
}

impl AnswerSynthesizer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        retriever: Arc<RetrieverHandle>,
        prompts: Arc<PromptSet>,
        options: QaOptions,
    ) -> Self {
        let rewriter = QueryRewriter::new(Arc::clone(&llm), Arc::clone(&prompts), options.clone());
        let gate = GuardrailGate::new(options.similarity_floor, options.confidence_floor);

        Self {
            llm,
            retriever,
            prompts,
            rewriter,
            gate,
            options,
        }
    }

    /// The retriever handle, for reload and warmup.
    pub fn retriever(&self) -> &Arc<RetrieverHandle> {
        &self.retriever
    }

    pub fn options(&self) -> &QaOptions {
        &self.options
    }

    /// Answer a question with one blocking generation call.
    ///
    /// Insufficient evidence or grounding yields a sentinel answer with
    /// confidence 0. Retrieval and generation failures are errors.
    pub async fn answer(&self, question: &str) -> AppResult<QaAnswer> {
        let span = tracing::info_span!(
            "qa",
            request_id = %uuid::Uuid::new_v4(),
            mode = "sync"
        );

        self.answer_inner(question).instrument(span).await
    }

    async fn answer_inner(&self, question: &str) -> AppResult<QaAnswer> {
        let start = Instant::now();

        let (context, confidence) = match self.gather_evidence(question).await? {
            Evidence::Unavailable => return Ok(QaAnswer::not_initialized()),
            Evidence::Empty => return Ok(QaAnswer::no_information(AnswerOutcome::NoEvidence)),
            Evidence::Found {
                context,
                confidence,
            } => (context, confidence),
        };

        let prompt = self.prompts.render_answer(&context, question)?;
        tracing::debug!(
            prompt = %prompt.metadata.source_prompt_id,
            origin = ?prompt.metadata.origin,
            "Rendered answer prompt"
        );
        let request = generation_request(&self.options, prompt.text);
        let response = within(self.options.generation_timeout, self.llm.complete(&request)).await?;
        let answer = response.content.trim();

        if !GuardrailGate::has_citation(answer) {
            tracing::info!("Answer carried no citation; returning sentinel");
            return Ok(QaAnswer::no_information(AnswerOutcome::Uncited));
        }

        if !self.gate.meets_confidence(confidence) {
            tracing::info!(confidence, "Confidence below floor; returning sentinel");
            return Ok(QaAnswer::no_information(AnswerOutcome::LowConfidence));
        }

        tracing::info!(
            confidence,
            elapsed = %format!("{:.2}s", start.elapsed().as_secs_f64()),
            "Answered question"
        );

        Ok(QaAnswer::answered(answer, confidence))
    }

    /// Answer a question as a stream of frames.
    ///
    /// Rewriting, retrieval and context assembly finish before this
    /// returns, so the prompt is fixed even if the index reloads while
    /// tokens flow; failures up to opening the generation stream are
    /// returned here. Streamed answers are not checked for citations or
    /// against the confidence floor, because tokens reach the caller
    /// before any check could run.
    pub async fn answer_stream(&self, question: &str) -> AppResult<AnswerStream> {
        let span = tracing::info_span!(
            "qa",
            request_id = %uuid::Uuid::new_v4(),
            mode = "stream"
        );

        self.answer_stream_inner(question, span.clone())
            .instrument(span)
            .await
    }

    async fn answer_stream_inner(
        &self,
        question: &str,
        span: tracing::Span,
    ) -> AppResult<AnswerStream> {
        let (context, confidence) = match self.gather_evidence(question).await? {
            Evidence::Unavailable => return Ok(sentinel_stream(NOT_INITIALIZED)),
            Evidence::Empty => return Ok(sentinel_stream(NO_ANSWER)),
            Evidence::Found {
                context,
                confidence,
            } => (context, confidence),
        };

        let prompt = self.prompts.render_answer(&context, question)?;
        let request = generation_request(&self.options, prompt.text).with_streaming();

        let deadline = self
            .options
            .generation_timeout
            .map(|limit| (tokio::time::Instant::now() + limit, limit.as_secs()));

        let tokens = within(self.options.generation_timeout, self.llm.stream(&request)).await?;

        // One slot: a token is produced only once the previous one is taken
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(forward_tokens(tokens, tx, confidence, deadline).instrument(span));

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn gather_evidence(&self, question: &str) -> AppResult<Evidence> {
        let query = self.rewriter.rewrite(question).await;

        let Some(retriever) = self.retriever.get().await else {
            tracing::info!("Knowledge base not initialized");
            return Ok(Evidence::Unavailable);
        };

        let passages = self
            .gate
            .retrieve(retriever.as_ref(), &query, self.options.top_k)
            .await?;

        if passages.is_empty() {
            tracing::info!("No passage reached the similarity floor");
            return Ok(Evidence::Empty);
        }

        let context = assemble(&passages);
        let confidence = confidence::score(&passages);
        tracing::debug!(confidence, context_chars = context.len(), "Assembled context");

        Ok(Evidence::Found {
            context,
            confidence,
        })
    }
}

fn sentinel_stream(message: &str) -> AnswerStream {
    let frames = vec![
        Ok(StreamFrame::Data(message.to_string())),
        Ok(StreamFrame::End),
    ];
    Box::pin(futures::stream::iter(frames))
}

/// Pull the next token, honouring the overall stream deadline.
async fn next_token(
    tokens: &mut LlmStream,
    deadline: Option<(tokio::time::Instant, u64)>,
) -> Option<AppResult<docqa_llm::LlmStreamChunk>> {
    match deadline {
        Some((at, secs)) => match tokio::time::timeout_at(at, tokens.next()).await {
            Ok(next) => next,
            Err(_) => Some(Err(AppError::GenerationTimeout(secs))),
        },
        None => tokens.next().await,
    }
}

/// Producer side of a streamed answer.
///
/// Stops, dropping the generation stream, as soon as the consumer goes
/// away.
async fn forward_tokens(
    mut tokens: LlmStream,
    tx: mpsc::Sender<AppResult<StreamFrame>>,
    confidence: f64,
    deadline: Option<(tokio::time::Instant, u64)>,
) {
    let start = Instant::now();
    let mut forwarded = 0usize;

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                tracing::debug!(forwarded, "Consumer disconnected; stopping generation");
                return;
            }
            next = next_token(&mut tokens, deadline) => next,
        };

        match next {
            Some(Ok(chunk)) => {
                if !chunk.content.is_empty() {
                    if tx.send(Ok(StreamFrame::Data(chunk.content))).await.is_err() {
                        tracing::debug!(forwarded, "Consumer disconnected; stopping generation");
                        return;
                    }
                    forwarded += 1;
                }
                if chunk.done {
                    break;
                }
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, forwarded, "Generation stream failed");
                if tx.send(Err(e)).await.is_ok() {
                    let _ = tx.send(Ok(StreamFrame::End)).await;
                }
                return;
            }
            None => break,
        }
    }

    drop(tokens);

    if tx.send(Ok(StreamFrame::Metadata { confidence })).await.is_err() {
        return;
    }
    let _ = tx.send(Ok(StreamFrame::End)).await;

    tracing::info!(
        forwarded,
        confidence,
        elapsed = %format!("{:.2}s", start.elapsed().as_secs_f64()),
        "Streamed answer"
    );
}
