//! Ask command handler.
//!
//! Answers one question, either as the final rendered answer or as
//! server-sent event frames while tokens arrive.

use clap::Args;
use docqa_core::{config::AppConfig, AppError, AppResult};
use docqa_knowledge::{build_synthesizer, AnswerSynthesizer, QaAnswer};
use futures::StreamExt;
use std::io::Write;

/// Ask a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Print server-sent event frames as the answer is generated
    #[arg(long)]
    pub stream: bool,

    /// Output as JSON
    #[arg(long, conflicts_with = "stream")]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(AppError::Config("Question must not be empty".to_string()));
        }

        let qa = build_synthesizer(config)?;

        if self.stream {
            stream_answer(&qa, question).await
        } else {
            let answer = qa.answer(question).await?;
            print_answer(&answer, self.json)
        }
    }
}

/// Print a finished answer as text or JSON.
pub(crate) fn print_answer(answer: &QaAnswer, json: bool) -> AppResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(answer)?);
    } else {
        println!("{}", answer.render());
    }

    tracing::debug!(outcome = ?answer.outcome, confidence = answer.confidence, "Printed answer");
    Ok(())
}

/// Print SSE frames as they arrive.
///
/// A mid-stream failure is still followed by the end frame; the error is
/// returned once the stream is exhausted.
pub(crate) async fn stream_answer(qa: &AnswerSynthesizer, question: &str) -> AppResult<()> {
    let mut frames = qa.answer_stream(question).await?;
    let mut stdout = std::io::stdout();
    let mut failure = None;

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(frame) => {
                write!(stdout, "{}", frame.to_sse())?;
                stdout.flush()?;
            }
            Err(e) => failure = Some(e),
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
