//! Interactive session handler.
//!
//! Reads questions from stdin, one per line, and answers each against the
//! same pipeline so the index is loaded once. `/reload` swaps in a freshly
//! loaded index without interrupting anything in flight.

use super::ask::{print_answer, stream_answer};
use clap::Args;
use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::build_synthesizer;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Answer questions read line by line from stdin
#[derive(Args, Debug)]
pub struct SessionCommand {
    /// Print server-sent event frames as answers are generated
    #[arg(long)]
    pub stream: bool,

    /// Output answers as JSON
    #[arg(long, conflicts_with = "stream")]
    pub json: bool,

    /// Load the index in the background before the first question
    #[arg(long)]
    pub warmup: bool,
}

impl SessionCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let qa = build_synthesizer(config)?;

        if self.warmup {
            let handle = Arc::clone(qa.retriever());
            tokio::spawn(async move {
                if handle.warmup().await {
                    tracing::info!("Knowledge base warmed up");
                } else {
                    tracing::warn!("Warmup found no usable index");
                }
            });
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut answered = 0usize;

        while let Some(line) = lines.next_line().await? {
            match line.trim() {
                "" => continue,
                "/quit" | "/exit" => break,
                "/reload" => {
                    if qa.retriever().reload().await {
                        println!("Knowledge base reloaded.");
                    } else {
                        println!("Knowledge base unavailable.");
                    }
                }
                question => {
                    let result = if self.stream {
                        stream_answer(&qa, question).await
                    } else {
                        match qa.answer(question).await {
                            Ok(answer) => print_answer(&answer, self.json),
                            Err(e) => Err(e),
                        }
                    };

                    // One failed question does not end the session
                    match result {
                        Ok(()) => answered += 1,
                        Err(e) => {
                            tracing::error!(retryable = e.is_retryable(), "Question failed: {}", e);
                            eprintln!("Error: {}", e);
                        }
                    }
                }
            }
        }

        tracing::info!(answered, "Session ended");
        Ok(())
    }
}
