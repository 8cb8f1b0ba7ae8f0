//! Stats command handler.

use clap::Args;
use docqa_core::{config::AppConfig, AppResult};

/// Show passage index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let stats = docqa_knowledge::stats(config)?;
        let prompt_overrides = docqa_prompt::list_prompts(&config.workspace)?;

        if self.json {
            let output = serde_json::json!({
                "path": stats.path,
                "passagesCount": stats.passages_count,
                "sourcesCount": stats.sources_count,
                "dimensions": stats.dimensions,
                "dbSizeBytes": stats.db_size_bytes,
                "modifiedAt": stats.modified_at,
                "promptOverrides": prompt_overrides,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Index: {}", stats.path.display());
            println!("  Passages: {}", stats.passages_count);
            println!("  Sources: {}", stats.sources_count);
            match stats.dimensions {
                Some(dimensions) => println!("  Dimensions: {}", dimensions),
                None => println!("  Dimensions: n/a"),
            }
            println!("  DB size: {} bytes", stats.db_size_bytes);
            if let Some(modified) = stats.modified_at {
                println!("  Modified: {}", modified);
            }
            if !prompt_overrides.is_empty() {
                println!("Prompt overrides: {}", prompt_overrides.join(", "));
            }
        }

        Ok(())
    }
}
