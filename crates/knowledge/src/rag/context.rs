//! Citation-tagged context assembly.

use crate::types::RetrievedPassage;

const UNKNOWN: &str = "unknown";

/// Join passages into the context block shown to the model.
///
/// Each passage becomes a `[source: <file>, page: <page>]` header line
/// followed by its trimmed text; blocks are separated by a blank line and
/// keep ranked order.
pub fn assemble(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| {
            let source = p.source_file.as_deref().unwrap_or(UNKNOWN);
            let page = p
                .page_number
                .map(|n| n.to_string())
                .unwrap_or_else(|| UNKNOWN.to_string());

            format!("[source: {}, page: {}]\n{}", source, page, p.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_blocks_in_order() {
        let passages = vec![
            RetrievedPassage::new("  Either party may terminate with 90 days notice.\n")
                .with_score(0.9)
                .with_source("contract.pdf", Some(3)),
            RetrievedPassage::new("Notice must be in writing.")
                .with_score(0.5)
                .with_source("contract.pdf", Some(4)),
        ];

        assert_eq!(
            assemble(&passages),
            "[source: contract.pdf, page: 3]\nEither party may terminate with 90 days notice.\n\n[source: contract.pdf, page: 4]\nNotice must be in writing."
        );
    }

    #[test]
    fn test_missing_metadata_becomes_unknown() {
        let passages = vec![
            RetrievedPassage::new("No metadata."),
            RetrievedPassage::new("No page.").with_source("memo.txt", None),
        ];

        assert_eq!(
            assemble(&passages),
            "[source: unknown, page: unknown]\nNo metadata.\n\n[source: memo.txt, page: unknown]\nNo page."
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(assemble(&[]), "");
    }
}
