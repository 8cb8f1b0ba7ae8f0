//! Prompts shipped with docqa.

use crate::types::PromptDefinition;

/// Instruction that frames every answer.
pub const SYSTEM_PROMPT_ID: &str = "qa.system";

/// Reformulates a question for retrieval.
pub const REWRITE_PROMPT_ID: &str = "qa.rewrite";

/// Wraps system instruction, context and question into the generation prompt.
pub const ANSWER_PROMPT_ID: &str = "qa.answer";

const SYSTEM_TEMPLATE: &str = "\
You are an enterprise document assistant.

STRICT RULES:
- Answer ONLY using the provided context.
- Every factual statement MUST include a citation.
- The context may be empty.
- If the context is empty OR the answer is not explicitly stated in the context, respond EXACTLY with:
  \"I don't know based on the provided documents.\"
- Do NOT use prior knowledge.
- Do NOT guess.
- Do NOT ask the user for more information.

CITATION FORMAT:
- Use square brackets.
- Example: [source: contract.pdf, page: 3]
- If multiple sources support a statement, list all of them.

If you cannot cite a statement, you must not include it.";

const REWRITE_TEMPLATE: &str = "\
You are a query rewriting assistant for retrieval over legal and contractual documents.

Rewrite the user's question into a search query that:
- Preserves the original intent exactly
- Uses explicit legal and contractual terminology
- Expands vague references (\"it\", \"this\", \"they\") into the terms they refer to

Do NOT answer the question.
Do NOT add facts that are not in the question.
Output ONLY the rewritten query.

Original question:
{{question}}

Rewritten query:";

const ANSWER_TEMPLATE: &str = "\
{{system}}

Context (with sources):
{{context}}

Question:
{{question}}

Answer (with citations):
";

/// Every built-in prompt ID.
pub const BUILTIN_IDS: [&str; 3] = [SYSTEM_PROMPT_ID, REWRITE_PROMPT_ID, ANSWER_PROMPT_ID];

/// Look up a built-in prompt definition.
pub fn builtin(id: &str) -> Option<PromptDefinition> {
    let (title, template) = match id {
        SYSTEM_PROMPT_ID => ("Grounded answering rules", SYSTEM_TEMPLATE),
        REWRITE_PROMPT_ID => ("Retrieval query rewrite", REWRITE_TEMPLATE),
        ANSWER_PROMPT_ID => ("Answer with citations", ANSWER_TEMPLATE),
        _ => return None,
    };

    Some(PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        created_by: "docqa".to_string(),
        template: template.to_string(),
    })
}
