//! Fixed prompt templates.

/// Template name registered with Handlebars.
pub const GROUNDED_QUESTION: &str = "grounded_question";

/// Instruction placed ahead of the fragments.
pub const GROUNDING_INSTRUCTION: &str =
    "Use ONLY the following context fragments to answer the user's question:";

/// Instruction placed after the question when fragments were supplied.
pub const MISSING_ANSWER_INSTRUCTION: &str =
    "If the answer cannot be found in the provided context, say so clearly.";

/// User-turn template.
///
/// Block tags share a line with text so no standalone-line whitespace
/// stripping applies.
pub const GROUNDED_QUESTION_TEMPLATE: &str = "{{#if fragments}}{{grounding}}\n\n\
{{#each fragments}}[Fragment {{index}} from {{source}}]: {{text}}\n\n{{/each}}{{/if}}\
Question: {{question}}\
{{#if fragments}}\n\n{{missing}}{{/if}}";
