//! Generation request builder.

use crate::templates::{
    GROUNDED_QUESTION, GROUNDED_QUESTION_TEMPLATE, GROUNDING_INSTRUCTION,
    MISSING_ANSWER_INSTRUCTION,
};
use askstore_core::{AppError, AppResult, ConversationTurn, Fragment};
use askstore_llm::{GenerationRequest, SamplingConfig};
use handlebars::Handlebars;
use serde::Serialize;

/// Fragment as seen by the template.
#[derive(Serialize)]
struct FragmentView<'a> {
    index: usize,
    source: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct QuestionView<'a> {
    grounding: &'static str,
    missing: &'static str,
    question: &'a str,
    fragments: Vec<FragmentView<'a>>,
}

/// Builds generation requests from fragments, question and history.
///
/// Holds only the compiled template and the sampling parameters, so
/// building a request never touches the network or any mutable state.
pub struct ContextBuilder {
    registry: Handlebars<'static>,
    sampling: SamplingConfig,
}

impl ContextBuilder {
    /// Compile the template with default sampling parameters.
    pub fn new() -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Fragments are plain text, not HTML
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);

        registry
            .register_template_string(GROUNDED_QUESTION, GROUNDED_QUESTION_TEMPLATE)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

        Ok(Self {
            registry,
            sampling: SamplingConfig::default(),
        })
    }

    /// Use different sampling parameters for every request built.
    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    /// Build a generation request.
    ///
    /// Output turns are `history` in original order followed by one new
    /// user turn. The new turn carries the grounding instruction and the
    /// numbered fragments only when `fragments` is non-empty.
    pub fn build_request(
        &self,
        question: &str,
        fragments: &[Fragment],
        history: &[ConversationTurn],
    ) -> AppResult<GenerationRequest> {
        let user_prompt = self.render_user_turn(question, fragments)?;

        tracing::debug!(
            "Built generation request: {} history turns, {} fragments, {} prompt chars",
            history.len(),
            fragments.len(),
            user_prompt.len()
        );

        let mut turns = Vec::with_capacity(history.len() + 1);
        turns.extend(history.iter().cloned());
        turns.push(ConversationTurn::user(user_prompt));

        Ok(GenerationRequest::new(turns).with_sampling(self.sampling))
    }

    fn render_user_turn(&self, question: &str, fragments: &[Fragment]) -> AppResult<String> {
        let view = QuestionView {
            grounding: GROUNDING_INSTRUCTION,
            missing: MISSING_ANSWER_INSTRUCTION,
            question,
            fragments: fragments
                .iter()
                .enumerate()
                .map(|(i, fragment)| FragmentView {
                    index: i + 1,
                    source: &fragment.source_document,
                    text: &fragment.text,
                })
                .collect(),
        };

        self.registry
            .render(GROUNDED_QUESTION, &view)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
    }
}

/// Build a generation request with default sampling parameters.
///
/// # Example
/// ```
/// use askstore_core::Fragment;
/// use askstore_prompt::build_request;
///
/// let fragments = vec![Fragment::new("Rust 1.0 shipped in 2015.", "history.md", 0.9)];
/// let request = build_request("When did Rust 1.0 ship?", &fragments, &[]).unwrap();
/// assert_eq!(request.turns.len(), 1);
/// ```
pub fn build_request(
    question: &str,
    fragments: &[Fragment],
    history: &[ConversationTurn],
) -> AppResult<GenerationRequest> {
    ContextBuilder::new()?.build_request(question, fragments, history)
}
