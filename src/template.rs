// Rendering of conversation turns into a model prompt.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::channel_parser::{END, FINAL_OPEN, markers};
use crate::context_shaper::{ConversationTurn, Role};
use crate::io_struct::ReasoningEffort;

const HARMONY_IDENTITY: &str = "You are ChatGPT, a large language model trained by OpenAI.";
const HARMONY_KNOWLEDGE_CUTOFF: &str = "2024-06";

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Unknown chat template: {0}")]
    UnknownTemplate(String),
}

/// Turns a conversation into the prompt string the engine expects.
pub trait PromptRenderer: Send + Sync {
    fn render(&self, turns: &[ConversationTurn], effort: ReasoningEffort) -> String;

    fn name(&self) -> &str;
}

/// Build a renderer by template name.
pub fn load_renderer(name: &str) -> Result<Arc<dyn PromptRenderer>, TemplateError> {
    match name {
        "harmony" | "gpt-oss" => Ok(Arc::new(HarmonyRenderer::new())),
        other => Err(TemplateError::UnknownTemplate(other.to_string())),
    }
}

/// gpt-oss Harmony chat layout.
///
/// ```text
/// <|start|>system<|message|>...Reasoning: medium...<|end|>
/// <|start|>developer<|message|># Instructions ...<|end|>
/// <|start|>user<|message|>...<|end|>
/// <|start|>assistant<|channel|>final<|message|>...<|end|>
/// <|start|>assistant
/// ```
#[derive(Debug, Clone, Default)]
pub struct HarmonyRenderer {
    current_date: Option<NaiveDate>,
}

impl HarmonyRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the date written into the system header.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.current_date = Some(date);
        self
    }

    fn system_header(&self, effort: ReasoningEffort) -> String {
        let date = self
            .current_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        format!(
            "{}\nKnowledge cutoff: {}\nCurrent date: {}\n\nReasoning: {}\n\n# Valid channels: analysis, final. Channel must be included for every message.",
            HARMONY_IDENTITY,
            HARMONY_KNOWLEDGE_CUTOFF,
            date.format("%Y-%m-%d"),
            effort.as_str()
        )
    }
}

fn push_message(prompt: &mut String, role: &str, body: &str) {
    prompt.push_str(markers::START);
    prompt.push_str(role);
    prompt.push_str(markers::MESSAGE);
    prompt.push_str(body);
    prompt.push_str(END);
}

impl PromptRenderer for HarmonyRenderer {
    fn render(&self, turns: &[ConversationTurn], effort: ReasoningEffort) -> String {
        let mut prompt = String::new();
        push_message(&mut prompt, "system", &self.system_header(effort));

        for turn in turns {
            match turn.role {
                Role::System => {
                    push_message(
                        &mut prompt,
                        "developer",
                        &format!("# Instructions\n\n{}", turn.text),
                    );
                }
                Role::User => push_message(&mut prompt, "user", &turn.text),
                Role::Assistant => {
                    prompt.push_str(markers::START);
                    prompt.push_str("assistant");
                    prompt.push_str(FINAL_OPEN);
                    prompt.push_str(&turn.text);
                    prompt.push_str(END);
                }
            }
        }

        prompt.push_str(markers::START);
        prompt.push_str("assistant");
        prompt
    }

    fn name(&self) -> &str {
        "harmony"
    }
}
