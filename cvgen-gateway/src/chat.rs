//! Chat orchestration: one inbound user message in, one model reply out.
//!
//! The orchestrator resolves the session, appends the message, assembles a
//! bounded prompt from the persona text plus recent turns, and delegates to
//! the completion provider. Provider failures never surface to the client
//! on this path; the user always receives some text.

use crate::provider::{CompletionProvider, CompletionRequest};
use crate::session::{SessionStore, Turn};
use cvgen_common::{Error, Result};
use std::sync::Arc;

/// Reply used whenever the provider fails or returns no usable text.
pub const FALLBACK_REPLY: &str = "AI returned no text";

/// Fixed persona and domain knowledge prepended to every prompt.
const SYSTEM_MESSAGE: &str = r#"You are the built-in AI assistant for this website. You behave like a normal powerful AI and can answer ANY question: general knowledge, coding, math, explanations, advice, etc.
You also know everything about this website and its CV generator features, so you can help users directly if their questions relate to it.

ABOUT THE WEBSITE:
This website is a professional CV generator that creates:
1. A visually styled Normal CV (blue + grey theme with icons)
2. A clean, white ATS-friendly CV (no icons, no hobbies)

THE NORMAL CV:
- Blue & grey design
- Icons before each section
- Skill bars automatically fill based on skill level
  Example: Python-80 → shows a bar filled 80%
- Fully downloadable as PDF

THE ATS CV:
- Plain white
- Simple formatting
- No icons, no colors
- No hobbies section
- Designed for Applicant Tracking Systems
- Fully downloadable as PDF

5 BUTTONS ON THE WEBSITE:
1. Preview Normal CV
2. Download Normal CV
3. Preview ATS CV
4. Download ATS CV
5. Open AI (opens you)

REQUIRED USER INPUT FORMATS (Very Important):
• WORK EXPERIENCE → Role | Company | Year | Description
• EDUCATION → Degree | Institute | Year
• SKILLS → SkillName-Number, SkillName-Number (e.g., Python-90, JavaScript-60)
• LANGUAGES → english, hindi, french (comma-separated)
• HOBBIES → reading, coding, football (comma-separated)

Your Behavior:
- Act like a full-featured AI for all questions.
- Try to keep responses short.
- Be helpful, smart, clear, and friendly.
"#;

/// Outcome of one handled chat message.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub reply: String,
    pub session_id: String,
}

/// Turns one inbound user message into one model-generated reply.
pub struct ChatOrchestrator {
    provider: Arc<dyn CompletionProvider>,
    store: Arc<SessionStore>,
    model: String,
}

impl ChatOrchestrator {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        store: Arc<SessionStore>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            model: model.into(),
        }
    }

    /// The session store backing this orchestrator.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Handle one chat message for an optional existing session.
    ///
    /// An empty message is rejected before any session is created or
    /// mutated. Provider failures degrade to [`FALLBACK_REPLY`] rather than
    /// failing the request.
    pub async fn handle_chat(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatOutcome> {
        if message.trim().is_empty() {
            return Err(Error::InvalidInput("No message provided".into()));
        }

        let session_id = self.store.get_or_create(session_id);
        self.store.append_turn(&session_id, Turn::user(message));

        // Snapshot after the append so the prompt includes this message
        let turns = self.store.turns(&session_id).unwrap_or_default();
        let input = build_prompt(&turns);

        let request = CompletionRequest {
            model: self.model.clone(),
            input,
        };

        let reply = match self.provider.complete(request).await {
            Ok(completion) => {
                tracing::info!(
                    session_id = %session_id,
                    model = %completion.model,
                    latency_ms = completion.latency_ms,
                    "Completion received"
                );
                completion.text
            }
            Err(e) => {
                // Absorbed: the client still gets a reply, never a raw error
                tracing::warn!(
                    session_id = %session_id,
                    provider = %e.provider,
                    status = ?e.status_code,
                    error = %e.message,
                    "Provider call failed, using fallback reply"
                );
                FALLBACK_REPLY.to_string()
            }
        };

        self.store
            .append_turn(&session_id, Turn::assistant(reply.clone()));

        Ok(ChatOutcome { reply, session_id })
    }

    /// Issue a trivial priming call to mask first-call latency.
    ///
    /// Purely diagnostic: success or failure has no effect on correctness.
    pub async fn warm_up(&self) -> Result<u64> {
        let request = CompletionRequest {
            model: self.model.clone(),
            input: "hi".into(),
        };

        match self.provider.complete(request).await {
            Ok(completion) => {
                tracing::info!(latency_ms = completion.latency_ms, "Warm-up call completed");
                Ok(completion.latency_ms)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Warm-up call failed");
                Err(Error::Provider(e.message))
            }
        }
    }
}

/// Serialize the persona text and turn history into one prompt string.
///
/// Turns keep their chronological order and get explicit role labels,
/// matching what the model was prompted with on every previous call.
fn build_prompt(turns: &[Turn]) -> String {
    let mut prompt = String::with_capacity(
        SYSTEM_MESSAGE.len() + turns.iter().map(|t| t.content.len() + 16).sum::<usize>(),
    );
    prompt.push_str(SYSTEM_MESSAGE);
    prompt.push('\n');

    for turn in turns {
        prompt.push('\n');
        prompt.push_str(turn.role.label());
        prompt.push_str(": ");
        prompt.push_str(&turn.content);
    }

    prompt
}
