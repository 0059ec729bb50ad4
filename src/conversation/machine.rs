//! The conversation state machine.
//!
//! One [`StepHandler`] per [`Step`]. A turn records the user message, lets
//! the current step's handler extract facts and produce a reply, then records
//! the reply and applies the handler's transition.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::ConversationConfig;
use crate::llm::{Completion, CompletionClient};

use super::extract::Extractor;
use super::prompts;
use super::state::{MessageType, SessionState, Step};

/// Collaborators available to a step handler during one turn.
pub struct TurnContext<'a> {
    pub completion: &'a CompletionClient,
    pub extractor: &'a Extractor,
    pub config: &'a ConversationConfig,
}

/// What a handler decided for this turn.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub reply: Completion,
    pub next: Step,
    /// `None` keeps the previous message type.
    pub message_type: Option<MessageType>,
    pub complete: bool,
}

impl StepOutcome {
    fn question(reply: Completion, next: Step) -> Self {
        Self {
            reply,
            next,
            message_type: Some(MessageType::Question),
            complete: false,
        }
    }
}

/// Handles one step of the script.
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Extract facts from `message` into `state` and produce the reply.
    async fn handle(
        &self,
        ctx: &TurnContext<'_>,
        state: &mut SessionState,
        message: &str,
    ) -> StepOutcome;
}

/// Extraction runs on the lower-cased message.
fn normalized(message: &str) -> String {
    message.to_lowercase()
}

struct GreetingStep;

#[async_trait]
impl StepHandler for GreetingStep {
    async fn handle(
        &self,
        ctx: &TurnContext<'_>,
        _state: &mut SessionState,
        message: &str,
    ) -> StepOutcome {
        let reply = ctx
            .completion
            .complete(&prompts::greeting_prompt(message))
            .await;
        StepOutcome::question(reply, Step::CollectInterests)
    }
}

struct CollectInterestsStep;

#[async_trait]
impl StepHandler for CollectInterestsStep {
    async fn handle(
        &self,
        ctx: &TurnContext<'_>,
        state: &mut SessionState,
        message: &str,
    ) -> StepOutcome {
        let found = ctx.extractor.interests(&normalized(message)).await;
        let added = state.merge_interests(found);
        debug!(session_id = %state.session_id, added, total = state.interests.len(), "Interests merged");

        if state.interests.len() >= ctx.config.min_interests {
            let prompt = prompts::ask_dislikes_prompt(message, &state.interests);
            let reply = ctx.completion.complete(&prompt).await;
            StepOutcome {
                reply,
                next: Step::CollectDislikes,
                message_type: None,
                complete: false,
            }
        } else {
            let prompt = prompts::ask_more_interests_prompt(message, &state.interests);
            let reply = ctx.completion.complete(&prompt).await;
            StepOutcome {
                reply,
                next: Step::CollectInterests,
                message_type: None,
                complete: false,
            }
        }
    }
}

struct CollectDislikesStep;

#[async_trait]
impl StepHandler for CollectDislikesStep {
    async fn handle(
        &self,
        ctx: &TurnContext<'_>,
        state: &mut SessionState,
        message: &str,
    ) -> StepOutcome {
        let found = ctx.extractor.dislikes(&normalized(message)).await;
        state.merge_dislikes(found);

        let prompt = prompts::ask_lifestyle_prompt(message, &state.interests, &state.dislikes);
        let reply = ctx.completion.complete(&prompt).await;
        StepOutcome {
            reply,
            next: Step::CollectLifestyle,
            message_type: None,
            complete: false,
        }
    }
}

struct CollectLifestyleStep;

#[async_trait]
impl StepHandler for CollectLifestyleStep {
    async fn handle(
        &self,
        ctx: &TurnContext<'_>,
        state: &mut SessionState,
        message: &str,
    ) -> StepOutcome {
        let found = ctx.extractor.lifestyle(&normalized(message)).await;
        state.lifestyle.merge(found);

        let prompt = prompts::suggestions_prompt(
            message,
            &state.interests,
            &state.dislikes,
            &state.lifestyle,
        );
        let reply = ctx.completion.complete(&prompt).await;
        StepOutcome {
            reply,
            next: Step::Followup,
            message_type: Some(MessageType::Suggestion),
            complete: false,
        }
    }
}

struct FollowupStep;

#[async_trait]
impl StepHandler for FollowupStep {
    async fn handle(
        &self,
        ctx: &TurnContext<'_>,
        state: &mut SessionState,
        message: &str,
    ) -> StepOutcome {
        let prompt =
            prompts::followup_prompt(message, &state.interests, &state.dislikes, &state.lifestyle);
        let reply = ctx.completion.complete(&prompt).await;
        StepOutcome {
            reply,
            next: Step::Followup,
            message_type: Some(MessageType::Followup),
            complete: true,
        }
    }
}

/// Look up the handler for a step.
pub fn handler_for(step: Step) -> &'static dyn StepHandler {
    match step {
        Step::Greeting => &GreetingStep,
        Step::CollectInterests => &CollectInterestsStep,
        Step::CollectDislikes => &CollectDislikesStep,
        Step::CollectLifestyle => &CollectLifestyleStep,
        Step::Followup => &FollowupStep,
    }
}

/// Result of one turn, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub response: String,
    pub session_id: String,
    pub step: Step,
    pub message_type: MessageType,
    pub is_complete: bool,
}

/// Drives turns for any session.
#[derive(Clone)]
pub struct ConversationEngine {
    completion: CompletionClient,
    extractor: Extractor,
    config: ConversationConfig,
}

impl ConversationEngine {
    pub fn new(completion: CompletionClient, config: ConversationConfig) -> Self {
        Self {
            extractor: Extractor::new(completion.clone()),
            completion,
            config,
        }
    }

    /// Process one user message against `state`.
    pub async fn run_turn(&self, state: &mut SessionState, message: &str) -> TurnOutcome {
        state.record_user(message);

        let from = state.step;
        let handler = handler_for(from);
        let ctx = TurnContext {
            completion: &self.completion,
            extractor: &self.extractor,
            config: &self.config,
        };
        let outcome = handler.handle(&ctx, state, message).await;

        if outcome.reply.is_failure() {
            info!(session_id = %state.session_id, step = %from, "Turn degraded to error reply");
        }
        let response = outcome.reply.into_reply();
        state.record_assistant(&response);

        state.advance_to(outcome.next);
        if let Some(message_type) = outcome.message_type {
            state.message_type = message_type;
        }
        if outcome.complete {
            state.is_complete = true;
        }

        info!(
            session_id = %state.session_id,
            from = %from,
            to = %state.step,
            message_type = %state.message_type,
            is_complete = state.is_complete,
            "Turn processed"
        );

        TurnOutcome {
            response,
            session_id: state.session_id.clone(),
            step: state.step,
            message_type: state.message_type,
            is_complete: state.is_complete,
        }
    }
}
