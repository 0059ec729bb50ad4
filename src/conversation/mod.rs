//! Hobby discovery conversation.
//!
//! A fixed script walks the user through greeting, interests, dislikes and
//! lifestyle, then recommends hobbies and answers follow-ups. Facts are
//! extracted from each message by the model and accumulated per session.

pub mod extract;
pub mod machine;
pub mod prompts;
pub mod routes;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use extract::Extractor;
pub use machine::{ConversationEngine, StepHandler, TurnOutcome};
pub use routes::{ChatRouteState, app, chat_routes};
pub use state::{HistoryEntry, Lifestyle, MessageType, Role, SessionSnapshot, SessionState, Step};
pub use store::SessionStore;
