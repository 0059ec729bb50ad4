//! Conversation state: the step marker and the profile gathered so far.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The steps of the hobby discovery script.
///
/// Progresses linearly: Greeting → CollectInterests → CollectDislikes →
/// CollectLifestyle → Followup. CollectInterests may repeat until enough
/// interests are known; Followup repeats forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Step {
    Greeting,
    CollectInterests,
    CollectDislikes,
    CollectLifestyle,
    Followup,
}

impl Step {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: Step) -> bool {
        use Step::*;
        matches!(
            (self, target),
            (Greeting, CollectInterests)
                | (CollectInterests, CollectInterests)
                | (CollectInterests, CollectDislikes)
                | (CollectDislikes, CollectLifestyle)
                | (CollectLifestyle, Followup)
                | (Followup, Followup)
        )
    }
}

/// Unknown step names map to `Followup`: the conversation is treated as
/// already complete.
impl From<&str> for Step {
    fn from(name: &str) -> Self {
        match name.trim() {
            "greeting" => Self::Greeting,
            "collect_interests" => Self::CollectInterests,
            "collect_dislikes" => Self::CollectDislikes,
            "collect_lifestyle" => Self::CollectLifestyle,
            _ => Self::Followup,
        }
    }
}

impl From<String> for Step {
    fn from(name: String) -> Self {
        Step::from(name.as_str())
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::Greeting
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Greeting => "greeting",
            Self::CollectInterests => "collect_interests",
            Self::CollectDislikes => "collect_dislikes",
            Self::CollectLifestyle => "collect_lifestyle",
            Self::Followup => "followup",
        };
        write!(f, "{s}")
    }
}

/// Intent of the most recent reply. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Question,
    Suggestion,
    Followup,
}

impl Default for MessageType {
    fn default() -> Self {
        Self::Question
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Question => "question",
            Self::Suggestion => "suggestion",
            Self::Followup => "followup",
        };
        write!(f, "{s}")
    }
}

/// Who said a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Lifestyle constraints. Absent facts are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifestyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_availability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,
}

impl Lifestyle {
    pub fn is_empty(&self) -> bool {
        self.time_availability.is_none() && self.budget.is_none() && self.space.is_none()
    }

    /// Overwrite any key present in `other`; keep the rest.
    pub fn merge(&mut self, other: Lifestyle) {
        if other.time_availability.is_some() {
            self.time_availability = other.time_availability;
        }
        if other.budget.is_some() {
            self.budget = other.budget;
        }
        if other.space.is_some() {
            self.space = other.space;
        }
    }
}

impl std::fmt::Display for Lifestyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = [
            ("time_availability", &self.time_availability),
            ("budget", &self.budget),
            ("space", &self.space),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}: {v}")))
        .collect();

        if parts.is_empty() {
            write!(f, "none shared yet")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Everything known about one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub step: Step,
    pub interests: BTreeSet<String>,
    pub dislikes: BTreeSet<String>,
    pub lifestyle: Lifestyle,
    /// Append-only transcript, one user and one assistant entry per turn.
    pub conversation_history: Vec<HistoryEntry>,
    pub message_type: MessageType,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            step: Step::default(),
            interests: BTreeSet::new(),
            dislikes: BTreeSet::new(),
            lifestyle: Lifestyle::default(),
            conversation_history: Vec::new(),
            message_type: MessageType::default(),
            is_complete: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_user(&mut self, content: &str) {
        self.push_history(Role::User, content);
    }

    pub fn record_assistant(&mut self, content: &str) {
        self.push_history(Role::Assistant, content);
    }

    fn push_history(&mut self, role: Role, content: &str) {
        self.conversation_history.push(HistoryEntry {
            role,
            content: content.to_string(),
        });
        self.updated_at = Utc::now();
    }

    /// Merge newly extracted interests. Returns how many were new.
    pub fn merge_interests(&mut self, found: impl IntoIterator<Item = String>) -> usize {
        let before = self.interests.len();
        self.interests.extend(found);
        self.interests.len() - before
    }

    /// Merge newly extracted dislikes. Returns how many were new.
    pub fn merge_dislikes(&mut self, found: impl IntoIterator<Item = String>) -> usize {
        let before = self.dislikes.len();
        self.dislikes.extend(found);
        self.dislikes.len() - before
    }

    /// Move to `next`. Invalid transitions are logged and applied anyway so
    /// a turn always completes.
    pub fn advance_to(&mut self, next: Step) {
        if !self.step.can_transition_to(next) {
            tracing::warn!(
                session_id = %self.session_id,
                from = %self.step,
                to = %next,
                "Unexpected step transition"
            );
        }
        self.step = next;
    }

    /// Number of completed turns.
    pub fn turns(&self) -> usize {
        self.conversation_history.len() / 2
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            current_step: self.step,
            interests: self.interests.iter().cloned().collect(),
            dislikes: self.dislikes.iter().cloned().collect(),
            lifestyle_info: self.lifestyle.clone(),
            message_type: self.message_type,
            is_complete: self.is_complete,
            conversation_length: self.conversation_history.len(),
            conversation_history: self.conversation_history.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Read-only profile view returned by the session endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub current_step: Step,
    pub interests: Vec<String>,
    pub dislikes: Vec<String>,
    pub lifestyle_info: Lifestyle,
    pub message_type: MessageType,
    pub is_complete: bool,
    pub conversation_length: usize,
    pub conversation_history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STEPS: [Step; 5] = [
        Step::Greeting,
        Step::CollectInterests,
        Step::CollectDislikes,
        Step::CollectLifestyle,
        Step::Followup,
    ];

    #[test]
    fn valid_transitions() {
        use Step::*;
        let transitions = [
            (Greeting, CollectInterests),
            (CollectInterests, CollectInterests),
            (CollectInterests, CollectDislikes),
            (CollectDislikes, CollectLifestyle),
            (CollectLifestyle, Followup),
            (Followup, Followup),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use Step::*;
        assert!(!Greeting.can_transition_to(CollectDislikes));
        assert!(!CollectDislikes.can_transition_to(CollectInterests));
        assert!(!Followup.can_transition_to(Greeting));
        assert!(!CollectDislikes.can_transition_to(CollectDislikes));
    }

    #[test]
    fn display_matches_serde() {
        for step in ALL_STEPS {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{step}\""), json);
        }
        for kind in [
            MessageType::Question,
            MessageType::Suggestion,
            MessageType::Followup,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(format!("\"{kind}\""), json);
        }
    }

    #[test]
    fn unknown_step_names_default_to_followup() {
        for step in ALL_STEPS {
            assert_eq!(Step::from(step.to_string()), step);
        }
        assert_eq!(Step::from("handle_followup"), Step::Followup);
        assert_eq!(Step::from("something_else"), Step::Followup);
    }

    #[test]
    fn unknown_step_deserializes_as_followup() {
        let step: Step = serde_json::from_str("\"handle_followup\"").unwrap();
        assert_eq!(step, Step::Followup);
        let step: Step = serde_json::from_str("\"collect_dislikes\"").unwrap();
        assert_eq!(step, Step::CollectDislikes);
    }

    #[test]
    fn new_session_is_empty_greeting() {
        let state = SessionState::new("abc");
        assert_eq!(state.session_id, "abc");
        assert_eq!(state.step, Step::Greeting);
        assert_eq!(state.message_type, MessageType::Question);
        assert!(state.interests.is_empty());
        assert!(state.dislikes.is_empty());
        assert!(state.lifestyle.is_empty());
        assert!(state.conversation_history.is_empty());
        assert!(!state.is_complete);
    }

    #[test]
    fn merges_deduplicate_case_sensitively() {
        let mut state = SessionState::new("s");
        let added = state.merge_interests(vec!["painting".to_string(), "hiking".to_string()]);
        assert_eq!(added, 2);
        let added = state.merge_interests(vec![
            "hiking".to_string(),
            "Hiking".to_string(),
            "hiking".to_string(),
        ]);
        assert_eq!(added, 1);
        assert_eq!(state.interests.len(), 3);

        state.merge_dislikes(vec!["gyms".to_string(), "gyms".to_string()]);
        assert_eq!(state.dislikes.len(), 1);
    }

    #[test]
    fn lifestyle_merge_overwrites_present_keys_only() {
        let mut lifestyle = Lifestyle {
            time_availability: Some("limited".to_string()),
            budget: Some("small".to_string()),
            space: None,
        };
        lifestyle.merge(Lifestyle {
            budget: Some("flexible".to_string()),
            space: Some("apartment".to_string()),
            ..Default::default()
        });
        assert_eq!(lifestyle.time_availability.as_deref(), Some("limited"));
        assert_eq!(lifestyle.budget.as_deref(), Some("flexible"));
        assert_eq!(lifestyle.space.as_deref(), Some("apartment"));
    }

    #[test]
    fn lifestyle_serializes_present_keys_only() {
        let lifestyle = Lifestyle {
            budget: Some("small".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&lifestyle).unwrap(),
            serde_json::json!({"budget": "small"})
        );
        assert_eq!(lifestyle.to_string(), "budget: small");
        assert_eq!(Lifestyle::default().to_string(), "none shared yet");
    }

    #[test]
    fn snapshot_reports_transcript_length() {
        let mut state = SessionState::new("s");
        state.record_user("hi");
        state.record_assistant("hello!");
        let snapshot = state.snapshot();
        assert_eq!(snapshot.conversation_length, 2);
        assert_eq!(state.turns(), 1);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["current_step"], "greeting");
        assert_eq!(json["conversation_history"][0]["role"], "user");
        assert_eq!(json["conversation_history"][1]["content"], "hello!");
        assert_eq!(json["lifestyle_info"], serde_json::json!({}));
    }
}
