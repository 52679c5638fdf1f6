//! Conversation memory.
//!
//! Two layers with different lifetimes:
//!
//! - [`ShortTermMemory`] holds exactly the previous completed turn and is
//!   overwritten wholesale on every turn.
//! - [`SemanticMemory`] accumulates boolean user-preference flags for the
//!   whole session. Flags only ever flip from absent/false to true, so a
//!   preference observed once stays known.

use crate::emotion::Emotion;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Context line used when no prior turn exists yet.
pub const NO_PRIOR_INTERACTION: &str = "no prior interaction";

/// Preference flags and the substrings that trigger them. Matching is
/// case-insensitive on the user's transcribed speech.
const PREFERENCE_TRIGGERS: &[(&str, &[&str])] = &[
    ("appreciates_gratitude", &["谢谢", "感谢", "thank"]),
    ("likes_humor", &["幽默", "搞笑", "humor", "funny"]),
    (
        "curious_about_identity",
        &["名字", "叫什么", "your name", "who are you"],
    ),
];

/// Snapshot of one completed turn, both sides.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortTermMemory {
    pub user_voice: String,
    pub user_emotion: Emotion,
    pub robot_emotion: Emotion,
    pub robot_level: f32,
    pub robot_response: String,
}

/// Session-scoped accumulated knowledge about the user.
///
/// `behavior_patterns` and `emotional_trends` are carried for future
/// summarization passes and are not yet populated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemanticMemory {
    pub user_preferences: BTreeMap<String, bool>,
    pub behavior_patterns: Vec<String>,
    pub emotional_trends: Vec<String>,
}

impl SemanticMemory {
    /// Flip on any preference whose trigger substring occurs in `voice_text`.
    /// Already-set flags are never cleared.
    pub fn extract_preferences(&mut self, voice_text: &str) {
        let lowered = voice_text.to_lowercase();
        for (flag, triggers) in PREFERENCE_TRIGGERS {
            if triggers.iter().any(|t| lowered.contains(t)) {
                self.user_preferences.insert((*flag).to_string(), true);
            }
        }
    }
}

/// Combined memory handed to the dialogue policy each turn.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    last_turn: Option<ShortTermMemory>,
    semantic: SemanticMemory,
}

impl ConversationMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_turn(&self) -> Option<&ShortTermMemory> {
        self.last_turn.as_ref()
    }

    #[must_use]
    pub fn semantic(&self) -> &SemanticMemory {
        &self.semantic
    }

    /// Record a completed turn: preference extraction first, then the
    /// short-term snapshot is replaced.
    pub fn update(&mut self, turn: ShortTermMemory) {
        self.semantic.extract_preferences(&turn.user_voice);
        self.last_turn = Some(turn);
    }

    /// Render the memory as the context block for the policy's user message.
    #[must_use]
    pub fn context_text(&self) -> String {
        let mut out = String::new();
        match &self.last_turn {
            Some(turn) => {
                let _ = writeln!(
                    out,
                    "Previous turn: the user said \"{}\" (emotion: {}), you replied \
\"{}\" (emotion: {}, level: {:.1}).",
                    turn.user_voice,
                    turn.user_emotion,
                    turn.robot_response,
                    turn.robot_emotion,
                    turn.robot_level,
                );
            }
            None => {
                let _ = writeln!(out, "Previous turn: {NO_PRIOR_INTERACTION}.");
            }
        }
        let known: Vec<&str> = self
            .semantic
            .user_preferences
            .iter()
            .filter(|(_, set)| **set)
            .map(|(flag, _)| flag.as_str())
            .collect();
        if !known.is_empty() {
            let _ = writeln!(out, "Known user preferences: {}.", known.join(", "));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn turn(voice: &str) -> ShortTermMemory {
        ShortTermMemory {
            user_voice: voice.to_string(),
            user_emotion: Emotion::Happy,
            robot_emotion: Emotion::Happy,
            robot_level: 0.8,
            robot_response: "Glad to hear it!".to_string(),
        }
    }

    #[test]
    fn empty_memory_reports_no_prior_interaction() {
        let memory = ConversationMemory::new();
        assert!(memory.context_text().contains(NO_PRIOR_INTERACTION));
        assert!(!memory.context_text().contains("preferences"));
    }

    #[test]
    fn update_replaces_last_turn() {
        let mut memory = ConversationMemory::new();
        memory.update(turn("first"));
        memory.update(turn("second"));
        assert_eq!(memory.last_turn().unwrap().user_voice, "second");
        assert!(memory.context_text().contains("second"));
        assert!(!memory.context_text().contains("first"));
    }

    #[test]
    fn gratitude_trigger_sets_preference() {
        let mut memory = ConversationMemory::new();
        memory.update(turn("thank you so much"));
        assert_eq!(
            memory.semantic().user_preferences.get("appreciates_gratitude"),
            Some(&true)
        );
        assert!(memory.context_text().contains("appreciates_gratitude"));
    }

    #[test]
    fn chinese_triggers_match() {
        let mut memory = ConversationMemory::new();
        memory.update(turn("谢谢你，你叫什么名字？"));
        let prefs = &memory.semantic().user_preferences;
        assert_eq!(prefs.get("appreciates_gratitude"), Some(&true));
        assert_eq!(prefs.get("curious_about_identity"), Some(&true));
        assert_eq!(prefs.get("likes_humor"), None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let mut semantic = SemanticMemory::default();
        semantic.extract_preferences("THANK YOU");
        assert_eq!(
            semantic.user_preferences.get("appreciates_gratitude"),
            Some(&true)
        );
    }

    #[test]
    fn preferences_accumulate_and_never_clear() {
        let mut memory = ConversationMemory::new();
        memory.update(turn("that was so funny"));
        memory.update(turn("just the weather please"));
        assert_eq!(
            memory.semantic().user_preferences.get("likes_humor"),
            Some(&true)
        );
    }

    #[test]
    fn extraction_is_idempotent() {
        let mut semantic = SemanticMemory::default();
        semantic.extract_preferences("thank you");
        let snapshot = semantic.clone();
        semantic.extract_preferences("thanks again");
        assert_eq!(semantic, snapshot);
    }
}
