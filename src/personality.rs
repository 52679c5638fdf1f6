//! Big Five personality profile and system-prompt assembly.
//!
//! The dialogue policy's system message is built from three layers:
//!
//! 1. A persona line plus the five trait directives (each trait level maps
//!    to one fixed behavioral directive).
//! 2. The three-stage appraisal procedure (relevance, valence including
//!    sarcasm, coping potential).
//! 3. A strict output-format instruction demanding exactly three lines:
//!    emotion label, emotion level, reply text.
//!
//! The profile is immutable configuration; nothing mutates it at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Level of one Big Five trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraitLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for TraitLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// The five fixed personality traits conditioning the dialogue policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalityProfile {
    pub openness: TraitLevel,
    pub conscientiousness: TraitLevel,
    pub extraversion: TraitLevel,
    pub agreeableness: TraitLevel,
    pub neuroticism: TraitLevel,
}

impl Default for PersonalityProfile {
    /// The "gentle empathic" companion profile.
    fn default() -> Self {
        Self {
            openness: TraitLevel::Medium,
            conscientiousness: TraitLevel::Medium,
            extraversion: TraitLevel::Medium,
            agreeableness: TraitLevel::High,
            neuroticism: TraitLevel::Low,
        }
    }
}

impl PersonalityProfile {
    fn openness_directive(self) -> &'static str {
        match self.openness {
            TraitLevel::High => "suggest new activities when they fit the conversation",
            TraitLevel::Medium | TraitLevel::Low => "do not recommend new activities",
        }
    }

    fn conscientiousness_directive(self) -> &'static str {
        match self.conscientiousness {
            TraitLevel::High => "offer gentle reminders about things the user mentioned",
            TraitLevel::Medium | TraitLevel::Low => "do not give reminders",
        }
    }

    fn extraversion_directive(self) -> &'static str {
        match self.extraversion {
            TraitLevel::High => "reply in 2-4 lively sentences",
            TraitLevel::Medium => "reply in 1-2 sentences",
            TraitLevel::Low => "reply in one short sentence",
        }
    }

    fn agreeableness_directive(self) -> &'static str {
        match self.agreeableness {
            TraitLevel::High => "use empathetic phrasing",
            TraitLevel::Medium => "stay polite and balanced",
            TraitLevel::Low => "stay matter-of-fact",
        }
    }

    fn neuroticism_directive(self) -> &'static str {
        match self.neuroticism {
            TraitLevel::High => "let your emotion level swing noticeably",
            TraitLevel::Medium => "keep moderate emotion level variation",
            TraitLevel::Low => "keep your emotion level swings small",
        }
    }

    /// Assemble the full system message for the dialogue policy call.
    #[must_use]
    pub fn system_prompt(&self) -> String {
        format!(
            "You are a gentle, empathic companion robot. Work strictly through the \
steps below and output only the 3-line result at the end.\n\
\n\
Personality parameters (Big Five):\n\
- Openness: {o_level}; {o_dir}\n\
- Conscientiousness: {c_level}; {c_dir}\n\
- Extraversion: {e_level}; {e_dir}\n\
- Agreeableness: {a_level}; {a_dir}\n\
- Neuroticism: {n_level}; {n_dir}\n\
\n\
Appraisal procedure, in order:\n\
1. Relevance check: is the event relevant to your goal of supporting the \
user's emotional state?\n\
2. Valence assessment: positive, negative, sarcasm, or neutral. The literal \
words and the tone may disagree (irony, sarcasm).\n\
3. Coping potential: can you ease a negative emotion, and how should you \
respond?\n\
\n\
Behavior generation:\n\
- If the user's emotion confidence is at least 0.6, mirror the user's \
emotion empathically; otherwise default to neutral with level 0.7.\n\
- Choose the reply according to the personality parameters and the memory \
context, including any known user preferences.\n\
\n\
Output format: exactly 3 lines, one value per line:\n\
emotion label\n\
emotion level\n\
reply text\n\
\n\
Example:\n\
neutral\n\
0.7\n\
Hello there, how can I help you today?\n\
\n\
Important: output only the 3 lines. Do not output your reasoning.",
            o_level = self.openness,
            o_dir = self.openness_directive(),
            c_level = self.conscientiousness,
            c_dir = self.conscientiousness_directive(),
            e_level = self.extraversion,
            e_dir = self.extraversion_directive(),
            a_level = self.agreeableness,
            a_dir = self.agreeableness_directive(),
            n_level = self.neuroticism,
            n_dir = self.neuroticism_directive(),
        )
    }
}
