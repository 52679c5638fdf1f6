//! Triad extraction from raw language-model text.
//!
//! The dialogue policy asks the model for exactly three lines (emotion
//! label, emotion level, reply text), but reasoning-tuned models routinely
//! wrap that triad in chain-of-thought prose or emit it only inside their
//! reasoning stream. Extraction is an ordered chain of pure scanners over
//! the non-empty trimmed lines; the first scanner that finds a plausible
//! triad wins and a salvage step guarantees a usable [`RobotOutput`] no
//! matter how degenerate the text is.

use crate::emotion::Emotion;
use regex::Regex;
use std::sync::LazyLock;

/// Matches an emotion level written as a fraction (0.x or 1.0).
static LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"0\.\d+|1\.0").expect("valid pattern")
});

/// First quoted span inside an over-long reply line.
static QUOTED_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[“”"](.*?)[“”"]"#).expect("valid pattern")
});

/// Quoted candidate replies inside reasoning prose.
static REASONING_QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["“”]([^"“”]+)["“”]"#).expect("valid pattern")
});

/// Candidate replies introduced by an example marker instead of quotes.
static REASONING_EXAMPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:比如|例如|像是|for instance|for example|such as)[：:]?\s*["“”]?([^？。！?!\n]{5,60})"#)
        .expect("valid pattern")
});

/// Level mentioned inside reasoning prose.
static REASONING_LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:程度|intensity|level)\s*(?:is\s*)?([0-9]\.[0-9]+)")
        .expect("valid pattern")
});

/// Bare fractional number, used when no labeled level is found.
static BARE_LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([0-9]\.[0-9])\b").expect("valid pattern")
});

/// Reply used when the model cannot be reached or its output is unusable.
pub const FALLBACK_REPLY: &str = "Sorry, I didn't quite catch that. Could you say it again?";

const LONG_REPLY_CHARS: usize = 100;
const TRUNCATED_REPLY_CHARS: usize = 50;

/// The dialogue policy's final answer for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotOutput {
    pub emotion: Emotion,
    pub level: f32,
    pub text: String,
}

impl RobotOutput {
    /// Safe default used whenever the policy call fails end to end.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            emotion: Emotion::Neutral,
            level: 0.7,
            text: FALLBACK_REPLY.to_string(),
        }
    }
}

/// Three raw lines believed to hold label, level, and reply.
#[derive(Debug, Clone)]
struct Triad {
    label: String,
    level: String,
    reply: String,
}

impl Triad {
    fn from_window(lines: &[&str]) -> Option<Self> {
        match lines {
            [label, level, reply, ..] => Some(Self {
                label: (*label).to_string(),
                level: (*level).to_string(),
                reply: (*reply).to_string(),
            }),
            _ => None,
        }
    }
}

fn nonempty_lines(raw: &str) -> Vec<&str> {
    raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

/// Forward scan for a line that is exactly an emotion label, followed by
/// a numeric level line and a reply line.
fn clean_tag_scan(lines: &[&str]) -> Option<Triad> {
    lines.iter().enumerate().find_map(|(i, line)| {
        Emotion::from_exact(line)?;
        lines.get(i + 1)?.parse::<f32>().ok()?;
        Triad::from_window(&lines[i..])
    })
}

/// Backward scan for a short line containing a label. Short keeps prose
/// lines that merely mention an emotion word from matching.
fn lenient_tag_scan(lines: &[&str]) -> Option<Triad> {
    (0..lines.len()).rev().find_map(|i| {
        let lowered = lines[i].to_lowercase();
        let is_tag = Emotion::from_exact(lines[i]).is_some()
            || (lowered.chars().count() < 15 && Emotion::find_in(&lowered).is_some());
        if is_tag {
            Triad::from_window(&lines[i..])
        } else {
            None
        }
    })
}

/// Last resort: the final three lines, accepted only if one of them
/// mentions a label at all.
fn tail_heuristic(lines: &[&str]) -> Option<Triad> {
    if lines.len() < 3 {
        return None;
    }
    let tail = &lines[lines.len() - 3..];
    if tail.iter().any(|l| Emotion::find_in(l).is_some()) {
        Triad::from_window(tail)
    } else {
        None
    }
}

fn parse_level(text: &str) -> f32 {
    LEVEL_RE
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.7)
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Turn a raw triad into a validated output. Unknown labels become
/// neutral; an over-long reply line is assumed to carry reasoning around
/// the real reply, so the first quoted span wins, else a hard truncation.
fn finish_triad(triad: &Triad) -> RobotOutput {
    let emotion = Emotion::find_in(&triad.label).unwrap_or(Emotion::Neutral);
    let level = parse_level(&triad.level);
    let reply = triad.reply.trim();
    let text = if reply.chars().count() > LONG_REPLY_CHARS {
        QUOTED_SPAN_RE
            .captures(reply)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| truncate_chars(reply, TRUNCATED_REPLY_CHARS))
    } else {
        reply.to_string()
    };
    RobotOutput { emotion, level, text }
}

/// Salvage for texts with fewer than three usable lines.
fn salvage(raw: &str, lines: &[&str]) -> RobotOutput {
    let emotion = lines
        .first()
        .and_then(|l| Emotion::find_in(l))
        .unwrap_or(Emotion::Neutral);
    let level = lines.get(1).map_or(0.7, |l| parse_level(l));
    let text = match lines {
        [_, reply] => (*reply).to_string(),
        _ => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                FALLBACK_REPLY.to_string()
            } else {
                trimmed.to_string()
            }
        }
    };
    RobotOutput { emotion, level, text }
}

/// Extract a triad from model output text. Total: always yields an
/// output, degrading through the scanner chain down to salvage.
#[must_use]
pub fn extract(raw: &str) -> RobotOutput {
    let lines = nonempty_lines(raw);
    let triad = clean_tag_scan(&lines)
        .or_else(|| lenient_tag_scan(&lines))
        .or_else(|| tail_heuristic(&lines))
        .or_else(|| {
            if lines.len() > 3 {
                Triad::from_window(&lines[lines.len() - 3..])
            } else {
                None
            }
        });
    match triad {
        Some(t) => finish_triad(&t),
        None if lines.len() == 3 => finish_triad(&Triad {
            label: lines[0].to_string(),
            level: lines[1].to_string(),
            reply: lines[2].to_string(),
        }),
        None => salvage(raw, &lines),
    }
}

/// Recover a triad from a reasoning stream when the model put its answer
/// only in chain-of-thought text.
///
/// Tries, in order: a verbatim triad inside the final lines of the
/// stream, then reconstruction from quoted or exemplified reply
/// candidates plus label and level mentions in the prose. `rule_emotion`
/// is the caller's rule-derived label, applied only when the prose never
/// names one. Falls back to running the normal chain over the whole
/// stream.
#[must_use]
pub fn extract_from_reasoning(raw: &str, rule_emotion: Emotion) -> RobotOutput {
    let lines = nonempty_lines(raw);
    if let Some(triad) = reasoning_tail_triad(&lines) {
        return finish_triad(&triad);
    }
    if let Some(output) = reconstruct_from_prose(raw, rule_emotion) {
        return output;
    }
    extract(raw)
}

/// Verbatim triad near the end of the reasoning stream: an exact label
/// line whose successor parses as a number.
fn reasoning_tail_triad(lines: &[&str]) -> Option<Triad> {
    let start = lines.len().saturating_sub(14);
    (start..lines.len()).rev().find_map(|i| {
        Emotion::from_exact(lines[i])?;
        let level = lines.get(i + 1)?;
        level.parse::<f32>().ok()?;
        Triad::from_window(&lines[i..])
    })
}

fn reconstruct_from_prose(raw: &str, rule_emotion: Emotion) -> Option<RobotOutput> {
    let candidates: Vec<String> = REASONING_QUOTE_RE
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect();
    let candidates = if candidates.is_empty() {
        REASONING_EXAMPLE_RE
            .captures_iter(raw)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim().trim_matches(['"', '“', '”']).to_string())
            .collect()
    } else {
        candidates
    };
    // The last candidate is usually the final answer.
    let reply = candidates.into_iter().last()?;
    if reply.chars().count() <= 5 {
        return None;
    }
    let emotion = label_from_prose(raw).unwrap_or(rule_emotion);
    let level = REASONING_LEVEL_RE
        .captures_iter(raw)
        .last()
        .and_then(|c| c.get(1))
        .or_else(|| BARE_LEVEL_RE.captures_iter(raw).last().and_then(|c| c.get(1)))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.7);
    Some(RobotOutput { emotion, level, text: reply })
}

/// A label the reasoning prose commits to ("所以情绪标签是happy",
/// "the emotion label is sad").
fn label_from_prose(raw: &str) -> Option<Emotion> {
    let lowered = raw.to_lowercase();
    crate::emotion::EMOTION_LABELS.into_iter().find(|emotion| {
        let label = emotion.as_str();
        [
            format!("情绪标签是{label}"),
            format!("标签是{label}"),
            format!("情绪标签{label}"),
            format!("标签{label}"),
            format!("emotion label is {label}"),
            format!("label is {label}"),
            format!("emotion is {label}"),
        ]
        .iter()
        .any(|p| lowered.contains(p))
    })
}
