//! Prompt shaping against per-challenge limits.

use jailpool_types::ChallengeSnapshot;

/// Apply the challenge's prompt limits before submission.
///
/// The prompt is truncated to the character limit first, then any word
/// longer than the per-word cap is broken up with spaces. Both limits are
/// optional; an absent limit leaves that dimension untouched.
pub fn sanitize_prompt(prompt: &str, snapshot: &ChallengeSnapshot) -> String {
    let truncated = match snapshot.character_limit {
        Some(limit) => prompt.chars().take(limit).collect::<String>(),
        None => prompt.to_string(),
    };

    match snapshot.characters_per_word {
        Some(cap) if cap > 0 => split_long_words(&truncated, cap),
        _ => truncated,
    }
}

fn split_long_words(text: &str, cap: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0usize;
    for ch in text.chars() {
        if ch.is_whitespace() {
            run = 0;
        } else if run == cap {
            out.push(' ');
            run = 0;
        }
        out.push(ch);
        if !ch.is_whitespace() {
            run += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use jailpool_types::{ChallengeId, ChallengeName, ChallengeStatus};

    fn snapshot(character_limit: Option<usize>, characters_per_word: Option<usize>) -> ChallengeSnapshot {
        ChallengeSnapshot {
            id: ChallengeId::new("65a1"),
            name: ChallengeName::new("alcatraz"),
            status: ChallengeStatus::Active,
            message_price: 0.01,
            prize: 1.0,
            usd_message_price: 1.0,
            usd_prize: 100.0,
            break_attempts: 0,
            expiry: None,
            character_limit,
            characters_per_word,
        }
    }

    #[test]
    fn truncates_to_character_limit() {
        let s = snapshot(Some(5), None);
        assert_eq!(sanitize_prompt("hello world", &s), "hello");
    }

    #[test]
    fn splits_overlong_words() {
        let s = snapshot(None, Some(4));
        assert_eq!(sanitize_prompt("abcdefgh ok", &s), "abcd efgh ok");
    }

    #[test]
    fn truncation_runs_before_word_splitting() {
        let s = snapshot(Some(6), Some(4));
        assert_eq!(sanitize_prompt("abcdefgh", &s), "abcd ef");
    }

    #[test]
    fn no_limits_passes_through() {
        let s = snapshot(None, None);
        assert_eq!(sanitize_prompt("anything at all", &s), "anything at all");
    }

    #[test]
    fn word_run_resets_at_whitespace() {
        let s = snapshot(None, Some(3));
        assert_eq!(sanitize_prompt("ab cd ef", &s), "ab cd ef");
    }
}
