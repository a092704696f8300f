//! Matching a requested language against the platform's voices.

use afrikunle_core::speech::Voice;

/// Picks the voice for `language`.
///
/// Order: a voice whose tag equals `language` (case-insensitive, `_` and `-`
/// treated alike), then one whose tag starts with the primary subtag, then
/// the first voice offered. `None` only when `voices` is empty.
#[must_use]
pub fn select_voice<'a>(voices: &'a [Voice], language: &str) -> Option<&'a Voice> {
    let wanted = canonical(language);
    let primary = wanted.split('-').next().unwrap_or_default().to_owned();

    voices
        .iter()
        .find(|voice| canonical(&voice.language) == wanted)
        .or_else(|| {
            voices.iter().find(|voice| {
                let tag = canonical(&voice.language);
                tag == primary || tag.starts_with(&format!("{primary}-"))
            })
        })
        .or_else(|| voices.first())
}

fn canonical(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use afrikunle_test_support::voice;

    use super::*;

    fn voices() -> Vec<Voice> {
        vec![
            voice("samantha", "Samantha", "en-US"),
            voice("daniel", "Daniel", "en-GB"),
            voice("thomas", "Thomas", "fr_FR"),
        ]
    }

    #[test]
    fn test_exact_tag_wins_over_prefix() {
        let voices = voices();

        assert_eq!(select_voice(&voices, "en-GB").unwrap().identifier, "daniel");
    }

    #[test]
    fn test_primary_subtag_prefix_matches_regional_voice() {
        let voices = voices();

        assert_eq!(select_voice(&voices, "fr-CA").unwrap().identifier, "thomas");
        assert_eq!(select_voice(&voices, "fr").unwrap().identifier, "thomas");
    }

    #[test]
    fn test_unmatched_language_falls_back_to_first_voice() {
        let voices = voices();

        assert_eq!(select_voice(&voices, "yo-NG").unwrap().identifier, "samantha");
    }

    #[test]
    fn test_prefix_does_not_match_longer_primary_subtag() {
        let voices = vec![voice("fr", "Thomas", "fr-FR"), voice("enx", "Other", "enx-XX")];

        assert_eq!(select_voice(&voices, "en-US").unwrap().identifier, "fr");
    }

    #[test]
    fn test_no_voices_yields_none() {
        assert!(select_voice(&[], "en-US").is_none());
    }
}
