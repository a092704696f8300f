//! What gets said for a lesson.

/// Pitch for the intro and full readings.
pub const NEUTRAL_PITCH: f32 = 1.0;

/// Slightly raised pitch for the excerpt that follows the intro.
pub const EXCERPT_PITCH: f32 = 1.05;

/// Speech language tag for a content locale: `en` and `fr` map to their
/// regional voices, anything else passes through.
#[must_use]
pub fn speech_language(locale: &str) -> String {
    match locale {
        "en" => "en-US".to_owned(),
        "fr" => "fr-FR".to_owned(),
        other => other.to_owned(),
    }
}

/// The tutor's greeting. French for `fr*` locales, English otherwise.
#[must_use]
pub fn intro(user_name: &str, title: &str, locale: &str) -> String {
    if locale.starts_with("fr") {
        format!(
            "Bon retour, {user_name} ! La leçon d'aujourd'hui est {title}. \
             Apprenons quelque chose de nouveau ensemble."
        )
    } else {
        format!(
            "Welcome back, {user_name}! Today's lesson is {title}. \
             Let's learn something new together."
        )
    }
}

/// The first two sentences of `body`, ending in exactly one period.
#[must_use]
pub fn excerpt(body: &str) -> String {
    let opening = body.split(". ").take(2).collect::<Vec<_>>().join(". ");
    format!("{}.", opening.trim_end().trim_end_matches('.'))
}

/// The whole lesson read aloud.
#[must_use]
pub fn full_reading(title: &str, body: &str) -> String {
    format!("{title}. {body}")
}

/// The two-stage narration of a lesson: greeting, then excerpt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonScript {
    /// Stage one.
    pub intro: String,
    /// Stage two.
    pub excerpt: String,
}

impl LessonScript {
    /// Builds the script for a lesson.
    #[must_use]
    pub fn new(user_name: &str, title: &str, body: &str, locale: &str) -> Self {
        Self {
            intro: intro(user_name, title, locale),
            excerpt: excerpt(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locales_map_to_regional_speech_tags() {
        assert_eq!(speech_language("en"), "en-US");
        assert_eq!(speech_language("fr"), "fr-FR");
        assert_eq!(speech_language("yo-NG"), "yo-NG");
    }

    #[test]
    fn test_intro_is_localized() {
        assert_eq!(
            intro("Ada", "Loops", "en"),
            "Welcome back, Ada! Today's lesson is Loops. Let's learn something new together."
        );
        assert_eq!(
            intro("Ada", "Boucles", "fr"),
            "Bon retour, Ada ! La leçon d'aujourd'hui est Boucles. \
             Apprenons quelque chose de nouveau ensemble."
        );
        assert!(intro("Ada", "Loops", "de").starts_with("Welcome back"));
    }

    #[test]
    fn test_excerpt_keeps_two_sentences() {
        let body = "Python is like Lego. You build big things from small blocks. Let's start.";

        assert_eq!(
            excerpt(body),
            "Python is like Lego. You build big things from small blocks."
        );
    }

    #[test]
    fn test_excerpt_of_short_body_ends_with_single_period() {
        assert_eq!(excerpt("One sentence."), "One sentence.");
        assert_eq!(excerpt("No period"), "No period.");
    }

    #[test]
    fn test_full_reading_joins_title_and_body() {
        assert_eq!(full_reading("Intro", "Body text."), "Intro. Body text.");
    }
}
