//! Prompt templates for recommendation generation.
//!
//! Maps a closed set of known genres to hand-authored prompt text; any
//! other genre falls back to a generic template embedding the genre name.

/// Genres with a dedicated prompt template.
///
/// `electronic` and `electro` are one equivalence class: the classifier's
/// vocabulary uses both spellings for the same style, so both parse to
/// [`KnownGenre::Electronic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownGenre {
    Rock,
    Pop,
    HipHop,
    Classical,
    Jazz,
    Electronic,
}

impl KnownGenre {
    /// Parses a genre label, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "rock" => Some(KnownGenre::Rock),
            "pop" => Some(KnownGenre::Pop),
            "hip-hop" => Some(KnownGenre::HipHop),
            "classical" => Some(KnownGenre::Classical),
            "jazz" => Some(KnownGenre::Jazz),
            "electronic" | "electro" => Some(KnownGenre::Electronic),
            _ => None,
        }
    }

    /// Returns the prompt template for this genre.
    pub fn prompt(&self) -> &'static str {
        match self {
            KnownGenre::Rock => {
                "Please suggest 2-3 similar bands or songs in the rock genre in bullet points."
            }
            KnownGenre::Pop => {
                "Please recommend popular artists in the pop genre in bullet points."
            }
            KnownGenre::HipHop => {
                "Please suggest popular playlists or artists in the hip-hop genre in bullet points."
            }
            KnownGenre::Classical => {
                "Please share an interesting fact about a composer or a piece in classical music."
            }
            KnownGenre::Jazz => {
                "Please suggest a relaxing evening playlist in the jazz genre in bullet points."
            }
            KnownGenre::Electronic => {
                "Please recommend famous music festivals or top DJs in the electronic music genre in bullet points."
            }
        }
    }
}

/// Returns the prompt text for a genre label.
///
/// Known genres get their dedicated template; everything else gets the
/// generic fallback with the genre embedded verbatim (trimmed).
pub fn prompt_for(genre: &str) -> String {
    match KnownGenre::parse(genre) {
        Some(known) => known.prompt().to_string(),
        None => format!("Please recommend music related to {} genre.", genre.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!(KnownGenre::parse("ROCK"), Some(KnownGenre::Rock));
        assert_eq!(KnownGenre::parse("Rock"), Some(KnownGenre::Rock));
        assert_eq!(KnownGenre::parse("rock "), Some(KnownGenre::Rock));
        assert_eq!(KnownGenre::parse("  jazz"), Some(KnownGenre::Jazz));
        assert_eq!(KnownGenre::parse("polka"), None);
    }

    #[test]
    fn case_variants_share_one_template() {
        assert_eq!(prompt_for("ROCK"), prompt_for("rock "));
        assert_eq!(prompt_for("Rock"), prompt_for("rock"));
    }

    #[test]
    fn electronic_aliases_share_one_template() {
        assert_eq!(
            KnownGenre::parse("electro"),
            Some(KnownGenre::Electronic)
        );
        assert_eq!(prompt_for("electronic"), prompt_for("electro"));
    }

    #[test]
    fn unknown_genre_gets_generic_fallback() {
        let prompt = prompt_for("vaporwave");
        assert!(prompt.contains("vaporwave"));
        assert!(prompt.starts_with("Please recommend music related to"));
    }

    #[test]
    fn fallback_trims_genre_text() {
        let prompt = prompt_for("  vaporwave  ");
        assert!(prompt.contains("related to vaporwave genre"));
    }

    #[test]
    fn all_known_genres_have_prompts() {
        for genre in [
            KnownGenre::Rock,
            KnownGenre::Pop,
            KnownGenre::HipHop,
            KnownGenre::Classical,
            KnownGenre::Jazz,
            KnownGenre::Electronic,
        ] {
            assert!(!genre.prompt().is_empty());
        }
    }
}
