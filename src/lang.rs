/// One of the two supported languages. English is the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    He,
}

impl Language {
    pub fn opposite(self) -> Self {
        match self {
            Language::En => Language::He,
            Language::He => Language::En,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::He => "he",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::He => "Hebrew",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Classifies text as Hebrew if any character falls in the Hebrew block,
/// English otherwise. Empty input is English.
pub fn detect_language(text: &str) -> Language {
    if contains_hebrew(text) {
        Language::He
    } else {
        Language::En
    }
}

fn contains_hebrew(text: &str) -> bool {
    text.chars().any(|c| matches!(c, '\u{0590}'..='\u{05EA}'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_word_is_english() {
        assert_eq!(detect_language("freedom"), Language::En);
    }

    #[test]
    fn hebrew_word_is_hebrew() {
        assert_eq!(detect_language("חבר"), Language::He);
    }

    #[test]
    fn single_hebrew_char_wins_over_latin() {
        assert_eq!(detect_language("hello world ש"), Language::He);
        assert_eq!(detect_language("ש hello world"), Language::He);
    }

    #[test]
    fn empty_input_falls_back_to_english() {
        assert_eq!(detect_language(""), Language::En);
        assert_eq!(detect_language("   "), Language::En);
    }

    #[test]
    fn block_boundaries() {
        assert_eq!(detect_language("\u{0590}"), Language::He);
        assert_eq!(detect_language("\u{05EA}"), Language::He);
        // Hebrew ligatures and punctuation past tav are outside the range.
        assert_eq!(detect_language("\u{05F0}"), Language::En);
        assert_eq!(detect_language("\u{058F}"), Language::En);
    }

    #[test]
    fn other_scripts_are_english() {
        assert_eq!(detect_language("привет"), Language::En);
        assert_eq!(detect_language("مرحبا"), Language::En);
        assert_eq!(detect_language("42"), Language::En);
    }

    #[test]
    fn opposite_swaps() {
        assert_eq!(Language::En.opposite(), Language::He);
        assert_eq!(Language::He.opposite(), Language::En);
    }
}
