use clap::ValueEnum;

/// Language the retrieved material should be in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Lang {
    #[default]
    Ko,
    En,
    Ja,
}

impl Lang {
    pub fn code(self) -> &'static str {
        match self {
            Lang::Ko => "ko",
            Lang::En => "en",
            Lang::Ja => "ja",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "ko" => Some(Lang::Ko),
            "en" => Some(Lang::En),
            "ja" => Some(Lang::Ja),
            _ => None,
        }
    }

    /// Appends an answer-language hint to a search query.
    pub fn apply_to_query(self, query: &str) -> String {
        match self {
            Lang::Ko => format!("{query} (한국어로 답변)"),
            Lang::En => format!("{query} (answer in English)"),
            Lang::Ja => format!("{query} (日本語で回答)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_korean() {
        assert_eq!(Lang::default(), Lang::Ko);
    }

    #[test]
    fn codes_round_trip() {
        for lang in [Lang::Ko, Lang::En, Lang::Ja] {
            assert_eq!(Lang::from_code(lang.code()), Some(lang));
        }
        assert_eq!(Lang::from_code(" EN "), Some(Lang::En));
        assert_eq!(Lang::from_code("fr"), None);
    }

    #[test]
    fn appends_language_hint() {
        assert_eq!(Lang::En.apply_to_query("test"), "test (answer in English)");
        assert_eq!(Lang::Ko.apply_to_query("test"), "test (한국어로 답변)");
        assert_eq!(Lang::Ja.apply_to_query("test"), "test (日本語で回答)");
    }
}
