use std::env;
use std::str::FromStr;

use crate::embedding::DEFAULT_BATCH_SIZE;
use crate::query::{DEFAULT_MAX_QUERIES, Lang};
use crate::retrieval::DEFAULT_MAX_PAGES;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Runtime settings read from the environment.
#[derive(Clone)]
pub struct Settings {
    pub gemini_api_key: String,
    pub gemini_model: String,
    openai_api_key: Option<String>,
    pub embedding_model: String,
    pub openai_base_url: Option<String>,
    pub embedding_batch: usize,
    pub max_queries: usize,
    pub max_pages: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub lang: Lang,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("gemini_model", &self.gemini_model)
            .field("embedding_model", &self.embedding_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("embedding_batch", &self.embedding_batch)
            .field("max_queries", &self.max_queries)
            .field("max_pages", &self.max_pages)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("lang", &self.lang)
            .finish_non_exhaustive()
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |var: &'static str| get(var).ok_or(ConfigError::Missing(var));

        let lang = match get("RETRIEVAL_LANG") {
            Some(code) => Lang::from_code(&code).ok_or(ConfigError::Invalid {
                var: "RETRIEVAL_LANG",
                value: code,
            })?,
            None => Lang::default(),
        };

        Ok(Self {
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: get("GEMINI_MODEL")
                .unwrap_or_else(|| crate::gemini::client::DEFAULT_MODEL.to_string()),
            openai_api_key: get("OPENAI_API_KEY"),
            embedding_model: get("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|| crate::embedding::DEFAULT_MODEL.to_string()),
            openai_base_url: get("OPENAI_BASE_URL"),
            embedding_batch: parse_or(&get, "OPENAI_EMBEDDING_BATCH", DEFAULT_BATCH_SIZE)?,
            max_queries: parse_or(&get, "RETRIEVAL_MAX_QUERIES", DEFAULT_MAX_QUERIES)?,
            max_pages: parse_or(&get, "RETRIEVAL_MAX_PAGES", DEFAULT_MAX_PAGES)?,
            chunk_size: parse_or(&get, "RETRIEVAL_CHUNK_SIZE", 1000)?,
            chunk_overlap: parse_or(&get, "RETRIEVAL_CHUNK_OVERLAP", 200)?,
            lang,
        })
    }

    /// Only commands that embed need the OpenAI key.
    pub fn openai_api_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(var) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|var| vars.get(var).cloned())
    }

    const KEYS: [(&str, &str); 2] = [("GEMINI_API_KEY", "g"), ("OPENAI_API_KEY", "o")];

    #[test]
    fn defaults_apply_when_only_keys_are_set() {
        let s = settings(&KEYS).unwrap();
        assert_eq!(s.gemini_model, "gemini-2.5-flash");
        assert_eq!(s.embedding_model, "text-embedding-3-small");
        assert_eq!(s.openai_base_url, None);
        assert_eq!(s.embedding_batch, 64);
        assert_eq!(s.max_queries, 3);
        assert_eq!(s.max_pages, 5);
        assert_eq!(s.chunk_size, 1000);
        assert_eq!(s.chunk_overlap, 200);
        assert_eq!(s.lang, Lang::Ko);
    }

    #[test]
    fn overrides_are_read() {
        let mut vars = KEYS.to_vec();
        vars.extend([
            ("GEMINI_MODEL", "gemini-2.5-pro"),
            ("OPENAI_BASE_URL", "http://localhost:8080"),
            ("RETRIEVAL_MAX_PAGES", " 3 "),
            ("RETRIEVAL_MAX_QUERIES", "5"),
            ("OPENAI_EMBEDDING_BATCH", "16"),
            ("RETRIEVAL_CHUNK_SIZE", "500"),
            ("RETRIEVAL_CHUNK_OVERLAP", "50"),
            ("RETRIEVAL_LANG", "EN"),
        ]);
        let s = settings(&vars).unwrap();
        assert_eq!(s.gemini_model, "gemini-2.5-pro");
        assert_eq!(s.openai_base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(s.max_pages, 3);
        assert_eq!(s.max_queries, 5);
        assert_eq!(s.embedding_batch, 16);
        assert_eq!(s.chunk_size, 500);
        assert_eq!(s.chunk_overlap, 50);
        assert_eq!(s.lang, Lang::En);
    }

    #[test]
    fn missing_gemini_key_is_reported() {
        let err = settings(&[("OPENAI_API_KEY", "o")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GEMINI_API_KEY")));
        assert_eq!(err.to_string(), "GEMINI_API_KEY not set");
    }

    #[test]
    fn openai_key_is_only_required_on_use() {
        let s = settings(&[("GEMINI_API_KEY", "g"), ("OPENAI_API_KEY", "  ")]).unwrap();
        assert!(matches!(
            s.openai_api_key(),
            Err(ConfigError::Missing("OPENAI_API_KEY"))
        ));

        let s = settings(&KEYS).unwrap();
        assert_eq!(s.openai_api_key().unwrap(), "o");
    }

    #[test]
    fn invalid_number_is_rejected() {
        let mut vars = KEYS.to_vec();
        vars.push(("RETRIEVAL_CHUNK_SIZE", "lots"));
        let err = settings(&vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { var: "RETRIEVAL_CHUNK_SIZE", ref value } if value == "lots"
        ));
    }

    #[test]
    fn unknown_language_is_rejected() {
        let mut vars = KEYS.to_vec();
        vars.push(("RETRIEVAL_LANG", "fr"));
        assert!(matches!(
            settings(&vars),
            Err(ConfigError::Invalid { var: "RETRIEVAL_LANG", .. })
        ));
    }

    #[test]
    fn debug_output_hides_keys() {
        let s = settings(&[("GEMINI_API_KEY", "secret-g"), ("OPENAI_API_KEY", "secret-o")]).unwrap();
        let debug = format!("{s:?}");
        assert!(!debug.contains("secret"));
    }
}
