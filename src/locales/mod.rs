use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

pub const DEFAULT_LOCALE: &str = "en";
pub const SUPPORTED_LOCALES: &[&str] = &["en", "zh-cn", "ja", "es", "fr"];

/// Interface message packs. Unsupported locales and missing keys fall back
/// to English; a key missing there too renders as the key itself.
#[derive(Debug, Clone)]
pub struct LocaleCatalog {
    packs: HashMap<String, HashMap<String, String>>,
}

impl LocaleCatalog {
    pub fn load() -> Result<Self> {
        let sources: [(&str, &str); 5] = [
            ("en", include_str!("en.toml")),
            ("zh-cn", include_str!("zh-cn.toml")),
            ("ja", include_str!("ja.toml")),
            ("es", include_str!("es.toml")),
            ("fr", include_str!("fr.toml")),
        ];

        let mut packs = HashMap::new();
        for (code, raw) in sources {
            let parsed: LocalePackFile = toml::from_str(raw)
                .with_context(|| format!("failed to parse locale pack: {}", code))?;
            packs.insert(code.to_string(), parsed.messages);
        }
        Ok(LocaleCatalog { packs })
    }

    pub fn message(&self, locale: &str, key: &str) -> String {
        let code = normalize_locale(locale);
        if let Some(pack) = self.packs.get(&code)
            && let Some(value) = pack.get(key)
        {
            return value.clone();
        }
        self.packs
            .get(DEFAULT_LOCALE)
            .and_then(|pack| pack.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    pub fn is_supported(&self, locale: &str) -> bool {
        self.packs.contains_key(&normalize_locale(locale))
    }
}

fn normalize_locale(locale: &str) -> String {
    locale.trim().to_lowercase()
}

#[derive(Debug, Deserialize)]
struct LocalePackFile {
    messages: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_locales_carry_save_error_messages() {
        let catalog = LocaleCatalog::load().unwrap();
        for locale in SUPPORTED_LOCALES {
            assert!(!catalog.message(locale, "notion_configure").is_empty());
            assert!(!catalog.message(locale, "notion_save_failed").is_empty());
        }
    }

    #[test]
    fn unsupported_locale_falls_back_to_english() {
        let catalog = LocaleCatalog::load().unwrap();
        let fallback = catalog.message("de", "notion_configure");
        let english = catalog.message("en", "notion_configure");
        assert_eq!(fallback, english);
    }

    #[test]
    fn locale_codes_are_case_insensitive() {
        let catalog = LocaleCatalog::load().unwrap();
        assert_eq!(
            catalog.message("zh-CN", "translation"),
            catalog.message("zh-cn", "translation")
        );
        assert!(catalog.is_supported("JA"));
    }
}
