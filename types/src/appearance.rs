//! Appearance settings forwarded to the vendor UI: theme and language.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::KycError;

/// Host-app language tags with a vendor translation, and the vendor's
/// uppercase code for each.
const VENDOR_LANGUAGES: &[(&str, &str)] = &[
    ("en", "EN"),
    ("ja", "JA"),
    ("zh", "ZH"),
    ("ko", "KO"),
    ("ar", "AR"),
    ("es", "ES"),
    ("fr", "FR"),
    ("de", "DE"),
    ("it", "IT"),
    ("pt", "PT"),
    ("ru", "RU"),
    ("tr", "TR"),
    ("vi", "VI"),
    ("th", "TH"),
    ("id", "ID"),
    ("ms", "MS"),
];

/// Fallback vendor code for unmapped tags.
pub const DEFAULT_VENDOR_LANGUAGE: &str = "EN";

/// Map a host-app language tag to the vendor's uppercase ISO code.
pub fn vendor_language_code(tag: &str) -> &'static str {
    VENDOR_LANGUAGES
        .iter()
        .find(|(host, _)| *host == tag)
        .map(|(_, vendor)| *vendor)
        .unwrap_or(DEFAULT_VENDOR_LANGUAGE)
}

/// Colour scheme of the host app.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn is_dark(&self) -> bool {
        matches!(self, Self::Dark)
    }

    pub fn font_color(&self) -> &'static str {
        match self {
            Self::Light => "#000000",
            Self::Dark => "#FFFFFF",
        }
    }

    pub fn background_color(&self) -> &'static str {
        match self {
            Self::Light => "#FFFFFF",
            Self::Dark => "#111115",
        }
    }
}

impl FromStr for Theme {
    type Err = KycError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(KycError::UnknownTheme(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_languages_are_uppercased() {
        assert_eq!(vendor_language_code("ja"), "JA");
        assert_eq!(vendor_language_code("ms"), "MS");
    }

    #[test]
    fn unmapped_languages_default_to_english() {
        assert_eq!(vendor_language_code("fil"), "EN");
        assert_eq!(vendor_language_code(""), "EN");
        assert_eq!(vendor_language_code("JA"), "EN");
    }

    #[test]
    fn theme_colours() {
        assert_eq!(Theme::Dark.background_color(), "#111115");
        assert_eq!(Theme::Light.font_color(), "#000000");
        assert_eq!("DARK".parse::<Theme>().unwrap(), Theme::Dark);
    }
}
