use serde::Serialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Joins the fields of a composite key. Neither policy can emit it.
pub const KEY_SEPARATOR: char = '|';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Whitespace runs become a single space; punctuation is kept.
    #[default]
    Spaced,
    /// Everything that is not a letter or digit is removed.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize(text: &str) -> String {
    normalize_with(text, KeyPolicy::default())
}

pub fn normalize_with(text: &str, policy: KeyPolicy) -> String {
    let folded: String = text
        .trim()
        .chars()
        .map(fold_ordinal)
        .collect::<String>()
        .to_lowercase()
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .map(|ch| if ch == KEY_SEPARATOR { ' ' } else { ch })
        .collect();

    match policy {
        KeyPolicy::Spaced => folded.split_whitespace().collect::<Vec<_>>().join(" "),
        KeyPolicy::Strict => folded.chars().filter(|ch| ch.is_alphanumeric()).collect(),
    }
}

/// Null labels arrive as `None` and normalize like an empty string.
pub fn build_key(
    assessment_name: Option<&str>,
    grade_label: Option<&str>,
    subject: Option<&str>,
) -> CanonicalKey {
    build_key_with(assessment_name, grade_label, subject, KeyPolicy::default())
}

pub fn build_key_with(
    assessment_name: Option<&str>,
    grade_label: Option<&str>,
    subject: Option<&str>,
    policy: KeyPolicy,
) -> CanonicalKey {
    let fields = [assessment_name, grade_label, subject]
        .map(|field| normalize_with(field.unwrap_or_default(), policy));
    let separator = KEY_SEPARATOR.to_string();
    CanonicalKey(fields.join(separator.as_str()))
}

fn fold_ordinal(ch: char) -> char {
    match ch {
        'º' | '°' => 'o',
        'ª' => 'a',
        other => other,
    }
}
