//! Event Name Normalization
//!
//! Every event name is canonicalised before it touches the registry, so
//! `fooEvent`, `FooEvent` and `foo_event` all address the same listeners.

use std::sync::OnceLock;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Canonicalises event identifiers into a comparable form.
///
/// Implementations must be pure and idempotent:
/// `normalize(normalize(x)) == normalize(x)`.
pub trait NameNormalizer: Send + Sync {
    /// Return the canonical form of `name`
    fn normalize(&self, name: &str) -> String;
}

/// Snake-case normalizer (`fooEvent` -> `foo_event`, `EventByName` -> `event_by_name`)
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCase;

/// Normalizer that leaves names untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

/// Normalizer selection used by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizerKind {
    #[default]
    SnakeCase,
    Verbatim,
}

impl std::str::FromStr for NormalizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "snake_case" => Ok(NormalizerKind::SnakeCase),
            "verbatim" | "none" => Ok(NormalizerKind::Verbatim),
            _ => Err(format!("Invalid normalizer: {}. Valid options: snake_case, verbatim", s)),
        }
    }
}

impl NormalizerKind {
    /// Build the normalizer this kind names
    pub fn build(self) -> Box<dyn NameNormalizer> {
        match self {
            NormalizerKind::SnakeCase => Box::new(SnakeCase),
            NormalizerKind::Verbatim => Box::new(Verbatim),
        }
    }
}

impl NameNormalizer for Verbatim {
    fn normalize(&self, name: &str) -> String {
        name.to_string()
    }
}

impl NameNormalizer for SnakeCase {
    fn normalize(&self, name: &str) -> String {
        to_snake_case(name)
    }
}

fn word_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s([a-z])").expect("static regex"))
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn capital() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Z])").expect("static regex"))
}

/// Join words in camel case: hyphens and whitespace separate words and the
/// first character is lowered
pub fn to_camel_case(input: &str) -> String {
    let folded = fold_accents(input).replace('-', " ");
    let joined = word_start().replace_all(&folded, |caps: &regex::Captures| caps[1].to_uppercase());
    let squashed = whitespace().replace_all(&joined, "");

    let mut chars = squashed.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {
            let mut out = first.to_ascii_lowercase().to_string();
            out.push_str(chars.as_str());
            out
        }
        _ => squashed.into_owned(),
    }
}

/// Convert an identifier to snake case via its camel-case form
pub fn to_snake_case(input: &str) -> String {
    let camel = to_camel_case(input);
    capital()
        .replace_all(&camel, "_$1")
        .trim()
        .to_lowercase()
}

/// Replace Latin-1 accented letters with their unaccented ASCII spelling
fn fold_accents(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            'À'..='Å' => out.push('A'),
            'Æ' => out.push_str("AE"),
            'Ç' => out.push('C'),
            'È'..='Ë' => out.push('E'),
            'Ì'..='Ï' => out.push('I'),
            'Ð' => out.push('D'),
            'Ñ' => out.push('N'),
            'Ò'..='Ö' | 'Ø' => out.push('O'),
            'Ù'..='Ü' => out.push('U'),
            'Ý' => out.push('Y'),
            'Þ' => out.push('P'),
            'à'..='å' => out.push('a'),
            'æ' => out.push_str("ae"),
            'ç' => out.push('c'),
            'è'..='ë' => out.push('e'),
            'ì'..='ï' => out.push('i'),
            'ñ' => out.push('n'),
            'ò'..='ö' | 'ø' => out.push('o'),
            'ù'..='ü' => out.push('u'),
            'þ' => out.push('p'),
            'ý' | 'ÿ' => out.push('y'),
            other => out.push(other),
        }
    }
    out
}
