use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_DIFFICULT_WORDS: [&str; 12] = [
    "edelgist",
    "gistvlokken",
    "gistextract",
    "gist",
    "sheaboter",
    "shea",
    "palmvet",
    "palmolie",
    "ingredienten:",
    "ca",
    "gedroogd",
    "gepasteuriseerd",
];

const LIST_MARKER: &str = "Ingrediënten:";

static ALLERGEN_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsporen\b|kan.*bevatten").unwrap());
static PERCENTAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+([.,]\d+)?\s*%").unwrap());
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[(\[{](.*?)[)\]}]").unwrap());
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[;,:.]").unwrap());
static SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// What happens to bracketed text in an ingredient list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BracketPolicy {
    /// Unwrap brackets holding a comma separated sub-list, keep the rest
    /// as `(…)`.
    #[default]
    Smart,
    /// Unwrap every bracket pair.
    Flatten,
}

/// Turns a raw label ingredient declaration into space separated words.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    difficult: Vec<Regex>,
    brackets: BracketPolicy,
}

impl Sanitizer {
    pub fn new<S: AsRef<str>>(difficult_words: &[S], brackets: BracketPolicy) -> Result<Self> {
        let difficult = difficult_words
            .iter()
            .map(|word| word.as_ref().trim())
            .filter(|word| !word.is_empty())
            .map(|word| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word))))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            difficult,
            brackets,
        })
    }

    pub fn standard() -> Result<Self> {
        Self::new(&DEFAULT_DIFFICULT_WORDS, BracketPolicy::default())
    }

    pub fn clean(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        let text = match raw.split_once(LIST_MARKER) {
            Some((_, rest)) => rest,
            None => raw,
        };
        let text = match ALLERGEN_TAIL.find(text) {
            Some(found) => &text[..found.start()],
            None => text,
        };

        let mut text = text.to_string();
        for word in &self.difficult {
            text = word.replace_all(&text, "").into_owned();
        }
        let text = PERCENTAGE.replace_all(&text, "");
        let text = BRACKETED.replace_all(&text, |caps: &Captures| {
            let inner = caps.get(1).map_or("", |m| m.as_str());
            match self.brackets {
                BracketPolicy::Smart if !inner.contains(',') => format!("({inner})"),
                _ => format!(" {inner} "),
            }
        });
        let text = PUNCTUATION.replace_all(&text, " ");
        SPACE_RUNS.replace_all(&text, " ").trim().to_string()
    }
}
