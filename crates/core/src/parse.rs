use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::Result;

/// Written to the rationale column when the model gave none.
pub const NO_RATIONALE: &str = "geen rationale opgegeven";

static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

/// Outcome of decoding one field from one response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMatch {
    Recognized(String),
    Unrecognized,
}

/// Ordered keyword table for one field.
///
/// Entries are checked in order and the first needle found wins, so a line
/// mentioning several keywords always resolves to the earliest entry.
#[derive(Debug, Clone)]
pub struct KeywordVocabulary {
    entries: Vec<(String, String)>,
}

impl KeywordVocabulary {
    pub fn new<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(needle, label)| (needle.to_lowercase(), label.to_string()))
                .collect(),
        }
    }

    pub fn decode(&self, text: &str) -> FieldMatch {
        let lower = text.to_lowercase();
        self.entries
            .iter()
            .find(|(needle, _)| lower.contains(needle.as_str()))
            .map(|(_, label)| FieldMatch::Recognized(label.clone()))
            .unwrap_or(FieldMatch::Unrecognized)
    }

    /// Distinct labels in priority order.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for (_, label) in &self.entries {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }
        labels
    }
}

/// A required output field: the column it fills, the names the model may
/// use for it, and its vocabulary.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    column: String,
    vocabulary: KeywordVocabulary,
    label_re: Option<Regex>,
}

impl FieldSpec {
    pub fn new<S: AsRef<str>>(
        column: &str,
        labels: &[S],
        vocabulary: KeywordVocabulary,
    ) -> Result<Self> {
        Ok(Self {
            column: column.to_string(),
            vocabulary,
            label_re: label_pattern(labels, r"([^|,;]*)")?,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn vocabulary(&self) -> &KeywordVocabulary {
        &self.vocabulary
    }

    /// A labeled value (`rol: Wel`) is decoded on its own; otherwise the
    /// unlabeled remainder of the line is searched.
    fn decode(&self, line: &str, unlabeled: &str) -> FieldMatch {
        if let Some(caps) = self.label_re.as_ref().and_then(|re| re.captures(line)) {
            return self
                .vocabulary
                .decode(caps.get(1).map_or("", |value| value.as_str()));
        }
        self.vocabulary.decode(unlabeled)
    }
}

#[derive(Debug, Clone)]
struct RationaleSpec {
    column: String,
    re: Regex,
}

impl RationaleSpec {
    /// Byte span of the rationale segment and its text. The text runs to the
    /// end of the line or up to a `| <field label>:` that follows it.
    fn locate<'a>(
        &self,
        line: &'a str,
        fields: &[FieldSpec],
    ) -> Option<(usize, usize, &'a str)> {
        let caps = self.re.captures(line)?;
        let start = caps.get(0)?.start();
        let text = caps.get(1)?;
        let mut end = line.len();
        for re in fields.iter().filter_map(|field| field.label_re.as_ref()) {
            for found in re.find_iter(text.as_str()) {
                let before = text.as_str()[..found.start()].trim_end();
                if let Some(kept) = before.strip_suffix('|') {
                    end = end.min(text.start() + kept.len());
                    break;
                }
            }
        }
        Some((start, end, line[text.start()..end].trim()))
    }
}

/// One committed response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub values: Vec<(String, String)>,
    pub rationale: Option<String>,
    pub raw: String,
}

impl ParsedLine {
    pub fn value(&self, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

/// Sparse row id → labels mapping recovered from one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationResult {
    entries: BTreeMap<usize, ParsedLine>,
}

impl ClassificationResult {
    pub fn get(&self, id: usize) -> Option<&ParsedLine> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<usize> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ParsedLine)> {
        self.entries.iter().map(|(id, line)| (*id, line))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub result: ClassificationResult,
    pub matched: usize,
    pub dropped: usize,
}

/// Answer grammar for one classification stage.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    fields: Vec<FieldSpec>,
    id_marker: Option<Regex>,
    marker_required: bool,
    rationale: Option<RationaleSpec>,
    raw_column: Option<String>,
    echo_re: Option<Regex>,
}

impl ResponseSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            id_marker: None,
            marker_required: false,
            rationale: None,
            raw_column: None,
            echo_re: None,
        }
    }

    /// Ids are read after `marker` (`ID:12`, `**ID:** 12`). When `required`,
    /// lines without the marker are dropped; otherwise the first number in
    /// the line is used.
    pub fn with_id_marker(mut self, marker: &str, required: bool) -> Result<Self> {
        let pattern = format!(r"(?i)\b{}\b[^0-9\n]{{0,4}}?([0-9]+)", regex::escape(marker));
        self.id_marker = Some(Regex::new(&pattern)?);
        self.marker_required = required;
        Ok(self)
    }

    pub fn with_rationale<S: AsRef<str>>(mut self, column: &str, labels: &[S]) -> Result<Self> {
        if let Some(re) = label_pattern(labels, r"(.*)$")? {
            self.rationale = Some(RationaleSpec {
                column: column.to_string(),
                re,
            });
        }
        Ok(self)
    }

    /// Stores the whole matched line in `column`.
    pub fn with_raw_column(mut self, column: &str) -> Self {
        self.raw_column = Some(column.to_string());
        self
    }

    /// Segments the model echoes back from the prompt (`Ingr:…`) are never
    /// searched for keywords.
    pub fn with_echo_labels<S: AsRef<str>>(mut self, labels: &[S]) -> Result<Self> {
        self.echo_re = label_pattern(labels, r"[^|]*")?;
        Ok(self)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn rationale_column(&self) -> Option<&str> {
        self.rationale.as_ref().map(|spec| spec.column.as_str())
    }

    pub fn raw_column(&self) -> Option<&str> {
        self.raw_column.as_deref()
    }

    /// Best-effort extraction of every line of `raw` that names an id from
    /// `batch` and resolves all required fields. Never fails; unusable lines
    /// only lower the matched count. The first line for an id wins.
    pub fn parse_response(&self, raw: &str, batch: &[usize]) -> ParseOutcome {
        let allowed: HashSet<usize> = batch.iter().copied().collect();
        let mut entries = BTreeMap::new();
        let mut dropped = 0usize;
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match self.parse_line(line) {
                Some((id, parsed)) if allowed.contains(&id) && !entries.contains_key(&id) => {
                    entries.insert(id, parsed);
                }
                _ => dropped += 1,
            }
        }
        let matched = entries.len();
        debug!(matched, dropped, batch = batch.len(), "parsed completion");
        ParseOutcome {
            result: ClassificationResult { entries },
            matched,
            dropped,
        }
    }

    /// Decodes a single line; `None` when the id or any required field is missing.
    pub fn parse_line(&self, line: &str) -> Option<(usize, ParsedLine)> {
        let id = self.extract_id(line)?;
        let (visible, rationale) = match &self.rationale {
            Some(spec) => match spec.locate(line, &self.fields) {
                Some((start, end, text)) => {
                    let text = if text.is_empty() { NO_RATIONALE } else { text };
                    (format!("{} {}", &line[..start], &line[end..]), Some(text.to_string()))
                }
                None => (line.to_string(), Some(NO_RATIONALE.to_string())),
            },
            None => (line.to_string(), None),
        };
        let unlabeled = self.unlabeled_text(&visible);
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            match field.decode(&visible, &unlabeled) {
                FieldMatch::Recognized(label) => values.push((field.column.clone(), label)),
                FieldMatch::Unrecognized => return None,
            }
        }
        Some((
            id,
            ParsedLine {
                values,
                rationale,
                raw: line.to_string(),
            },
        ))
    }

    fn extract_id(&self, line: &str) -> Option<usize> {
        if let Some(marker) = &self.id_marker {
            if let Some(caps) = marker.captures(line) {
                return caps.get(1)?.as_str().parse().ok();
            }
            if self.marker_required {
                return None;
            }
        }
        FIRST_NUMBER.find(line)?.as_str().parse().ok()
    }

    /// The line without echoed prompt text and without any labeled field.
    fn unlabeled_text(&self, visible: &str) -> String {
        let mut text = match &self.echo_re {
            Some(re) => re.replace_all(visible, " ").into_owned(),
            None => visible.to_string(),
        };
        for field in &self.fields {
            if let Some(re) = &field.label_re {
                text = re.replace_all(&text, " ").into_owned();
            }
        }
        text
    }
}

/// `(?i)\b(?:label|…)\b\s*[:：=]\s*<tail>`, longest label first.
fn label_pattern<S: AsRef<str>>(labels: &[S], tail: &str) -> Result<Option<Regex>> {
    let mut names: Vec<&str> = labels
        .iter()
        .map(|label| label.as_ref().trim())
        .filter(|label| !label.is_empty())
        .collect();
    if names.is_empty() {
        return Ok(None);
    }
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));
    let alternation = names
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"(?i)\b(?:{alternation})\b\s*[:：=]\s*{tail}");
    Ok(Some(Regex::new(&pattern)?))
}
