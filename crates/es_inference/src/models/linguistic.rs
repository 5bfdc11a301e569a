use es_core::{Entity, Error, LinguisticAnalysis, LinguisticModel, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

const DEFAULT_GAZETTEER: &str = include_str!("../../data/gazetteer.json");

const MONEY_PATTERN: &str = r"(?:[$€£]\s?\d[\d.,]*(?:\s?(?:million|billion|trillion|Mio\.|Mrd\.|bn|m)\b)?)|(?:\b\d[\d.,]*\s?(?:Mio\.|Mrd\.|million|billion)?\s?(?:Euro|euros?|EUR|USD|dollars?)\b)";
const PERCENT_PATTERN: &str = r"\b\d+(?:[.,]\d+)?\s?(?:%|percent\b|per cent\b|Prozent\b)";
const ORG_PATTERN: &str = r"\b(?:\p{Lu}[\w&\-]*\s){0,3}\p{Lu}[\w&\-]*\s(?:AG|SE|GmbH|KGaA|Inc\.?|Corp\.?|Ltd\.?|plc|Group|Holding)\b";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
    label: &'static str,
}

/// Tokenizer, sentence segmenter and entity tagger built from Unicode
/// segmentation rules, pattern matchers and a name gazetteer.
#[derive(Debug)]
pub struct RuleBasedLinguist {
    money: Regex,
    percent: Regex,
    organization: Regex,
    gazetteer: Vec<(String, &'static str)>,
}

impl RuleBasedLinguist {
    pub fn new(gazetteer: HashMap<String, String>) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::ModelUnavailable(format!("bad entity pattern: {}", e)))
        };

        let mut names: Vec<(String, &'static str)> = gazetteer
            .into_iter()
            .filter(|(name, _)| !name.trim().is_empty())
            .map(|(name, label)| (name, intern_label(&label)))
            .collect();
        // Longer names first so "European Central Bank" wins over shorter overlaps.
        names.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Ok(Self {
            money: compile(MONEY_PATTERN)?,
            percent: compile(PERCENT_PATTERN)?,
            organization: compile(ORG_PATTERN)?,
            gazetteer: names,
        })
    }

    pub fn load(gazetteer_path: Option<&Path>) -> Result<Self> {
        let raw = match gazetteer_path {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                Error::ModelUnavailable(format!("cannot read gazetteer {}: {}", path.display(), e))
            })?,
            None => DEFAULT_GAZETTEER.to_string(),
        };
        let gazetteer: HashMap<String, String> = serde_json::from_str(&raw)
            .map_err(|e| Error::ModelUnavailable(format!("invalid gazetteer: {}", e)))?;
        Self::new(gazetteer)
    }

    fn entity_spans(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();

        for (name, label) in &self.gazetteer {
            for (start, matched) in text.match_indices(name.as_str()) {
                let end = start + matched.len();
                if is_word_boundary(text, start, end) {
                    spans.push(Span { start, end, label: *label });
                }
            }
        }
        for (regex, label) in [
            (&self.money, "MONEY"),
            (&self.percent, "PERCENT"),
            (&self.organization, "ORG"),
        ] {
            spans.extend(regex.find_iter(text).map(|m| Span {
                start: m.start(),
                end: m.end(),
                label,
            }));
        }

        spans.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| b.end.cmp(&a.end)));
        let mut kept: Vec<Span> = Vec::with_capacity(spans.len());
        for span in spans {
            if kept.last().map_or(true, |last| span.start >= last.end) {
                kept.push(span);
            }
        }
        kept
    }
}

fn intern_label(label: &str) -> &'static str {
    match label.to_ascii_uppercase().as_str() {
        "ORG" => "ORG",
        "GPE" => "GPE",
        "PERSON" => "PERSON",
        "MONEY" => "MONEY",
        "PERCENT" => "PERCENT",
        "DATE" => "DATE",
        _ => "MISC",
    }
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.map_or(false, char::is_alphanumeric) && !after.map_or(false, char::is_alphanumeric)
}

impl LinguisticModel for RuleBasedLinguist {
    fn name(&self) -> &str {
        "rule-based"
    }

    fn analyze(&self, text: &str) -> LinguisticAnalysis {
        let tokens = text
            .split_word_bounds()
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .collect();
        let sentences = text
            .split_sentence_bounds()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let entities = self
            .entity_spans(text)
            .into_iter()
            .map(|span| Entity {
                text: text[span.start..span.end].trim().to_string(),
                label: span.label.to_string(),
            })
            .collect();

        LinguisticAnalysis { tokens, sentences, entities }
    }
}
