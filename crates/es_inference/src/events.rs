use es_core::{Error, EventSet, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRule {
    pub category: String,
    pub triggers: Vec<String>,
}

/// Category → trigger phrase table. Order is significant: classification
/// reports categories in table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventRules(Vec<EventRule>);

impl EventRules {
    pub fn new(rules: Vec<EventRule>) -> Result<Self> {
        let mut normalized: Vec<EventRule> = Vec::with_capacity(rules.len());
        for rule in rules {
            if normalized.iter().any(|r| r.category == rule.category) {
                return Err(Error::Config(format!("duplicate event category {:?}", rule.category)));
            }
            let triggers: Vec<String> = rule
                .triggers
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            if triggers.is_empty() {
                return Err(Error::Config(format!("event category {:?} has no triggers", rule.category)));
            }
            normalized.push(EventRule { category: rule.category, triggers });
        }
        Ok(Self(normalized))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let rules: Vec<EventRule> = serde_json::from_str(&raw)?;
        Self::new(rules)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|r| r.category.as_str())
    }

    pub fn rules(&self) -> &[EventRule] {
        &self.0
    }
}

impl Default for EventRules {
    fn default() -> Self {
        let rule = |category: &str, triggers: &[&str]| EventRule {
            category: category.to_string(),
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
        };
        Self(vec![
            rule("earnings warning", &["gewinnwarnung", "profit warning", "lower guidance"]),
            rule("merger", &["merger", "fusion", "übernahme", "acquisition"]),
            rule("regulation", &["regulatory", "regulation", "behörde", "aufsicht"]),
            rule("dividend", &["dividend", "ausschüttung"]),
        ])
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventClassifier {
    rules: EventRules,
}

impl EventClassifier {
    pub fn new(rules: EventRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &EventRules {
        &self.rules
    }

    /// Categories with at least one trigger phrase anywhere in `text`, ignoring case.
    pub fn classify(&self, text: &str) -> EventSet {
        let lowered = text.to_lowercase();
        self.rules
            .rules()
            .iter()
            .filter(|rule| rule.triggers.iter().any(|t| lowered.contains(t.as_str())))
            .map(|rule| rule.category.as_str())
            .collect()
    }
}

/// Classifies `text` with the built-in rule table.
pub fn classify_events(text: &str) -> EventSet {
    EventClassifier::default().classify(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_events() {
        let events = classify_events("The company issued a profit warning and announced a merger.");
        assert!(events.contains("earnings warning"));
        assert!(events.contains("merger"));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_matching_ignores_case_and_position() {
        assert!(classify_events("DIVIDEND").contains("dividend"));
        assert!(classify_events("Die Behörde prüft").contains("regulation"));
        assert!(classify_events("ÜBERNAHMEANGEBOT").contains("merger"));
        assert!(classify_events("pre-acquisitions talk").contains("merger"));
    }

    #[test]
    fn test_results_follow_table_order() {
        let events = classify_events("Dividend cut after regulation and a profit warning; merger off.");
        let order: Vec<&str> = events.iter().collect();
        assert_eq!(order, vec!["earnings warning", "merger", "regulation", "dividend"]);
    }

    #[test]
    fn test_no_triggers_no_events() {
        assert!(classify_events("Weather was mild across the region.").is_empty());
        assert!(classify_events("").is_empty());
    }

    #[test]
    fn test_custom_rules_are_normalized() {
        let rules = EventRules::new(vec![EventRule {
            category: "layoffs".to_string(),
            triggers: vec!["  Job Cuts ".to_string(), "".to_string()],
        }])
        .unwrap();
        let classifier = EventClassifier::new(rules);
        assert_eq!(classifier.classify("Massive JOB CUTS announced").as_slice(), &["layoffs".to_string()]);
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let empty = EventRules::new(vec![EventRule { category: "x".into(), triggers: vec![] }]);
        assert!(matches!(empty, Err(Error::Config(_))));

        let twice = EventRules::new(vec![
            EventRule { category: "x".into(), triggers: vec!["a".into()] },
            EventRule { category: "x".into(), triggers: vec!["b".into()] },
        ]);
        assert!(matches!(twice, Err(Error::Config(_))));
    }

    #[test]
    fn test_rules_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"[{"category": "strike", "triggers": ["Streik", "walkout"]}]"#).unwrap();

        let rules = EventRules::from_file(&path).unwrap();
        assert_eq!(rules.categories().collect::<Vec<_>>(), vec!["strike"]);
        assert!(EventClassifier::new(rules).classify("Der STREIK geht weiter").contains("strike"));
    }
}
