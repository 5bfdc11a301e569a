use scraper::{Html, Selector};
use serde_json::Value;

/// Parsed JSON-LD blocks of the document, with top-level arrays and
/// `@graph` containers flattened into individual nodes.
fn nodes(document: &Html) -> Vec<Value> {
    let mut nodes = Vec::new();
    let Ok(script_selector) = Selector::parse("script[type='application/ld+json']") else {
        return nodes;
    };

    for script in document.select(&script_selector) {
        let raw = script.text().collect::<String>();
        if let Ok(json) = serde_json::from_str::<Value>(raw.trim()) {
            flatten(json, &mut nodes);
        }
    }
    nodes
}

fn flatten(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|item| flatten(item, out)),
        Value::Object(mut obj) => {
            if let Some(graph) = obj.remove("@graph") {
                flatten(graph, out);
            }
            out.push(Value::Object(obj));
        }
        _ => {}
    }
}

fn author_names(author: &Value, authors: &mut Vec<String>) {
    match author {
        Value::Array(arr) => arr.iter().for_each(|a| author_names(a, authors)),
        Value::Object(obj) => {
            if let Some(name) = obj.get("name").and_then(|n| n.as_str()) {
                authors.push(name.trim().to_string());
            }
        }
        Value::String(s) => authors.push(s.trim().to_string()),
        _ => {}
    }
}

/// Extracts author names from JSON-LD metadata in the HTML document.
pub fn extract_authors(document: &Html) -> Vec<String> {
    let mut authors = Vec::new();
    for node in nodes(document) {
        if let Some(author) = node.get("author") {
            author_names(author, &mut authors);
        }
    }
    authors.retain(|a| !a.is_empty());
    authors
}

/// First `datePublished` value found in JSON-LD metadata, unparsed.
pub fn extract_date_published(document: &Html) -> Option<String> {
    nodes(document)
        .iter()
        .find_map(|node| node.get("datePublished").and_then(|d| d.as_str()).map(str::to_string))
}
