//! Template Engine — `[name]` placeholder substitution and extraction.

pub mod handlers;

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{scalar_string, Record};

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]").unwrap())
}

/// Replaces every occurrence of `[key]` with the binding's string form, one
/// key at a time in binding order. The token is matched as literal text, so
/// keys may contain any characters. Tokens without a binding survive
/// untouched; null bindings become the empty string.
pub fn substitute(template: &str, bindings: &Record) -> String {
    let mut result = template.to_string();
    for (key, value) in bindings {
        let token = format!("[{key}]");
        result = result.replace(&token, &scalar_string(value));
    }
    result
}

/// Distinct placeholder names referenced by the template, in first-occurrence
/// order. An empty template yields an empty list.
pub fn extract_names(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in token_re().captures_iter(template) {
        let name = &cap[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bindings(value: serde_json::Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_substitute_replaces_all_occurrences() {
        let b = bindings(json!({"nome": "Anna"}));
        assert_eq!(
            substitute("Ciao [nome], benvenuta [nome]!", &b),
            "Ciao Anna, benvenuta Anna!"
        );
    }

    #[test]
    fn test_substitute_null_becomes_empty() {
        let b = bindings(json!({"campo": null}));
        assert_eq!(substitute("Valore: [campo].", &b), "Valore: .");
    }

    #[test]
    fn test_substitute_numbers_and_booleans() {
        let b = bindings(json!({"anni": 5, "attivo": true}));
        assert_eq!(substitute("[anni] anni, [attivo]", &b), "5 anni, true");
    }

    #[test]
    fn test_unbound_token_survives() {
        let b = bindings(json!({"nome": "Anna"}));
        assert_eq!(substitute("[nome] — [ruolo]", &b), "Anna — [ruolo]");
    }

    #[test]
    fn test_keys_with_regex_metacharacters_are_literal() {
        let b = bindings(json!({"costo (€)": "12"}));
        assert_eq!(substitute("Totale: [costo (€)]", &b), "Totale: 12");
    }

    #[test]
    fn test_substitution_is_idempotent_on_resolved_output() {
        let b = bindings(json!({"nome": "Anna", "ruolo": "istruttrice"}));
        let once = substitute("[nome] lavora come [ruolo]", &b);
        assert_eq!(substitute(&once, &b), once);
    }

    #[test]
    fn test_extract_names_first_occurrence_order() {
        assert_eq!(
            extract_names("Hello [name], your [role] starts [date]"),
            vec!["name", "role", "date"]
        );
    }

    #[test]
    fn test_extract_names_deduplicates() {
        assert_eq!(
            extract_names("[a] e [b] e ancora [a]"),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_extract_names_empty_template() {
        assert!(extract_names("").is_empty());
        assert!(extract_names("nessun segnaposto").is_empty());
    }
}
