use crate::error::Result;
use crate::schema::{Conditions, Document};

/// The CRUD contract shared by the document store and the SQL backend.
///
/// "No matching document" is `Ok(None)`, never an error.
pub trait Crud {
    /// Every document, in insertion order.
    fn get_all(&self) -> Result<Vec<Document>>;

    /// Every document satisfying all conditions. Empty conditions match all.
    fn find_many(&self, conditions: &Conditions) -> Result<Vec<Document>>;

    /// First match in insertion order.
    fn find_one(&self, conditions: &Conditions) -> Result<Option<Document>>;

    /// Validate, default-fill and store a document. Returns what was stored.
    fn create(&mut self, data: Document) -> Result<Document>;

    /// Apply `patch` to the first match and return the updated document.
    fn update(&mut self, conditions: &Conditions, patch: &Document) -> Result<Option<Document>>;

    /// Remove the first match and return it.
    fn delete(&mut self, conditions: &Conditions) -> Result<Option<Document>>;
}

/// Conjunctive equality test. A document missing a tested field never matches.
pub fn matches(document: &Document, conditions: &Conditions) -> bool {
    conditions
        .iter()
        .all(|(field, expected)| document.get(field) == Some(expected))
}

/// Position of the first document matching `conditions`.
pub fn position(documents: &[Document], conditions: &Conditions) -> Option<usize> {
    documents.iter().position(|doc| matches(doc, conditions))
}

/// Build a condition set from `(field, value)` pairs.
pub fn conditions<I, K>(pairs: I) -> Conditions
where
    I: IntoIterator<Item = (K, serde_json::Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_conditions_match_everything() {
        assert!(matches(&doc(json!({"a": 1})), &Conditions::new()));
        assert!(matches(&doc(json!({})), &Conditions::new()));
    }

    #[test]
    fn test_all_conditions_must_hold() {
        let d = doc(json!({"a": 1, "b": "x"}));
        assert!(matches(&d, &conditions([("a", json!(1)), ("b", json!("x"))])));
        assert!(!matches(&d, &conditions([("a", json!(1)), ("b", json!("y"))])));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let d = doc(json!({"a": 1}));
        assert!(!matches(&d, &conditions([("b", json!(null))])));
    }

    #[test]
    fn test_no_type_coercion() {
        let d = doc(json!({"a": 1}));
        assert!(!matches(&d, &conditions([("a", json!("1"))])));
    }

    #[test]
    fn test_position_finds_first_match() {
        let docs = vec![
            doc(json!({"k": 1, "n": 0})),
            doc(json!({"k": 2, "n": 1})),
            doc(json!({"k": 2, "n": 2})),
        ];
        assert_eq!(position(&docs, &conditions([("k", json!(2))])), Some(1));
        assert_eq!(position(&docs, &conditions([("k", json!(3))])), None);
    }
}
