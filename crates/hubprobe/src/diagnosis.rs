//! Error classification
//!
//! Maps the error text returned by the remote functions onto the handful of
//! known failure modes and the remediation that goes with each.

use serde::Serialize;
use std::fmt;

pub const FOREIGN_KEY_NAME: &str = "join_requests_room_id_fkey";
pub const RELOAD_SCHEMA_SQL: &str = "NOTIFY pgrst, 'reload schema';";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Diagnosis {
    /// PostgREST cannot resolve an embedded join between two tables
    MissingRelationship,
    /// PostgREST is serving a stale schema cache
    SchemaCache,
    /// The function read its request body twice
    BodyConsumed,
    /// The service rejected an identifier it does not know
    UnknownId,
    Other(String),
}

impl Diagnosis {
    /// Classify error text; the first matching rule wins
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();

        if text.contains("Could not find a relationship") || lower.contains("relationship") {
            Self::MissingRelationship
        } else if lower.contains("schema cache") {
            Self::SchemaCache
        } else if lower.contains("body already consumed") {
            Self::BodyConsumed
        } else if lower.contains("not found") || lower.contains("already processed") {
            Self::UnknownId
        } else {
            Self::Other(text.to_string())
        }
    }

    /// Whether this diagnosis points at a deployment or schema defect
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            Self::MissingRelationship | Self::SchemaCache | Self::BodyConsumed
        )
    }

    pub fn summary(&self) -> String {
        match self {
            Self::MissingRelationship => "The error is still about table relationships".to_string(),
            Self::SchemaCache => "Schema cache issue".to_string(),
            Self::BodyConsumed => "Request body parsed more than once ('Body already consumed')".to_string(),
            Self::UnknownId => "Identifier rejected as unknown".to_string(),
            Self::Other(text) => format!("Different error - {}", text),
        }
    }

    pub fn hints(&self) -> Vec<String> {
        match self {
            Self::MissingRelationship => vec![
                "The function code has not been updated or deployed with the manual join".to_string(),
                "OR there is still a hidden relationship reference in the code".to_string(),
                format!("The foreign key constraint '{}' needs to be created", FOREIGN_KEY_NAME),
            ],
            Self::SchemaCache => vec![
                "The database schema cache needs to be reloaded".to_string(),
                format!("Execute {} in the SQL editor", RELOAD_SCHEMA_SQL),
            ],
            Self::BodyConsumed => vec![
                "Parse the request JSON once at the top of the function and reuse the fields".to_string(),
            ],
            Self::UnknownId | Self::Other(_) => Vec::new(),
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_errors() {
        assert_eq!(
            Diagnosis::classify("Could not find a relationship between 'join_requests' and 'game_rooms' in the schema cache"),
            Diagnosis::MissingRelationship
        );
        assert_eq!(
            Diagnosis::classify("RELATIONSHIP missing"),
            Diagnosis::MissingRelationship
        );
    }

    #[test]
    fn test_schema_cache() {
        assert_eq!(
            Diagnosis::classify("column room_id not present in Schema Cache"),
            Diagnosis::SchemaCache
        );
    }

    #[test]
    fn test_body_consumed() {
        let diagnosis = Diagnosis::classify("TypeError: Body already consumed.");
        assert_eq!(diagnosis, Diagnosis::BodyConsumed);
        assert!(diagnosis.is_defect());
    }

    #[test]
    fn test_unknown_id() {
        assert_eq!(Diagnosis::classify("Invitation not found"), Diagnosis::UnknownId);
        assert_eq!(
            Diagnosis::classify("Request already processed"),
            Diagnosis::UnknownId
        );
        assert!(!Diagnosis::UnknownId.is_defect());
    }

    #[test]
    fn test_other() {
        let diagnosis = Diagnosis::classify("Invitation system temporarily unavailable");
        assert_eq!(
            diagnosis.summary(),
            "Different error - Invitation system temporarily unavailable"
        );
        assert!(diagnosis.hints().is_empty());
    }

    #[test]
    fn test_hints_name_the_constraint() {
        let hints = Diagnosis::MissingRelationship.hints();
        assert!(hints.iter().any(|h| h.contains(FOREIGN_KEY_NAME)));
    }
}
