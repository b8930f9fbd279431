// Identifiers for circuits, steps, actions and documents
//
// ## Why newtypes
//
// Every reference that crosses the engine boundary is a plain string in the
// surrounding admin console (database keys, route parameters, form values).
// Wrapping each one in its own type means a `StepId` can never be handed to a
// function that expects an `ActionId`, even though both are strings on the wire.
//
// ### Example circuit:
//
// ```text
//     [intake] --validate--> [legal_review] --sign_off--> [archive (final)]
//        ^                        |
//        |                        | return to previous
//        +------------------------+
// ```
//
// - `intake`, `legal_review`, `archive` are `StepId`s
// - `validate`, `sign_off` are `ActionId`s offered on a step
// - the document moving through the circuit is addressed by its `DocumentId`

use serde::{Deserialize, Serialize};

/// Declares a string-backed identifier with the usual conversions.
///
/// Each generated type is `#[serde(transparent)]`, so it serializes as the bare
/// string and can be used directly as a JSON field or route parameter.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier from any string-like input
            pub fn new<S: Into<String>>(value: S) -> Self {
                $name(value.into())
            }

            /// Get the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a configured approval circuit
    ///
    /// Examples: "contract_approval", "invoice_validation"
    CircuitId
);

string_id!(
    /// Identifier of a single step inside a circuit
    ///
    /// Step ids are globally unique references (foreign keys in the
    /// definition store); the human-facing name is the [`StepKey`].
    StepId
);

string_id!(
    /// Human-facing key of a step, unique within its circuit
    ///
    /// Examples: "draft", "legal_review", "archive"
    StepKey
);

string_id!(
    /// Identifier of a named trigger offered on a step
    ActionId
);

string_id!(
    /// Identifier of a checklist entry defined on a step
    StatusItemId
);

string_id!(
    /// Identifier of a document bound to a circuit
    DocumentId
);

string_id!(
    /// Identifier of the user performing an operation
    UserId
);

string_id!(
    /// Identifier of a role from the identity provider
    RoleId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_id_creation() {
        let step1 = StepId::from("review");
        let step2 = StepId::from("review".to_string());
        let step3 = StepId("review".to_string());
        let step4 = StepId::new("review");

        assert_eq!(step1, step2);
        assert_eq!(step2, step3);
        assert_eq!(step3, step4);
        assert_eq!(step1.as_str(), "review");
        assert_eq!(step1.to_string(), "review");
    }

    #[test]
    fn test_ids_serialize_as_bare_strings() {
        let document = DocumentId::from("doc-42");
        let json = serde_json::to_string(&document).unwrap();
        assert_eq!(json, "\"doc-42\"");

        let back: DocumentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, document);
    }

    #[test]
    fn test_ids_order_lexically() {
        let mut ids = vec![ActionId::from("reject"), ActionId::from("approve")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "approve");
    }
}
