//! Error types for the query engine

use thiserror::Error;

/// Main error type returned by query finishers and store operations
#[derive(Error, Debug)]
pub enum Error {
    /// Builder-time validation failure (the sticky error of a query)
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Store command or connection failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Offset was requested on a query that has no order
    #[error("Offset cannot be applied to queries without an order")]
    OffsetWithoutOrder,

    /// A record referenced by an index no longer exists
    #[error("Record not found: {model}:{id}")]
    RecordNotFound {
        /// Model name
        model: String,
        /// Record identifier
        id: String,
    },

    /// Converting a stored record into a typed value failed
    #[error("Hydration error: {0}")]
    Hydration(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Validation errors recorded while building a query or registering a schema
///
/// Cloneable so the first error of a query can be returned by every finisher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Model name has not been registered
    #[error("Model {0} is not registered")]
    UnknownModel(String),

    /// Field does not exist on the model
    #[error("Could not find field {field} in model {model}")]
    UnknownField {
        /// Model name
        model: String,
        /// Field name
        field: String,
    },

    /// Field exists but is not indexed
    #[error("Field {field} in model {model} is not indexed; filters and orders require an indexed field")]
    UnindexedField {
        /// Model name
        model: String,
        /// Field name
        field: String,
    },

    /// Order was already set on the query
    #[error("Previous order already specified; only one order per query is allowed")]
    DuplicateOrder,

    /// Include and exclude were both used on the same query
    #[error("Cannot use both include and exclude modifiers on a query")]
    IncludeExcludeConflict,

    /// Filter expression is not `"<field> <operator>"`
    #[error("Malformed filter expression {0:?}: expected a field name, a space, and an operator")]
    MalformedFilter(String),

    /// Operator is not one of =, !=, >, <, >=, <=
    #[error("Invalid operator {0:?}: should be one of =, !=, >, <, >=, or <=")]
    InvalidOperator(String),

    /// Only equality is supported on the identifier field
    #[error("Only the = operator can be used with a filter on the Id field, got {0:?}")]
    IdOperator(String),

    /// Identifier filters need a string value
    #[error("A filter on the Id field requires a string value, got {0}")]
    IdValueType(String),

    /// Filter value type differs from the declared field type
    #[error("Filter value type ({actual}) does not match type of field {field} ({expected})")]
    TypeMismatch {
        /// Field name
        field: String,
        /// Declared field type
        expected: String,
        /// Type of the supplied value
        actual: String,
    },

    /// Filter value was an empty optional
    #[error("Invalid value for filter on {0}: value is None")]
    NilValue(String),

    /// Model name is already present in the registry
    #[error("Model name {0} is already registered")]
    NameAlreadyRegistered(String),

    /// Two fields share a name or a store key
    #[error("Model {model} declares field {field} more than once")]
    DuplicateField {
        /// Model name
        model: String,
        /// Field name
        field: String,
    },

    /// Schema is unusable for another reason
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection to the store failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// A command was rejected or failed
    #[error("Command error: {0}")]
    Command(String),

    /// A command returned a reply of an unexpected shape
    #[error("Unexpected reply to {command}: {reply}")]
    UnexpectedReply {
        /// Command name
        command: String,
        /// Description of the reply received
        reply: String,
    },

    /// Command did not complete in time
    #[error("Command timeout")]
    Timeout,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_converts() {
        let err: Error = ValidationError::DuplicateOrder.into();
        assert!(matches!(err, Error::Validation(ValidationError::DuplicateOrder)));
        assert!(err.to_string().contains("only one order"));
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::UnexpectedReply {
            command: "ZRANK".to_string(),
            reply: "members".to_string(),
        };
        assert_eq!(err.to_string(), "Unexpected reply to ZRANK: members");
    }
}
