use thiserror::Error;

/* A raw exchange record that cannot be turned into a Transaction.
These are never fatal: the record is logged and skipped. */
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    #[error("missing field `{0}`")]
    MissingField(String),
    #[error("invalid value for `{field}`: {value}")]
    InvalidField { field: String, value: String },
    #[error("record is neither a trade, a deposit nor a withdrawal")]
    UnknownKind,
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
}

impl MappingError {
    pub fn invalid(field: &str, value: impl ToString) -> Self {
        return MappingError::InvalidField {
            field: field.to_string(),
            value: value.to_string(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_field() {
        let error = MappingError::invalid("amount", "abc");
        assert_eq!(error, MappingError::InvalidField { field: "amount".to_string(), value: "abc".to_string() });
        assert_eq!(error.to_string(), "invalid value for `amount`: abc");
    }
}
