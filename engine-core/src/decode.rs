//! Re-materializes an untyped `params` map into a task-specific typed
//! parameter struct, by round-tripping through `serde_json::Value` as the
//! canonical intermediate form.

use serde::de::DeserializeOwned;

use crate::error::{EngineError, ValidationError};

pub fn decode<P: DeserializeOwned>(value: &serde_json::Value) -> Result<P, EngineError> {
    serde_json::from_value(value.clone()).map_err(|e| {
        if e.to_string().contains("missing field") {
            EngineError::Validation(ValidationError::MissingField(e.to_string()))
        } else {
            EngineError::Validation(ValidationError::BadType {
                field: "params".to_string(),
                reason: e.to_string(),
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Params {
        count: u32,
        nameformat: String,
    }

    #[test]
    fn decodes_well_formed_params() {
        let value = json!({"count": 3, "nameformat": "j{{._ENUM_}}"});
        let params: Params = decode(&value).unwrap();
        assert_eq!(
            params,
            Params {
                count: 3,
                nameformat: "j{{._ENUM_}}".to_string()
            }
        );
    }

    #[test]
    fn missing_required_field_is_a_validation_error() {
        let value = json!({"count": 3});
        let err = decode::<Params>(&value).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::MissingField(_))
        ));
    }

    #[test]
    fn wrong_type_is_a_validation_error() {
        let value = json!({"count": "not-a-number", "nameformat": "j"});
        let err = decode::<Params>(&value).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::BadType { .. })
        ));
    }
}
