//! Instance validation against class schemas.

use serde_json::{json, Map, Value};

use crate::error::{ApiError, FieldError};

/// Derive a plain JSON Schema from a class schema.
///
/// Class-schema descriptors describe a single value; instances may carry a
/// list of values per predicate, so each property accepts either its stanza or
/// an array of it, bounded by `min`/`max`. A `min` above one admits only the
/// array. `format: uri` is dropped because
/// instance documents use CURIEs. Unknown keys are allowed.
pub fn validation_schema(class_schema: &Value) -> Value {
    let mut properties = Map::new();

    if let Some(props) = class_schema.get("properties").and_then(Value::as_object) {
        for (key, prop) in props {
            let mut stanza = Map::new();
            if let Some(t) = prop.get("type") {
                stanza.insert("type".into(), t.clone());
            }
            if let Some(format) = prop.get("format").and_then(Value::as_str) {
                if format != "uri" {
                    stanza.insert("format".into(), json!(format));
                }
            }
            if let Some(values) = prop.get("enum") {
                stanza.insert("enum".into(), values.clone());
            }

            let mut array = Map::new();
            array.insert("type".into(), json!("array"));
            array.insert("items".into(), Value::Object(stanza.clone()));
            if let Some(max) = prop.get("max") {
                array.insert("maxItems".into(), max.clone());
            }
            let min = prop.get("min");
            if let Some(min) = min {
                array.insert("minItems".into(), min.clone());
            }

            let property = if min.and_then(Value::as_u64).is_some_and(|min| min > 1) {
                Value::Object(array)
            } else {
                json!({"anyOf": [Value::Object(stanza), Value::Object(array)]})
            };
            properties.insert(key.clone(), property);
        }
    }

    let required = class_schema
        .get("required")
        .cloned()
        .unwrap_or_else(|| json!([]));

    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

/// Validate an instance document against a class schema.
///
/// # Errors
///
/// Returns `ApiError::Invalid` listing every failure, or `ApiError::Upstream`
/// if the class schema itself cannot be compiled.
pub fn validate_instance(class_schema: &Value, instance: &Value) -> Result<(), ApiError> {
    let schema = validation_schema(class_schema);
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| ApiError::upstream(format!("invalid class schema: {}", e)))?;

    let errors: Vec<FieldError> = validator
        .iter_errors(instance)
        .map(|e| FieldError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Invalid { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "upper:name": {"type": "string", "datatype": "xsd:string", "title": "Nome"},
                "upper:age": {"type": "integer", "datatype": "xsd:int", "max": 1},
                "upper:gender": {
                    "type": "string",
                    "format": "uri",
                    "enum": ["upper:Male", "upper:Female"],
                    "min": 1,
                    "max": 1
                }
            },
            "required": ["upper:gender"]
        })
    }

    #[test]
    fn valid_instance() {
        let instance = json!({
            "upper:name": ["Flipper", "Flip"],
            "upper:age": 4,
            "upper:gender": "upper:Male",
            "@context": {"upper": "http://semantica.globo.com/upper/"}
        });
        assert!(validate_instance(&class_schema(), &instance).is_ok());
    }

    #[test]
    fn wrong_type_is_rejected() {
        let instance = json!({"upper:age": "four", "upper:gender": "upper:Male"});
        let result = validate_instance(&class_schema(), &instance);
        assert!(matches!(result, Err(ApiError::Invalid { .. })));
    }

    #[test]
    fn max_cardinality_is_enforced_on_lists() {
        let instance = json!({"upper:age": [4, 5], "upper:gender": "upper:Male"});
        assert!(validate_instance(&class_schema(), &instance).is_err());
    }

    #[test]
    fn min_cardinality_above_one_requires_a_list() {
        let schema = json!({
            "properties": {"upper:nick": {"type": "string", "min": 2}}
        });
        assert!(validate_instance(&schema, &json!({"upper:nick": "Flip"})).is_err());
        assert!(validate_instance(&schema, &json!({"upper:nick": ["Flip"]})).is_err());
        assert!(validate_instance(&schema, &json!({"upper:nick": ["Flip", "Flipper"]})).is_ok());
    }

    #[test]
    fn enum_and_required() {
        let result = validate_instance(&class_schema(), &json!({"upper:gender": "upper:Other"}));
        assert!(result.is_err());

        match validate_instance(&class_schema(), &json!({"upper:age": "x"})) {
            Err(ApiError::Invalid { errors }) => assert_eq!(errors.len(), 2),
            other => panic!("expected two validation errors, got {:?}", other),
        }
    }

    #[test]
    fn uri_format_is_relaxed_for_curies() {
        let schema = validation_schema(&class_schema());
        let gender = &schema["properties"]["upper:gender"]["anyOf"][0];
        assert!(gender.get("format").is_none());
        assert_eq!(schema["properties"]["upper:gender"]["anyOf"][1]["minItems"], 1);
    }
}
