use crate::model::{FieldDescriptor, FieldShape, FieldValue};

/// Checks one answer against its field and returns human-readable problems.
pub fn validate_field(field: &FieldDescriptor, value: &FieldValue) -> Vec<String> {
    let label = &field.label;
    let mut errors = Vec::new();

    match (&field.shape, value) {
        (FieldShape::Text { length }, FieldValue::Text(text)) => {
            if text.chars().count() > *length {
                errors.push(format!("{label} cannot exceed {length} characters"));
            }
        }
        (FieldShape::Date, FieldValue::Date(_)) => {}
        (FieldShape::Date, FieldValue::RawDate(text)) => {
            if !text.trim().is_empty() {
                errors.push(format!("{label} must be a valid date"));
            }
        }
        (FieldShape::Choice { options }, FieldValue::Choice(token)) => {
            if !token.is_empty() && !options.iter().any(|option| &option.token == token) {
                errors.push(format!("{label} must be one of the provided options"));
            }
        }
        (FieldShape::Signature, FieldValue::Signature(_)) => {}
        _ => errors.push(format!("{label} has an unexpected value type")),
    }

    errors
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{ChoiceOption, FieldKind};

    fn field(shape: FieldShape) -> FieldDescriptor {
        FieldDescriptor {
            name: "F".to_string(),
            label: "Field".to_string(),
            shape,
        }
    }

    #[test]
    fn text_longer_than_cell_count_is_rejected() {
        let field = field(FieldShape::Text { length: 3 });
        assert!(validate_field(&field, &FieldValue::Text("abc".to_string())).is_empty());
        assert_eq!(
            validate_field(&field, &FieldValue::Text("abcd".to_string())),
            vec!["Field cannot exceed 3 characters".to_string()]
        );
    }

    #[test]
    fn unparseable_date_is_rejected() {
        let field = field(FieldShape::Date);
        let bad = FieldValue::from_json(FieldKind::Date, json!("32/01/2024"));
        let good = FieldValue::from_json(FieldKind::Date, json!("31/01/2024"));
        let blank = FieldValue::from_json(FieldKind::Date, json!(""));

        assert_eq!(
            validate_field(&field, &bad),
            vec!["Field must be a valid date".to_string()]
        );
        assert!(validate_field(&field, &good).is_empty());
        assert!(validate_field(&field, &blank).is_empty());
    }

    #[test]
    fn choice_must_match_an_option_token() {
        let field = field(FieldShape::Choice {
            options: vec![ChoiceOption {
                display: "Active (A)".to_string(),
                token: "A".to_string(),
            }],
        });

        assert!(validate_field(&field, &FieldValue::Choice("A".to_string())).is_empty());
        assert!(validate_field(&field, &FieldValue::Choice(String::new())).is_empty());
        assert_eq!(
            validate_field(&field, &FieldValue::Choice("Active (A)".to_string())),
            vec!["Field must be one of the provided options".to_string()]
        );
    }

    #[test]
    fn mismatched_value_type_is_reported() {
        let field = field(FieldShape::Signature);
        let value = FieldValue::from_json(FieldKind::Signature, json!("M 0 0"));
        assert_eq!(
            validate_field(&field, &value),
            vec!["Field has an unexpected value type".to_string()]
        );
    }
}
