//! Class-compatibility check: when multiple service classes share one
//! server, fields with the same name across classes must declare compatible
//! shapes and default values.

use std::collections::HashMap;

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[error("field `{field}` is declared with incompatible defaults by `{first_class}` and `{second_class}`")]
pub struct SchemaConflict {
    pub field: String,
    pub first_class: String,
    pub second_class: String,
}

/// A single class's declared default for one session field.
#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub class_name: String,
    pub default: Value,
}

/// Accumulates field declarations across classes as they register, and
/// rejects a nondeterministic or conflicting one at registration time
/// rather than at runtime.
#[derive(Default)]
pub struct SessionFieldSchema {
    declarations: HashMap<String, FieldDeclaration>,
}

impl SessionFieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `class_name`'s default for `field`, checking it against
    /// any prior declaration of the same field name by a different class.
    /// Two classes declaring the same field with structurally deep-equal
    /// defaults are compatible; the first declaration wins
    /// the slot and later identical ones are no-ops.
    pub fn declare(&mut self, class_name: &str, field: &str, default: Value) -> Result<(), SchemaConflict> {
        match self.declarations.get(field) {
            None => {
                self.declarations.insert(
                    field.to_owned(),
                    FieldDeclaration { class_name: class_name.to_owned(), default },
                );
                Ok(())
            }
            Some(existing) if existing.default == default => Ok(()),
            Some(existing) => Err(SchemaConflict {
                field: field.to_owned(),
                first_class: existing.class_name.clone(),
                second_class: class_name.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_defaults_are_compatible() {
        let mut schema = SessionFieldSchema::new();
        schema.declare("Cart", "items", Value::from(Vec::<Value>::new())).unwrap();
        assert!(schema.declare("Wishlist", "items", Value::from(Vec::<Value>::new())).is_ok());
    }

    #[test]
    fn differing_defaults_conflict() {
        let mut schema = SessionFieldSchema::new();
        schema.declare("Cart", "count", Value::from(0)).unwrap();
        let err = schema.declare("Orders", "count", Value::from(1)).unwrap_err();
        assert_eq!(err.field, "count");
    }
}
