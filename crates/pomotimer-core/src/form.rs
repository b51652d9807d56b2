//! Name-keyed registry of typed fields.
//!
//! Built once and passed by reference to whoever edits values through it.
//! Registering the same name twice is a programming error and fails hard.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    String,
    Boolean,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// A raw string parsed according to its field's type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    String(String),
    Boolean(bool),
}

#[derive(Debug, Clone, Default)]
pub struct FormRegistry {
    fields: Vec<FieldDefinition>,
    disabled: bool,
}

impl FormRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: FieldDefinition) -> Result<(), RegistryError> {
        if self.get(&def.name).is_some() {
            tracing::error!(field = %def.name, "duplicate field registration");
            return Err(RegistryError::DuplicateField(def.name));
        }
        self.fields.push(def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields in registration order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn parse_value(&self, name: &str, raw: &str) -> Result<FieldValue, RegistryError> {
        if self.disabled {
            return Err(RegistryError::Disabled);
        }
        let def = self
            .get(name)
            .ok_or_else(|| RegistryError::UnknownField(name.to_string()))?;
        let invalid = || RegistryError::InvalidValue {
            name: name.to_string(),
            expected: def.field_type.as_str(),
            raw: raw.to_string(),
        };
        let raw_trimmed = raw.trim();
        match def.field_type {
            FieldType::Number => raw_trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FieldValue::Number)
                .ok_or_else(invalid),
            FieldType::Boolean => raw_trimmed
                .parse::<bool>()
                .map(FieldValue::Boolean)
                .map_err(|_| invalid()),
            FieldType::String => Ok(FieldValue::String(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> FormRegistry {
        let mut form = FormRegistry::new();
        form.register(FieldDefinition::new("minutes", FieldType::Number))
            .unwrap();
        form.register(FieldDefinition::new("label", FieldType::String))
            .unwrap();
        form.register(FieldDefinition::new("enabled", FieldType::Boolean))
            .unwrap();
        form
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut form = registry();
        let err = form
            .register(FieldDefinition::new("minutes", FieldType::String))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateField("minutes".into()));
        assert_eq!(form.get("minutes").unwrap().field_type, FieldType::Number);
        assert_eq!(form.fields().len(), 3);
    }

    #[test]
    fn values_parse_by_type() {
        let form = registry();
        assert_eq!(form.parse_value("minutes", " 25 ").unwrap(), FieldValue::Number(25.0));
        assert_eq!(form.parse_value("enabled", "true").unwrap(), FieldValue::Boolean(true));
        assert_eq!(
            form.parse_value("label", "Deep work").unwrap(),
            FieldValue::String("Deep work".into())
        );
    }

    #[test]
    fn bad_values_and_unknown_fields() {
        let form = registry();
        assert!(matches!(
            form.parse_value("minutes", "soon"),
            Err(RegistryError::InvalidValue { expected: "number", .. })
        ));
        assert!(matches!(
            form.parse_value("minutes", "NaN"),
            Err(RegistryError::InvalidValue { .. })
        ));
        assert!(matches!(
            form.parse_value("enabled", "yes"),
            Err(RegistryError::InvalidValue { expected: "boolean", .. })
        ));
        assert_eq!(
            form.parse_value("colour", "red"),
            Err(RegistryError::UnknownField("colour".into()))
        );
    }

    #[test]
    fn disabled_form_refuses_edits() {
        let mut form = registry();
        form.set_disabled(true);
        assert_eq!(form.parse_value("minutes", "5"), Err(RegistryError::Disabled));
        form.set_disabled(false);
        assert!(form.parse_value("minutes", "5").is_ok());
    }
}
