//! Target field sets sent to the model and expected back from it.
//!
//! A schema is plain data: the key list plus a literal formatting hint per
//! key. The same value drives the instruction text (see [`crate::prompts`])
//! and the post-parse audit, so the two can never drift apart. Bump
//! [`ExtractionSchema::version`] whenever the field list changes.

use crate::output::ExtractedRecord;
use serde::{Deserialize, Serialize};

/// One field the model is asked to fill in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// JSON key in the answer.
    pub key: String,
    /// Literal value template shown to the model, e.g. `"DD/MM/YYYY"` or
    /// `"Sí" o "No"`. Rendered verbatim after the colon.
    pub template: String,
}

impl SchemaField {
    fn text(key: &str) -> Self {
        Self::with_template(key, "\"\"")
    }

    fn with_template(key: &str, template: &str) -> Self {
        Self {
            key: key.to_string(),
            template: template.to_string(),
        }
    }
}

/// Built-in schemas selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    /// Name, surnames, birth date, sex and CURP.
    Identity,
    /// Identity plus address, contact, tax and occupation fields. (default)
    #[default]
    Extended,
}

/// A versioned target field set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSchema {
    pub name: String,
    pub version: u32,
    pub fields: Vec<SchemaField>,
}

impl Default for ExtractionSchema {
    fn default() -> Self {
        Self::from_kind(SchemaKind::default())
    }
}

impl ExtractionSchema {
    pub fn from_kind(kind: SchemaKind) -> Self {
        match kind {
            SchemaKind::Identity => Self::identity(),
            SchemaKind::Extended => Self::extended(),
        }
    }

    /// Short personal-identity field set.
    pub fn identity() -> Self {
        Self {
            name: "identity".to_string(),
            version: 1,
            fields: vec![
                SchemaField::text("nombre"),
                SchemaField::text("apellido_paterno"),
                SchemaField::text("apellido_materno"),
                SchemaField::with_template("fecha_nacimiento", "\"DD/MM/YYYY\""),
                SchemaField::with_template("sexo", "\"M\" o \"F\""),
                SchemaField::text("curp"),
            ],
        }
    }

    /// Identity, address, contact and KYC field set.
    pub fn extended() -> Self {
        Self {
            name: "extended".to_string(),
            version: 1,
            fields: vec![
                SchemaField::text("nombre"),
                SchemaField::text("apellido_paterno"),
                SchemaField::text("apellido_materno"),
                SchemaField::with_template("fecha", "\"DD/MM/YYYY\""),
                SchemaField::text("calle_y_numero"),
                SchemaField::text("colonia"),
                SchemaField::text("ciudad_municipio"),
                SchemaField::text("estado"),
                SchemaField::text("codigo_postal"),
                SchemaField::text("pais_nacimiento"),
                SchemaField::text("nacionalidad"),
                SchemaField::with_template("fecha_nacimiento", "\"DD/MM/YYYY\""),
                SchemaField::text("rfc"),
                SchemaField::text("correo_electronico"),
                SchemaField::text("telefono"),
                SchemaField::text("ocupacion"),
                SchemaField::text("origen_recursos"),
                SchemaField::with_template("ha_desempenado_cargo_en_gobierno", "\"Sí\" o \"No\""),
            ],
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    /// Compare a parsed record's keys with this schema.
    ///
    /// Advisory only: the pipeline logs the result and returns the record
    /// unchanged whatever it says.
    pub fn audit(&self, record: &ExtractedRecord) -> SchemaAudit {
        let missing = self
            .keys()
            .filter(|k| !record.contains_key(*k))
            .map(str::to_string)
            .collect();
        let unexpected = record
            .keys()
            .filter(|k| !self.fields.iter().any(|f| &f.key == *k))
            .cloned()
            .collect();
        SchemaAudit {
            missing,
            unexpected,
        }
    }
}

/// Key-level differences between a record and its schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaAudit {
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
}

impl SchemaAudit {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> ExtractedRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extended_is_default() {
        let s = ExtractionSchema::default();
        assert_eq!(s.name, "extended");
        assert_eq!(s.fields.len(), 18);
        assert_eq!(s.fields[0].key, "nombre");
        assert_eq!(
            s.fields.last().unwrap().key,
            "ha_desempenado_cargo_en_gobierno"
        );
    }

    #[test]
    fn keys_are_unique() {
        for s in [ExtractionSchema::identity(), ExtractionSchema::extended()] {
            let mut keys: Vec<_> = s.keys().collect();
            let n = keys.len();
            keys.sort_unstable();
            keys.dedup();
            assert_eq!(keys.len(), n, "duplicate key in schema {}", s.name);
        }
    }

    #[test]
    fn audit_reports_missing_and_unexpected() {
        let s = ExtractionSchema::identity();
        let r = record(r#"{"nombre":"Ana","apellido_paterno":"Ruiz","edad":"30"}"#);
        let audit = s.audit(&r);
        assert!(!audit.is_clean());
        assert!(audit.missing.contains(&"curp".to_string()));
        assert!(!audit.missing.contains(&"nombre".to_string()));
        assert_eq!(audit.unexpected, vec!["edad".to_string()]);
    }

    #[test]
    fn audit_clean_on_exact_match() {
        let s = ExtractionSchema::identity();
        let r = record(
            r#"{"nombre":"","apellido_paterno":"","apellido_materno":"",
                "fecha_nacimiento":"01/02/1990","sexo":"F","curp":""}"#,
        );
        assert!(s.audit(&r).is_clean());
    }

    #[test]
    fn kind_deserialises_lowercase() {
        let k: SchemaKind = serde_json::from_str("\"identity\"").unwrap();
        assert_eq!(k, SchemaKind::Identity);
    }
}
