//! Instruction text sent to the vision model.
//!
//! The instruction is rendered from an [`ExtractionSchema`] so the field list
//! the model sees and the field list the audit checks are the same data.
//! Callers can replace it wholesale via
//! [`crate::config::ExtractionConfig::instruction`].

use crate::schema::ExtractionSchema;

/// Preamble placed before the JSON template.
///
/// Forbids fences and prose. Models still ignore this now and then, which
/// is why [`crate::pipeline::response`] strips one fence pair anyway.
pub const INSTRUCTION_PREAMBLE: &str = "Este es un documento de datos personales. \
Extrae los campos y responde solo con un JSON plano, sin comillas triples ni texto adicional. \
El formato es:";

/// Render the extraction instruction for `schema`.
///
/// ```text
/// <preamble>
///
/// {
///   "nombre": "",
///   "fecha": "DD/MM/YYYY",
///   "ha_desempenado_cargo_en_gobierno": "Sí" o "No"
/// }
/// ```
pub fn render_instruction(schema: &ExtractionSchema) -> String {
    let body = schema
        .fields
        .iter()
        .map(|f| format!("  \"{}\": {}", f.key, f.template))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("{INSTRUCTION_PREAMBLE}\n\n{{\n{body}\n}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_every_key_once() {
        let schema = ExtractionSchema::extended();
        let text = render_instruction(&schema);
        for key in schema.keys() {
            assert_eq!(
                text.matches(&format!("\"{key}\":")).count(),
                1,
                "key {key} not rendered exactly once"
            );
        }
    }

    #[test]
    fn keeps_literal_templates() {
        let text = render_instruction(&ExtractionSchema::extended());
        assert!(text.contains("\"fecha\": \"DD/MM/YYYY\""));
        assert!(text.contains("\"ha_desempenado_cargo_en_gobierno\": \"Sí\" o \"No\"\n}"));
        let text = render_instruction(&ExtractionSchema::identity());
        assert!(text.contains("\"sexo\": \"M\" o \"F\""));
    }

    #[test]
    fn forbids_fences_and_prose() {
        let text = render_instruction(&ExtractionSchema::identity());
        assert!(text.starts_with(INSTRUCTION_PREAMBLE));
        assert!(text.contains("sin comillas triples"));
        assert!(text.ends_with('}'));
        // No trailing comma after the last field.
        assert!(!text.contains(",\n}"));
    }

    #[test]
    fn deterministic() {
        let s = ExtractionSchema::identity();
        assert_eq!(render_instruction(&s), render_instruction(&s));
    }
}
