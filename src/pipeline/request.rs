//! Request building: instruction text + one image → [`ExtractionRequest`].
//!
//! Pure and deterministic. The content-part shape is the OpenAI chat
//! multimodal format, which every gateway either speaks natively or maps
//! from (see [`crate::pipeline::gateway`]).

use crate::config::ExtractionConfig;
use crate::pipeline::ingest::NormalizedImage;
use crate::prompts::render_instruction;
use serde::{Deserialize, Serialize};

/// One part of a multimodal user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Image reference inside a [`ContentPart::ImageUrl`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ImageUrl {
    /// Split a `data:<mime>;base64,<payload>` URL into `(mime, payload)`.
    pub fn data_parts(&self) -> Option<(&str, &str)> {
        let rest = self.url.strip_prefix("data:")?;
        let (mime, payload) = rest.split_once(";base64,")?;
        Some((mime, payload))
    }
}

/// The complete, immutable request for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionRequest {
    pub model: String,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
    parts: Vec<ContentPart>,
}

impl ExtractionRequest {
    /// Content parts in send order: instruction first, then the image.
    pub fn parts(&self) -> &[ContentPart] {
        &self.parts
    }

    pub fn instruction(&self) -> &str {
        self.parts
            .iter()
            .find_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn image(&self) -> Option<&ImageUrl> {
        self.parts.iter().find_map(|p| match p {
            ContentPart::ImageUrl { image_url } => Some(image_url),
            _ => None,
        })
    }
}

/// Build the request for `image` under `config`.
pub fn build_request(image: &NormalizedImage, config: &ExtractionConfig) -> ExtractionRequest {
    let instruction = config
        .instruction
        .clone()
        .unwrap_or_else(|| render_instruction(&config.schema));

    ExtractionRequest {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        parts: vec![
            ContentPart::Text { text: instruction },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                    detail: config.image_detail.clone(),
                },
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::SourceKind;
    use serde_json::json;

    fn image() -> NormalizedImage {
        NormalizedImage {
            bytes: b"ab".to_vec(),
            mime_type: "image/jpeg".into(),
            base64: "YWI=".into(),
            source: SourceKind::Image,
            page_count: None,
        }
    }

    #[test]
    fn instruction_then_image() {
        let req = build_request(&image(), &ExtractionConfig::default());
        assert_eq!(req.parts().len(), 2);
        assert!(matches!(req.parts()[0], ContentPart::Text { .. }));
        assert!(matches!(req.parts()[1], ContentPart::ImageUrl { .. }));
        assert!(req.instruction().contains("\"nombre\""));
        assert_eq!(req.image().unwrap().url, "data:image/jpeg;base64,YWI=");
        assert_eq!(req.model, "gpt-4o");
        assert_eq!(req.max_tokens, 300);
    }

    #[test]
    fn serialises_as_openai_parts() {
        let config = ExtractionConfig::builder()
            .instruction("Extract.")
            .image_detail("high")
            .build()
            .unwrap();
        let req = build_request(&image(), &config);
        let parts = serde_json::to_value(req.parts()).unwrap();
        assert_eq!(
            parts,
            json!([
                {"type": "text", "text": "Extract."},
                {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,YWI=", "detail": "high"}}
            ])
        );
    }

    #[test]
    fn detail_omitted_when_unset() {
        let req = build_request(&image(), &ExtractionConfig::default());
        let v = serde_json::to_value(&req.parts()[1]).unwrap();
        assert!(v["image_url"].get("detail").is_none());
    }

    #[test]
    fn deterministic() {
        let config = ExtractionConfig::default();
        assert_eq!(build_request(&image(), &config), build_request(&image(), &config));
    }

    #[test]
    fn data_parts_split() {
        let url = ImageUrl {
            url: "data:image/png;base64,AAAA".into(),
            detail: None,
        };
        assert_eq!(url.data_parts(), Some(("image/png", "AAAA")));
        let url = ImageUrl {
            url: "https://example.org/a.png".into(),
            detail: None,
        };
        assert_eq!(url.data_parts(), None);
    }
}
