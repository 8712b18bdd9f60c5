use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<ContentRole>,
}

/// One content part of a candidate.
///
/// Only the text and inline data payloads are interpreted by the relay; the
/// remaining payload kinds are carried as raw JSON so that newer upstream
/// shapes still parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable_code: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_execution_result: Option<JsonValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
    /// Base64-encoded bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,
}

impl Part {
    pub fn is_thought(&self) -> bool {
        self.thought == Some(true)
    }

    pub fn visible_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.is_empty())
    }

    /// True when the part carries anything besides an empty text field.
    pub fn has_payload(&self) -> bool {
        self.visible_text().is_some()
            || self.inline_data.is_some()
            || self.function_call.is_some()
            || self.function_response.is_some()
            || self.file_data.is_some()
            || self.executable_code.is_some()
            || self.code_execution_result.is_some()
    }

    /// Inline data with a declared media type, e.g. a generated image.
    pub fn has_media(&self) -> bool {
        self.inline_data
            .as_ref()
            .is_some_and(|blob| !blob.mime_type.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// IANA media type, e.g. `image/png`.
    #[serde(default)]
    pub mime_type: String,
    /// Base64-encoded bytes.
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modality {
    #[serde(rename = "MODALITY_UNSPECIFIED")]
    ModalityUnspecified,
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "IMAGE")]
    Image,
    #[serde(rename = "VIDEO")]
    Video,
    #[serde(rename = "AUDIO")]
    Audio,
    #[serde(rename = "DOCUMENT")]
    Document,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalityTokenCount {
    pub modality: Modality,
    #[serde(default)]
    pub token_count: u32,
}
