//! Request bodies: JSON values or multipart forms.
//!
//! The caller picks the encoding explicitly. A [`Payload::Json`] is serialized
//! and sent with `Content-Type: application/json`; a [`Payload::Form`] is sent
//! as `multipart/form-data` with a boundary chosen by the transport, and is never
//! JSON-encoded.
//!
//! Forms are kept as owned parts rather than a `reqwest::multipart::Form` so the
//! same body can be sent again when a conditional update is retried.
//!
//! # Examples
//!
//! ```
//! use trial_portal_client::{FormPayload, Payload};
//! use serde_json::json;
//!
//! let json = Payload::from(json!({ "trial_id": "10021" }));
//! assert!(!json.is_form());
//!
//! let form = FormPayload::new()
//!     .text("trial_id", "10021")
//!     .file("template", "wes.xlsx", None, b"PK\x03\x04".to_vec());
//! assert_eq!(form.parts().len(), 2);
//! assert!(Payload::from(form).is_form());
//! ```

use crate::error::{ApiError, Result};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

/// Body of a create or update request.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// JSON body, sent as `application/json`.
    Json(Value),
    /// Multipart form, sent as `multipart/form-data`.
    Form(FormPayload),
}

impl Payload {
    /// Serialize any value into a JSON payload.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Payload::Json(serde_json::to_value(value)?))
    }

    /// Whether this payload is a multipart form.
    #[inline]
    pub fn is_form(&self) -> bool {
        matches!(self, Payload::Form(_))
    }

    /// JSON-encoded body bytes, or `None` for a form.
    pub fn to_json_bytes(&self) -> Result<Option<Bytes>> {
        match self {
            Payload::Json(value) => Ok(Some(Bytes::from(serde_json::to_vec(value)?))),
            Payload::Form(_) => Ok(None),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<FormPayload> for Payload {
    fn from(form: FormPayload) -> Self {
        Payload::Form(form)
    }
}

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    /// Plain text field.
    Text {
        /// Field name.
        name: String,
        /// Field value.
        value: String,
    },
    /// File upload field.
    File {
        /// Field name.
        name: String,
        /// File name reported to the server.
        file_name: String,
        /// MIME type of the file, if known.
        mime: Option<String>,
        /// File contents.
        bytes: Bytes,
    },
}

/// A multipart form body, e.g. a metadata spreadsheet upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormPayload {
    parts: Vec<FormPart>,
}

impl FormPayload {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append a file field.
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<&str>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.map(str::to_string),
            bytes: bytes.into(),
        });
        self
    }

    /// Parts in insertion order.
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Whether the form has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Build a fresh `reqwest` multipart form from the parts.
    pub fn to_multipart(&self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for part in &self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let mut file =
                        reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(file_name.clone());
                    if let Some(mime) = mime {
                        file = file.mime_str(mime).map_err(|e| {
                            ApiError::InvalidHeader(format!("invalid MIME type {}: {}", mime, e))
                        })?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}
