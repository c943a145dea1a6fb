//! Transport-neutral request bodies.
//!
//! A [`Payload`] is structured fields plus at most one binary attachment.
//! Callers never pick an encoding: the HTTP layer sends JSON when there is
//! no attachment and `multipart/form-data` when there is one.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CoreError;

/// A file carried alongside form fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Multipart field name (`file`, `image`, `avatar`).
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Build an attachment, guessing the MIME type from the file extension.
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).map(str::to_string);
        Self {
            field: field.into(),
            file_name,
            content_type,
            bytes,
        }
    }

    /// Move the attachment to a different multipart field.
    pub fn under(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }
}

/// Map a file name's extension to a MIME type for the kinds of files the
/// cabin stores. Unknown extensions return `None`.
pub fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    Some(match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => return None,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    fields: Map<String, Value>,
    attachment: Option<Attachment>,
}

impl Payload {
    /// Serialize a value into payload fields. The value must be a JSON
    /// object.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, CoreError> {
        match serde_json::to_value(value)? {
            Value::Object(fields) => Ok(Self {
                fields,
                attachment: None,
            }),
            other => Err(CoreError::NotAnObject(other.to_string())),
        }
    }

    pub fn with_attachment(mut self, attachment: Option<Attachment>) -> Self {
        self.attachment = attachment;
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn is_multipart(&self) -> bool {
        self.attachment.is_some()
    }

    /// Fields rendered as multipart text parts. Strings go as-is, `null`
    /// is skipped, everything else uses its JSON text.
    pub fn text_fields(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some((key.clone(), text))
            })
            .collect()
    }

    pub fn into_parts(self) -> (Map<String, Value>, Option<Attachment>) {
        (self.fields, self.attachment)
    }
}
