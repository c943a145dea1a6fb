//! Shared document repository (manuals, contracts, receipts, photos).

use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use super::{ActionPolicy, Draft, Resource};
use crate::error::CoreError;
use crate::identity::UserRef;
use crate::payload::{Attachment, Payload};
use crate::permissions::{DOCUMENTS_DELETE, DOCUMENTS_EDIT, DOCUMENTS_UPLOAD};
use crate::types::{ResourceId, Timestamp};
use crate::validation::FormErrors;

/// Categories offered when uploading. Stored documents may carry other
/// server-defined categories, so [`Document::category`] stays a string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    #[default]
    General,
    Manual,
    Procedure,
    Contract,
    Receipt,
    Photo,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 6] = [
        DocumentCategory::General,
        DocumentCategory::Manual,
        DocumentCategory::Procedure,
        DocumentCategory::Contract,
        DocumentCategory::Receipt,
        DocumentCategory::Photo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::General => "general",
            DocumentCategory::Manual => "manual",
            DocumentCategory::Procedure => "procedure",
            DocumentCategory::Contract => "contract",
            DocumentCategory::Receipt => "receipt",
            DocumentCategory::Photo => "photo",
        }
    }
}

impl std::str::FromStr for DocumentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown document category {s:?}"))
    }
}

fn default_category() -> String {
    DocumentCategory::General.as_str().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(flatten, with = "crate::types::wire_id")]
    pub id: ResourceId,
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    /// Extension without the dot (`pdf`, `jpg`).
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub uploaded_by: Option<UserRef>,
    #[serde(default)]
    pub uploaded_at: Option<Timestamp>,
}

impl Document {
    /// File name a download is saved under: `name.fileType`.
    pub fn download_file_name(&self) -> String {
        if self.file_type.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.file_type)
        }
    }
}

impl Resource for Document {
    const PATH: &'static str = "documents";
    const LABEL: &'static str = "document";
    const PLURAL: &'static str = "documents";
    const POLICY: ActionPolicy = ActionPolicy {
        create: Some(DOCUMENTS_UPLOAD),
        edit: DOCUMENTS_EDIT,
        delete: DOCUMENTS_DELETE,
    };
    const CREATE_VERB: &'static str = "upload";

    type Create = DocumentUpload;
    type Update = DocumentUpdate;

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> Option<&str> {
        self.uploaded_by.as_ref().map(|user| user.id.as_str())
    }
}

/// Upload form: always multipart, the file travels as the `file` part.
#[derive(Debug, Clone, Validate)]
pub struct DocumentUpload {
    #[validate(length(min = 1, message = "Please enter a document name"))]
    pub name: String,
    pub category: DocumentCategory,
    pub file: Option<Attachment>,
}

impl DocumentUpload {
    /// Name the document after the file's stem, like the upload dialog
    /// pre-fills it.
    pub fn from_file(file: Attachment, category: DocumentCategory) -> Self {
        let name = file
            .file_name
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            name,
            category,
            file: Some(file),
        }
    }
}

impl Draft for DocumentUpload {
    fn check(&self) -> Result<(), FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };
        if self.file.is_none() {
            errors.add_field("file", "Please select a file to upload");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn to_payload(&self) -> Result<Payload, CoreError> {
        let file = self.file.clone().map(|file| file.under("file"));
        Ok(Payload::json(&json!({
            "name": self.name,
            "category": self.category,
        }))?
        .with_attachment(file))
    }
}

/// Metadata edit for an existing document (JSON, no file).
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct DocumentUpdate {
    #[validate(length(min = 1, message = "Please enter a document name"))]
    pub name: String,
    pub category: DocumentCategory,
}

impl Draft for DocumentUpdate {
    fn to_payload(&self) -> Result<Payload, CoreError> {
        Payload::json(self)
    }
}
