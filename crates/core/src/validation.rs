//! Field- and form-level validation errors shared by every form.
//!
//! Client-side checks run through [`validator::Validate`] derives on the
//! draft types; server-side rejections arrive as JSON bodies. Both are
//! flattened into [`FormErrors`] so a caller renders them the same way.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Key `validator` uses for struct-level (`schema`) errors.
const SCHEMA_KEY: &str = "__all__";

/// Validation messages keyed by form field, plus form-wide messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    form: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`add_field`](Self::add_field).
    pub fn with_field(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.add_field(field, message);
        self
    }

    pub fn add_field(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_form(&mut self, message: impl Into<String>) {
        self.form.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.form.is_empty()
    }

    /// Messages attached to one field, in the order they were added.
    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First message for a field, the one a form shows as helper text.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.field(field).first().map(String::as_str)
    }

    /// Names of all fields carrying at least one message.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn form(&self) -> &[String] {
        &self.form
    }

    /// Extract field errors from a server error body.
    ///
    /// Accepts either an object (`{"errors": {"email": "taken"}}`, values
    /// may be strings or string arrays) or a list of
    /// `{"param"|"path"|"field": .., "msg"|"message": ..}` records. Anything
    /// else yields an empty set.
    pub fn from_server_body(body: &serde_json::Value) -> Self {
        let mut out = Self::new();
        match body.get("errors") {
            Some(serde_json::Value::Object(map)) => {
                for (field, value) in map {
                    match value {
                        serde_json::Value::String(msg) => out.add_field(field.clone(), msg.clone()),
                        serde_json::Value::Array(items) => {
                            for msg in items.iter().filter_map(serde_json::Value::as_str) {
                                out.add_field(field.clone(), msg);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Some(serde_json::Value::Array(items)) => {
                for item in items {
                    let field = ["param", "path", "field"]
                        .iter()
                        .find_map(|k| item.get(*k).and_then(serde_json::Value::as_str));
                    let msg = ["msg", "message"]
                        .iter()
                        .find_map(|k| item.get(*k).and_then(serde_json::Value::as_str));
                    match (field, msg) {
                        (Some(field), Some(msg)) => out.add_field(field, msg),
                        (None, Some(msg)) => out.add_form(msg),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        out
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.form.clone();
        for (field, messages) in &self.fields {
            for msg in messages {
                parts.push(format!("{field}: {msg}"));
            }
        }
        write!(f, "{}", parts.join("; "))
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = Self::new();
        collect(&mut out, None, &errors);
        out
    }
}

fn collect(out: &mut FormErrors, prefix: Option<&str>, errors: &ValidationErrors) {
    for (key, kind) in errors.errors() {
        let key = wire_name(key);
        let name = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let msg = message_of(error);
                    if key == SCHEMA_KEY {
                        out.add_form(msg);
                    } else {
                        out.add_field(name.clone(), msg);
                    }
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(out, Some(&name), nested),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(out, Some(&format!("{name}[{index}]")), nested);
                }
            }
        }
    }
}

/// Field key as the backend spells it: `visit_date` becomes `visitDate`.
fn wire_name(key: &str) -> String {
    if key == SCHEMA_KEY {
        return key.to_string();
    }
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn message_of(error: &ValidationError) -> String {
    match &error.message {
        Some(msg) => msg.to_string(),
        None => format!("Invalid value ({})", error.code),
    }
}

/// Run a draft's derived checks and flatten any failure.
pub fn check<T: Validate + ?Sized>(input: &T) -> Result<(), FormErrors> {
    input.validate().map_err(FormErrors::from)
}
