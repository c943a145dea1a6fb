//! Well-known permission names.
//!
//! The vocabulary is open-ended and owned by the server; these are the
//! names the client gates affordances on. A missing constant here never
//! blocks a server-granted permission from being checked by name.

pub const CALENDAR_CREATE: &str = "calendar.create";
pub const CALENDAR_EDIT: &str = "calendar.edit";
pub const CALENDAR_DELETE: &str = "calendar.delete";

pub const NOTICES_CREATE: &str = "notices.create";
pub const NOTICES_EDIT: &str = "notices.edit";
pub const NOTICES_DELETE: &str = "notices.delete";

pub const DOCUMENTS_UPLOAD: &str = "documents.upload";
pub const DOCUMENTS_EDIT: &str = "documents.edit";
pub const DOCUMENTS_DELETE: &str = "documents.delete";

pub const MESSAGES_MANAGE: &str = "messages.manage";

pub const GUESTBOOK_MANAGE: &str = "guestbook.manage";
