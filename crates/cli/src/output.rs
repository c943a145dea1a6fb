//! Terminal rendering for identities and resource items.

use std::sync::Arc;

use cabin_core::dashboard::Card;
use cabin_core::identity::Identity;
use cabin_core::resources::{CalendarEvent, Document, EventTime, GuestEntry, Message, Notice};
use cabin_core::types::Timestamp;
use serde::Serialize;

/// One-line text form of an item.
pub trait Line {
    fn line(&self) -> String;
}

fn stamp(at: Option<Timestamp>) -> String {
    at.map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn when(at: &EventTime) -> String {
    match at {
        EventTime::Date(date) => date.format("%Y-%m-%d").to_string(),
        EventTime::At(at) => at.format("%Y-%m-%d %H:%M").to_string(),
    }
}

impl Line for CalendarEvent {
    fn line(&self) -> String {
        format!(
            "{}  {} .. {}  {}",
            self.id,
            when(&self.start),
            when(&self.end),
            self.title
        )
    }
}

impl Line for Notice {
    fn line(&self) -> String {
        let author = self.author.as_ref().map_or("Unknown", |a| a.display_name());
        format!(
            "{}  [{}]  {}  ({}, {})",
            self.id,
            self.priority.as_str(),
            self.title,
            author,
            stamp(self.created_at)
        )
    }
}

impl Line for Document {
    fn line(&self) -> String {
        format!(
            "{}  {:<10}  {}  {}",
            self.id,
            self.category,
            self.download_file_name(),
            stamp(self.uploaded_at)
        )
    }
}

impl Line for Message {
    fn line(&self) -> String {
        let author = self.author.as_ref().map_or("Unknown", |a| a.display_name());
        let photo = if self.image.is_some() { " [photo]" } else { "" };
        format!("{}  {}: {}{}", self.id, author, self.content, photo)
    }
}

impl Line for GuestEntry {
    fn line(&self) -> String {
        let stars = "*".repeat(usize::from(self.rating.unwrap_or(0)));
        let pending = if self.approved { "" } else { " (pending)" };
        format!("{}  {}  {:<5}  {}{}", self.id, self.name, stars, self.message, pending)
    }
}

/// Print `items` one per line, or as a JSON array.
pub fn items<T: Line + Serialize>(items: &[Arc<T>], json: bool) -> anyhow::Result<()> {
    if json {
        let plain: Vec<&T> = items.iter().map(Arc::as_ref).collect();
        println!("{}", serde_json::to_string_pretty(&plain)?);
    } else if items.is_empty() {
        println!("(none)");
    } else {
        for item in items {
            println!("{}", item.line());
        }
    }
    Ok(())
}

pub fn item<T: Line + Serialize>(item: &T, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(item)?);
    } else {
        println!("{}", item.line());
    }
    Ok(())
}

pub fn identity(identity: &Identity, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(identity)?);
        return Ok(());
    }
    println!("{} <{}>  role={}", identity.name, identity.email, identity.role);
    let permissions: Vec<&str> = identity.permissions.iter().collect();
    println!("permissions: {}", permissions.join(", "));
    Ok(())
}

/// Heading plus items, or the card's own error.
pub fn card<T: Line>(card: Card, items: &[T], error: Option<&str>) {
    println!("== {}", card.title());
    match error {
        Some(message) => println!("   {message}"),
        None if items.is_empty() => println!("   (nothing yet)"),
        None => {
            for item in items {
                println!("   {}", item.line());
            }
        }
    }
}
