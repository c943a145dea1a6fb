//! One function per command. Every command runs after session bootstrap;
//! protected ones pass through the route guard first, like the pages do.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use cabin_client::dashboard::{self, CardState};
use cabin_client::guard::{self, GuardDecision};
use cabin_client::{Cabin, GuestAccess, ResourceView, SessionError, SyncError, SyncOutcome};
use cabin_core::account::{Credentials, PasswordChange, ProfileUpdate, Registration};
use cabin_core::resources::{
    CalendarEvent, Document, DocumentUpdate, DocumentUpload, EventDraft, GuestEntry,
    GuestEntryDraft, Message, MessageDraft, Notice, NoticeDraft,
};
use cabin_core::dashboard::Card;
use cabin_core::{Attachment, Resource, Route};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::args::{
    CalendarCommand, Cli, Command, DocumentCommand, EventArgs, GuestAction, GuestArgs,
    GuestBookCommand, MessageCommand, NoticeArgs, NoticeCommand, ProfileArgs,
};
use crate::output;

pub async fn run(cli: Cli, cabin: &Cabin) -> anyhow::Result<()> {
    let state = cabin.session.bootstrap().await;
    debug!(?state, "Bootstrap finished");
    let json = cli.json;

    match cli.command {
        Command::Login { email, password } => {
            let identity = cabin
                .session
                .login(&Credentials::new(email, password))
                .await
                .map_err(session_failure)?;
            println!("Signed in as {}", identity.name);
        }
        Command::Oauth {
            provider,
            access_token,
        } => {
            let identity = cabin
                .session
                .oauth_login(provider, &access_token)
                .await
                .map_err(session_failure)?;
            println!("Signed in with {} as {}", provider.display_name(), identity.name);
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            cabin
                .session
                .register(&Registration {
                    name,
                    email,
                    password,
                })
                .await
                .map_err(session_failure)?;
            println!("Account created. Sign in with `cabin login`.");
        }
        Command::Logout => {
            cabin.session.logout();
            println!("Signed out");
        }
        Command::Whoami => {
            enter(cabin, Route::Profile)?;
            let identity = cabin.session.identity().context("not signed in")?;
            output::identity(&identity, json)?;
        }
        Command::Profile(args) => profile(cabin, args, json).await?,
        Command::Password {
            current,
            new_password,
            confirm,
        } => {
            enter(cabin, Route::Profile)?;
            cabin
                .session
                .change_password(&PasswordChange::new(current, new_password, confirm))
                .await
                .map_err(session_failure)?;
            println!("Password updated");
        }
        Command::Dashboard => show_dashboard(cabin, json).await?,
        Command::Open { path } => open(cabin, &path).await?,
        Command::Calendar(cmd) => calendar(cabin, cmd, json).await?,
        Command::Notices(cmd) => notices(cabin, cmd, json).await?,
        Command::Documents(cmd) => documents(cabin, cmd, json).await?,
        Command::Messages(cmd) => messages(cabin, cmd, json).await?,
        Command::Guestbook(cmd) => guest_book(cabin, cmd, json).await?,
        Command::Guest(args) => guest(cabin, args, json).await?,
    }
    Ok(())
}

/// Navigate to `route` and require the guard to let it render.
fn enter(cabin: &Cabin, route: Route) -> anyhow::Result<()> {
    cabin.context.navigate(route.clone());
    match guard::evaluate_route(&cabin.session.state(), &route) {
        GuardDecision::Render => Ok(()),
        GuardDecision::Redirect(Route::Login) => {
            cabin.context.navigate(Route::Login);
            bail!("Not signed in. Run `cabin login` first.")
        }
        GuardDecision::Redirect(to) => {
            cabin.context.navigate(to.clone());
            bail!("{route} is not available to you; sent to {to}")
        }
        GuardDecision::Waiting => bail!("Session is still loading"),
    }
}

fn session_failure(error: SessionError) -> anyhow::Error {
    let mut lines = vec![error.message.clone()];
    for field in error.fields.field_names() {
        for message in error.fields.field(field) {
            let line = format!("  {field}: {message}");
            if !error.message.contains(message.as_str()) {
                lines.push(line);
            }
        }
    }
    anyhow!(lines.join("\n"))
}

/// Unwrap a view result, preferring the page's own error message.
fn applied<R: Resource, T>(
    view: &ResourceView<R>,
    result: Result<SyncOutcome<T>, SyncError>,
) -> anyhow::Result<T> {
    match result {
        Ok(SyncOutcome::Applied(value)) => Ok(value),
        Ok(SyncOutcome::Detached) => bail!("view closed before the server answered"),
        Err(SyncError::Api(e)) if e.is_unauthorized() => {
            bail!("Session expired. Run `cabin login` again.")
        }
        Err(SyncError::Api(e)) => match view.error() {
            Some(message) => Err(anyhow::Error::new(e).context(message)),
            None => Err(e.into()),
        },
        Err(e) => Err(e.into()),
    }
}

async fn loaded<R: Resource>(cabin: &Cabin) -> anyhow::Result<ResourceView<R>> {
    let view = cabin.view::<R>();
    let result = view.load().await;
    applied(&view, result)?;
    Ok(view)
}

async fn attachment(field: &str, path: &Path) -> anyhow::Result<Attachment> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(Attachment::new(field, name, bytes))
}

async fn profile(cabin: &Cabin, args: ProfileArgs, json: bool) -> anyhow::Result<()> {
    enter(cabin, Route::Profile)?;
    let current = cabin.session.identity().context("not signed in")?;

    let mut update = ProfileUpdate::from_identity(&current);
    if let Some(name) = args.name {
        update.name = name;
    }
    if let Some(email) = args.email {
        update.email = email;
    }
    if args.phone.is_some() {
        update.phone = args.phone;
    }
    if args.bio.is_some() {
        update.bio = args.bio;
    }
    if let Some(path) = args.avatar {
        update.avatar = Some(attachment("avatar", &path).await?);
    }

    let identity = cabin
        .session
        .update_profile(&update)
        .await
        .map_err(session_failure)?;
    output::identity(&identity, json)
}

fn card_json<T: Serialize>(card: &CardState<T>) -> anyhow::Result<serde_json::Value> {
    Ok(match card {
        CardState::Loaded(items) => serde_json::to_value(items)?,
        CardState::Failed(message) => json!({ "error": message }),
    })
}

async fn show_dashboard(cabin: &Cabin, json: bool) -> anyhow::Result<()> {
    enter(cabin, Route::Dashboard)?;
    let view = dashboard::load(&cabin.api, &chrono::Local::now()).await;

    if json {
        let cards = json!({
            "upcomingEvents": card_json(&view.upcoming_events)?,
            "recentNotices": card_json(&view.recent_notices)?,
            "recentDocuments": card_json(&view.recent_documents)?,
            "recentMessages": card_json(&view.recent_messages)?,
            "recentGuestEntries": card_json(&view.recent_guest_entries)?,
        });
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }

    let name = cabin
        .session
        .identity()
        .map(|identity| identity.name.clone())
        .unwrap_or_default();
    println!("Welcome back, {name}");
    let events = &view.upcoming_events;
    output::card(Card::UpcomingEvents, events.items(), events.error());
    let notices = &view.recent_notices;
    output::card(Card::RecentNotices, notices.items(), notices.error());
    let docs = &view.recent_documents;
    output::card(Card::RecentDocuments, docs.items(), docs.error());
    let messages = &view.recent_messages;
    output::card(Card::RecentMessages, messages.items(), messages.error());
    let entries = &view.recent_guest_entries;
    output::card(Card::RecentGuestEntries, entries.items(), entries.error());
    Ok(())
}

async fn open(cabin: &Cabin, path: &str) -> anyhow::Result<()> {
    let route = Route::parse(path);
    cabin.context.navigate(route.clone());
    let mut states = cabin.context.subscribe();

    match guard::resolve(&mut states, &route).await {
        GuardDecision::Render => match &route {
            Route::NotFound(_) => println!("Page not found. Back to {}", Route::DEFAULT),
            _ => println!("{route}"),
        },
        GuardDecision::Redirect(to) => {
            cabin.context.navigate(to.clone());
            println!("{route} -> {to}");
        }
        GuardDecision::Waiting => println!("{route} (waiting for session)"),
    }
    Ok(())
}

fn event_draft(args: EventArgs) -> EventDraft {
    EventDraft {
        title: args.title,
        description: args.description,
        start: Some(args.start),
        end: Some(args.end),
        all_day: !args.timed,
    }
}

async fn calendar(cabin: &Cabin, cmd: CalendarCommand, json: bool) -> anyhow::Result<()> {
    enter(cabin, Route::Calendar)?;
    match cmd {
        CalendarCommand::List => {
            let view = loaded::<CalendarEvent>(cabin).await?;
            output::items(&view.items(), json)?;
        }
        CalendarCommand::Create(args) => {
            let view = cabin.view::<CalendarEvent>();
            let result = view.create(&event_draft(args)).await;
            output::item(applied(&view, result)?.as_ref(), json)?;
        }
        CalendarCommand::Update { id, event } => {
            let view = loaded::<CalendarEvent>(cabin).await?;
            let result = view.update(&id, &event_draft(event)).await;
            output::item(applied(&view, result)?.as_ref(), json)?;
        }
        CalendarCommand::Delete { id } => {
            let view = loaded::<CalendarEvent>(cabin).await?;
            let result = view.delete(&id).await;
            applied(&view, result)?;
            println!("Deleted event {id}");
        }
    }
    Ok(())
}

fn notice_draft(args: NoticeArgs) -> NoticeDraft {
    NoticeDraft::new(args.title, args.content).with_priority(args.priority)
}

async fn notices(cabin: &Cabin, cmd: NoticeCommand, json: bool) -> anyhow::Result<()> {
    enter(cabin, Route::Notices)?;
    match cmd {
        NoticeCommand::List => {
            let view = loaded::<Notice>(cabin).await?;
            output::items(&view.items(), json)?;
        }
        NoticeCommand::Create(args) => {
            let view = cabin.view::<Notice>();
            let result = view.create(&notice_draft(args)).await;
            output::item(applied(&view, result)?.as_ref(), json)?;
        }
        NoticeCommand::Update { id, notice } => {
            let view = loaded::<Notice>(cabin).await?;
            let result = view.update(&id, &notice_draft(notice)).await;
            output::item(applied(&view, result)?.as_ref(), json)?;
        }
        NoticeCommand::Delete { id } => {
            let view = loaded::<Notice>(cabin).await?;
            let result = view.delete(&id).await;
            applied(&view, result)?;
            println!("Deleted notice {id}");
        }
    }
    Ok(())
}

async fn documents(cabin: &Cabin, cmd: DocumentCommand, json: bool) -> anyhow::Result<()> {
    enter(cabin, Route::Documents)?;
    match cmd {
        DocumentCommand::List { category } => {
            let view = loaded::<Document>(cabin).await?;
            let mut items = view.items();
            if let Some(category) = category {
                items.retain(|doc| doc.category == category.as_str());
            }
            output::items(&items, json)?;
        }
        DocumentCommand::Upload {
            file,
            name,
            category,
        } => {
            let mut upload = DocumentUpload::from_file(attachment("file", &file).await?, category);
            if let Some(name) = name {
                upload.name = name;
            }
            let view = cabin.view::<Document>();
            let result = view.create(&upload).await;
            output::item(applied(&view, result)?.as_ref(), json)?;
        }
        DocumentCommand::Update { id, name, category } => {
            let view = loaded::<Document>(cabin).await?;
            let result = view.update(&id, &DocumentUpdate { name, category }).await;
            output::item(applied(&view, result)?.as_ref(), json)?;
        }
        DocumentCommand::Delete { id } => {
            let view = loaded::<Document>(cabin).await?;
            let result = view.delete(&id).await;
            applied(&view, result)?;
            println!("Deleted document {id}");
        }
        DocumentCommand::Download { id, dir } => {
            let view = loaded::<Document>(cabin).await?;
            let document = view
                .get(&id)
                .with_context(|| format!("no document with id {id}"))?;
            let saved = download_into(cabin, &document, &dir).await?;
            println!("Saved {}", saved.display());
        }
    }
    Ok(())
}

async fn download_into(cabin: &Cabin, document: &Document, dir: &Path) -> anyhow::Result<PathBuf> {
    let file = cabin_client::documents::download(&cabin.api, document)
        .await
        .context(cabin_client::documents::DOWNLOAD_FAILED)?;
    file.save_in(dir)
        .with_context(|| format!("writing into {}", dir.display()))
}

async fn messages(cabin: &Cabin, cmd: MessageCommand, json: bool) -> anyhow::Result<()> {
    enter(cabin, Route::Messages)?;
    match cmd {
        MessageCommand::List => {
            let view = loaded::<Message>(cabin).await?;
            output::items(&view.items(), json)?;
        }
        MessageCommand::Send { content, image } => {
            let mut draft = MessageDraft::text(content);
            if let Some(path) = image {
                draft = draft.with_image(attachment("image", &path).await?);
            }
            let view = cabin.view::<Message>();
            let result = view.create(&draft).await;
            output::item(applied(&view, result)?.as_ref(), json)?;
        }
        MessageCommand::Edit { id, content } => {
            let view = loaded::<Message>(cabin).await?;
            let result = view.update(&id, &MessageDraft::text(content)).await;
            output::item(applied(&view, result)?.as_ref(), json)?;
        }
        MessageCommand::Delete { id } => {
            let view = loaded::<Message>(cabin).await?;
            let result = view.delete(&id).await;
            applied(&view, result)?;
            println!("Deleted message {id}");
        }
    }
    Ok(())
}

async fn guest_book(cabin: &Cabin, cmd: GuestBookCommand, json: bool) -> anyhow::Result<()> {
    enter(cabin, Route::GuestBook)?;
    let view = loaded::<GuestEntry>(cabin).await?;
    match cmd {
        GuestBookCommand::List => output::items(&view.items(), json)?,
        GuestBookCommand::Approve { id } => {
            let entry = view
                .get(&id)
                .with_context(|| format!("no guest book entry with id {id}"))?;
            let result = view.update(&id, &GuestEntryDraft::approving(&entry)).await;
            output::item(applied(&view, result)?.as_ref(), json)?;
        }
        GuestBookCommand::Delete { id } => {
            let result = view.delete(&id).await;
            applied(&view, result)?;
            println!("Deleted entry {id}");
        }
    }
    Ok(())
}

async fn guest(cabin: &Cabin, args: GuestArgs, json: bool) -> anyhow::Result<()> {
    cabin.context.navigate(Route::Guest(args.pin.clone()));
    let book = cabin.guest_book();

    if let Err(e) = book.verify(&args.pin).await {
        debug!(error = %e, "Guest access refused");
        let message = match book.access() {
            GuestAccess::PinRequired { error: Some(message) } => message,
            _ => e.to_string(),
        };
        bail!(message);
    }

    match args.action {
        None => output::items(&book.entries(), json)?,
        Some(GuestAction::Sign {
            name,
            email,
            message,
            rating,
            visit_date,
        }) => {
            let draft = GuestEntryDraft::new(name, email, message, visit_date).with_rating(rating);
            let entry = book.sign(&draft).await.map_err(|e| match book.error() {
                Some(message) => anyhow::Error::new(e).context(message),
                None => e.into(),
            })?;
            println!("Thanks for signing the guest book!");
            output::item(entry.as_ref(), json)?;
        }
    }
    Ok(())
}
