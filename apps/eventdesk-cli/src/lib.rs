#![allow(clippy::print_stdout)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::panic))]

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use eventdesk_api_client::{
    ApiClient, ApiClientConfig, ApiError, EventRecord, Method, RsvpStatus, UpdateUserRoleRequest,
};
use eventdesk_app_state::{
    AdminDashboard, ApiFailure, Credentials, EventWizardState, GuestRsvpAction, GuestRsvpState,
    GuestRsvpStatus, Registration, SessionContext, WizardAction, WizardStatus, apply_rsvp_action,
    apply_wizard_action, submit_event_wizard, submit_guest_rsvp,
};
use eventdesk_client_core::auth::resolve_api_timeout_ms;
use eventdesk_client_core::{AppRoute, Decision, FileStore, Role};
use serde_json::Value;
use tracing::debug;

pub const ENV_SESSION_FILE: &str = "EVENTDESK_SESSION_FILE";
pub const DEFAULT_SESSION_FILE: &str = ".eventdesk-session.json";

type Session = SessionContext<FileStore>;

#[derive(Parser, Debug)]
#[command(name = "eventdesk")]
#[command(about = "EventDesk command-line client")]
pub struct EventDeskCli {
    /// Backend base URL (default: EVENTDESK_API_BASE_URL, EVENTDESK_API_URL, then localhost)
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    /// Session file (default: EVENTDESK_SESSION_FILE, then ./.eventdesk-session.json)
    #[arg(long, global = true)]
    pub session_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an organizer account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the local session
    Logout,
    /// Show the remembered session and where it lands
    Status,
    /// Show which view a path resolves to for the current session
    Open { path: String },
    /// Manage your events
    #[command(subcommand)]
    Events(EventsCommand),
    /// Answer an invitation as a guest (no sign-in needed)
    Rsvp(RsvpArgs),
    /// List notifications
    Notifications {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
        /// Mark one notification as read
        #[arg(long, value_name = "ID")]
        mark_read: Option<String>,
    },
    /// Admin console
    #[command(subcommand)]
    Admin(AdminCommand),
    /// Send a raw request to the backend with the session token
    Request {
        method: String,
        path: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum EventsCommand {
    /// List your events
    List,
    /// Show one event and its RSVPs
    Show { event_id: String },
    /// Create an event
    Create(CreateEventArgs),
    /// Delete an event
    Delete { event_id: String },
}

#[derive(Args, Debug)]
pub struct CreateEventArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub category: Option<String>,
    /// Event date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,
    /// Start time (HH:MM)
    #[arg(long, value_parser = parse_time)]
    pub start: NaiveTime,
    /// End time (HH:MM)
    #[arg(long, value_parser = parse_time)]
    pub end: Option<NaiveTime>,
    /// Last day to RSVP (YYYY-MM-DD)
    #[arg(long)]
    pub rsvp_deadline: Option<NaiveDate>,
    #[arg(long, conflicts_with = "meeting_link")]
    pub location: Option<String>,
    /// Makes the event virtual
    #[arg(long)]
    pub meeting_link: Option<String>,
    #[arg(long)]
    pub capacity: Option<u32>,
}

#[derive(Args, Debug)]
pub struct RsvpArgs {
    pub event_id: String,
    /// yes, no, or maybe
    #[arg(long)]
    pub response: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    /// Extra guests (yes only)
    #[arg(long, default_value_t = 0)]
    pub guests: u32,
    /// Dietary notes (yes only)
    #[arg(long)]
    pub dietary: Option<String>,
    #[arg(long)]
    pub message: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Platform totals
    Stats,
    /// Every event on the platform
    Events,
    /// Every account
    Users,
    /// Change a user's role
    SetRole { user_id: String, role: String },
    /// Delete an account
    DeleteUser { user_id: String },
}

pub async fn run() -> Result<()> {
    run_with(EventDeskCli::parse()).await
}

pub async fn run_with(cli: EventDeskCli) -> Result<()> {
    let session_file = resolve_session_file(cli.session_file);
    debug!(path = %session_file.display(), "using session file");
    let client = build_client(cli.base_url.as_deref())?;
    let mut context = SessionContext::restore(FileStore::new(session_file), client);

    match cli.command {
        Commands::Login { email, password } => {
            let landing = context
                .login(&Credentials::new(email, password))
                .await
                .map_err(|error| anyhow!(error.user_message()))?;
            println!("Signed in. Landing on {landing}");
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            context
                .register(&Registration {
                    name,
                    email,
                    password,
                })
                .await
                .map_err(|error| anyhow!(error.user_message()))?;
            println!("Account created. Run `eventdesk login` to sign in.");
        }
        Commands::Logout => {
            let landing = context.logout();
            println!("Signed out. Landing on {landing}");
        }
        Commands::Status => print_status(&context),
        Commands::Open { path } => {
            let requested = AppRoute::from_path(&path);
            let landed = context.navigate(requested.clone());
            if landed == requested {
                println!("render {landed}");
            } else {
                println!("redirect {landed}");
            }
        }
        Commands::Events(command) => run_events(&mut context, command).await?,
        Commands::Rsvp(args) => run_rsvp(&context, args).await?,
        Commands::Notifications { unread, mark_read } => {
            run_notifications(&mut context, unread, mark_read).await?;
        }
        Commands::Admin(command) => run_admin(&mut context, command).await?,
        Commands::Request { method, path, body } => {
            run_request(&mut context, &method, &path, body.as_deref()).await?;
        }
    }
    Ok(())
}

fn resolve_session_file(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| {
        std::env::var(ENV_SESSION_FILE)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    })
    .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE))
}

fn build_client(base_url: Option<&str>) -> Result<ApiClient> {
    let config = match base_url {
        Some(base_url) => ApiClientConfig {
            base_url: base_url.to_string(),
            timeout_ms: resolve_api_timeout_ms()?,
        },
        None => ApiClientConfig::from_env()?,
    };
    ApiClient::new(config).context("invalid API configuration")
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| format!("expected HH:MM, got '{raw}'"))
}

fn print_status(context: &Session) {
    let snapshot = context.snapshot();
    println!("api: {}", context.client().base_url());
    println!("signed in: {}", if snapshot.has_token() { "yes" } else { "no" });
    println!("role: {}", snapshot.role.as_deref().unwrap_or("-"));
    println!("landing: {}", context.initial_route());
}

fn require(context: &Session, role: Role) -> Result<()> {
    match context.authorize(Some(role)) {
        Decision::Render => Ok(()),
        Decision::Redirect(AppRoute::Login) => {
            bail!("Not signed in. Run `eventdesk login` first.")
        }
        Decision::Redirect(_) => bail!("This command needs the {role} role."),
    }
}

/// Turns a failed call into the CLI error, clearing a rejected session.
fn failure_error(context: &mut Session, failure: ApiFailure) -> anyhow::Error {
    if failure.should_logout {
        context.logout();
        return anyhow!("{} Session cleared; sign in again.", failure.message);
    }
    anyhow!(failure.message)
}

fn api_error(context: &mut Session, error: &ApiError) -> anyhow::Error {
    let failure = context.handle_api_error(error);
    failure_error(context, failure)
}

fn event_line(event: &EventRecord) -> String {
    format!(
        "{}\t{}\t{}",
        event.id,
        event.date.as_deref().unwrap_or("-"),
        event.title
    )
}

fn print_events(events: &[EventRecord]) {
    if events.is_empty() {
        println!("No events.");
    }
    for event in events {
        println!("{}", event_line(event));
    }
}

async fn run_events(context: &mut Session, command: EventsCommand) -> Result<()> {
    require(context, Role::User)?;
    match command {
        EventsCommand::List => {
            let result = context.client().list_events().await;
            let events = result.map_err(|error| api_error(context, &error))?;
            print_events(&events);
        }
        EventsCommand::Show { event_id } => {
            let result = context.client().get_event(&event_id).await;
            let event = result.map_err(|error| api_error(context, &error))?;
            println!("{}", event.title);
            println!("id: {}", event.id);
            println!("date: {}", event.date.as_deref().unwrap_or("-"));
            println!("starts: {}", event.start_time.as_deref().unwrap_or("-"));
            if event.is_virtual {
                println!("link: {}", event.meeting_link.as_deref().unwrap_or("-"));
            } else {
                println!("venue: {}", event.location.as_deref().unwrap_or("-"));
            }
            if let Some(capacity) = event.capacity {
                println!("capacity: {capacity}");
            }

            let result = context.client().event_rsvps(&event_id).await;
            let rsvps = result.map_err(|error| api_error(context, &error))?;
            println!("rsvps: {}", rsvps.len());
            for rsvp in rsvps {
                println!(
                    "  {}\t{}\t{}",
                    rsvp.status.as_deref().unwrap_or("-"),
                    rsvp.guests.unwrap_or(0),
                    rsvp.name.as_deref().unwrap_or("-")
                );
            }
        }
        EventsCommand::Create(args) => create_event(context, args).await?,
        EventsCommand::Delete { event_id } => {
            let result = context.client().delete_event(&event_id).await;
            result.map_err(|error| api_error(context, &error))?;
            println!("Deleted event {event_id}");
        }
    }
    Ok(())
}

/// Drives the wizard one step at a time so each step's checks run in order.
async fn create_event(context: &mut Session, args: CreateEventArgs) -> Result<()> {
    let is_virtual = args.meeting_link.is_some();
    let steps = [
        vec![
            WizardAction::SetTitle(args.title),
            WizardAction::SetDescription(args.description),
            WizardAction::SetCategory(args.category.unwrap_or_default()),
        ],
        vec![
            WizardAction::SetDate(Some(args.date)),
            WizardAction::SetStartTime(Some(args.start)),
            WizardAction::SetEndTime(args.end),
            WizardAction::SetRsvpDeadline(args.rsvp_deadline),
        ],
        vec![
            WizardAction::SetVirtual(is_virtual),
            WizardAction::SetLocation(args.location.unwrap_or_default()),
            WizardAction::SetMeetingLink(args.meeting_link.unwrap_or_default()),
            WizardAction::SetCapacity(args.capacity),
        ],
    ];

    let mut state = EventWizardState::new();
    for actions in steps {
        for action in actions {
            apply_wizard_action(&mut state, action);
        }
        apply_wizard_action(&mut state, WizardAction::Next);
        if let WizardStatus::Invalid(error) = &state.status {
            bail!("{error}");
        }
    }

    submit_event_wizard(context.client(), &mut state).await;
    match state.status {
        WizardStatus::Submitted { event_id } => {
            println!("Created event {event_id}");
            Ok(())
        }
        WizardStatus::Failed(failure) => Err(failure_error(context, failure)),
        WizardStatus::Invalid(error) => bail!("{error}"),
        WizardStatus::Editing | WizardStatus::Submitting => {
            bail!("event was not submitted")
        }
    }
}

async fn run_rsvp(context: &Session, args: RsvpArgs) -> Result<()> {
    let response = args
        .response
        .parse::<RsvpStatus>()
        .map_err(|error| anyhow!(error))?;
    let guest_client = context.client().with_auth_token(None);

    match guest_client.public_event(&args.event_id).await {
        Ok(event) => println!("RSVP for {}", event.title),
        Err(error) => debug!(%error, "public event lookup failed"),
    }

    let mut state = GuestRsvpState::new(args.event_id);
    for action in [
        GuestRsvpAction::SetResponse(response),
        GuestRsvpAction::SetFullName(args.name),
        GuestRsvpAction::SetPhone(args.phone.unwrap_or_default()),
        GuestRsvpAction::SetEmail(args.email.unwrap_or_default()),
        GuestRsvpAction::SetGuestCount(args.guests),
        GuestRsvpAction::SetDietaryNotes(args.dietary.unwrap_or_default()),
        GuestRsvpAction::SetMessage(args.message.unwrap_or_default()),
    ] {
        apply_rsvp_action(&mut state, action);
    }

    submit_guest_rsvp(&guest_client, &mut state).await;
    match state.status {
        GuestRsvpStatus::Submitted => {
            println!("Thanks! Your response ({}) was recorded.", response.as_str());
            Ok(())
        }
        GuestRsvpStatus::Invalid(error) => bail!("{error}"),
        GuestRsvpStatus::Failed(failure) => bail!(failure.message),
        GuestRsvpStatus::Editing | GuestRsvpStatus::Submitting => bail!("rsvp was not submitted"),
    }
}

async fn run_notifications(
    context: &mut Session,
    unread_only: bool,
    mark_read: Option<String>,
) -> Result<()> {
    require(context, Role::User)?;
    if let Some(notification_id) = mark_read {
        let result = context
            .client()
            .mark_notification_read(&notification_id)
            .await;
        result.map_err(|error| api_error(context, &error))?;
        println!("Marked {notification_id} as read");
        return Ok(());
    }

    let result = context.client().notifications().await;
    let notifications = result.map_err(|error| api_error(context, &error))?;
    let shown = notifications
        .iter()
        .filter(|notification| !unread_only || !notification.read)
        .collect::<Vec<_>>();
    if shown.is_empty() {
        println!("No notifications.");
    }
    for notification in shown {
        let marker = if notification.read { ' ' } else { '*' };
        let text = notification
            .title
            .as_deref()
            .unwrap_or(notification.message.as_str());
        println!("{marker} {}\t{text}", notification.id);
    }
    Ok(())
}

async fn run_admin(context: &mut Session, command: AdminCommand) -> Result<()> {
    require(context, Role::Admin)?;
    match command {
        AdminCommand::Stats => {
            let dashboard = AdminDashboard::load(context.client()).await;
            if let Some(failure) = dashboard.stats.failure() {
                return Err(failure_error(context, failure.clone()));
            }
            if let Some(stats) = dashboard.stats.loaded() {
                println!("events: {}", stats.total_events);
                println!("upcoming events: {}", stats.upcoming_events);
                println!("users: {}", stats.total_users);
                println!("rsvps: {}", stats.total_rsvps);
            }
            println!("admins: {}", dashboard.users_with_role(Role::Admin.as_str()));
        }
        AdminCommand::Events => {
            let result = context.client().admin_events().await;
            let events = result.map_err(|error| api_error(context, &error))?;
            print_events(&events);
        }
        AdminCommand::Users => {
            let result = context.client().admin_users().await;
            let users = result.map_err(|error| api_error(context, &error))?;
            for user in users {
                println!(
                    "{}\t{}\t{}",
                    user.id,
                    user.role.as_deref().unwrap_or("-"),
                    user.email.as_deref().unwrap_or("-")
                );
            }
        }
        AdminCommand::SetRole { user_id, role } => {
            let request = UpdateUserRoleRequest {
                role: role.parse::<Role>()?,
            };
            let result = context
                .client()
                .admin_update_user_role(&user_id, &request)
                .await;
            result.map_err(|error| api_error(context, &error))?;
            println!("User {user_id} is now {}", request.role);
        }
        AdminCommand::DeleteUser { user_id } => {
            let result = context.client().admin_delete_user(&user_id).await;
            result.map_err(|error| api_error(context, &error))?;
            println!("Deleted user {user_id}");
        }
    }
    Ok(())
}

async fn run_request(
    context: &mut Session,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> Result<()> {
    let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method '{method}'"))?;
    let body = body
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("--body must be valid JSON")?;

    let result = context
        .client()
        .request::<Value, Value>(method, path, body.as_ref())
        .await;
    let value = result.map_err(|error| api_error(context, &error))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
