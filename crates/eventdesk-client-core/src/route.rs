use std::fmt;

use crate::auth::Role;

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketingPage {
    About,
    Contact,
    Features,
}

impl MarketingPage {
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::About => "about",
            Self::Contact => "contact",
            Self::Features => "features",
        }
    }

    fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "about" => Some(Self::About),
            "contact" => Some(Self::Contact),
            "features" => Some(Self::Features),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DashboardSection {
    Overview,
    Events,
    NewEvent,
    Event { event_id: String },
    Rsvps,
    Notifications,
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminSection {
    Overview,
    Events,
    Users,
    Reports,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AppRoute {
    Home,
    Marketing(MarketingPage),
    Login,
    Register,
    GuestRsvp { event_id: String },
    Dashboard { section: DashboardSection },
    Admin { section: AdminSection },
    NotFound { path: String },
}

impl AppRoute {
    #[must_use]
    pub fn from_path(raw: &str) -> Self {
        let path = raw.split(['?', '#']).next().unwrap_or_default();
        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>();

        match segments.as_slice() {
            [] => Self::Home,
            ["login"] => Self::Login,
            ["register"] => Self::Register,
            ["rsvp", event_id] => Self::GuestRsvp {
                event_id: (*event_id).to_string(),
            },
            ["dashboard", rest @ ..] => match dashboard_section(rest) {
                Some(section) => Self::Dashboard { section },
                None => Self::not_found(path),
            },
            ["admin", rest @ ..] => match admin_section(rest) {
                Some(section) => Self::Admin { section },
                None => Self::not_found(path),
            },
            [slug] => match MarketingPage::from_slug(slug) {
                Some(page) => Self::Marketing(page),
                None => Self::not_found(path),
            },
            _ => Self::not_found(path),
        }
    }

    fn not_found(path: &str) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }

    #[must_use]
    pub fn to_path(&self) -> String {
        match self {
            Self::Home => HOME_PATH.to_string(),
            Self::Marketing(page) => format!("/{}", page.slug()),
            Self::Login => LOGIN_PATH.to_string(),
            Self::Register => "/register".to_string(),
            Self::GuestRsvp { event_id } => format!("/rsvp/{event_id}"),
            Self::Dashboard { section } => match section {
                DashboardSection::Overview => "/dashboard".to_string(),
                DashboardSection::Events => "/dashboard/events".to_string(),
                DashboardSection::NewEvent => "/dashboard/events/new".to_string(),
                DashboardSection::Event { event_id } => format!("/dashboard/events/{event_id}"),
                DashboardSection::Rsvps => "/dashboard/rsvps".to_string(),
                DashboardSection::Notifications => "/dashboard/notifications".to_string(),
                DashboardSection::Profile => "/dashboard/profile".to_string(),
            },
            Self::Admin { section } => match section {
                AdminSection::Overview => "/admin".to_string(),
                AdminSection::Events => "/admin/events".to_string(),
                AdminSection::Users => "/admin/users".to_string(),
                AdminSection::Reports => "/admin/reports".to_string(),
            },
            Self::NotFound { path } => path.clone(),
        }
    }

    /// Role a visitor must hold for the view to render; `None` for public views.
    #[must_use]
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Self::Dashboard { .. } => Some(Role::User),
            Self::Admin { .. } => Some(Role::Admin),
            Self::Home
            | Self::Marketing(_)
            | Self::Login
            | Self::Register
            | Self::GuestRsvp { .. }
            | Self::NotFound { .. } => None,
        }
    }

    /// Landing view for a role after login or reload.
    #[must_use]
    pub fn dashboard_for(role: Role) -> Self {
        match role {
            Role::User => Self::Dashboard {
                section: DashboardSection::Overview,
            },
            Role::Admin => Self::Admin {
                section: AdminSection::Overview,
            },
        }
    }
}

impl fmt::Display for AppRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

fn dashboard_section(rest: &[&str]) -> Option<DashboardSection> {
    match rest {
        [] => Some(DashboardSection::Overview),
        ["events"] => Some(DashboardSection::Events),
        ["events", "new"] => Some(DashboardSection::NewEvent),
        ["events", event_id] => Some(DashboardSection::Event {
            event_id: (*event_id).to_string(),
        }),
        ["rsvps"] => Some(DashboardSection::Rsvps),
        ["notifications"] => Some(DashboardSection::Notifications),
        ["profile"] => Some(DashboardSection::Profile),
        _ => None,
    }
}

fn admin_section(rest: &[&str]) -> Option<AdminSection> {
    match rest {
        [] => Some(AdminSection::Overview),
        ["events"] => Some(AdminSection::Events),
        ["users"] => Some(AdminSection::Users),
        ["reports"] => Some(AdminSection::Reports),
        _ => None,
    }
}
