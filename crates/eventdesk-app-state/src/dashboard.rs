use eventdesk_api_client::{
    AdminStats, ApiClient, EventRecord, Notification, RsvpRecord, UserSummary,
};
use tracing::debug;

use crate::view::LoadState;

/// Organizer ("user") dashboard data. Each panel loads and fails on its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrganizerDashboard {
    pub events: LoadState<Vec<EventRecord>>,
    pub rsvps: LoadState<Vec<RsvpRecord>>,
    pub notifications: LoadState<Vec<Notification>>,
}

impl OrganizerDashboard {
    #[must_use]
    pub fn loading() -> Self {
        Self {
            events: LoadState::Loading,
            rsvps: LoadState::Loading,
            notifications: LoadState::Loading,
        }
    }

    pub async fn load(client: &ApiClient) -> Self {
        let (events, rsvps, notifications) = futures::join!(
            client.list_events(),
            client.rsvps(),
            client.notifications()
        );
        let dashboard = Self {
            events: LoadState::from_result(events),
            rsvps: LoadState::from_result(rsvps),
            notifications: LoadState::from_result(notifications),
        };
        debug!(
            events_ok = dashboard.events.loaded().is_some(),
            rsvps_ok = dashboard.rsvps.loaded().is_some(),
            notifications_ok = dashboard.notifications.loaded().is_some(),
            "organizer dashboard loaded"
        );
        dashboard
    }

    #[must_use]
    pub fn unread_notifications(&self) -> usize {
        self.notifications
            .loaded()
            .map_or(0, |items| items.iter().filter(|item| !item.read).count())
    }

    /// Total guests across loaded RSVPs answering "yes"; a yes without a
    /// count is one guest.
    #[must_use]
    pub fn confirmed_guests(&self) -> u64 {
        self.rsvps.loaded().map_or(0, |items| {
            items
                .iter()
                .filter(|rsvp| rsvp.status.as_deref() == Some("yes"))
                .map(|rsvp| u64::from(rsvp.guests.unwrap_or(1).max(1)))
                .sum()
        })
    }

    #[must_use]
    pub fn should_logout(&self) -> bool {
        self.events.should_logout()
            || self.rsvps.should_logout()
            || self.notifications.should_logout()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminDashboard {
    pub stats: LoadState<AdminStats>,
    pub events: LoadState<Vec<EventRecord>>,
    pub users: LoadState<Vec<UserSummary>>,
}

impl AdminDashboard {
    #[must_use]
    pub fn loading() -> Self {
        Self {
            stats: LoadState::Loading,
            events: LoadState::Loading,
            users: LoadState::Loading,
        }
    }

    pub async fn load(client: &ApiClient) -> Self {
        let (stats, events, users) = futures::join!(
            client.admin_stats(),
            client.admin_events(),
            client.admin_users()
        );
        let dashboard = Self {
            stats: LoadState::from_result(stats),
            events: LoadState::from_result(events),
            users: LoadState::from_result(users),
        };
        debug!(
            stats_ok = dashboard.stats.loaded().is_some(),
            events_ok = dashboard.events.loaded().is_some(),
            users_ok = dashboard.users.loaded().is_some(),
            "admin dashboard loaded"
        );
        dashboard
    }

    /// Users per role label, as reported by the backend.
    #[must_use]
    pub fn users_with_role(&self, role: &str) -> usize {
        self.users.loaded().map_or(0, |users| {
            users
                .iter()
                .filter(|user| user.role.as_deref() == Some(role))
                .count()
        })
    }

    #[must_use]
    pub fn should_logout(&self) -> bool {
        self.stats.should_logout() || self.events.should_logout() || self.users.should_logout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsvp(status: &str, guests: Option<u32>) -> RsvpRecord {
        RsvpRecord {
            status: Some(status.to_string()),
            guests,
            ..RsvpRecord::default()
        }
    }

    #[test]
    fn confirmed_guests_counts_yes_only() {
        let dashboard = OrganizerDashboard {
            rsvps: LoadState::Loaded(vec![
                rsvp("yes", Some(3)),
                rsvp("yes", None),
                rsvp("yes", Some(0)),
                rsvp("maybe", Some(4)),
                rsvp("no", None),
            ]),
            ..OrganizerDashboard::default()
        };
        assert_eq!(dashboard.confirmed_guests(), 5);
    }

    #[test]
    fn unread_count_ignores_unloaded_panels() {
        let mut dashboard = OrganizerDashboard::loading();
        assert_eq!(dashboard.unread_notifications(), 0);

        dashboard.notifications = LoadState::Loaded(vec![
            Notification {
                read: true,
                ..Notification::default()
            },
            Notification::default(),
        ]);
        assert_eq!(dashboard.unread_notifications(), 1);
    }

    #[test]
    fn admin_role_counts() {
        let dashboard = AdminDashboard {
            users: LoadState::Loaded(vec![
                UserSummary {
                    role: Some("admin".to_string()),
                    ..UserSummary::default()
                },
                UserSummary {
                    role: Some("user".to_string()),
                    ..UserSummary::default()
                },
                UserSummary::default(),
            ]),
            ..AdminDashboard::loading()
        };
        assert_eq!(dashboard.users_with_role("user"), 1);
        assert_eq!(dashboard.users_with_role("admin"), 1);
        assert!(!dashboard.should_logout());
    }
}
