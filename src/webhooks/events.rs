use serde::Serialize;

/// Synthetic event type used by manual connectivity checks. It is accepted
/// on dispatch but is not part of the subscribable vocabulary.
pub const TEST_EVENT: &str = "test";

/// A member of the closed event vocabulary, exposed read-only to clients.
#[derive(Debug, Clone, Serialize)]
pub struct EventInfo {
    pub event_type: &'static str,
    pub description: &'static str,
    pub category: &'static str,
}

/// The closed event vocabulary. Extending it means redeploying with an
/// updated table.
pub const WEBHOOK_EVENTS: &[EventInfo] = &[
    EventInfo { event_type: "service.started", description: "Proxy service started", category: "service" },
    EventInfo { event_type: "service.stopped", description: "Proxy service stopped", category: "service" },
    EventInfo { event_type: "service.created", description: "Proxy service created", category: "service" },
    EventInfo { event_type: "service.deleted", description: "Proxy service deleted", category: "service" },
    EventInfo { event_type: "user.created", description: "User created", category: "user" },
    EventInfo { event_type: "user.deleted", description: "User deleted", category: "user" },
    EventInfo { event_type: "user.disabled", description: "User disabled", category: "user" },
    EventInfo { event_type: "user.enabled", description: "User enabled", category: "user" },
    EventInfo { event_type: "user.quota_exceeded", description: "User traffic quota exceeded", category: "user" },
    EventInfo { event_type: "user.expired", description: "User subscription expired", category: "user" },
    EventInfo { event_type: "domain.created", description: "Domain added", category: "domain" },
    EventInfo { event_type: "domain.cert_issued", description: "TLS certificate issued", category: "domain" },
    EventInfo { event_type: "domain.cert_renewed", description: "TLS certificate renewed", category: "domain" },
    EventInfo { event_type: "domain.cert_expiring", description: "TLS certificate expiring soon", category: "domain" },
    EventInfo { event_type: "domain.deleted", description: "Domain deleted", category: "domain" },
    EventInfo { event_type: "backup.created", description: "Backup created", category: "backup" },
    EventInfo { event_type: "backup.restored", description: "Backup restored", category: "backup" },
    EventInfo { event_type: "backup.deleted", description: "Backup deleted", category: "backup" },
    EventInfo { event_type: "system.health_warning", description: "System health warning", category: "system" },
    EventInfo { event_type: "system.resource_alert", description: "System resource alert", category: "system" },
    EventInfo { event_type: "system.error", description: "System error", category: "system" },
];

pub fn is_valid_event(event_type: &str) -> bool {
    WEBHOOK_EVENTS.iter().any(|e| e.event_type == event_type)
}

/// Validates a subscription's event list against the vocabulary, returning
/// the invalid entries. An empty result means the list is acceptable.
pub fn invalid_events(events: &[String]) -> Vec<String> {
    events
        .iter()
        .filter(|e| !is_valid_event(e))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_members_are_valid() {
        assert!(is_valid_event("user.created"));
        assert!(is_valid_event("domain.cert_expiring"));
        assert!(is_valid_event("system.error"));
    }

    #[test]
    fn test_unknown_and_test_events_are_not_subscribable() {
        assert!(!is_valid_event("user.promoted"));
        assert!(!is_valid_event(""));
        // "test" is dispatch-only, never part of the create-path vocabulary.
        assert!(!is_valid_event(TEST_EVENT));
    }

    #[test]
    fn test_invalid_events_names_offenders() {
        let events = vec![
            "user.created".to_string(),
            "bogus.event".to_string(),
            "service.stopped".to_string(),
            "nope".to_string(),
        ];
        assert_eq!(invalid_events(&events), vec!["bogus.event", "nope"]);
    }

    #[test]
    fn test_vocabulary_has_no_duplicates() {
        let mut names: Vec<_> = WEBHOOK_EVENTS.iter().map(|e| e.event_type).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), WEBHOOK_EVENTS.len());
    }
}
