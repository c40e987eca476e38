//! Bookkeeping for long-lived listeners (auth state, notifications, feed queries).
//!
//! Every listener the core starts is registered here under a scope; the owner
//! disposes its scope when it goes away, and [`Subscriptions::dispose_all`] runs
//! on shutdown. Deliveries tagged with an id that is no longer registered are
//! dropped by the caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::feeds::FeedKind;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriptionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Who owns a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionScope {
    AuthState,
    Notifications,
    Feed(FeedKind),
}

#[derive(Debug, Default)]
pub struct Subscriptions {
    active: HashMap<SubscriptionId, SubscriptionScope>,
}

impl Subscriptions {
    /// Registers a fresh id. Any listener already held by `scope` is returned for disposal.
    pub fn register(&mut self, scope: SubscriptionScope) -> (SubscriptionId, Vec<SubscriptionId>) {
        let replaced = self.dispose(scope);
        let id = SubscriptionId::generate();
        self.active.insert(id.clone(), scope);
        (id, replaced)
    }

    /// Removes and returns every id held by `scope`.
    pub fn dispose(&mut self, scope: SubscriptionScope) -> Vec<SubscriptionId> {
        let ids: Vec<SubscriptionId> = self
            .active
            .iter()
            .filter(|(_, s)| **s == scope)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            self.active.remove(id);
        }
        ids
    }

    pub fn dispose_all(&mut self) -> Vec<(SubscriptionId, SubscriptionScope)> {
        self.active.drain().collect()
    }

    /// True when `id` is live and owned by `scope`.
    #[must_use]
    pub fn is_active(&self, id: &SubscriptionId, scope: SubscriptionScope) -> bool {
        self.active.get(id) == Some(&scope)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_replaces_previous_listener_in_scope() {
        let mut subs = Subscriptions::default();
        let (first, replaced) = subs.register(SubscriptionScope::Notifications);
        assert!(replaced.is_empty());

        let (second, replaced) = subs.register(SubscriptionScope::Notifications);
        assert_eq!(replaced, vec![first.clone()]);
        assert!(!subs.is_active(&first, SubscriptionScope::Notifications));
        assert!(subs.is_active(&second, SubscriptionScope::Notifications));
        assert_eq!(subs.len(), 1);
    }

    #[test]
    fn dispose_only_touches_its_scope() {
        let mut subs = Subscriptions::default();
        let (news, _) = subs.register(SubscriptionScope::Feed(FeedKind::News));
        let (auth, _) = subs.register(SubscriptionScope::AuthState);

        assert_eq!(subs.dispose(SubscriptionScope::Feed(FeedKind::News)), vec![news]);
        assert!(subs.is_active(&auth, SubscriptionScope::AuthState));
        assert!(!subs.is_active(&auth, SubscriptionScope::Notifications));
    }

    #[test]
    fn dispose_all_empties_the_registry() {
        let mut subs = Subscriptions::default();
        subs.register(SubscriptionScope::AuthState);
        subs.register(SubscriptionScope::Notifications);
        subs.register(SubscriptionScope::Feed(FeedKind::EmergencyCases));

        assert_eq!(subs.dispose_all().len(), 3);
        assert!(subs.is_empty());
    }
}
