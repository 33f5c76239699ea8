//! Per-socket subscription bookkeeping.
//!
//! Several channels may hold the same identifier on one pooled socket. The
//! server keeps a single subscription per identifier, so `subscribe` goes
//! out once per socket session and `unsubscribe` only when the last holder
//! leaves.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What a holder must do after attaching to a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionJoin {
    /// Nothing was sent on this socket yet; the caller sends `subscribe`.
    First,
    /// Another holder sent `subscribe`; the confirmation will reach everyone.
    Pending,
    /// The server already confirmed it on this socket.
    Confirmed,
}

#[derive(Debug, Default)]
struct Slot {
    holders: usize,
    sent: bool,
    confirmed: bool,
}

impl Slot {
    fn attach(&mut self) -> SubscriptionJoin {
        if self.confirmed {
            SubscriptionJoin::Confirmed
        } else if self.sent {
            SubscriptionJoin::Pending
        } else {
            self.sent = true;
            SubscriptionJoin::First
        }
    }
}

/// Identifier holder counts for one socket.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionRegistry {
    slots: Mutex<HashMap<String, Slot>>,
}

impl SubscriptionRegistry {
    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a holder for `key`.
    pub(crate) fn join(&self, key: &str) -> SubscriptionJoin {
        let mut slots = self.slots();
        let slot = slots.entry(key.to_string()).or_default();
        slot.holders = slot.holders.saturating_add(1);
        slot.attach()
    }

    /// Re-attaches an existing holder, e.g. after a reconnect.
    pub(crate) fn resume(&self, key: &str) -> SubscriptionJoin {
        self.slots().entry(key.to_string()).or_default().attach()
    }

    /// Removes a holder. Returns true if it was the last one.
    pub(crate) fn leave(&self, key: &str) -> bool {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(key) else {
            return false;
        };
        slot.holders = slot.holders.saturating_sub(1);
        if slot.holders == 0 {
            slots.remove(key);
            return true;
        }
        false
    }

    pub(crate) fn confirm(&self, key: &str) {
        if let Some(slot) = self.slots().get_mut(key) {
            slot.confirmed = true;
        }
    }

    /// Forgets that `subscribe` was sent for `key`.
    pub(crate) fn reset(&self, key: &str) {
        if let Some(slot) = self.slots().get_mut(key) {
            slot.sent = false;
            slot.confirmed = false;
        }
    }

    /// Forgets every sent `subscribe`; the socket was replaced.
    pub(crate) fn reset_all(&self) {
        for slot in self.slots().values_mut() {
            slot.sent = false;
            slot.confirmed = false;
        }
    }

    pub(crate) fn holders(&self, key: &str) -> usize {
        self.slots().get(key).map_or(0, |slot| slot.holders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = r#"{"channel":"TestRunChannel","submission_uuid":"abc"}"#;

    #[test]
    fn test_first_holder_sends() {
        let registry = SubscriptionRegistry::default();
        assert_eq!(registry.join(KEY), SubscriptionJoin::First);
        assert_eq!(registry.join(KEY), SubscriptionJoin::Pending);

        registry.confirm(KEY);
        assert_eq!(registry.join(KEY), SubscriptionJoin::Confirmed);
        assert_eq!(registry.holders(KEY), 3);
    }

    #[test]
    fn test_only_last_leave_unsubscribes() {
        let registry = SubscriptionRegistry::default();
        registry.join(KEY);
        registry.join(KEY);

        assert!(!registry.leave(KEY));
        assert!(registry.leave(KEY));
        assert!(!registry.leave(KEY));
        assert_eq!(registry.holders(KEY), 0);
    }

    #[test]
    fn test_reset_all_requires_resend() {
        let registry = SubscriptionRegistry::default();
        registry.join(KEY);
        registry.join(KEY);
        registry.confirm(KEY);

        registry.reset_all();

        assert_eq!(registry.resume(KEY), SubscriptionJoin::First);
        assert_eq!(registry.resume(KEY), SubscriptionJoin::Pending);
        assert_eq!(registry.holders(KEY), 2);
    }

    #[test]
    fn test_reset_after_rejection() {
        let registry = SubscriptionRegistry::default();
        registry.join(KEY);
        registry.reset(KEY);
        assert_eq!(registry.resume(KEY), SubscriptionJoin::First);
    }
}
