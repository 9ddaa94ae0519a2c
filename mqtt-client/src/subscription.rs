use mqtt_core::QoS;

use crate::event::Message;
use crate::options::MAX_SUBSCRIPTIONS;
use crate::Error;

/// Handler invoked for every delivered message matching a subscription's
/// filter (§3 `SubscriptionEntry`: "on-message handler").
pub type MessageHandler = Box<dyn FnMut(&Message) + Send>;

/// A live entry in the subscription registry (§3 `SubscriptionEntry`, §4.D).
///
/// Inserted only once a SUBACK grants the filter with a QoS other than
/// `0x80`; removed on UNSUBSCRIBE, on a SUBACK nack, or on client destroy.
pub struct SubscriptionEntry {
    pub filter: String,
    pub qos: QoS,
    pub handler: MessageHandler,
}

impl std::fmt::Debug for SubscriptionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionEntry")
            .field("filter", &self.filter)
            .field("qos", &self.qos)
            .finish()
    }
}

/// Fixed-capacity table mapping topic filter to granted QoS and handler,
/// with MQTT wildcard matching on dispatch.
///
/// Kept as a flat `Vec` scanned linearly rather than the reference corpus's
/// `mqtt-proto` `FilterTree` trie: §4.D caps this table at ~10 entries, so a
/// linear scan is simpler and avoids pulling in `slab` for a table this
/// small.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: Vec<SubscriptionEntry>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        SubscriptionRegistry { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubscriptionEntry> {
        self.entries.iter()
    }

    /// Insert or replace the entry for `filter` (last-writer-wins per §4.D).
    pub fn insert(&mut self, filter: String, qos: QoS, handler: MessageHandler) -> Result<(), Error> {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.filter == filter) {
            existing.qos = qos;
            existing.handler = handler;
            return Ok(());
        }
        if self.entries.len() >= MAX_SUBSCRIPTIONS {
            return Err(Error::ResourceExhausted("subscription table is full"));
        }
        self.entries.push(SubscriptionEntry { filter, qos, handler });
        Ok(())
    }

    pub fn remove(&mut self, filter: &str) -> Option<SubscriptionEntry> {
        let pos = self.entries.iter().position(|e| e.filter == filter)?;
        Some(self.entries.remove(pos))
    }

    pub fn contains(&self, filter: &str) -> bool {
        self.entries.iter().any(|e| e.filter == filter)
    }

    /// All entries whose filter matches `topic`, in registration order.
    pub fn matching_mut<'a>(
        &'a mut self,
        topic: &'a str,
    ) -> impl Iterator<Item = &'a mut SubscriptionEntry> + 'a {
        self.entries.iter_mut().filter(move |e| topic_matches(&e.filter, topic))
    }
}

/// MQTT wildcard match of a concrete topic name against a filter: `+`
/// matches exactly one level, `#` (only valid as the final token) matches
/// zero or more trailing levels.
///
/// Grounded on the level-walk in `mqtt-proto/src/topic.rs`'s `match_topic!`
/// macro, simplified to a direct two-iterator walk (no filter tree) to match
/// this registry's small fixed-capacity scan.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some("+"), None) => return false,
            (Some(f), Some(t)) => {
                if f != t {
                    return false;
                }
            }
            (Some(_), None) => return false,
            (None, Some(_)) => return false,
            (None, None) => return true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_handler() -> MessageHandler {
        Box::new(|_: &Message| {})
    }

    #[test]
    fn single_level_wildcard() {
        assert!(topic_matches("sport/tennis/+", "sport/tennis/player1"));
        assert!(!topic_matches("sport/tennis/+", "sport/tennis/player1/ranking"));
    }

    #[test]
    fn multi_level_wildcard() {
        assert!(topic_matches("sport/#", "sport"));
        assert!(topic_matches("sport/#", "sport/tennis/player1"));
    }

    #[test]
    fn bare_plus_does_not_match_empty_level_gap() {
        assert!(!topic_matches("+", "/"));
        assert!(topic_matches("+/+", "/"));
    }

    #[test]
    fn exact_match_with_no_wildcards() {
        assert!(topic_matches("dev/data", "dev/data"));
        assert!(!topic_matches("dev/data", "dev/other"));
    }

    #[test]
    fn insert_is_idempotent_on_duplicate_filter() {
        let mut registry = SubscriptionRegistry::new();
        registry.insert("dev/data".to_owned(), QoS::AtLeastOnce, noop_handler()).unwrap();
        registry.insert("dev/data".to_owned(), QoS::AtMostOnce, noop_handler()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.iter().next().unwrap().qos, QoS::AtMostOnce);
    }

    #[test]
    fn insert_rejects_beyond_capacity() {
        let mut registry = SubscriptionRegistry::new();
        for i in 0..MAX_SUBSCRIPTIONS {
            registry.insert(format!("topic/{}", i), QoS::AtMostOnce, noop_handler()).unwrap();
        }
        assert!(registry.insert("overflow".to_owned(), QoS::AtMostOnce, noop_handler()).is_err());
    }

    #[test]
    fn matching_returns_in_registration_order() {
        let mut registry = SubscriptionRegistry::new();
        registry.insert("#".to_owned(), QoS::AtMostOnce, noop_handler()).unwrap();
        registry.insert("dev/+".to_owned(), QoS::AtMostOnce, noop_handler()).unwrap();
        let matched: Vec<_> = registry.matching_mut("dev/data").map(|e| e.filter.clone()).collect();
        assert_eq!(matched, vec!["#", "dev/+"]);
    }
}
