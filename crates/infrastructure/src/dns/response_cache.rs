use crate::collections::ByteTree;
use ferrous_netkit_application::ports::DnsResponseCache;
use ferrous_netkit_domain::{CacheConfig, DnsDatagram, DnsQuestionRecord, DnsResourceRecord};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Inserts between two sweeps of expired responses.
const PURGE_INTERVAL: usize = 512;

/// Response cache keyed by the lower-cased wire form of the question.
///
/// Records are clamped to `[min_ttl, max_ttl]` and pinned to an absolute
/// expiry when stored. A response stays live while every record that decides
/// its lifetime (the answer, or the authority section of a negative reply)
/// still has a TTL above zero.
pub struct ByteTreeResponseCache {
    entries: ByteTree<Arc<DnsDatagram>>,
    min_ttl: u32,
    max_ttl: u32,
    inserts: AtomicUsize,
}

impl ByteTreeResponseCache {
    pub fn new(min_ttl: u32, max_ttl: u32) -> Self {
        Self {
            entries: ByteTree::new(),
            min_ttl,
            max_ttl: max_ttl.max(min_ttl),
            inserts: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.min_ttl, config.max_ttl)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every response that is no longer live. Runs on its own every
    /// few hundred inserts; lookups evict what they touch in between.
    pub fn purge_expired(&self) -> usize {
        let removed = self.entries.remove_where(|_, response| !is_live(response));
        if removed > 0 {
            debug!(removed, "Purged expired responses");
        }
        removed
    }

    fn clamp_ttl(&self, ttl: u32) -> u32 {
        ttl.clamp(self.min_ttl, self.max_ttl)
    }
}

fn lifetime_records(response: &DnsDatagram) -> &[DnsResourceRecord] {
    if response.answer.is_empty() {
        &response.authority
    } else {
        &response.answer
    }
}

fn is_live(response: &DnsDatagram) -> bool {
    lifetime_records(response)
        .iter()
        .all(|record| record.ttl_value() > 0)
}

impl DnsResponseCache for ByteTreeResponseCache {
    fn get(&self, question: &DnsQuestionRecord) -> Option<DnsDatagram> {
        let key = question.cache_key().ok()?;
        let cached = self.entries.try_get(&key)?;

        if is_live(&cached) {
            return Some(DnsDatagram::clone(&cached));
        }

        debug!(question = %question, "Evicting expired response");
        self.entries.try_remove(&key);
        None
    }

    fn insert(&self, question: &DnsQuestionRecord, response: &DnsDatagram) {
        // nothing would ever expire it
        if lifetime_records(response).is_empty() {
            return;
        }
        let key = match question.cache_key() {
            Ok(key) => key,
            Err(e) => {
                warn!(question = %question, error = %e, "Response not cacheable");
                return;
            }
        };

        let mut stored = response.clone();
        for record in stored
            .answer
            .iter_mut()
            .chain(stored.authority.iter_mut())
            .chain(stored.additional.iter_mut())
        {
            let ttl = self.clamp_ttl(record.ttl_value());
            record.set_ttl(ttl);
        }
        stored.set_expiry();

        self.entries.set(&key, Arc::new(stored));

        if (self.inserts.fetch_add(1, Ordering::Relaxed) + 1) % PURGE_INTERVAL == 0 {
            self.purge_expired();
        }
    }

    fn remove(&self, question: &DnsQuestionRecord) -> bool {
        question
            .cache_key()
            .is_ok_and(|key| self.entries.try_remove(&key).is_some())
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrous_netkit_domain::{DnsHeader, RecordClass, RecordType};

    fn question() -> DnsQuestionRecord {
        DnsQuestionRecord::new("example.com", RecordType::A, RecordClass::IN)
    }

    fn response_with_ttl(ttl: u32) -> DnsDatagram {
        DnsDatagram::new(
            DnsHeader::query(1, true),
            vec![question()],
            vec![DnsResourceRecord::address(
                "example.com",
                ttl,
                "192.0.2.1".parse().unwrap(),
            )],
            Vec::new(),
            Vec::new(),
        )
    }

    #[test]
    fn test_ttl_is_clamped_into_bounds() {
        let cache = ByteTreeResponseCache::new(60, 300);

        cache.insert(&question(), &response_with_ttl(5));
        let low = cache.get(&question()).unwrap();
        assert!(low.answer[0].ttl_value() > 5);
        assert!(low.answer[0].ttl_value() <= 60);

        cache.insert(&question(), &response_with_ttl(86_400));
        let high = cache.get(&question()).unwrap();
        assert!(high.answer[0].ttl_value() <= 300);
    }

    #[test]
    fn test_response_without_records_is_not_stored() {
        let cache = ByteTreeResponseCache::new(0, 300);
        let empty = DnsDatagram::query(1, question(), true);

        cache.insert(&question(), &empty);

        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_drops_only_expired_responses() {
        let cache = ByteTreeResponseCache::new(0, 300);
        let stale = DnsQuestionRecord::new("stale.example", RecordType::A, RecordClass::IN);
        let mut response = response_with_ttl(0);
        response.question = vec![stale.clone()];
        cache.insert(&stale, &response);
        cache.insert(&question(), &response_with_ttl(300));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.purge_expired(), 0);
        assert!(cache.get(&question()).is_some());
        assert!(!cache.is_empty());
    }

    #[test]
    fn test_inserts_trigger_periodic_purge() {
        let cache = ByteTreeResponseCache::new(0, 300);
        for i in 0..PURGE_INTERVAL {
            let name = format!("host{i}.example");
            let q = DnsQuestionRecord::new(name, RecordType::A, RecordClass::IN);
            cache.insert(&q, &response_with_ttl(0));
        }

        assert!(cache.is_empty());
    }

    #[test]
    fn test_inverted_bounds_collapse_to_min() {
        let cache = ByteTreeResponseCache::new(120, 60);
        assert_eq!(cache.clamp_ttl(10), 120);
        assert_eq!(cache.clamp_ttl(1_000), 120);
    }
}
