use ferrous_netkit_domain::{DnsDatagram, DnsQuestionRecord};

/// Response cache consulted by the client before going to the network.
pub trait DnsResponseCache: Send + Sync {
    /// Returns the stored response while its answers are still live.
    fn get(&self, question: &DnsQuestionRecord) -> Option<DnsDatagram>;

    fn insert(&self, question: &DnsQuestionRecord, response: &DnsDatagram);

    fn remove(&self, question: &DnsQuestionRecord) -> bool;

    fn clear(&self);
}
