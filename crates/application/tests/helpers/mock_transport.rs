#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use ferrous_netkit_application::ports::{DnsResponseCache, DnsTransport, RandomSource};
use ferrous_netkit_domain::{
    DnsDatagram, DnsQuestionRecord, DnsResourceRecord, DomainError, NameServerAddress,
    ResponseCode,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Script = dyn Fn(&NameServerAddress, &DnsDatagram) -> Result<Bytes, DomainError> + Send + Sync;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub server: NameServerAddress,
    pub question: DnsQuestionRecord,
    pub recursion_desired: bool,
}

/// Transport that answers every query from a closure and records the calls.
pub struct ScriptedTransport {
    script: Box<Script>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn raw(
        script: impl Fn(&NameServerAddress, &DnsDatagram) -> Result<Bytes, DomainError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(
        script: impl Fn(&NameServerAddress, &DnsDatagram) -> Result<DnsDatagram, DomainError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self::raw(move |server, query| script(server, query)?.to_bytes())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DnsTransport for ScriptedTransport {
    async fn send(
        &self,
        server: &NameServerAddress,
        message: &[u8],
        _timeout: Duration,
    ) -> Result<Bytes, DomainError> {
        let query = DnsDatagram::from_bytes(message)?;
        self.calls.lock().unwrap().push(RecordedCall {
            server: server.clone(),
            question: query.question[0].clone(),
            recursion_desired: query.header.recursion_desired,
        });
        (self.script)(server, &query)
    }
}

/// Empty NOERROR response echoing the query's ID and question.
pub fn reply(query: &DnsDatagram) -> DnsDatagram {
    let mut header = query.header.clone();
    header.is_response = true;
    header.recursion_available = true;
    DnsDatagram::new(
        header,
        query.question.clone(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
    )
}

pub fn reply_with(query: &DnsDatagram, answer: Vec<DnsResourceRecord>) -> DnsDatagram {
    let mut response = reply(query);
    response.answer = answer;
    response
}

pub fn reply_rcode(query: &DnsDatagram, rcode: ResponseCode) -> DnsDatagram {
    let mut response = reply(query);
    response.header.rcode = rcode;
    response
}

pub fn referral(
    query: &DnsDatagram,
    zone: &str,
    ns_host: &str,
    glue: Option<&str>,
) -> DnsDatagram {
    let mut response = reply(query);
    response.header.recursion_available = false;
    response.authority = vec![DnsResourceRecord::ns(zone, 3600, ns_host)];
    if let Some(ip) = glue {
        response.additional = vec![DnsResourceRecord::address(ns_host, 3600, ip.parse().unwrap())];
    }
    response
}

pub fn timeout(server: &NameServerAddress) -> DomainError {
    DomainError::TransportTimeout {
        server: server.to_string(),
    }
}

/// Deterministic IDs counting up from 1, and a fixed starting server.
pub struct FixedRandom {
    next_id: AtomicU16,
    index: usize,
}

impl FixedRandom {
    pub fn new(index: usize) -> Self {
        Self {
            next_id: AtomicU16::new(1),
            index,
        }
    }
}

impl RandomSource for FixedRandom {
    fn next_id(&self) -> u16 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn next_index(&self, bound: usize) -> usize {
        self.index % bound
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, DnsDatagram>>,
}

impl MemoryCache {
    fn key(question: &DnsQuestionRecord) -> String {
        format!("{}/{}", question.name.to_ascii_lowercase(), question.qtype)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl DnsResponseCache for MemoryCache {
    fn get(&self, question: &DnsQuestionRecord) -> Option<DnsDatagram> {
        self.entries.lock().unwrap().get(&Self::key(question)).cloned()
    }

    fn insert(&self, question: &DnsQuestionRecord, response: &DnsDatagram) {
        self.entries
            .lock()
            .unwrap()
            .insert(Self::key(question), response.clone());
    }

    fn remove(&self, question: &DnsQuestionRecord) -> bool {
        self.entries
            .lock()
            .unwrap()
            .remove(&Self::key(question))
            .is_some()
    }

    fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}
