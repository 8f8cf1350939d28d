use crate::ports::{DnsResponseCache, DnsTransport, RandomSource};
use ferrous_netkit_domain::dns_message::sort_by_preference;
use ferrous_netkit_domain::{
    DnsDatagram, DnsDatagramMetadata, DnsQuestionRecord, DnsResourceRecord, DnsTransportProtocol,
    DomainError, MxData, NameServerAddress, RecordClass, RecordData, RecordType, ResolverConfig,
    ResponseCode,
};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Upper bound on queries issued while following CNAMEs or delegations.
pub const MAX_HOPS: u32 = 64;

#[derive(Debug, Clone)]
pub struct DnsClientSettings {
    /// Passes over the server list. Attempts are `retries * servers`.
    pub retries: u32,
    pub timeout: Duration,
    pub recursion_desired: bool,
    pub tcp_fallback_on_truncation: bool,
}

impl Default for DnsClientSettings {
    fn default() -> Self {
        Self {
            retries: 2,
            timeout: Duration::from_secs(2),
            recursion_desired: true,
            tcp_fallback_on_truncation: true,
        }
    }
}

impl From<&ResolverConfig> for DnsClientSettings {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            retries: config.retries,
            timeout: config.timeout(),
            recursion_desired: config.recursion_desired,
            tcp_fallback_on_truncation: config.tcp_fallback_on_truncation,
        }
    }
}

/// Stub resolver over a fixed list of name servers.
///
/// Holds no mutable state, so one instance can serve concurrent lookups.
#[derive(Clone)]
pub struct DnsClient {
    servers: Arc<[NameServerAddress]>,
    transport: Arc<dyn DnsTransport>,
    random: Arc<dyn RandomSource>,
    cache: Option<Arc<dyn DnsResponseCache>>,
    settings: DnsClientSettings,
}

impl DnsClient {
    pub fn new(
        servers: Vec<NameServerAddress>,
        transport: Arc<dyn DnsTransport>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            servers: servers.into(),
            transport,
            random,
            cache: None,
            settings: DnsClientSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: DnsClientSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn DnsResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn servers(&self) -> &[NameServerAddress] {
        &self.servers
    }

    pub fn settings(&self) -> &DnsClientSettings {
        &self.settings
    }

    /// Sends `question` to the configured servers and returns the first
    /// well-formed reply, whatever its RCODE.
    pub async fn resolve(&self, question: &DnsQuestionRecord) -> Result<DnsDatagram, DomainError> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(question) {
                debug!(question = %question, "Response cache hit");
                return Ok(cached);
            }
        }

        let response = self
            .query_servers(&self.servers, question, self.settings.recursion_desired)
            .await?;

        if let Some(cache) = &self.cache {
            if response.header.rcode == ResponseCode::NoError && !response.is_truncated() {
                cache.insert(question, &response);
            }
        }

        Ok(response)
    }

    pub async fn resolve_name(
        &self,
        domain: &str,
        record_type: RecordType,
    ) -> Result<DnsDatagram, DomainError> {
        self.resolve(&DnsQuestionRecord::new(domain, record_type, RecordClass::IN))
            .await
    }

    /// Addresses of `domain`, following CNAMEs. With `prefer_ipv6` the AAAA
    /// set is tried first and A is used only when it comes back empty.
    pub async fn resolve_ip(
        &self,
        domain: &str,
        prefer_ipv6: bool,
    ) -> Result<Vec<IpAddr>, DomainError> {
        if prefer_ipv6 {
            let addresses = addresses_of(&self.resolve_chasing_cnames(domain, RecordType::AAAA).await?);
            if !addresses.is_empty() {
                return Ok(addresses);
            }
        }
        Ok(addresses_of(
            &self.resolve_chasing_cnames(domain, RecordType::A).await?,
        ))
    }

    /// Mail exchangers of `domain`, lowest preference first.
    pub async fn resolve_mx(&self, domain: &str) -> Result<Vec<MxData>, DomainError> {
        let records = self.resolve_chasing_cnames(domain, RecordType::MX).await?;
        let mut exchangers: Vec<MxData> = records
            .into_iter()
            .filter_map(|record| match record.rdata {
                RecordData::Mx(mx) => Some(mx),
                _ => None,
            })
            .collect();
        sort_by_preference(&mut exchangers);
        Ok(exchangers)
    }

    pub async fn resolve_ptr(&self, ip: IpAddr) -> Result<Option<String>, DomainError> {
        let question = DnsQuestionRecord::ptr(ip);
        let response = self.resolve(&question).await?;
        check_response(&response, &question.name)?;

        Ok(response
            .answer
            .iter()
            .find_map(|record| match &record.rdata {
                RecordData::Ptr(name) if record.name.eq_ignore_ascii_case(&question.name) => {
                    Some(name.clone())
                }
                _ => None,
            }))
    }

    /// Records of `record_type` for `domain`, re-querying whenever the answer
    /// only carries a CNAME for the name being sought.
    pub async fn resolve_chasing_cnames(
        &self,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Vec<DnsResourceRecord>, DomainError> {
        let mut current = domain.trim_end_matches('.').to_string();
        let mut hops = 0;

        loop {
            if hops >= MAX_HOPS {
                return Err(DomainError::HopCountExceeded { hops: MAX_HOPS });
            }
            hops += 1;

            let response = self.resolve_name(&current, record_type).await?;
            check_response(&response, &current)?;

            let (records, target) = follow_answer(&response.answer, &current, record_type)?;
            if !records.is_empty() || target.eq_ignore_ascii_case(&current) {
                return Ok(records);
            }

            debug!(from = %current, to = %target, hops, "Following CNAME");
            current = target;
        }
    }

    /// Tries each server in turn, starting from a random one, until a reply
    /// with the query's ID arrives. Only transport failures move on to the
    /// next attempt.
    pub(crate) async fn query_servers(
        &self,
        servers: &[NameServerAddress],
        question: &DnsQuestionRecord,
        recursion_desired: bool,
    ) -> Result<DnsDatagram, DomainError> {
        if servers.is_empty() {
            return Err(DomainError::NoNameServers);
        }

        let attempts = self.settings.retries.max(1) as usize * servers.len();
        let first = self.random.next_index(servers.len());

        for attempt in 0..attempts {
            let server = &servers[(first + attempt) % servers.len()];
            debug!(server = %server, question = %question, attempt, "Sending query");

            match self.exchange(server, question, recursion_desired).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transport_error() => {
                    warn!(server = %server, attempt, error = %e, "Query attempt failed");
                }
                Err(e) => return Err(e),
            }
        }

        Err(DomainError::ResolutionFailed { attempts })
    }

    async fn exchange(
        &self,
        server: &NameServerAddress,
        question: &DnsQuestionRecord,
        recursion_desired: bool,
    ) -> Result<DnsDatagram, DomainError> {
        let id = self.random.next_id();
        let message = DnsDatagram::query(id, question.clone(), recursion_desired).to_bytes()?;

        let started = Instant::now();
        let mut response = self.send_once(server, &message, id, started).await?;

        if response.is_truncated()
            && server.protocol == DnsTransportProtocol::Udp
            && self.settings.tcp_fallback_on_truncation
        {
            warn!(server = %server, question = %question, "Truncated response, retrying over TCP");
            let tcp = server.with_protocol(DnsTransportProtocol::Tcp);
            response = self.send_once(&tcp, &message, id, started).await?;
        }

        Ok(response)
    }

    async fn send_once(
        &self,
        server: &NameServerAddress,
        message: &[u8],
        id: u16,
        started: Instant,
    ) -> Result<DnsDatagram, DomainError> {
        let raw = self
            .transport
            .send(server, message, self.settings.timeout)
            .await?;
        let mut response = DnsDatagram::from_bytes(&raw)?;

        if response.id() != id {
            return Err(DomainError::ResponseIdMismatch {
                expected: id,
                received: response.id(),
            });
        }

        response.metadata = Some(DnsDatagramMetadata {
            server: server.clone(),
            protocol: server.protocol,
            size: raw.len(),
            rtt: started.elapsed(),
        });
        Ok(response)
    }
}

/// Maps NXDOMAIN and other failure RCODEs to errors.
pub fn check_response(response: &DnsDatagram, domain: &str) -> Result<(), DomainError> {
    match response.header.rcode {
        ResponseCode::NoError => Ok(()),
        ResponseCode::NameError => Err(DomainError::NameError {
            domain: domain.to_string(),
        }),
        rcode => Err(DomainError::ServerFailure { rcode }),
    }
}

// Walks the answer in order. CNAMEs owned by the name being followed move the
// target along; matching records for the final target are collected. A chain
// that comes back to a name it already passed never ends.
fn follow_answer(
    answer: &[DnsResourceRecord],
    domain: &str,
    record_type: RecordType,
) -> Result<(Vec<DnsResourceRecord>, String), DomainError> {
    let mut target = domain.to_string();
    let mut visited = vec![domain.to_ascii_lowercase()];
    let mut records = Vec::new();

    for record in answer {
        if !record.name.eq_ignore_ascii_case(&target) {
            continue;
        }
        match &record.rdata {
            RecordData::Cname(next) if record_type != RecordType::CNAME => {
                target = next.trim_end_matches('.').to_string();
                let key = target.to_ascii_lowercase();
                if visited.contains(&key) {
                    return Err(DomainError::HopCountExceeded { hops: MAX_HOPS });
                }
                visited.push(key);
            }
            _ if record.rtype == record_type => records.push(record.clone()),
            _ => {}
        }
    }

    Ok((records, target))
}

fn addresses_of(records: &[DnsResourceRecord]) -> Vec<IpAddr> {
    records
        .iter()
        .filter_map(|record| match record.rdata {
            RecordData::A(ip) => Some(IpAddr::V4(ip)),
            RecordData::Aaaa(ip) => Some(IpAddr::V6(ip)),
            _ => None,
        })
        .collect()
}
