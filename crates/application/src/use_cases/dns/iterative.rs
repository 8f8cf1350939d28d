//! Iterative resolution: walk delegations from a set of starting servers
//! (usually the root hints) without relying on a recursive resolver.

use super::client::{DnsClient, MAX_HOPS};
use ferrous_netkit_domain::{
    root_name_servers, DnsDatagram, DnsQuestionRecord, DomainError, NameServerAddress,
    RecordClass, RecordData, RecordType, ResponseCode,
};
use futures::future::{BoxFuture, FutureExt};
use std::net::IpAddr;
use tracing::debug;

impl DnsClient {
    /// Resolves `question` starting from the 13 IANA root servers.
    pub async fn resolve_via_root_name_servers(
        &self,
        question: &DnsQuestionRecord,
        prefer_ipv6: bool,
    ) -> Result<DnsDatagram, DomainError> {
        let roots = root_name_servers(prefer_ipv6);
        self.resolve_via_name_servers(&roots, question, prefer_ipv6)
            .await
    }

    /// Resolves `question` by following referrals from `name_servers`.
    ///
    /// Every query sent counts as one hop, including those needed to find
    /// the address of a name server that came without glue. After
    /// `MAX_HOPS` queries the walk fails with `HopCountExceeded`.
    /// The configured servers, cache and recursion flag are not used.
    pub async fn resolve_via_name_servers(
        &self,
        name_servers: &[NameServerAddress],
        question: &DnsQuestionRecord,
        prefer_ipv6: bool,
    ) -> Result<DnsDatagram, DomainError> {
        let mut hops = 0;
        self.iterate(
            name_servers,
            name_servers.to_vec(),
            question.clone(),
            prefer_ipv6,
            &mut hops,
        )
        .await
    }

    fn iterate<'a>(
        &'a self,
        start: &'a [NameServerAddress],
        servers: Vec<NameServerAddress>,
        question: DnsQuestionRecord,
        prefer_ipv6: bool,
        hops: &'a mut u32,
    ) -> BoxFuture<'a, Result<DnsDatagram, DomainError>> {
        async move {
            let mut servers = servers;
            loop {
                if *hops >= MAX_HOPS {
                    return Err(DomainError::HopCountExceeded { hops: MAX_HOPS });
                }
                *hops += 1;

                let response = self.query_servers(&servers, &question, false).await?;
                let delegation = referral_hosts(&response);
                if delegation.is_empty() {
                    return Ok(response);
                }

                let mut next = glue_addresses(&response, &delegation, prefer_ipv6);
                if next.is_empty() {
                    next = self
                        .resolve_glueless(start, &delegation, prefer_ipv6, hops)
                        .await?;
                }
                if next.is_empty() {
                    debug!(question = %question, "Referral without reachable name servers");
                    return Ok(response);
                }

                debug!(
                    question = %question,
                    hops = *hops,
                    next = %next[0],
                    "Following referral"
                );
                servers = next;
            }
        }
        .boxed()
    }

    // Looks up name server hosts one at a time from the starting servers,
    // sharing the caller's hop budget.
    async fn resolve_glueless(
        &self,
        start: &[NameServerAddress],
        hosts: &[String],
        prefer_ipv6: bool,
        hops: &mut u32,
    ) -> Result<Vec<NameServerAddress>, DomainError> {
        let record_type = if prefer_ipv6 {
            RecordType::AAAA
        } else {
            RecordType::A
        };

        for host in hosts {
            let question = DnsQuestionRecord::new(host.as_str(), record_type, RecordClass::IN);
            let response = match self
                .iterate(start, start.to_vec(), question, prefer_ipv6, &mut *hops)
                .await
            {
                Ok(response) => response,
                Err(e @ DomainError::HopCountExceeded { .. }) => return Err(e),
                Err(e) => {
                    debug!(host = %host, error = %e, "Name server lookup failed");
                    continue;
                }
            };

            let servers: Vec<NameServerAddress> = response
                .answer
                .iter()
                .filter(|record| record.name.eq_ignore_ascii_case(host))
                .filter_map(|record| address_of(&record.rdata))
                .map(|ip| NameServerAddress::udp(ip).with_host(host.as_str()))
                .collect();
            if !servers.is_empty() {
                return Ok(servers);
            }
        }

        Ok(Vec::new())
    }
}

// NS hosts of a referral: no answer, NOERROR, NS records in authority.
fn referral_hosts(response: &DnsDatagram) -> Vec<String> {
    if !response.answer.is_empty() || response.header.rcode != ResponseCode::NoError {
        return Vec::new();
    }
    response
        .authority
        .iter()
        .filter_map(|record| match &record.rdata {
            RecordData::Ns(host) => Some(host.clone()),
            _ => None,
        })
        .collect()
}

fn glue_addresses(
    response: &DnsDatagram,
    hosts: &[String],
    prefer_ipv6: bool,
) -> Vec<NameServerAddress> {
    let mut v4 = Vec::new();
    let mut v6 = Vec::new();

    for host in hosts {
        for record in &response.additional {
            if !record.name.eq_ignore_ascii_case(host) {
                continue;
            }
            let server = match address_of(&record.rdata) {
                Some(ip) => NameServerAddress::udp(ip).with_host(host.as_str()),
                None => continue,
            };
            if server.addr.is_ipv4() {
                v4.push(server);
            } else {
                v6.push(server);
            }
        }
    }

    if prefer_ipv6 {
        v6.extend(v4);
        v6
    } else {
        v4
    }
}

fn address_of(rdata: &RecordData) -> Option<IpAddr> {
    match rdata {
        RecordData::A(ip) => Some(IpAddr::V4(*ip)),
        RecordData::Aaaa(ip) => Some(IpAddr::V6(*ip)),
        _ => None,
    }
}
