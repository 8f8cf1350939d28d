use super::random::FastRandom;
use super::response_cache::ByteTreeResponseCache;
use super::system_servers::SystemNameServers;
use super::transport::NetworkTransport;
use ferrous_netkit_application::ports::{DnsResponseCache, DnsTransport, RandomSource};
use ferrous_netkit_application::use_cases::{DnsClient, DnsClientSettings};
use ferrous_netkit_domain::{CacheConfig, Config, ConfigError, ResolverConfig};
use std::sync::Arc;
use tracing::info;

/// Turns configuration into a ready [`DnsClient`].
///
/// Defaults to real sockets, a `fastrand` source and the host's name servers
/// when the configuration lists none. Each piece can be swapped out.
pub struct DnsClientBuilder {
    resolver: ResolverConfig,
    cache: Option<CacheConfig>,
    transport: Arc<dyn DnsTransport>,
    random: Arc<dyn RandomSource>,
    system_servers: SystemNameServers,
}

impl Default for DnsClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsClientBuilder {
    pub fn new() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            cache: None,
            transport: Arc::new(NetworkTransport::new()),
            random: Arc::new(FastRandom::new()),
            system_servers: SystemNameServers::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_resolver_config(config.resolver.clone())
            .with_cache_config(config.cache.clone())
    }

    pub fn with_resolver_config(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    /// Ignored unless `cache.enabled` is set.
    pub fn with_cache_config(mut self, cache: CacheConfig) -> Self {
        self.cache = cache.enabled.then_some(cache);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn DnsTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn with_system_servers(mut self, system_servers: SystemNameServers) -> Self {
        self.system_servers = system_servers;
        self
    }

    pub fn build(self) -> Result<DnsClient, ConfigError> {
        self.resolver.validate()?;

        let mut servers = self.resolver.name_servers()?;
        if servers.is_empty() {
            servers = self
                .system_servers
                .discover()
                .into_iter()
                .map(|server| server.with_protocol(self.resolver.protocol))
                .collect();
        }

        info!(
            servers = servers.len(),
            protocol = %self.resolver.protocol,
            cache = self.cache.is_some(),
            "DNS client configured"
        );

        let mut client = DnsClient::new(servers, self.transport, self.random)
            .with_settings(DnsClientSettings::from(&self.resolver));
        if let Some(cache) = &self.cache {
            let cache: Arc<dyn DnsResponseCache> = Arc::new(ByteTreeResponseCache::from_config(cache));
            client = client.with_cache(cache);
        }
        Ok(client)
    }
}
