//! Guards page fetches against internal hosts, before and after redirects.

use std::borrow::Cow;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use tracing::warn;
use url::{Host, Url};

use super::FetchError;

const DNS_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);
const BLOCKED_SUFFIXES: &[&str] = &[".localhost", ".local", ".internal", ".arpa"];

/// Resolves host names so their addresses can be checked before fetching.
pub trait DnsResolver {
    async fn lookup(&self, host: &str, port: u16) -> Result<Vec<IpAddr>, FetchError>;
}

pub struct TokioDnsResolver;

impl DnsResolver for TokioDnsResolver {
    async fn lookup(&self, host: &str, port: u16) -> Result<Vec<IpAddr>, FetchError> {
        let addrs = tokio::time::timeout(
            DNS_LOOKUP_TIMEOUT,
            tokio::net::lookup_host((host, port)),
        )
        .await
        .map_err(|_| FetchError::DnsResolution("DNS lookup timed out".to_string()))?
        .map_err(|e| FetchError::DnsResolution(e.to_string()))?;
        Ok(addrs.map(|a| a.ip()).collect())
    }
}

/// Drops userinfo so credentials never reach the logs.
pub(super) fn redact(raw: &str) -> Cow<'_, str> {
    if !raw.contains('@') {
        return Cow::Borrowed(raw);
    }
    match Url::parse(raw) {
        Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            Cow::Owned(parsed.to_string())
        }
        _ => Cow::Borrowed(raw),
    }
}

pub(super) async fn guard(raw: &str, resolver: &impl DnsResolver) -> Result<Url, FetchError> {
    let parsed = parse_public_url(raw).inspect_err(|e| {
        if matches!(e, FetchError::InternalHost) {
            warn!(url = %redact(raw), "blocked fetch to internal host");
        }
    })?;

    if let Some(Host::Domain(domain)) = parsed.host() {
        let port = parsed.port_or_known_default().unwrap_or(80);
        let resolved = resolver.lookup(domain, port).await?;
        if let Some(ip) = resolved.into_iter().find(|ip| !is_public(*ip)) {
            warn!(host = %domain, %ip, "host resolves to a non-public address");
            return Err(FetchError::InternalHost);
        }
    }

    Ok(parsed)
}

fn parse_public_url(raw: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(raw)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidScheme);
    }
    let allowed = match parsed.host() {
        Some(Host::Ipv4(v4)) => is_public(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => is_public(IpAddr::V6(v6)),
        Some(Host::Domain(domain)) => {
            let lower = domain.to_ascii_lowercase();
            lower != "localhost" && !BLOCKED_SUFFIXES.iter().any(|s| lower.ends_with(s))
        }
        None => false,
    };
    if allowed {
        Ok(parsed)
    } else {
        Err(FetchError::InternalHost)
    }
}

fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(v4),
            None => is_public_v6(v6),
        },
    }
}

fn is_public_v4(v4: Ipv4Addr) -> bool {
    let [a, b, ..] = v4.octets();
    // 100.64.0.0/10 is carrier-grade NAT.
    let cgnat = a == 100 && (64..=127).contains(&b);
    !(v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_unspecified()
        || v4.is_broadcast()
        || a == 0
        || cgnat)
}

fn is_public_v6(v6: Ipv6Addr) -> bool {
    let first = v6.segments()[0];
    let link_local = (first & 0xffc0) == 0xfe80;
    let unique_local = (first & 0xfe00) == 0xfc00;
    !(v6.is_loopback() || v6.is_unspecified() || link_local || unique_local)
}
