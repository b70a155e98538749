//! System resolver
//!
//! Address lookups go through the OS resolver. CNAME lookups shell out to
//! `dig`, which is optional: when it is missing the chain simply stops.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::net::IpAddr;
use std::process::Stdio;
use tokio::process::Command;

use super::DnsResolver;

#[derive(Debug, Clone, Default)]
pub struct SystemResolver;

#[async_trait]
impl DnsResolver for SystemResolver {
    async fn lookup_ips(&self, host: &str) -> Result<Vec<IpAddr>> {
        let host = host.trim_end_matches('.');
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .with_context(|| format!("Failed to resolve {}", host))?;

        let mut ips = Vec::new();
        for addr in addrs {
            if !ips.contains(&addr.ip()) {
                ips.push(addr.ip());
            }
        }
        Ok(ips)
    }

    async fn lookup_cname(&self, host: &str) -> Result<Option<String>> {
        let output = Command::new("dig")
            .args(["+short", "CNAME", host])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        let output = match output {
            Ok(output) if output.status.success() => output,
            Ok(_) => return Ok(None),
            Err(e) => {
                tracing::debug!("CNAME lookup for {} skipped: {}", host, e);
                return Ok(None);
            }
        };

        Ok(parse_dig_short(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// First non-comment line of `dig +short` output
fn parse_dig_short(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with(';'))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dig_short() {
        assert_eq!(
            parse_dig_short("d111.cloudfront.net.\n"),
            Some("d111.cloudfront.net.".to_string())
        );
        assert_eq!(parse_dig_short(""), None);
        assert_eq!(parse_dig_short(";; connection timed out\n"), None);
    }

    #[tokio::test]
    async fn test_localhost_resolves() {
        let ips = SystemResolver.lookup_ips("localhost").await.unwrap();
        assert!(ips.iter().any(|ip| ip.is_loopback()));
    }
}
