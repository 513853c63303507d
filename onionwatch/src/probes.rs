//! Built-in protocol probes and their registry wiring.
//!
//! Each probe writes only to its own report fields; anything beyond these
//! three (web, tls, irc, and friends) is registered by external callers
//! through the same trait.

use async_trait::async_trait;
use onionwatch_core::{Onion, Report};
use onionwatch_engine::{ProtocolScanner, ScanConfig, ScannerRegistry};

const PROBE_TIMEOUT_MS: u64 = 10_000;

pub struct SshScanner;

#[async_trait]
impl ProtocolScanner for SshScanner {
    async fn scan_protocol(
        &self,
        onion: &Onion,
        _config: &ScanConfig,
        report: &mut Report,
    ) -> anyhow::Result<()> {
        let banner = banner_probe::grab_ssh(onion.as_str(), 22, PROBE_TIMEOUT_MS).await?;
        report.ssh_detected = true;
        report.ssh_banner = banner.line;
        Ok(())
    }
}

pub struct FtpScanner;

#[async_trait]
impl ProtocolScanner for FtpScanner {
    async fn scan_protocol(
        &self,
        onion: &Onion,
        _config: &ScanConfig,
        report: &mut Report,
    ) -> anyhow::Result<()> {
        let banner = banner_probe::grab_greeting("ftp", onion.as_str(), 21, PROBE_TIMEOUT_MS).await?;
        report.ftp_detected = true;
        report.ftp_banner = banner.line;
        Ok(())
    }
}

pub struct SmtpScanner;

#[async_trait]
impl ProtocolScanner for SmtpScanner {
    async fn scan_protocol(
        &self,
        onion: &Onion,
        _config: &ScanConfig,
        report: &mut Report,
    ) -> anyhow::Result<()> {
        let banner = banner_probe::grab_greeting("smtp", onion.as_str(), 25, PROBE_TIMEOUT_MS).await?;
        report.smtp_detected = true;
        report.smtp_banner = banner.line;
        Ok(())
    }
}

pub fn default_registry() -> ScannerRegistry {
    let mut registry = ScannerRegistry::new();
    registry.register("ssh", Box::new(SshScanner));
    registry.register("ftp", Box::new(FtpScanner));
    registry.register("smtp", Box::new(SmtpScanner));
    registry
}
