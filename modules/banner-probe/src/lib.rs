//! Greeting-line banner grabbing for SSH, FTP, and SMTP.
//!
//! All three protocols volunteer a banner as the first line after connect,
//! so one timed read covers them. Connection goes to whatever address the
//! caller resolves (typically a Tor SOCKS-mapped endpoint).

use anyhow::{anyhow, Result};
use std::net::ToSocketAddrs;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

#[derive(Debug, Clone)]
pub struct Banner {
    pub protocol: String,
    pub port: u16,
    pub line: String,
}

async fn read_first_line(host: &str, port: u16, timeout_ms: u64) -> Result<String> {
    let addr = resolve_first(host, port)?;
    let mut stream = timeout(Duration::from_millis(timeout_ms), TcpStream::connect(addr)).await??;
    let mut buf = vec![0u8; 512];
    let n = timeout(Duration::from_millis(timeout_ms), stream.read(&mut buf)).await??;
    Ok(first_line(&buf[..n]))
}

/// Read the SSH identification string (e.g. "SSH-2.0-OpenSSH_7.2").
pub async fn grab_ssh(host: &str, port: u16, timeout_ms: u64) -> Result<Banner> {
    let line = read_first_line(host, port, timeout_ms).await?;
    Ok(Banner { protocol: "ssh".into(), port, line })
}

/// Read an FTP/SMTP-style "220 ..." greeting.
pub async fn grab_greeting(protocol: &str, host: &str, port: u16, timeout_ms: u64) -> Result<Banner> {
    let line = read_first_line(host, port, timeout_ms).await?;
    Ok(Banner { protocol: protocol.into(), port, line })
}

/// Trim a raw read down to its first line, without trailing CR/LF.
pub fn first_line(raw: &[u8]) -> String {
    let mut line = String::from_utf8_lossy(raw).to_string();
    if let Some(idx) = line.find('\n') {
        line.truncate(idx);
    }
    line.trim_end_matches('\r').to_string()
}

/// Software identifier carried by an SSH identification string: the part
/// after "SSH-<ver>-", or the whole line when it isn't SSH-shaped.
pub fn ssh_software(banner: &str) -> &str {
    banner
        .strip_prefix("SSH-")
        .and_then(|rest| rest.split_once('-').map(|(_, sw)| sw))
        .unwrap_or(banner)
}

fn resolve_first(host: &str, port: u16) -> Result<std::net::SocketAddr> {
    let mut it = (host, port).to_socket_addrs()?;
    it.next().ok_or_else(|| anyhow!("failed to resolve: {}", host))
}
