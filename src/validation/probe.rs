//! Reachability probes for replacement addresses.
//!
//! ICMP goes through the system `ping` binary and is best-effort: ICMP is
//! frequently filtered, so no reply is informational, never an error. TCP
//! probes connect with a bounded timeout and run concurrently across the
//! configured ports.

use crate::azure::shell;
use async_trait::async_trait;
use futures::future::join_all;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Outcome of probing one address.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub icmp: bool,
    pub per_port: Vec<(u16, bool)>,
}

impl ProbeReport {
    /// An address counts as reachable when ICMP answered or any probed
    /// port accepted a connection.
    pub fn reachable(&self) -> bool {
        self.icmp || self.per_port.iter().any(|(_, open)| *open)
    }

    /// Short human-readable form for notes and logs.
    pub fn describe(&self) -> String {
        let ports: Vec<String> = self
            .per_port
            .iter()
            .map(|(port, open)| format!("tcp/{port}={}", if *open { "open" } else { "closed" }))
            .collect();
        format!(
            "icmp={} {}",
            if self.icmp { "reply" } else { "no-reply" },
            ports.join(" ")
        )
    }
}

/// Probe seam; the Validate phase is tested against a static fake.
#[async_trait]
pub trait Prober {
    async fn probe(&self, address: &str, ports: &[u16]) -> ProbeReport;
}

/// Probes over the real network.
pub struct NetworkProber {
    timeout: Duration,
}

impl NetworkProber {
    pub fn new(timeout: Duration) -> NetworkProber {
        NetworkProber { timeout }
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn probe(&self, address: &str, ports: &[u16]) -> ProbeReport {
        let icmp = ping(address, self.timeout);
        let connects = ports.iter().map(|&port| tcp_open(address, port, self.timeout));
        let results = join_all(connects).await;
        ProbeReport {
            icmp,
            per_port: ports.iter().copied().zip(results).collect(),
        }
    }
}

fn ping(address: &str, probe_timeout: Duration) -> bool {
    let seconds = probe_timeout.as_secs().max(1);
    match shell::run(&format!("ping -c 1 -W {seconds} {address}")) {
        Ok(_) => true,
        Err(e) => {
            log::debug!("icmp probe of {address} got no reply: {e}");
            false
        }
    }
}

async fn tcp_open(address: &str, port: u16, probe_timeout: Duration) -> bool {
    match timeout(probe_timeout, TcpStream::connect((address, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            log::debug!("tcp probe {address}:{port} refused: {e}");
            false
        }
        Err(_) => {
            log::debug!("tcp probe {address}:{port} timed out");
            false
        }
    }
}
