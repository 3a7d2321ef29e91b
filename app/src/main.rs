#[macro_use]
extern crate clap;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use netlab_api as api;
use netlab::fabric::{Handler, Interface, NodePacket, Verdict};
use netlab::threadings::Exit;
use netlab::topology::Topology;

mod commands;
mod config;

/// Accepts every packet and logs where it ends up
struct LogHandler;

impl Handler for LogHandler {
    fn ingress(&self, _: &mut NodePacket) -> Verdict {
        Verdict::Accept
    }

    fn local_delivery(&self, pkt: &NodePacket) {
        let eth = pkt.packet().ethernet();
        info!(
            interface = pkt.src().name(),
            src = %eth.src,
            dst = %eth.dst,
            etype = eth.etype,
            len = pkt.packet().raw().len(),
            "packet delivered"
        );
        if let Some(arp) = pkt.packet().arp() {
            info!(
                interface = pkt.src().name(),
                "arp {:?}: who has {} tell {}",
                arp.operation(),
                arp.dst_ip,
                arp.src_ip
            );
        }
    }

    fn egress(&self, pkt: &NodePacket) {
        debug!(
            interface = pkt.src().name(),
            dst = ?pkt.dst().map(|iface| iface.name().to_string()),
            "packet egress"
        );
    }
}

/// Broadcast ARP request for `target` from `iface`
fn arp_request(iface: &Interface, target: IpAddr) -> Option<Vec<u8>> {
    let (sender, target) = match (iface.addr(), target) {
        (IpAddr::V4(sender), IpAddr::V4(target)) => (sender, target),
        _ => return None,
    };

    let mut buf = Vec::with_capacity(42);
    buf.extend_from_slice(&[0xff; 6]);
    buf.extend_from_slice(&iface.hw_addr().bytes());
    buf.extend_from_slice(&0x0806u16.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&0x0800u16.to_be_bytes());
    buf.extend_from_slice(&[6, 4]);
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&iface.hw_addr().bytes());
    buf.extend_from_slice(&sender.octets());
    buf.extend_from_slice(&[0; 6]);
    buf.extend_from_slice(&target.octets());
    Some(buf)
}

fn init_logging(cfg: &api::config::Config) {
    let fallback = if cfg.verbose_mode {
        "debug"
    } else if cfg.quiet {
        "warn"
    } else {
        "info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> Result<()> {
    let root_cmd = commands::new_root_command();
    let cfg = Arc::new(config::parse_args(root_cmd)?);
    init_logging(&cfg);

    let exit = Exit::new();
    let topology = Topology::build(cfg.clone(), &exit.signal())?;

    let handler = Arc::new(LogHandler);
    for node in topology.nodes() {
        node.set_handler(handler.clone());
    }

    let timeout = cfg.send_timeout().or(Some(Duration::from_secs(1)));
    for link in topology.links() {
        let (a, b) = match link.ends() {
            [Some(a), Some(b)] => (a, b),
            _ => continue,
        };
        match arp_request(&a, b.addr()) {
            Some(buf) => {
                if let Err(e) = a.send(buf, timeout).await {
                    warn!("probe from {} to {} failed: {}", a.name(), b.name(), e);
                }
            }
            None => debug!("no probe from {} to {}, not ipv4", a.name(), b.name()),
        }
    }

    info!(
        config = cfg.fpath.as_str(),
        "netlab running, press ctrl-c to exit"
    );
    tokio::signal::ctrl_c().await?;

    info!("netlab exiting");
    exit.trigger();
    topology.join().await?;

    Ok(())
}
