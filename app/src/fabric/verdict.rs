//! Ingress verdict chain. Every packet arriving on an interface goes through its
//! node's ingress handler first; the verdict decides whether it is delivered, dropped
//! or evaluated again.

use std::sync::Arc;

use tracing::warn;

use netlab_utils as utils;
use utils::dissectors::{self, Decoder, Packet};

use super::interface::Counter;
use super::Interface;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Verdict {
    /// Hand the packet to local delivery when it has no destination, then to egress
    Accept,
    Drop,
    /// Run the ingress handler on the same packet again
    Repeat,
}

/// Packet handling behaviour of a node
pub trait Handler: Send + Sync {
    /// Judge an inbound packet, may edit it or pick its destination interface
    fn ingress(&self, pkt: &mut NodePacket) -> Verdict;

    fn local_delivery(&self, pkt: &NodePacket);

    fn egress(&self, pkt: &NodePacket);
}

/// A decoded packet inside a node: where it came in and where it leaves
#[derive(Debug)]
pub struct NodePacket {
    packet: Packet,
    src: Arc<Interface>,
    dst: Option<Arc<Interface>>,
    decoder: Decoder,
}

impl NodePacket {
    pub fn new(packet: Packet, src: Arc<Interface>, decoder: Decoder) -> Self {
        NodePacket {
            packet,
            src,
            dst: None,
            decoder,
        }
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn src(&self) -> &Arc<Interface> {
        &self.src
    }

    pub fn dst(&self) -> Option<&Arc<Interface>> {
        self.dst.as_ref()
    }

    pub fn set_dst(&mut self, dst: Arc<Interface>) {
        self.dst = Some(dst);
    }

    pub fn clear_dst(&mut self) {
        self.dst = None;
    }

    /// Whether this packet is for the node itself
    pub fn is_local(&self) -> bool {
        self.dst.is_none()
    }

    /// Edit a copy of the raw packet and decode it again
    ///
    /// On a decode error the packet is left untouched.
    pub fn rewrite<F>(&mut self, f: F) -> Result<(), dissectors::Error>
    where
        F: FnOnce(&mut Vec<u8>),
    {
        let mut buf = self.packet.raw().to_vec();
        f(&mut buf);
        self.packet = self.decoder.decode(&buf)?;
        Ok(())
    }
}

/// Run a packet through `handler` until it is accepted or dropped
///
/// A packet asking for more than `max_repeats` extra passes is dropped.
pub fn dispatch(handler: &dyn Handler, pkt: &mut NodePacket, max_repeats: u32) -> Verdict {
    let mut repeats = 0u32;
    loop {
        match handler.ingress(pkt) {
            Verdict::Accept => {
                // TODO: local packets reach egress as well, restrict egress to
                // packets with a destination once handlers stop relying on it
                if pkt.is_local() {
                    handler.local_delivery(pkt);
                    pkt.src.count(Counter::Delivered);
                }
                handler.egress(pkt);
                pkt.src.count(Counter::Egressed);
                return Verdict::Accept;
            }
            Verdict::Drop => return Verdict::Drop,
            Verdict::Repeat => {
                repeats += 1;
                if repeats > max_repeats {
                    warn!(
                        interface = pkt.src.name(),
                        repeats, "packet exceeds repeat limit, dropped"
                    );
                    return Verdict::Drop;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, Weak};

    use super::*;

    const ARP_REQUEST: [u8; 42] = [
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02, 0x00, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06,
        0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x01,
        0x0a, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x02,
    ];

    /// Replays a fixed sequence of verdicts, then keeps returning the last one
    #[derive(Default)]
    struct Script {
        verdicts: Mutex<Vec<Verdict>>,
        ingress: AtomicUsize,
        delivered: AtomicUsize,
        egressed: AtomicUsize,
    }

    impl Script {
        fn new(mut verdicts: Vec<Verdict>) -> Self {
            verdicts.reverse();
            Script {
                verdicts: Mutex::new(verdicts),
                ..Default::default()
            }
        }
    }

    impl Handler for Script {
        fn ingress(&self, _: &mut NodePacket) -> Verdict {
            self.ingress.fetch_add(1, Ordering::SeqCst);
            let mut verdicts = self.verdicts.lock().unwrap();
            match verdicts.len() {
                1 => verdicts[0],
                _ => verdicts.pop().unwrap(),
            }
        }

        fn local_delivery(&self, _: &NodePacket) {
            self.delivered.fetch_add(1, Ordering::SeqCst);
        }

        fn egress(&self, _: &NodePacket) {
            self.egressed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn iface(name: &str) -> Arc<Interface> {
        let (iface, _) = Interface::new(
            name,
            "10.0.0.1".parse().unwrap(),
            Weak::new(),
            Weak::new(),
            1,
        );
        iface
    }

    fn packet() -> NodePacket {
        let decoder = Decoder::default();
        NodePacket::new(decoder.decode(&ARP_REQUEST).unwrap(), iface("eth0"), decoder)
    }

    #[test]
    fn accept_local_dispatches_twice() {
        let handler = Script::new(vec![Verdict::Accept]);
        let mut pkt = packet();
        assert_eq!(dispatch(&handler, &mut pkt, 16), Verdict::Accept);
        assert_eq!(handler.ingress.load(Ordering::SeqCst), 1);
        assert_eq!(handler.delivered.load(Ordering::SeqCst), 1);
        assert_eq!(handler.egressed.load(Ordering::SeqCst), 1);

        let stat = pkt.src().stats();
        assert_eq!(stat.delivered, 1);
        assert_eq!(stat.egressed, 1);
    }

    #[test]
    fn accept_with_destination_skips_local_delivery() {
        let handler = Script::new(vec![Verdict::Accept]);
        let mut pkt = packet();
        pkt.set_dst(iface("eth1"));
        assert!(!pkt.is_local());
        assert_eq!(dispatch(&handler, &mut pkt, 16), Verdict::Accept);
        assert_eq!(handler.delivered.load(Ordering::SeqCst), 0);
        assert_eq!(handler.egressed.load(Ordering::SeqCst), 1);

        pkt.clear_dst();
        assert!(pkt.is_local());
    }

    #[test]
    fn drop_stops_chain() {
        let handler = Script::new(vec![Verdict::Drop]);
        let mut pkt = packet();
        assert_eq!(dispatch(&handler, &mut pkt, 16), Verdict::Drop);
        assert_eq!(handler.ingress.load(Ordering::SeqCst), 1);
        assert_eq!(handler.delivered.load(Ordering::SeqCst), 0);
        assert_eq!(handler.egressed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn repeat_reevaluates() {
        let handler = Script::new(vec![Verdict::Repeat, Verdict::Repeat, Verdict::Accept]);
        let mut pkt = packet();
        assert_eq!(dispatch(&handler, &mut pkt, 16), Verdict::Accept);
        assert_eq!(handler.ingress.load(Ordering::SeqCst), 3);
        assert_eq!(handler.delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repeat_limit() {
        let handler = Script::new(vec![Verdict::Repeat]);
        let mut pkt = packet();
        assert_eq!(dispatch(&handler, &mut pkt, 4), Verdict::Drop);
        assert_eq!(handler.ingress.load(Ordering::SeqCst), 5);
        assert_eq!(handler.egressed.load(Ordering::SeqCst), 0);

        let handler = Script::new(vec![Verdict::Repeat]);
        assert_eq!(dispatch(&handler, &mut pkt, 0), Verdict::Drop);
        assert_eq!(handler.ingress.load(Ordering::SeqCst), 1);
    }

    /// Rewrites the ARP target address once, then accepts
    struct Nat;

    impl Handler for Nat {
        fn ingress(&self, pkt: &mut NodePacket) -> Verdict {
            let target = pkt.packet().arp().map(|arp| arp.dst_ip);
            match target {
                Some(ip) if ip == "10.0.0.2".parse::<std::net::IpAddr>().unwrap() => {
                    pkt.rewrite(|buf| buf[41] = 0x03).unwrap();
                    Verdict::Repeat
                }
                _ => Verdict::Accept,
            }
        }

        fn local_delivery(&self, _: &NodePacket) {}

        fn egress(&self, _: &NodePacket) {}
    }

    #[test]
    fn rewrite_then_repeat() {
        let mut pkt = packet();
        assert_eq!(dispatch(&Nat, &mut pkt, 16), Verdict::Accept);
        let arp = pkt.packet().arp().unwrap();
        assert_eq!(arp.dst_ip, "10.0.0.3".parse::<std::net::IpAddr>().unwrap());
    }

    #[test]
    fn failed_rewrite_keeps_packet() {
        let mut pkt = packet();
        assert!(pkt.rewrite(|buf| buf.truncate(10)).is_err());
        assert_eq!(pkt.packet().raw(), &ARP_REQUEST[..]);
    }

    #[test]
    fn verdict_display() {
        assert_eq!(Verdict::Accept.to_string(), "accept");
        assert_eq!(Verdict::Repeat.to_string(), "repeat");
    }
}
