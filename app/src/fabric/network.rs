use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use dashmap::DashMap;
use fnv::FnvBuildHasher;

use netlab_api as api;
use netlab_utils as utils;
use api::config::Config;
use utils::dissectors::{Decoder, EtherTypeRange};

use super::{link, Error, Interface, Link};

/// CIDR block, an address and a prefix length
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct Prefix {
    addr: IpAddr,
    len: u8,
}

impl Prefix {
    pub fn new(addr: IpAddr, len: u8) -> Result<Prefix, Error> {
        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if len > max {
            return Err(Error::InvalidPrefix(format!("{}/{}", addr, len)));
        }
        Ok(Prefix { addr, len })
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    /// Whether this is the zero value prefix, which no address can be drawn from
    pub fn is_zero(&self) -> bool {
        self.len == 0 && self.addr.is_unspecified()
    }

    /// Get the network address, the prefix's address with its host bits cleared
    pub fn base(&self) -> IpAddr {
        match self.addr {
            IpAddr::V4(addr) => IpAddr::V4(Ipv4Addr::from(u32::from(addr) & v4_mask(self.len))),
            IpAddr::V6(addr) => {
                IpAddr::V6(Ipv6Addr::from(u128::from(addr) & v6_mask(self.len)))
            }
        }
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self.addr, addr) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let mask = v4_mask(self.len);
                u32::from(net) & mask == u32::from(addr) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let mask = v6_mask(self.len);
                u128::from(net) & mask == u128::from(addr) & mask
            }
            _ => false,
        }
    }

    /// Get the address following `addr` inside this prefix
    fn next(&self, addr: IpAddr) -> Option<IpAddr> {
        let next = match addr {
            IpAddr::V4(addr) => IpAddr::V4(Ipv4Addr::from(u32::from(addr).checked_add(1)?)),
            IpAddr::V6(addr) => IpAddr::V6(Ipv6Addr::from(u128::from(addr).checked_add(1)?)),
        };
        Some(next).filter(|next| self.contains(*next))
    }
}

impl Default for Prefix {
    fn default() -> Self {
        Prefix {
            addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            len: 0,
        }
    }
}

impl Display for Prefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

impl FromStr for Prefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidPrefix(s.to_string());
        let mut parts = s.splitn(2, '/');
        let addr = parts
            .next()
            .and_then(|a| a.trim().parse::<IpAddr>().ok())
            .ok_or_else(invalid)?;
        let len = parts
            .next()
            .and_then(|l| l.trim().parse::<u8>().ok())
            .ok_or_else(invalid)?;
        Prefix::new(addr, len).map_err(|_| invalid())
    }
}

#[inline]
fn v4_mask(len: u8) -> u32 {
    u32::MAX.checked_shl(32 - len as u32).unwrap_or(0)
}

#[inline]
fn v6_mask(len: u8) -> u128 {
    u128::MAX.checked_shl(128 - len as u32).unwrap_or(0)
}

/// Address cursor of a network
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cursor {
    Unseeded,
    At(IpAddr),
    Exhausted,
}

/// A simulated network, owns an address prefix and hands out its addresses in order
pub struct Network {
    name: String,
    prefix: Prefix,
    cfg: Arc<Config>,
    cursor: Mutex<Cursor>,
    /// Interfaces drawing their address from this network, owned by their nodes
    interfaces: DashMap<String, Weak<Interface>, FnvBuildHasher>,
}

impl Network {
    pub fn new(name: &str, prefix: Prefix, cfg: Arc<Config>) -> Arc<Network> {
        Arc::new(Network {
            name: name.to_string(),
            prefix,
            cfg,
            cursor: Mutex::new(Cursor::Unseeded),
            interfaces: DashMap::with_hasher(FnvBuildHasher::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.cfg
    }

    /// Get the decoder every interface of this network decodes inbound packets with
    pub fn decoder(&self) -> Decoder {
        Decoder::new(EtherTypeRange::new(self.cfg.etype_min, self.cfg.etype_max))
    }

    /// Allocate the next address of this network
    ///
    /// # Panics
    ///
    /// Panics if the prefix is the zero value or every address is already issued,
    /// both mean the lab was set up wrong.
    pub fn allocate(&self) -> IpAddr {
        if self.prefix.is_zero() {
            panic!("network {} has no address prefix", self.name);
        }

        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let addr = match *cursor {
            Cursor::Unseeded => self.prefix.base(),
            Cursor::At(addr) => addr,
            Cursor::Exhausted => panic!(
                "network {} ran out of addresses in {}",
                self.name, self.prefix
            ),
        };
        *cursor = match self.prefix.next(addr) {
            Some(next) => Cursor::At(next),
            None => Cursor::Exhausted,
        };

        addr
    }

    pub(crate) fn register(&self, iface: &Arc<Interface>) {
        self.interfaces
            .insert(iface.name().to_string(), Arc::downgrade(iface));
    }

    /// Look up a live interface of this network by name
    pub fn interface(&self, name: &str) -> Option<Arc<Interface>> {
        self.interfaces.get(name).and_then(|iface| iface.upgrade())
    }

    /// Link two interfaces of this network by name
    pub fn link_by_name(&self, a: &str, b: &str) -> Result<Arc<Link>, Error> {
        let a = self
            .interface(a)
            .ok_or_else(|| Error::InterfaceAbsent(a.to_string()))?;
        let b = self
            .interface(b)
            .ok_or_else(|| Error::InterfaceAbsent(b.to_string()))?;
        link(&a, &b)
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(prefix: &str) -> Arc<Network> {
        Network::new(
            "internet",
            prefix.parse().unwrap(),
            Arc::new(Config::default()),
        )
    }

    #[test]
    fn parse_prefix() {
        let prefix: Prefix = "10.0.0.0/24".parse().unwrap();
        assert_eq!(prefix.addr(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)));
        assert_eq!(prefix.len(), 24);
        assert_eq!(prefix.to_string(), "10.0.0.0/24");

        let prefix: Prefix = "fd00::/64".parse().unwrap();
        assert_eq!(prefix.len(), 64);

        assert!("10.0.0.0".parse::<Prefix>().is_err());
        assert!("10.0.0.0/33".parse::<Prefix>().is_err());
        assert!("fd00::/129".parse::<Prefix>().is_err());
        assert!("ten/8".parse::<Prefix>().is_err());
    }

    #[test]
    fn base_clears_host_bits() {
        let prefix: Prefix = "20.0.0.1/24".parse().unwrap();
        assert_eq!(prefix.base(), IpAddr::V4(Ipv4Addr::new(20, 0, 0, 0)));
        assert!(prefix.contains(IpAddr::V4(Ipv4Addr::new(20, 0, 0, 255))));
        assert!(!prefix.contains(IpAddr::V4(Ipv4Addr::new(20, 0, 1, 0))));
        assert!(!prefix.contains(IpAddr::V6(Ipv6Addr::LOCALHOST)));

        let prefix: Prefix = "0.0.0.0/0".parse().unwrap();
        assert!(prefix.is_zero());
        assert!(prefix.contains(IpAddr::V4(Ipv4Addr::BROADCAST)));
        assert!(Prefix::default().is_zero());
    }

    #[test]
    fn allocate_in_order() {
        let net = network("10.0.0.0/24");
        assert_eq!(net.allocate(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)));
        assert_eq!(net.allocate(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(net.allocate(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
    }

    #[test]
    fn allocate_whole_prefix() {
        let net = network("10.0.0.0/24");
        for i in 0..=255u8 {
            assert_eq!(net.allocate(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, i)));
        }
    }

    #[test]
    #[should_panic(expected = "ran out of addresses")]
    fn allocate_exhausted() {
        let net = network("10.0.0.0/24");
        for _ in 0..257 {
            net.allocate();
        }
    }

    #[test]
    #[should_panic(expected = "ran out of addresses")]
    fn allocate_top_of_address_space() {
        let net = network("255.255.255.254/31");
        assert_eq!(net.allocate(), IpAddr::V4(Ipv4Addr::new(255, 255, 255, 254)));
        assert_eq!(net.allocate(), IpAddr::V4(Ipv4Addr::BROADCAST));
        net.allocate();
    }

    #[test]
    #[should_panic(expected = "has no address prefix")]
    fn allocate_zero_prefix() {
        let net = Network::new("void", Prefix::default(), Arc::new(Config::default()));
        net.allocate();
    }

    #[test]
    fn allocate_ipv6() {
        let net = network("fd00::/126");
        assert_eq!(net.allocate(), "fd00::".parse::<IpAddr>().unwrap());
        assert_eq!(net.allocate(), "fd00::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn lookup_and_link_absent() {
        let net = network("10.0.0.0/24");
        assert!(net.interface("eth0").is_none());
        assert_eq!(
            net.link_by_name("eth0", "eth1").unwrap_err(),
            Error::InterfaceAbsent("eth0".to_string())
        );
    }

    #[test]
    fn decoder_follows_config() {
        let cfg = Config {
            etype_min: 0x0800,
            ..Default::default()
        };
        let net = Network::new("lab", "10.0.0.0/8".parse().unwrap(), Arc::new(cfg));
        assert_eq!(net.decoder().etypes(), EtherTypeRange::ABOVE_0X07FF);
    }
}
