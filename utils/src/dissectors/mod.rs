use std::fmt::{Display, Formatter};

use bytes::Bytes;
use nom::error::{ErrorKind, ParseError};
use num_traits::FromPrimitive;
use tracing::debug;

use netlab_api as api;
pub use api::packet::{Layer, LayerType};

mod etype;
pub mod link;
pub mod network;
mod packet;

pub use etype::{EtherType, EtherTypeRange};
pub use packet::{LinkLayer, NetworkLayer, Packet, TransportLayer};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Buffer is shorter than the layer's fixed header
    PacketTooShort(LayerType, usize),
    /// Ether type outside the accepted range
    UnknownEtype(u16),
    /// Buffer is shorter than the length its own fields claim: (expected, actual)
    InvalidLength(usize, usize),
    /// Address bytes do not form an address of a known family
    InvalidAddress(&'static str),
    UnsupportVersion(u8),
    /// IPv4 header length other than 5 words
    UnsupportOptions(u8),
    UnsupportProtocol(&'static str),
    Nom(ErrorKind),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::PacketTooShort(layer, len) => {
                write!(f, "The {} packet is too short ({} bytes)", layer, len)
            }
            Error::UnknownEtype(etype) => write!(f, "Unknown ether type({:#06x})", etype),
            Error::InvalidLength(expected, actual) => write!(
                f,
                "Invalid packet length, expecting at least {} bytes, actual {} bytes",
                expected, actual
            ),
            Error::InvalidAddress(s) | Error::UnsupportProtocol(s) => write!(f, "{}", s),
            Error::UnsupportVersion(version) => {
                write!(f, "Unsupport ip version, expecting 4, actual {}", version)
            }
            Error::UnsupportOptions(ihl) => {
                write!(f, "Unsupport ip options, header length is {} words", ihl)
            }
            Error::Nom(kind) => write!(f, "Nom parse error: {:?}", kind),
        }
    }
}

impl<I> ParseError<I> for Error {
    fn from_error_kind(_: I, kind: ErrorKind) -> Self {
        Error::Nom(kind)
    }

    fn append(_: I, _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl From<nom::Err<Error>> for Error {
    fn from(e: nom::Err<Error>) -> Self {
        match e {
            nom::Err::Error(e) | nom::Err::Failure(e) => e,
            nom::Err::Incomplete(_) => Error::Nom(ErrorKind::Eof),
        }
    }
}

impl std::error::Error for Error {}

pub type IResult<'a, O> = nom::IResult<&'a [u8], O, Error>;

/// Layered decoder: ethernet first, then whatever the ether type announces
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Decoder {
    etypes: EtherTypeRange,
}

impl Decoder {
    pub fn new(etypes: EtherTypeRange) -> Self {
        Decoder { etypes }
    }

    pub fn etypes(&self) -> EtherTypeRange {
        self.etypes
    }

    /// Decode a single packet
    ///
    /// The returned packet owns a private copy of `buf`.
    pub fn decode(&self, buf: &[u8]) -> Result<Packet, Error> {
        let raw = Bytes::copy_from_slice(buf);
        let eth = link::ethernet::dissect(&raw, self.etypes)?;

        let network = match EtherType::from_u16(eth.etype) {
            Some(EtherType::ARP) => Some(NetworkLayer::Arp(link::arp::dissect(
                eth.payload_bytes(),
            )?)),
            Some(EtherType::IPV4) => Some(NetworkLayer::Ipv4(network::ipv4::dissect(
                eth.payload_bytes(),
            )?)),
            Some(EtherType::IPV6) => {
                return Err(Error::UnsupportProtocol("Unsupport protocol: ipv6"));
            }
            None => {
                debug!(
                    etype = eth.etype,
                    "unknown network protocol, network layer left unset"
                );
                None
            }
        };

        Ok(Packet::new(raw, LinkLayer::Ethernet(eth), network))
    }
}

/// Decode a single packet with the default ether type range
pub fn decode(buf: &[u8]) -> Result<Packet, Error> {
    Decoder::default().decode(buf)
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::link::arp::ArpOperation;
    use super::*;

    pub const ARP_REQUEST: [u8; 42] = [
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02, 0x42, 0xac, 0x11, 0x00, 0x02, 0x08, 0x06, // ethernet
        0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01, 0x02, 0x42, 0xac, 0x11, 0x00, 0x02, 0x0a,
        0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x02, // arp
    ];

    pub const IPV4_ICMP: [u8; 42] = [
        0x00, 0x1b, 0x21, 0x3a, 0x4c, 0x5d, 0x02, 0x42, 0xac, 0x11, 0x00, 0x02, 0x08, 0x00, // ethernet
        0x45, 0x00, 0x00, 0x1c, 0x00, 0x0a, 0x40, 0x00, 0x40, 0x01, 0xa5, 0x6a, 0x0a, 0x01,
        0x02, 0x01, 0x0a, 0x22, 0x00, 0x01, // ipv4
        0x08, 0x00, 0xf7, 0xff, 0x00, 0x00, 0x00, 0x00, // icmp
    ];

    #[test]
    fn arp_request() {
        let pkt = decode(&ARP_REQUEST).unwrap();
        assert_eq!(pkt.ethernet().etype, EtherType::ARP as u16);
        let arp = pkt.arp().unwrap();
        assert_eq!(arp.operation(), Some(ArpOperation::Request));
        assert_eq!(arp.contents(), &ARP_REQUEST[14..]);
        assert!(pkt.ipv4().is_none());
        assert!(pkt.transport().is_none());
    }

    #[test]
    fn ipv4_packet() {
        let pkt = decode(&IPV4_ICMP).unwrap();
        let ip = pkt.ipv4().unwrap();
        assert_eq!(ip.src, Ipv4Addr::new(10, 1, 2, 1));
        assert_eq!(ip.dst, Ipv4Addr::new(10, 34, 0, 1));
        assert_eq!(ip.payload(), &IPV4_ICMP[34..]);
        assert!(matches!(pkt.network(), Some(NetworkLayer::Ipv4(_))));
        assert_eq!(pkt.network().unwrap().layer_type(), LayerType::IPV4);
    }

    #[test]
    fn link_error_propagates() {
        let result = decode(b"hi");
        assert_eq!(
            result.unwrap_err(),
            Error::PacketTooShort(LayerType::ETHERNET, 2)
        );
    }

    #[test]
    fn network_error_propagates() {
        let mut buf = IPV4_ICMP;
        buf[14] = 0x46;
        assert_eq!(decode(&buf).unwrap_err(), Error::UnsupportOptions(6));

        let buf = &ARP_REQUEST[..30];
        assert!(matches!(decode(buf), Err(Error::InvalidLength(28, 16))));
    }

    #[test]
    fn ipv6_is_unsupported() {
        let mut buf = IPV4_ICMP;
        buf[12] = 0x86;
        buf[13] = 0xdd;
        assert!(matches!(decode(&buf), Err(Error::UnsupportProtocol(_))));
    }

    #[test]
    fn unknown_etype_leaves_network_unset() {
        let mut buf = IPV4_ICMP;
        // Reverse ARP, inside the default range but without a dissector
        buf[12] = 0x80;
        buf[13] = 0x35;
        let pkt = decode(&buf).unwrap();
        assert!(pkt.network().is_none());
        assert_eq!(pkt.ethernet().etype, 0x8035);
        assert_eq!(pkt.ethernet().payload(), &buf[14..]);
    }

    #[test]
    fn etype_floor_is_configurable() {
        let mut buf = IPV4_ICMP;
        buf[12] = 0x06;
        buf[13] = 0x00;
        assert!(decode(&buf).is_ok());

        let strict = Decoder::new(EtherTypeRange::ABOVE_0X07FF);
        assert_eq!(strict.decode(&buf).unwrap_err(), Error::UnknownEtype(0x0600));
        assert!(strict.decode(&IPV4_ICMP).is_ok());

        // the frame decoder's floor drops every IPv4 and ARP frame
        let frame = Decoder::new(EtherTypeRange::ABOVE_0X7FFF);
        assert_eq!(frame.decode(&IPV4_ICMP).unwrap_err(), Error::UnknownEtype(0x0800));
        assert_eq!(frame.decode(&ARP_REQUEST).unwrap_err(), Error::UnknownEtype(0x0806));
    }

    #[test]
    fn decode_is_idempotent() {
        assert_eq!(decode(&IPV4_ICMP).unwrap(), decode(&IPV4_ICMP).unwrap());
        assert_eq!(decode(&ARP_REQUEST).unwrap(), decode(&ARP_REQUEST).unwrap());
    }

    #[test]
    fn decode_copies_input() {
        let mut buf = IPV4_ICMP.to_vec();
        let pkt = decode(&buf).unwrap();
        buf[0] = 0xee;
        assert_eq!(pkt.raw()[0], 0x00);
        assert_ne!(pkt.raw().as_ptr(), buf.as_ptr());
    }

    #[test]
    fn never_panics_on_short_input() {
        for len in 0..IPV4_ICMP.len() {
            let _ = decode(&IPV4_ICMP[..len]);
            let _ = decode(&ARP_REQUEST[..len]);
        }
    }
}
