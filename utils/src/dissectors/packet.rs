use bytes::Bytes;

use super::link::arp::Arp;
use super::link::ethernet::Ethernet;
use super::network::ipv4::Ipv4;
use super::{Layer, LayerType};

/// Decoded link layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkLayer {
    Ethernet(Ethernet),
}

/// Decoded network layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkLayer {
    Arp(Arp),
    Ipv4(Ipv4),
}

/// Decoded transport layer, no transport protocol is dissected yet
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportLayer {}

impl Layer for LinkLayer {
    fn layer_type(&self) -> LayerType {
        match self {
            LinkLayer::Ethernet(eth) => eth.layer_type(),
        }
    }

    fn contents(&self) -> &[u8] {
        match self {
            LinkLayer::Ethernet(eth) => eth.contents(),
        }
    }

    fn payload(&self) -> &[u8] {
        match self {
            LinkLayer::Ethernet(eth) => eth.payload(),
        }
    }
}

impl Layer for NetworkLayer {
    fn layer_type(&self) -> LayerType {
        match self {
            NetworkLayer::Arp(arp) => arp.layer_type(),
            NetworkLayer::Ipv4(ip) => ip.layer_type(),
        }
    }

    fn contents(&self) -> &[u8] {
        match self {
            NetworkLayer::Arp(arp) => arp.contents(),
            NetworkLayer::Ipv4(ip) => ip.contents(),
        }
    }

    fn payload(&self) -> &[u8] {
        match self {
            NetworkLayer::Arp(arp) => arp.payload(),
            NetworkLayer::Ipv4(ip) => ip.payload(),
        }
    }
}

impl Layer for TransportLayer {
    fn layer_type(&self) -> LayerType {
        match *self {}
    }

    fn contents(&self) -> &[u8] {
        match *self {}
    }

    fn payload(&self) -> &[u8] {
        match *self {}
    }
}

/// A decoded packet
///
/// Every layer is a view into the packet's own copy of the raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    raw: Bytes,
    link: LinkLayer,
    network: Option<NetworkLayer>,
}

impl Packet {
    pub(super) fn new(raw: Bytes, link: LinkLayer, network: Option<NetworkLayer>) -> Self {
        Packet { raw, link, network }
    }

    /// Get raw packet data
    #[inline]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Get a cheap handle to the raw packet data
    #[inline]
    pub fn raw_bytes(&self) -> &Bytes {
        &self.raw
    }

    #[inline]
    pub fn link(&self) -> &LinkLayer {
        &self.link
    }

    /// Get the network layer, unset when the ether type has no dissector
    #[inline]
    pub fn network(&self) -> Option<&NetworkLayer> {
        self.network.as_ref()
    }

    #[inline]
    pub fn transport(&self) -> Option<&TransportLayer> {
        None
    }

    #[inline]
    pub fn ethernet(&self) -> &Ethernet {
        match &self.link {
            LinkLayer::Ethernet(eth) => eth,
        }
    }

    pub fn arp(&self) -> Option<&Arp> {
        match &self.network {
            Some(NetworkLayer::Arp(arp)) => Some(arp),
            _ => None,
        }
    }

    pub fn ipv4(&self) -> Option<&Ipv4> {
        match &self.network {
            Some(NetworkLayer::Ipv4(ip)) => Some(ip),
            _ => None,
        }
    }

    /// Get every decoded layer, outermost first
    pub fn layers(&self) -> Vec<&dyn Layer> {
        let mut layers: Vec<&dyn Layer> = Vec::with_capacity(2);
        layers.push(&self.link);
        if let Some(network) = &self.network {
            layers.push(network);
        }
        layers
    }
}
