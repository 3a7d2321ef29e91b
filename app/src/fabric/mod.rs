//! Simulated network fabric: networks hand out addresses, nodes own interfaces,
//! and a link couples two interfaces of the same network so that whatever one
//! sends lands in the other's receive queue.

use std::fmt::{Display, Formatter};

mod interface;
mod link;
mod network;
mod node;
mod verdict;

pub(crate) use interface::Counter;
pub use interface::{Interface, InterfaceStat, ReceiveQueue};
pub use link::{link, Link};
pub use network::{Network, Prefix};
pub use node::Node;
pub use verdict::{dispatch, Handler, NodePacket, Verdict};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    InvalidPrefix(String),
    /// No interface with this name
    InterfaceAbsent(String),
    /// Interface's network is gone
    NoNetwork(String),
    AlreadyLinked(String),
    DifferentNetworks(String, String),
    SelfLink(String),
    SendTimeout(String),
    /// Peer's receive queue is closed
    PeerClosed(String),
    /// Interface's owning node is gone
    NodeGone(String),
    HandlerUnset(String),
    /// Receive queue is already drained by someone else
    QueueClaimed(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidPrefix(s) => write!(f, "Invalid address prefix: {}", s),
            Error::InterfaceAbsent(name) => write!(f, "Interface {} does not exist", name),
            Error::NoNetwork(name) => write!(f, "Interface {} has no network", name),
            Error::AlreadyLinked(name) => write!(f, "Interface {} is already linked", name),
            Error::DifferentNetworks(a, b) => write!(
                f,
                "Interface {} and {} belong to different networks",
                a, b
            ),
            Error::SelfLink(name) => write!(f, "Interface {} can not be linked to itself", name),
            Error::SendTimeout(name) => write!(f, "Send on interface {} timed out", name),
            Error::PeerClosed(name) => {
                write!(f, "Peer of interface {} no longer receives packets", name)
            }
            Error::NodeGone(name) => write!(f, "Owner node of interface {} is gone", name),
            Error::HandlerUnset(name) => write!(f, "Node {} has no packet handler", name),
            Error::QueueClaimed(name) => {
                write!(f, "Receive queue of interface {} is already claimed", name)
            }
        }
    }
}

impl std::error::Error for Error {}
