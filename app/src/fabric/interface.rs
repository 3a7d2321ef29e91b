use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use bytes::Bytes;
use mac_address::MacAddress;
use once_cell::sync::OnceCell;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{link, Error, Link, Network, Node};

/// Interface statistic information
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InterfaceStat {
    /// Buffers taken off the receive queue
    pub received: u64,
    /// Received buffers discarded because they failed to decode
    pub decode_errors: u64,
    /// Packets the ingress handler finally accepted
    pub accepted: u64,
    /// Packets the ingress handler dropped, or that hit the repeat cap
    pub dropped: u64,
    /// Accepted packets handed to local delivery
    pub delivered: u64,
    /// Accepted packets handed to egress
    pub egressed: u64,
    /// Buffers sent to the link peer
    pub sent: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Counter {
    Received,
    DecodeError,
    Accepted,
    Dropped,
    Delivered,
    Egressed,
    Sent,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    decode_errors: AtomicU64,
    accepted: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    egressed: AtomicU64,
    sent: AtomicU64,
}

impl Counters {
    fn get(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::Received => &self.received,
            Counter::DecodeError => &self.decode_errors,
            Counter::Accepted => &self.accepted,
            Counter::Dropped => &self.dropped,
            Counter::Delivered => &self.delivered,
            Counter::Egressed => &self.egressed,
            Counter::Sent => &self.sent,
        }
    }

    fn snapshot(&self) -> InterfaceStat {
        InterfaceStat {
            received: self.received.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            egressed: self.egressed.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
        }
    }
}

/// Inbound buffers of an interface, in the order its link peer sent them
#[derive(Debug)]
pub struct ReceiveQueue {
    rx: mpsc::Receiver<Bytes>,
}

impl ReceiveQueue {
    /// Wait for the next buffer, `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }
}

/// A named attachment point of a node to a network
///
/// The address is drawn from the network once, at attach time. An interface
/// without a link is down.
pub struct Interface {
    name: String,
    addr: IpAddr,
    hw_addr: MacAddress,
    node: Weak<Node>,
    network: Weak<Network>,
    link: OnceCell<Arc<Link>>,
    sender: mpsc::Sender<Bytes>,
    /// Receive queue, until a receiver task or a caller of `receive` claims it
    queue: Mutex<Option<ReceiveQueue>>,
    task: Mutex<Option<JoinHandle<Result<(), Error>>>>,
    counters: Counters,
}

impl Interface {
    pub(crate) fn new(
        name: &str,
        addr: IpAddr,
        node: Weak<Node>,
        network: Weak<Network>,
        capacity: usize,
    ) -> (Arc<Interface>, ReceiveQueue) {
        let (sender, rx) = mpsc::channel(capacity.max(1));
        let iface = Arc::new(Interface {
            name: name.to_string(),
            addr,
            hw_addr: random_mac(),
            node,
            network,
            link: OnceCell::new(),
            sender,
            queue: Mutex::new(None),
            task: Mutex::new(None),
            counters: Counters::default(),
        });
        (iface, ReceiveQueue { rx })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn hw_addr(&self) -> MacAddress {
        self.hw_addr
    }

    pub fn node(&self) -> Option<Arc<Node>> {
        self.node.upgrade()
    }

    pub fn network(&self) -> Option<Arc<Network>> {
        self.network.upgrade()
    }

    pub fn link(&self) -> Option<&Arc<Link>> {
        self.link.get()
    }

    /// Whether this interface has a link
    pub fn is_up(&self) -> bool {
        self.link.get().is_some()
    }

    /// Get the other end of this interface's link
    pub fn peer(&self) -> Option<Arc<Interface>> {
        self.link.get().and_then(|link| link.peer(self))
    }

    /// Link this interface with `other`, see [`link`]
    pub fn link_with(self: &Arc<Self>, other: &Arc<Interface>) -> Result<Arc<Link>, Error> {
        link(self, other)
    }

    pub fn stats(&self) -> InterfaceStat {
        self.counters.snapshot()
    }

    /// Send a buffer to the link peer, waiting at most `timeout` for room in its queue
    ///
    /// # Panics
    ///
    /// Panics if the interface is down.
    pub async fn send<B: Into<Bytes>>(
        &self,
        buf: B,
        timeout: Option<Duration>,
    ) -> Result<(), Error> {
        let link = match self.link.get() {
            Some(link) => link,
            None => panic!("send on interface {} which has no link", self.name),
        };
        let peer = link
            .peer(self)
            .ok_or_else(|| Error::PeerClosed(self.name.clone()))?;

        let enqueue = peer.sender.send(buf.into());
        let result = match timeout {
            None => enqueue.await,
            Some(timeout) => match tokio::time::timeout(timeout, enqueue).await {
                Ok(result) => result,
                Err(_) => return Err(Error::SendTimeout(self.name.clone())),
            },
        };
        result.map_err(|_| Error::PeerClosed(self.name.clone()))?;

        self.count(Counter::Sent);
        Ok(())
    }

    /// Take this interface's own receive queue, the buffers its link peer sent
    ///
    /// Only available once, and only when the network's config has `rx.spawn`
    /// turned off. Otherwise the receiver task owns the queue and this returns
    /// `Error::QueueClaimed`.
    pub fn receive(&self) -> Result<ReceiveQueue, Error> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| Error::QueueClaimed(self.name.clone()))
    }

    /// Wait for this interface's receiver task to finish
    pub async fn join(&self) -> Result<(), Error> {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let handle = match handle {
            Some(handle) => handle,
            None => return Ok(()),
        };

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Ok(()),
        }
    }

    pub(crate) fn count(&self, counter: Counter) {
        self.counters.get(counter).fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn bind(&self, link: Arc<Link>) -> Result<(), Error> {
        self.link
            .set(link)
            .map_err(|_| Error::AlreadyLinked(self.name.clone()))
    }

    pub(super) fn park(&self, queue: ReceiveQueue) {
        *self.queue.lock().unwrap_or_else(PoisonError::into_inner) = Some(queue);
    }

    pub(super) fn set_task(&self, task: JoinHandle<Result<(), Error>>) {
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
    }
}

impl std::fmt::Debug for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interface")
            .field("name", &self.name)
            .field("addr", &self.addr)
            .field("hw_addr", &self.hw_addr)
            .field("up", &self.is_up())
            .finish()
    }
}

/// Random unicast, locally administered hardware address
fn random_mac() -> MacAddress {
    let mut bytes: [u8; 6] = rand::random();
    bytes[0] = (bytes[0] | 0x02) & 0xfe;
    MacAddress::new(bytes)
}
