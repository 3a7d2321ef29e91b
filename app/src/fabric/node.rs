use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use super::{Handler, Interface, Network};
use crate::threadings::{ExitSignal, RxTask};

/// An addressable endpoint owning a set of interfaces
pub struct Node {
    name: String,
    interfaces: RwLock<Vec<Arc<Interface>>>,
    handler: RwLock<Option<Arc<dyn Handler>>>,
}

impl Node {
    pub fn new(name: &str) -> Arc<Node> {
        Arc::new(Node {
            name: name.to_string(),
            interfaces: RwLock::new(Vec::new()),
            handler: RwLock::new(None),
        })
    }

    pub fn with_handler(name: &str, handler: Arc<dyn Handler>) -> Arc<Node> {
        let node = Node::new(name);
        node.set_handler(handler);
        node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_handler(&self, handler: Arc<dyn Handler>) {
        *self
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    pub fn handler(&self) -> Option<Arc<dyn Handler>> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get every interface of this node, in attach order
    pub fn interfaces(&self) -> Vec<Arc<Interface>> {
        self.interfaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn interface(&self, name: &str) -> Option<Arc<Interface>> {
        self.interfaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|iface| iface.name() == name)
            .cloned()
    }

    /// Attach a new interface to `network`
    ///
    /// The interface gets the network's next address and a random hardware address.
    /// Unless the network's config says otherwise, a receiver task is spawned on the
    /// current tokio runtime to run every inbound buffer through this node's handler,
    /// until `exit` fires.
    ///
    /// # Panics
    ///
    /// Panics if the network has no addresses left, or when a receiver task must be
    /// spawned outside of a tokio runtime.
    pub fn attach(
        self: &Arc<Self>,
        name: &str,
        network: &Arc<Network>,
        exit: &ExitSignal,
    ) -> Arc<Interface> {
        let cfg = network.config();
        let addr = network.allocate();
        let (iface, queue) = Interface::new(
            name,
            addr,
            Arc::downgrade(self),
            Arc::downgrade(network),
            cfg.rx_queue_size as usize,
        );

        network.register(&iface);
        self.interfaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(iface.clone());

        if cfg.spawn_receivers {
            let task = RxTask::new(
                iface.clone(),
                queue,
                network.decoder(),
                cfg.max_repeats,
                exit.clone(),
            );
            iface.set_task(tokio::spawn(task.run()));
        } else {
            iface.park(queue);
        }

        info!(
            node = self.name.as_str(),
            interface = name,
            network = network.name(),
            %addr,
            hw_addr = %iface.hw_addr(),
            "interface attached"
        );

        iface
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("interfaces", &self.interfaces())
            .finish()
    }
}
