//! Lab topology described in the configuration document
//!
//! ```yaml
//! networks:
//!   - name: internet
//!     prefix: 10.0.0.0/24
//! nodes:
//!   - name: n0
//!     interfaces:
//!       - { name: eth0, network: internet }
//! links:
//!   - [eth0, eth1]
//! ```

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use tracing::info;
use yaml_rust::Yaml;

use netlab_api as api;
use api::config::{self, Config};

use crate::fabric::{link, Error, Interface, Link, Network, Node, Prefix};
use crate::threadings::ExitSignal;

#[derive(Debug, Default)]
pub struct Topology {
    networks: Vec<Arc<Network>>,
    nodes: Vec<Arc<Node>>,
    links: Vec<Arc<Link>>,
}

impl Topology {
    /// Create every network, node, interface and link the document describes,
    /// in that order
    pub fn build(cfg: Arc<Config>, exit: &ExitSignal) -> Result<Topology> {
        let mut topology = Topology::default();

        for doc in entries(cfg.get_object("networks"), "networks")? {
            let name = config::get_str_without_default(doc, "name")?;
            let prefix = config::get_str_without_default(doc, "prefix")?
                .parse::<Prefix>()
                .map_err(|e| anyhow!("network {}: {}", name, e))?;
            if prefix.is_zero() {
                bail!("network {} has no usable address prefix", name);
            }
            if topology.network(&name).is_some() {
                bail!("Duplicate network {}", name);
            }
            topology
                .networks
                .push(Network::new(&name, prefix, cfg.clone()));
        }

        for doc in entries(cfg.get_object("nodes"), "nodes")? {
            let name = config::get_str_without_default(doc, "name")?;
            if topology.node(&name).is_some() {
                bail!("Duplicate node {}", name);
            }
            let node = Node::new(&name);

            for doc in entries(config::get_object(doc, "interfaces"), "interfaces")? {
                let iface = config::get_str_without_default(doc, "name")?;
                let network = config::get_str_without_default(doc, "network")?;
                if topology.interface(&iface).is_some() || node.interface(&iface).is_some() {
                    bail!("Duplicate interface {}", iface);
                }
                let network = topology
                    .network(&network)
                    .ok_or_else(|| {
                        anyhow!("Interface {} refers to unknown network {}", iface, network)
                    })?
                    .clone();
                node.attach(&iface, &network, exit);
            }

            topology.nodes.push(node);
        }

        for doc in entries(cfg.get_object("links"), "links")? {
            let ends = match doc.as_vec() {
                Some(ends) if ends.len() == 2 => ends,
                _ => bail!("A link must name exactly two interfaces"),
            };
            let mut ifaces = Vec::with_capacity(2);
            for end in ends {
                let name = end
                    .as_str()
                    .ok_or_else(|| anyhow!("Wrong value type for link end, expecting string"))?;
                let iface = topology
                    .interface(name)
                    .ok_or_else(|| Error::InterfaceAbsent(name.to_string()))?;
                ifaces.push(iface);
            }
            topology.links.push(link(&ifaces[0], &ifaces[1])?);
        }

        info!(
            networks = topology.networks.len(),
            nodes = topology.nodes.len(),
            links = topology.links.len(),
            "topology built"
        );

        Ok(topology)
    }

    pub fn networks(&self) -> &[Arc<Network>] {
        &self.networks
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn links(&self) -> &[Arc<Link>] {
        &self.links
    }

    pub fn network(&self, name: &str) -> Option<&Arc<Network>> {
        self.networks.iter().find(|net| net.name() == name)
    }

    pub fn node(&self, name: &str) -> Option<&Arc<Node>> {
        self.nodes.iter().find(|node| node.name() == name)
    }

    /// Look up an interface by name across every node
    pub fn interface(&self, name: &str) -> Option<Arc<Interface>> {
        self.nodes.iter().find_map(|node| node.interface(name))
    }

    /// Wait for every receiver task to finish
    pub async fn join(&self) -> Result<()> {
        for node in self.nodes.iter() {
            for iface in node.interfaces() {
                iface.join().await?;
            }
        }
        Ok(())
    }
}

/// Get the entries of a list option, a missing option is an empty list
fn entries<'a>(doc: &'a Yaml, key: &str) -> Result<&'a [Yaml]> {
    match doc {
        Yaml::Array(entries) => Ok(entries.as_slice()),
        Yaml::Null => Ok(&[]),
        _ => Err(anyhow!("Wrong value type for {}, expecting list", key)),
    }
}
