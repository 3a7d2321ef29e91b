use std::sync::{Arc, Weak};

use super::{Error, Interface};

/// A point to point link between two interfaces of the same network
///
/// Never changes after creation. Each end holds the link, the link only refers back weakly.
#[derive(Debug)]
pub struct Link {
    ends: [Weak<Interface>; 2],
}

impl Link {
    /// Get both ends, `None` for an end whose node is gone
    pub fn ends(&self) -> [Option<Arc<Interface>>; 2] {
        [self.ends[0].upgrade(), self.ends[1].upgrade()]
    }

    /// Get the end opposite to `iface`
    pub fn peer(&self, iface: &Interface) -> Option<Arc<Interface>> {
        let iface = iface as *const Interface;
        if self.ends[0].as_ptr() == iface {
            self.ends[1].upgrade()
        } else if self.ends[1].as_ptr() == iface {
            self.ends[0].upgrade()
        } else {
            None
        }
    }
}

/// Couple two interfaces, each becomes the other's peer
///
/// Links are set up from a single control plane, so checking and binding both ends
/// is not atomic.
pub fn link(a: &Arc<Interface>, b: &Arc<Interface>) -> Result<Arc<Link>, Error> {
    let net_a = a
        .network()
        .ok_or_else(|| Error::NoNetwork(a.name().to_string()))?;
    let net_b = b
        .network()
        .ok_or_else(|| Error::NoNetwork(b.name().to_string()))?;

    if a.is_up() {
        return Err(Error::AlreadyLinked(a.name().to_string()));
    }
    if b.is_up() {
        return Err(Error::AlreadyLinked(b.name().to_string()));
    }

    if !Arc::ptr_eq(&net_a, &net_b) {
        return Err(Error::DifferentNetworks(
            a.name().to_string(),
            b.name().to_string(),
        ));
    }

    if Arc::ptr_eq(a, b) {
        return Err(Error::SelfLink(a.name().to_string()));
    }

    let link = Arc::new(Link {
        ends: [Arc::downgrade(a), Arc::downgrade(b)],
    });
    a.bind(link.clone())?;
    b.bind(link.clone())?;

    Ok(link)
}
