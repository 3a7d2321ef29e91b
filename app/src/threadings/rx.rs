use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info, warn};

use netlab_utils as utils;
use utils::dissectors::Decoder;

use super::ExitSignal;
use crate::fabric::{dispatch, Counter, Error, Interface, NodePacket, ReceiveQueue, Verdict};

/// Receiver task of one interface
///
/// Drains the interface's receive queue and runs every buffer through the owning
/// node's ingress handler.
pub struct RxTask {
    iface: Arc<Interface>,
    queue: ReceiveQueue,
    decoder: Decoder,
    max_repeats: u32,
    exit: ExitSignal,
}

impl RxTask {
    pub fn new(
        iface: Arc<Interface>,
        queue: ReceiveQueue,
        decoder: Decoder,
        max_repeats: u32,
        exit: ExitSignal,
    ) -> Self {
        RxTask {
            iface,
            queue,
            decoder,
            max_repeats,
            exit,
        }
    }

    pub fn name(&self) -> String {
        format!("netlab-rx-{}", self.iface.name())
    }

    /// Run until the exit signal fires or the queue closes
    ///
    /// A buffer that fails to decode is discarded. A missing node or handler
    /// stops the task with an error.
    pub async fn run(mut self) -> Result<(), Error> {
        let name = self.name();
        info!("{} started", name);

        let result = loop {
            let buf = tokio::select! {
                biased;
                _ = self.exit.wait() => break Ok(()),
                buf = self.queue.recv() => match buf {
                    Some(buf) => buf,
                    None => break Ok(()),
                },
            };

            if let Err(e) = self.process(buf) {
                error!("{} halted: {}", name, e);
                break Err(e);
            }
        };

        info!("{} exit", name);
        result
    }

    fn process(&self, buf: Bytes) -> Result<(), Error> {
        self.iface.count(Counter::Received);

        let pkt = match self.decoder.decode(&buf) {
            Ok(pkt) => pkt,
            Err(e) => {
                warn!(
                    interface = self.iface.name(),
                    len = buf.len(),
                    "discard undecodable packet: {}",
                    e
                );
                self.iface.count(Counter::DecodeError);
                return Ok(());
            }
        };

        let node = self
            .iface
            .node()
            .ok_or_else(|| Error::NodeGone(self.iface.name().to_string()))?;
        let handler = node
            .handler()
            .ok_or_else(|| Error::HandlerUnset(node.name().to_string()))?;

        let mut pkt = NodePacket::new(pkt, self.iface.clone(), self.decoder);
        match dispatch(handler.as_ref(), &mut pkt, self.max_repeats) {
            Verdict::Accept => self.iface.count(Counter::Accepted),
            _ => self.iface.count(Counter::Dropped),
        }

        Ok(())
    }
}
