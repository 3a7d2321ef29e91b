use tokio::sync::watch;

mod rx;

pub use rx::RxTask;

/// Exit flag shared by every receiver task
#[derive(Debug)]
pub struct Exit {
    sender: watch::Sender<bool>,
}

impl Exit {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Exit { sender }
    }

    pub fn signal(&self) -> ExitSignal {
        ExitSignal(self.sender.subscribe())
    }

    /// Tell every task holding a signal of this flag to exit
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

impl Default for Exit {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of an [`Exit`] flag
#[derive(Clone, Debug)]
pub struct ExitSignal(watch::Receiver<bool>);

impl ExitSignal {
    pub fn is_set(&self) -> bool {
        *self.0.borrow()
    }

    /// Wait until the flag is set or its `Exit` is dropped
    pub async fn wait(&mut self) {
        loop {
            let set = *self.0.borrow_and_update();
            if set {
                return;
            }
            if self.0.changed().await.is_err() {
                return;
            }
        }
    }
}
