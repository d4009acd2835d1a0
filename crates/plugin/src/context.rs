use tokio::runtime::Handle;
use tokio::sync::watch;

/// Ambient resources handed to a policy constructor.
///
/// Policies that run background work spawn it on `runtime` and stop it when
/// `shutdown` flips to `true` or its sender is dropped.
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub runtime: Option<Handle>,
    pub shutdown: watch::Receiver<bool>,
}

impl PluginContext {
    pub fn new(runtime: Option<Handle>, shutdown: watch::Receiver<bool>) -> Self {
        Self { runtime, shutdown }
    }

    /// Context bound to `runtime`, plus the sender that cancels its
    /// background work.
    pub fn with_runtime(runtime: Handle) -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self::new(Some(runtime), rx), tx)
    }

    /// Context for policies that never spawn background work.
    pub fn detached() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self::new(None, rx)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }
}
