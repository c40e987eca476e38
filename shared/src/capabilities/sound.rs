use crux_core::capability::{CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SoundOperation {
    Play { asset: String },
}

impl Operation for SoundOperation {
    type Output = ();
}

/// Fire-and-forget playback of a bundled audio asset.
#[derive(crux_core::macros::Capability)]
pub struct Sound<Ev> {
    context: CapabilityContext<SoundOperation, Ev>,
}

impl<Ev> Sound<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<SoundOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn play(&self, asset: &str) {
        let operation = SoundOperation::Play {
            asset: asset.to_string(),
        };
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(operation).await;
        });
    }
}
