use std::fmt::Debug;

use anyhow::Result;
use module::EventProcessor;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info};

pub mod module;
pub mod notify;

/// Receives events from a monitor and hands them to a processor one by one. A failing event is
/// logged and skipped; the module stops once every sender is dropped.
pub struct ProcessingModule<E, Processor> {
    receiver: Receiver<E>,
    processor: Processor,
}

impl<E: Debug + Clone, P: EventProcessor<E>> ProcessingModule<E, P> {
    pub fn new(receiver: Receiver<E>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(event) = self.receiver.recv().await {
            debug!("Processing event {:?}", event);
            match self.processor.process_next(event.clone()).await {
                Ok(_) => {
                    info!("Processed event {:?}", event)
                }
                Err(e) => {
                    error!("Error processing event {:?}: {e:?}", event)
                }
            }
        }

        let result = self.processor.finalize().await;
        self.receiver.close();
        result
    }
}
