use anyhow::Result;

/// Represents an event processor. Monitors only detect events; what happens with them (printing,
/// ringing the bell, running a user command) is decided by the processor at the end of the
/// channel.
pub trait EventProcessor<E> {
    fn process_next(&mut self, event: E) -> impl std::future::Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}
