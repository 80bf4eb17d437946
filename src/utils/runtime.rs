use anyhow::Result;

/// Every tool is sequential, so one thread is enough even for the daemon.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
