//! # Re-running a render until its reads are ready.

use super::cache::Read;

/// Calls `render` until it returns [`Read::Ready`], waiting on each pending handle.
///
/// ```
/// use pageloader::{ReadCache, suspend};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let cache = ReadCache::<u32>::new();
/// cache.write("/", || 1);
/// let value = suspend(|| cache.read("/")).await;
/// assert_eq!(value, 1);
/// # });
/// ```
pub async fn suspend<T, F>(mut render: F) -> T
where
    F: FnMut() -> Read<T>,
{
    loop {
        match render() {
            Read::Ready(value) => return value,
            Read::NotReady(handle) => handle.settled().await,
        }
    }
}
