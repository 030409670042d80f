use super::Result;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// Compute-once cell with an explicit reset.
///
/// Readers take the fast path (atomic flag plus a short read of the published
/// `Arc`). The first caller that finds the cell empty enters the exclusive
/// section, re-checks, runs the initializer and publishes. Everyone who queued
/// behind it sees the published value on their re-check, so the initializer runs
/// exactly once per empty period. A failed initializer publishes nothing.
pub struct LazyInit<T> {
    ready: AtomicBool,
    slot: RwLock<Option<Arc<T>>>,
    init_lock: Mutex<()>,
    init_count: AtomicU64,
}

impl<T> LazyInit<T> {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            slot: RwLock::new(None),
            init_lock: Mutex::new(()),
            init_count: AtomicU64::new(0),
        }
    }

    /// Currently published value, without initializing.
    pub fn get(&self) -> Result<Option<Arc<T>>> {
        if !self.ready.load(Ordering::Acquire) {
            return Ok(None);
        }
        Ok(self.slot.read()?.clone())
    }

    /// Returns the published value, running `init` first if the cell is empty.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get()? {
            return Ok(value);
        }

        let _guard = self.init_lock.lock().await;

        // Another caller may have published while we waited for the lock.
        if let Some(value) = self.get()? {
            return Ok(value);
        }

        let value = Arc::new(init().await?);
        self.publish(Arc::clone(&value))?;
        self.init_count.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    /// Drops the published value. Waits for an in-flight initialization to
    /// publish first, so the reset always wins over it.
    pub async fn reset(&self) -> Result<()> {
        let _guard = self.init_lock.lock().await;
        self.ready.store(false, Ordering::Release);
        *self.slot.write()? = None;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Number of successful initializations so far.
    pub fn init_count(&self) -> u64 {
        self.init_count.load(Ordering::SeqCst)
    }

    fn publish(&self, value: Arc<T>) -> Result<()> {
        *self.slot.write()? = Some(value);
        self.ready.store(true, Ordering::Release);
        Ok(())
    }
}

impl<T> Default for LazyInit<T> {
    fn default() -> Self {
        Self::new()
    }
}
