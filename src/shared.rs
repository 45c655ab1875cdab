//! Sharing one driver between threads.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{channel::ChannelOpener, driver::PantakDriver};

/// Cloneable handle to a driver behind a single lock.
///
/// The emitter cannot interleave commands, so every caller goes through
/// [`Self::lock`] and holds the guard for the whole operation, including
/// multi-exchange ones such as [`PantakDriver::start_emitting`].
pub struct SharedPantak<O: ChannelOpener, const L: usize = 128> {
    inner: Arc<Mutex<PantakDriver<O, L>>>,
}

impl<O: ChannelOpener, const L: usize> SharedPantak<O, L> {
    pub fn new(driver: PantakDriver<O, L>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(driver)),
        }
    }

    /// Wait for exclusive access to the driver.
    ///
    /// A panic in another holder does not make the driver unusable: the lock is
    /// recovered rather than reported.
    pub fn lock(&self) -> MutexGuard<'_, PantakDriver<O, L>> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovering driver lock poisoned by a panicking holder");
            poisoned.into_inner()
        })
    }
}

impl<O: ChannelOpener, const L: usize> Clone for SharedPantak<O, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O: ChannelOpener, const L: usize> From<PantakDriver<O, L>> for SharedPantak<O, L> {
    fn from(driver: PantakDriver<O, L>) -> Self {
        Self::new(driver)
    }
}
