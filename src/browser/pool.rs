use crate::browser::{Browser, BrowserError, Surface};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Bounded pool of browser surfaces.
///
/// Opening a Chrome session costs seconds, so released surfaces are kept idle
/// and handed out again after a [`Surface::reset`]. The semaphore caps how many
/// sessions exist at once; `acquire` waits when the pool is fully checked out.
pub struct SurfacePool {
    factory: Arc<dyn Browser>,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<Box<dyn Surface>>>,
}

impl SurfacePool {
    pub fn new(factory: Arc<dyn Browser>, size: usize) -> Self {
        Self {
            factory,
            permits: Arc::new(Semaphore::new(size.max(1))),
            idle: Mutex::new(Vec::new()),
        }
    }

    pub async fn acquire(&self) -> Result<Checkout, BrowserError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| BrowserError::Exhausted)?;

        let reused = self.idle.lock().await.pop();
        let surface = match reused {
            Some(surface) => {
                debug!("Reusing idle surface");
                surface
            }
            None => self.factory.open().await?,
        };

        Ok(Checkout {
            surface,
            _permit: permit,
        })
    }

    /// Return a surface to the pool. A surface that fails its reset is closed
    /// and dropped instead of being handed to the next caller dirty.
    pub async fn release(&self, checkout: Checkout) {
        let Checkout { mut surface, _permit } = checkout;
        match surface.reset().await {
            Ok(()) => self.idle.lock().await.push(surface),
            Err(e) => {
                warn!("Surface failed reset, closing it: {}", e);
                let _ = surface.close().await;
            }
        }
    }

    /// Close a surface without pooling it. Used after browser-level failures
    /// where the session state is suspect.
    pub async fn discard(&self, checkout: Checkout) {
        let Checkout { mut surface, _permit } = checkout;
        if let Err(e) = surface.close().await {
            warn!("Surface close failed: {}", e);
        }
    }

    /// Close every idle surface. Chrome sessions outlive the process unless
    /// told to quit, so the pipeline calls this before exiting.
    pub async fn shutdown(&self) {
        let mut idle = self.idle.lock().await;
        while let Some(mut surface) = idle.pop() {
            if let Err(e) = surface.close().await {
                warn!("Surface close failed during shutdown: {}", e);
            }
        }
    }
}

/// A checked-out surface. Holds its semaphore permit until handed back via
/// [`SurfacePool::release`] or [`SurfacePool::discard`].
pub struct Checkout {
    surface: Box<dyn Surface>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for Checkout {
    type Target = dyn Surface;

    fn deref(&self) -> &Self::Target {
        self.surface.as_ref()
    }
}

impl DerefMut for Checkout {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.surface.as_mut()
    }
}
