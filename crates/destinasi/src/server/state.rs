//! Shared application state.

use std::sync::{Arc, Mutex};

use destinasi_imagekit::ImageKit;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::media::ImageService;
use crate::storage::Storage;

/// State cloned into every handler.
///
/// The SQLite connection is the only shared mutable state. Handlers take the
/// lock through [`AppState::with_storage`], which never spans an `.await`.
#[derive(Debug, Clone)]
pub struct AppState {
    storage: Arc<Mutex<Storage>>,
    images: Option<Arc<dyn ImageService>>,
    config: Arc<Config>,
}

impl AppState {
    /// Assemble state from parts.
    #[must_use]
    pub fn new(storage: Storage, images: Option<Arc<dyn ImageService>>, config: Config) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            images,
            config: Arc::new(config),
        }
    }

    /// Open the configured database and build the CDN client, if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the CDN client
    /// cannot be built.
    pub fn from_config(config: Config) -> Result<Self> {
        let storage = Storage::open(config.database_path())?;
        let images: Option<Arc<dyn ImageService>> = match config.imagekit_config() {
            Some(imagekit) => {
                info!("Image CDN enabled at {}", imagekit.url_endpoint);
                Some(Arc::new(ImageKit::new(imagekit)?))
            }
            None => {
                warn!("Image CDN is not configured; image endpoints will answer 503");
                None
            }
        };
        Ok(Self::new(storage, images, config))
    }

    /// Run `f` with the locked storage.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or [`Error::Internal`] if the lock is
    /// poisoned.
    pub fn with_storage<T>(&self, f: impl FnOnce(&Storage) -> Result<T>) -> Result<T> {
        let storage = self
            .storage
            .lock()
            .map_err(|_| Error::internal("storage lock poisoned"))?;
        f(&storage)
    }

    /// The image service, if configured.
    #[must_use]
    pub fn images(&self) -> Option<&dyn ImageService> {
        self.images.as_deref()
    }

    /// The image service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageServiceUnavailable`] when the CDN is not
    /// configured.
    pub fn require_images(&self) -> Result<&dyn ImageService> {
        self.images().ok_or(Error::ImageServiceUnavailable)
    }

    /// The loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
