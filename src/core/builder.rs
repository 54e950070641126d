use std::sync::Arc;
use std::time::Duration;

use crate::cluster::{Router, TopologyStore};
use crate::core::config::RouterConfig;
use crate::Error;

/// Builder for configuring and creating a [`Router`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use slotgate::RouterBuilder;
///
/// let router = RouterBuilder::new()
///     .seed("redis://127.0.0.1:7000")
///     .max_redirects(3)
///     .tryagain_delay(Duration::from_millis(20))
///     .build()
///     .unwrap();
/// assert_eq!(router.config().seed_nodes, vec!["127.0.0.1:7000".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct RouterBuilder {
    config: RouterConfig,
    store: Option<Arc<TopologyStore>>,
}

impl RouterBuilder {
    /// Creates a new [`RouterBuilder`] with default settings.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    #[inline]
    pub fn from_config(config: RouterConfig) -> Self {
        Self {
            config,
            store: None,
        }
    }

    /// Adds a seed node used to bootstrap unpopulated clusters.
    ///
    /// # Arguments
    ///
    /// * `address` - `host:port` or `redis://host:port`
    #[inline]
    pub fn seed(mut self, address: impl Into<String>) -> Self {
        self.config.seed_nodes.push(address.into());
        self
    }

    /// Adds several seed nodes.
    #[inline]
    pub fn seeds<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .seed_nodes
            .extend(addresses.into_iter().map(Into::into));
        self
    }

    /// Sets how many redirects a request may follow.
    ///
    /// # Arguments
    ///
    /// * `max` - Retry ceiling for MOVED, ASK and TRYAGAIN (default: 5)
    #[inline]
    pub fn max_redirects(mut self, max: u32) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Sets the delay hint attached to `TRYAGAIN` retries.
    ///
    /// # Arguments
    ///
    /// * `delay` - Time the transport should wait before resending (default: 50ms)
    #[inline]
    pub fn tryagain_delay(mut self, delay: Duration) -> Self {
        self.config.tryagain_delay = delay;
        self
    }

    /// Sets the largest frame the decoders accept.
    ///
    /// # Arguments
    ///
    /// * `size` - Maximum frame size in bytes (default: 512 MB)
    #[inline]
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Shares an existing topology store instead of creating a new one.
    ///
    /// Routers built over the same store see each other's topology updates.
    #[inline]
    pub fn store(mut self, store: Arc<TopologyStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the [`Router`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a seed address is invalid or the
    /// frame size is zero.
    pub fn build(self) -> Result<Router, Error> {
        let config = self.config.validate()?;
        let store = self.store.unwrap_or_default();
        Ok(Router::with_store(store, config))
    }
}
