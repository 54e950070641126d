use std::time::Duration;

use crate::proto::codec::DEFAULT_MAX_FRAME_SIZE;
use crate::proto::error::{Error, Result};

/// Default ceiling on MOVED/ASK/TRYAGAIN retries per request.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Default wait before retrying a request that got `TRYAGAIN`.
pub const DEFAULT_TRYAGAIN_DELAY: Duration = Duration::from_millis(50);

/// Port assumed when a seed address does not name one.
const DEFAULT_PORT: u16 = 6379;

/// What to do with a multi-key request whose keys span several slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum CrossSlotPolicy {
    /// Answer the client with a `CROSSSLOT` error.
    #[default]
    Reject,
}

/// Router settings.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use slotgate::core::config::RouterConfig;
///
/// let config = RouterConfig::default();
/// assert_eq!(config.max_redirects, 5);
/// assert_eq!(config.tryagain_delay, Duration::from_millis(50));
/// assert!(config.seed_nodes.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
#[non_exhaustive]
pub struct RouterConfig {
    /// Redirects a request may follow before it fails.
    pub max_redirects: u32,
    /// Delay hint attached to `TRYAGAIN` retries.
    #[cfg_attr(feature = "json", serde(with = "millis"))]
    pub tryagain_delay: Duration,
    /// `host:port` of nodes to fetch the topology from when a cluster has
    /// never been populated.
    pub seed_nodes: Vec<String>,
    /// Largest frame the decoders accept.
    pub max_frame_size: usize,
    /// Handling of cross-slot multi-key requests.
    pub cross_slot_policy: CrossSlotPolicy,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            tryagain_delay: DEFAULT_TRYAGAIN_DELAY,
            seed_nodes: Vec::new(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            cross_slot_policy: CrossSlotPolicy::default(),
        }
    }
}

impl RouterConfig {
    /// Checks the settings and normalizes seed addresses to `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a zero frame size or a seed
    /// that is not a valid address.
    pub fn validate(mut self) -> Result<Self> {
        if self.max_frame_size == 0 {
            return Err(Error::InvalidArgument {
                message: "max_frame_size must be positive".to_string(),
            });
        }
        self.seed_nodes = self
            .seed_nodes
            .iter()
            .map(|seed| parse_seed(seed))
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Loads settings from JSON; missing fields take their defaults.
    ///
    /// # Example
    ///
    /// ```
    /// use slotgate::core::config::RouterConfig;
    ///
    /// let config = RouterConfig::from_json(
    ///     r#"{"max_redirects": 3, "tryagain_delay": 10, "seed_nodes": ["redis://10.0.0.1:7000"]}"#,
    /// )
    /// .unwrap();
    /// assert_eq!(config.max_redirects, 3);
    /// assert_eq!(config.seed_nodes, vec!["10.0.0.1:7000".to_string()]);
    /// ```
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::InvalidArgument {
            message: format!("invalid router config: {}", e),
        })?;
        config.validate()
    }
}

/// Normalizes `host:port` or `redis://host:port` to `host:port`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the address cannot be parsed, uses
/// a scheme other than `redis`, or has no host.
pub fn parse_seed(seed: &str) -> Result<String> {
    let candidate = if seed.contains("://") {
        seed.to_string()
    } else {
        format!("redis://{}", seed)
    };

    let parsed_url = url::Url::parse(&candidate).map_err(|_| Error::InvalidArgument {
        message: format!("invalid seed address '{}'", seed),
    })?;

    if parsed_url.scheme() != "redis" {
        return Err(Error::InvalidArgument {
            message: format!("invalid scheme in '{}', expected redis://", seed),
        });
    }

    let host = parsed_url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| Error::InvalidArgument {
            message: format!("missing host in seed address '{}'", seed),
        })?;

    let port = parsed_url.port().unwrap_or(DEFAULT_PORT);
    Ok(format!("{}:{}", host, port))
}

#[cfg(feature = "json")]
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(delay: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.max_redirects, DEFAULT_MAX_REDIRECTS);
        assert_eq!(config.max_frame_size, 512 * 1024 * 1024);
        assert_eq!(config.cross_slot_policy, CrossSlotPolicy::Reject);
    }

    #[test]
    fn test_parse_seed() {
        assert_eq!(parse_seed("127.0.0.1:7000").unwrap(), "127.0.0.1:7000");
        assert_eq!(parse_seed("redis://10.0.0.1:7001").unwrap(), "10.0.0.1:7001");
        assert_eq!(parse_seed("redis://node-a").unwrap(), "node-a:6379");
        assert_eq!(parse_seed("[::1]:7000").unwrap(), "[::1]:7000");
    }

    #[test]
    fn test_parse_seed_invalid() {
        assert!(parse_seed("http://127.0.0.1:7000").is_err());
        assert!(parse_seed("127.0.0.1:notaport").is_err());
        assert!(parse_seed("").is_err());
    }

    #[test]
    fn test_validate_normalizes_seeds() {
        let config = RouterConfig {
            seed_nodes: vec!["redis://a:1".to_string(), "b:2".to_string()],
            ..RouterConfig::default()
        };
        let config = config.validate().unwrap();
        assert_eq!(config.seed_nodes, vec!["a:1".to_string(), "b:2".to_string()]);
    }

    #[test]
    fn test_validate_rejects_zero_frame_size() {
        let config = RouterConfig {
            max_frame_size: 0,
            ..RouterConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_from_json() {
        let config = RouterConfig::from_json(r#"{"tryagain_delay": 250}"#).unwrap();
        assert_eq!(config.tryagain_delay, Duration::from_millis(250));
        assert_eq!(config.max_redirects, DEFAULT_MAX_REDIRECTS);

        assert!(RouterConfig::from_json("{").is_err());
        assert!(RouterConfig::from_json(r#"{"seed_nodes": ["ftp://x"]}"#).is_err());
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_roundtrip_keeps_millis() {
        let config = RouterConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"tryagain_delay\":50"));
        assert!(json.contains("\"cross_slot_policy\":\"reject\""));
    }
}
