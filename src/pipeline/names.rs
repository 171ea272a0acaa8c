//! Vessel display-name resolution
//!
//! Resolution order: inline name, then the persistent cache, then the external
//! lookup (gated by a process-wide cooldown), then the configured fallback.
//! Fallback names never enter the cache.

use super::lookup::NameLookup;
use super::types::Sighting;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_FALLBACK_NAME: &str = "Unknown";

/// What to publish when no real name can be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackName {
    Sentinel(String),
    Identifier,
}

impl Default for FallbackName {
    fn default() -> Self {
        FallbackName::Sentinel(DEFAULT_FALLBACK_NAME.to_string())
    }
}

impl FallbackName {
    fn render(&self, identifier: &str) -> String {
        match self {
            FallbackName::Sentinel(s) => s.clone(),
            FallbackName::Identifier => identifier.to_string(),
        }
    }

    /// True when `name` is what the fallback would render for `identifier`
    fn is_fallback(&self, identifier: &str, name: &str) -> bool {
        match self {
            FallbackName::Sentinel(s) => s == name,
            FallbackName::Identifier => identifier == name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    Inline,
    Cache,
    Lookup,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub name: String,
    pub source: NameSource,
    /// True when this resolution added a new cache entry
    pub cached: bool,
}

/// Process-wide cooldown on the external lookup
#[derive(Debug, Clone)]
pub struct RateLimitToken {
    cooldown_secs: i64,
    last_call_at: Option<i64>,
}

impl RateLimitToken {
    pub fn new(cooldown_secs: i64) -> Self {
        Self {
            cooldown_secs,
            last_call_at: None,
        }
    }

    /// Take the token if the cooldown has elapsed; taking it stamps `now`
    pub fn try_acquire(&mut self, now: i64) -> bool {
        if let Some(last) = self.last_call_at {
            if now >= last && now - last < self.cooldown_secs {
                return false;
            }
        }
        self.last_call_at = Some(now);
        true
    }

    pub fn last_call_at(&self) -> Option<i64> {
        self.last_call_at
    }
}

pub struct NameResolver {
    cache: HashMap<String, String>,
    token: RateLimitToken,
    lookup: Option<Arc<dyn NameLookup>>,
    fallback: FallbackName,
}

impl NameResolver {
    pub fn new(
        cache: HashMap<String, String>,
        lookup: Option<Arc<dyn NameLookup>>,
        cooldown_secs: i64,
        fallback: FallbackName,
    ) -> Self {
        Self {
            cache,
            token: RateLimitToken::new(cooldown_secs),
            lookup,
            fallback,
        }
    }

    pub async fn resolve(&mut self, sighting: &Sighting, now: i64) -> ResolvedName {
        let identifier = sighting.identifier.as_str();

        if let Some(name) = &sighting.inline_name {
            let cached = self.remember(identifier, name);
            return ResolvedName {
                name: name.clone(),
                source: NameSource::Inline,
                cached,
            };
        }

        if let Some(name) = self.cache.get(identifier) {
            log::debug!("Found name '{}' for MMSI {} in cache", name, identifier);
            return ResolvedName {
                name: name.clone(),
                source: NameSource::Cache,
                cached: false,
            };
        }

        if let Some(name) = self.lookup_external(identifier, now).await {
            let cached = self.remember(identifier, &name);
            return ResolvedName {
                name,
                source: NameSource::Lookup,
                cached,
            };
        }

        let name = self.fallback.render(identifier);
        log::info!("No name found for MMSI {}, using '{}'", identifier, name);
        ResolvedName {
            name,
            source: NameSource::Fallback,
            cached: false,
        }
    }

    async fn lookup_external(&mut self, identifier: &str, now: i64) -> Option<String> {
        let lookup = self.lookup.as_ref()?;

        if !self.token.try_acquire(now) {
            log::debug!("Lookup cooldown active, skipping lookup for MMSI {}", identifier);
            return None;
        }

        match lookup.lookup(identifier).await {
            Ok(Some(name)) => {
                log::info!("Lookup resolved MMSI {} to '{}'", identifier, name);
                Some(name)
            }
            Ok(None) => {
                log::info!("Lookup returned no name for MMSI {}", identifier);
                None
            }
            Err(e) => {
                log::warn!("Lookup failed for MMSI {}: {}", identifier, e);
                None
            }
        }
    }

    /// Insert into the cache if absent; never stores a fallback-shaped name
    fn remember(&mut self, identifier: &str, name: &str) -> bool {
        if self.fallback.is_fallback(identifier, name) || self.cache.contains_key(identifier) {
            return false;
        }
        self.cache.insert(identifier.to_string(), name.to_string());
        log::info!("Added '{}' to the name cache for MMSI {}", name, identifier);
        true
    }

    pub fn cache(&self) -> &HashMap<String, String> {
        &self.cache
    }

    pub fn token(&self) -> &RateLimitToken {
        &self.token
    }
}
