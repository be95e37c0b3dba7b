//! Platform registry for looking up platform definitions.

use std::collections::HashMap;

use super::definition::PlatformDefinition;
use super::vendors;

/// Registry for platform definitions.
#[derive(Debug, Default)]
pub struct PlatformRegistry {
    platforms: HashMap<String, PlatformDefinition>,
}

impl PlatformRegistry {
    /// Platform used when neither the prompt nor the roster says otherwise.
    pub const FALLBACK: &'static str = vendors::cisco_xr::PLATFORM_NAME;

    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            platforms: HashMap::new(),
        }
    }

    /// Create a registry holding the built-in platforms.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for platform in [
            vendors::linux::platform(),
            vendors::cisco_xr::platform(),
            vendors::cisco_ios::platform(),
            vendors::cisco_nxos::platform(),
        ] {
            registry.platforms.insert(platform.name.clone(), platform);
        }
        registry
    }

    /// Get a platform by name.
    pub fn get(&self, name: &str) -> Option<&PlatformDefinition> {
        self.platforms.get(name)
    }

    /// Pick the platform for a freshly landed session.
    ///
    /// An XR-style node prompt wins over the roster's `device_type`; an
    /// unknown or missing `device_type` falls back to [`Self::FALLBACK`].
    pub fn detect(&self, prompt: &str, advisory: Option<&str>) -> Option<&PlatformDefinition> {
        if vendors::cisco_xr::is_xr_prompt(prompt) {
            return self.get(vendors::cisco_xr::PLATFORM_NAME);
        }
        advisory
            .and_then(|name| self.get(name))
            .or_else(|| self.get(Self::FALLBACK))
    }
}
