//! Owned collector registry.
//!
//! Maps source-type strings to collector constructors. Constructed once at
//! startup and passed by reference to whatever needs to create collectors;
//! registration is a method call on the instance, not a module-level side
//! effect.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::CollectError;
use crate::github::GithubCollector;
use crate::rss::RssCollector;
use crate::types::HttpSettings;
use crate::Collector;

type Constructor = Box<dyn Fn(&Value) -> Result<Box<dyn Collector>, CollectError> + Send + Sync>;

pub struct CollectorRegistry {
    constructors: HashMap<String, Constructor>,
}

impl CollectorRegistry {
    /// An empty registry with no collector types.
    #[must_use]
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A registry with the built-in `github` and `rss` collectors, using
    /// default HTTP settings.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::with_builtins_using(HttpSettings::default())
    }

    /// A registry with the built-in collectors sharing the given HTTP
    /// settings.
    #[must_use]
    pub fn with_builtins_using(settings: HttpSettings) -> Self {
        let mut registry = Self::new();
        let github_settings = settings.clone();
        registry.register("github", move |config| {
            Ok(Box::new(GithubCollector::from_config(
                config,
                &github_settings,
            )?))
        });
        registry.register("rss", move |config| {
            Ok(Box::new(RssCollector::from_config(config, &settings)?))
        });
        registry
    }

    /// Register (or replace) a collector constructor for a source type.
    pub fn register<F>(&mut self, source_type: &str, constructor: F)
    where
        F: Fn(&Value) -> Result<Box<dyn Collector>, CollectError> + Send + Sync + 'static,
    {
        self.constructors
            .insert(source_type.to_string(), Box::new(constructor));
    }

    /// Create a collector for the given source type and config.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::UnsupportedSourceType`] naming the available
    /// types when `source_type` is unknown, or the constructor's error when
    /// the config is invalid.
    pub fn create(
        &self,
        source_type: &str,
        config: &Value,
    ) -> Result<Box<dyn Collector>, CollectError> {
        let constructor = self.constructors.get(source_type).ok_or_else(|| {
            CollectError::UnsupportedSourceType {
                source_type: source_type.to_string(),
                available: self.available().join(", "),
            }
        })?;
        constructor(config)
    }

    /// True when the source type has a registered constructor.
    #[must_use]
    pub fn supports(&self, source_type: &str) -> bool {
        self.constructors.contains_key(source_type)
    }

    /// Sorted list of registered source types.
    #[must_use]
    pub fn available(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtins_include_github_and_rss() {
        let registry = CollectorRegistry::with_builtins();
        assert_eq!(registry.available(), vec!["github", "rss"]);
        assert!(registry.supports("github"));
        assert!(!registry.supports("twitter"));
    }

    #[test]
    fn unknown_source_type_names_available_types() {
        let registry = CollectorRegistry::with_builtins();
        let err = match registry.create("carrier-pigeon", &json!({})) {
            Err(err) => err,
            Ok(_) => panic!("unknown type must fail"),
        };

        let msg = err.to_string();
        assert!(msg.contains("carrier-pigeon"), "{msg}");
        assert!(msg.contains("github, rss"), "{msg}");
    }

    #[test]
    fn create_github_collector_from_valid_config() {
        let registry = CollectorRegistry::with_builtins();
        let config = json!({"repositories": ["acme/widgets"], "token": "t"});
        assert!(registry.create("github", &config).is_ok());
    }

    #[test]
    fn invalid_config_surfaces_constructor_error() {
        let registry = CollectorRegistry::with_builtins();
        let result = registry.create("github", &json!({"repositories": "not-a-list"}));
        assert!(matches!(result, Err(CollectError::InvalidConfig(_))));
    }

    #[test]
    fn registration_is_an_instance_method() {
        let mut registry = CollectorRegistry::new();
        assert!(registry.available().is_empty());

        registry.register("rss", |config| {
            Ok(Box::new(RssCollector::from_config(
                config,
                &HttpSettings::default(),
            )?))
        });
        assert_eq!(registry.available(), vec!["rss"]);
    }
}
