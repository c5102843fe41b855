//! The set of methods a pipeline run should execute

use std::collections::BTreeMap;

use super::{ForecastConfig, Method};

/// Mapping from method to its configuration.
///
/// Keys are derived from the configuration variant, so a method can never be
/// paired with another method's configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodConfigs {
    configs: BTreeMap<Method, ForecastConfig>,
}

impl MethodConfigs {
    /// An empty set; a run over it completes with no outcomes
    pub fn empty() -> Self {
        Self {
            configs: BTreeMap::new(),
        }
    }

    /// Add or replace the configuration for its method
    pub fn insert(&mut self, config: impl Into<ForecastConfig>) -> Option<ForecastConfig> {
        let config = config.into();
        self.configs.insert(config.method(), config)
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, config: impl Into<ForecastConfig>) -> Self {
        self.insert(config);
        self
    }

    pub fn remove(&mut self, method: Method) -> Option<ForecastConfig> {
        self.configs.remove(&method)
    }

    pub fn get(&self, method: Method) -> Option<&ForecastConfig> {
        self.configs.get(&method)
    }

    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.configs.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForecastConfig> {
        self.configs.values()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

impl Default for MethodConfigs {
    /// All four methods with their default configurations
    fn default() -> Self {
        Method::ALL
            .into_iter()
            .map(ForecastConfig::default_for)
            .collect()
    }
}

impl FromIterator<ForecastConfig> for MethodConfigs {
    fn from_iter<I: IntoIterator<Item = ForecastConfig>>(iter: I) -> Self {
        let mut configs = Self::empty();
        for config in iter {
            configs.insert(config);
        }
        configs
    }
}
