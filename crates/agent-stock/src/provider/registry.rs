//! Ordered provider registry and dossier scopes

use super::DataProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Providers in declared order
///
/// The declared order is the order sections appear in the dossier, so two
/// runs over the same providers render identically.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn DataProvider>>,
    index: HashMap<String, usize>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider; a repeated name replaces the earlier one in place
    pub fn register(&mut self, provider: Arc<dyn DataProvider>) {
        let name = provider.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => self.providers[slot] = provider,
            None => {
                self.index.insert(name, self.providers.len());
                self.providers.push(provider);
            }
        }
    }

    pub fn with(mut self, provider: Arc<dyn DataProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DataProvider>> {
        self.index.get(name).map(|&slot| Arc::clone(&self.providers[slot]))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DataProvider>> {
        self.providers.iter()
    }

    /// Providers in scope, in declared order
    pub fn select<'a>(&'a self, scope: &'a DossierScope) -> impl Iterator<Item = &'a Arc<dyn DataProvider>> {
        self.providers.iter().filter(move |p| scope.includes(p.name()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Which providers feed a dossier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DossierScope {
    #[default]
    All,
    /// Named subset; order still follows the registry
    Only(Vec<String>),
}

impl DossierScope {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DossierScope::Only(names.into_iter().map(Into::into).collect())
    }

    pub fn includes(&self, name: &str) -> bool {
        match self {
            DossierScope::All => true,
            DossierScope::Only(names) => names.iter().any(|n| n == name),
        }
    }
}
