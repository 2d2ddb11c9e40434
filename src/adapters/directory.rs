//! In-memory streamer directory.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::Address;
use crate::ports::{RecipientResolver, ResolveError};

#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    entries: HashMap<String, Address>,
}

fn normalize(username: &str) -> String {
    username.trim().trim_start_matches('@').to_lowercase()
}

impl StaticDirectory {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Address)>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, address)| (normalize(name.as_ref()), address))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RecipientResolver for StaticDirectory {
    async fn resolve(&self, username: &str) -> Result<Address, ResolveError> {
        self.entries
            .get(&normalize(username))
            .copied()
            .ok_or_else(|| ResolveError::UnknownRecipient(username.to_string()))
    }
}
