//! Test helpers for handler tests.
//!
//! [`InMemoryParameterStore`] stands in for SSM Parameter Store: it keeps
//! parameters and their tag keys in memory, records every call in order, and
//! can inject remote failures and cooperative latency.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::adapters::parameters::{ParameterError, ParameterStore, ParameterTagger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    AddTag {
        parameter: String,
        key: String,
        value: String,
    },
    RemoveTag { parameter: String, key: String },
    ParameterExists { name: String },
    PutParameter { name: String, value: String },
    DeleteParameters { names: Vec<String> },
    ListTagKeys { name: String },
}

#[derive(Debug, Default)]
pub struct InMemoryParameterStore {
    parameters: Mutex<BTreeMap<String, String>>,
    tags: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
    calls: Mutex<Vec<StoreCall>>,
    failing: Mutex<BTreeSet<String>>,
    latency_yields: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl InMemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `names`, each with the value `value-of-{name}`.
    pub fn with_parameters(names: &[&str]) -> Self {
        let store = Self::new();
        for name in names {
            store.seed_parameter(name, &format!("value-of-{name}"));
        }
        store
    }

    /// Every remote call yields to the scheduler `yields` times before it
    /// completes, so concurrent calls overlap.
    pub fn with_latency_yields(mut self, yields: usize) -> Self {
        self.latency_yields = yields;
        self
    }

    pub fn seed_parameter(&self, name: &str, value: &str) {
        self.parameters
            .lock()
            .expect("poisoned mutex")
            .insert(name.to_string(), value.to_string());
    }

    /// Tags `name` with `key` and the strong-reference value `true`.
    pub fn seed_tag(&self, name: &str, key: &str) {
        self.write_tag(name, key, "true");
    }

    fn write_tag(&self, name: &str, key: &str, value: &str) {
        self.tags
            .lock()
            .expect("poisoned mutex")
            .entry(name.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Any call touching `name` fails with a non-absent remote error.
    pub fn fail_remote_calls_for(&self, name: &str) {
        self.failing
            .lock()
            .expect("poisoned mutex")
            .insert(name.to_string());
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().expect("poisoned mutex").clone()
    }

    pub fn parameters(&self) -> BTreeMap<String, String> {
        self.parameters.lock().expect("poisoned mutex").clone()
    }

    /// Parameters currently carrying tag `key`, sorted by name.
    pub fn tagged_with(&self, key: &str) -> Vec<String> {
        self.tags
            .lock()
            .expect("poisoned mutex")
            .iter()
            .filter(|(_, tags)| tags.contains_key(key))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn tag_value(&self, name: &str, key: &str) -> Option<String> {
        self.tags
            .lock()
            .expect("poisoned mutex")
            .get(name)
            .and_then(|tags| tags.get(key).cloned())
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn remote_call(&self, call: StoreCall, touched: &[&str]) -> Result<(), ParameterError> {
        self.calls.lock().expect("poisoned mutex").push(call);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        for _ in 0..self.latency_yields {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failing = self.failing.lock().expect("poisoned mutex");
        match touched.iter().find(|name| failing.contains(**name)) {
            Some(name) => Err(ParameterError::Remote(format!(
                "simulated throttling for {name}"
            ))),
            None => Ok(()),
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.parameters
            .lock()
            .expect("poisoned mutex")
            .contains_key(name)
    }
}

#[async_trait]
impl ParameterTagger for InMemoryParameterStore {
    async fn add_tag(
        &self,
        parameter_name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ParameterError> {
        self.remote_call(
            StoreCall::AddTag {
                parameter: parameter_name.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            },
            &[parameter_name],
        )
        .await?;

        if !self.contains(parameter_name) {
            return Err(ParameterError::AlreadyAbsent);
        }
        self.write_tag(parameter_name, key, value);
        Ok(())
    }

    async fn remove_tag(&self, parameter_name: &str, key: &str) -> Result<(), ParameterError> {
        self.remote_call(
            StoreCall::RemoveTag {
                parameter: parameter_name.to_string(),
                key: key.to_string(),
            },
            &[parameter_name],
        )
        .await?;

        if !self.contains(parameter_name) {
            return Err(ParameterError::AlreadyAbsent);
        }
        if let Some(tags) = self
            .tags
            .lock()
            .expect("poisoned mutex")
            .get_mut(parameter_name)
        {
            tags.remove(key);
        }
        Ok(())
    }
}

#[async_trait]
impl ParameterStore for InMemoryParameterStore {
    async fn parameter_exists(&self, name: &str) -> Result<bool, ParameterError> {
        self.remote_call(
            StoreCall::ParameterExists {
                name: name.to_string(),
            },
            &[name],
        )
        .await?;
        Ok(self.contains(name))
    }

    async fn put_parameter(&self, name: &str, value: &str) -> Result<(), ParameterError> {
        self.remote_call(
            StoreCall::PutParameter {
                name: name.to_string(),
                value: value.to_string(),
            },
            &[name],
        )
        .await?;
        self.seed_parameter(name, value);
        Ok(())
    }

    async fn delete_parameters(&self, names: &[String]) -> Result<(), ParameterError> {
        let touched: Vec<&str> = names.iter().map(String::as_str).collect();
        self.remote_call(
            StoreCall::DeleteParameters {
                names: names.to_vec(),
            },
            &touched,
        )
        .await?;

        let mut parameters = self.parameters.lock().expect("poisoned mutex");
        let mut tags = self.tags.lock().expect("poisoned mutex");
        for name in names {
            parameters.remove(name);
            tags.remove(name);
        }
        Ok(())
    }

    async fn list_tag_keys(&self, name: &str) -> Result<Vec<String>, ParameterError> {
        self.remote_call(
            StoreCall::ListTagKeys {
                name: name.to_string(),
            },
            &[name],
        )
        .await?;

        if !self.contains(name) {
            return Err(ParameterError::AlreadyAbsent);
        }
        Ok(self
            .tags
            .lock()
            .expect("poisoned mutex")
            .get(name)
            .map(|tags| tags.keys().cloned().collect())
            .unwrap_or_default())
    }
}
