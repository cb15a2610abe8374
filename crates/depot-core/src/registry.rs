//! Connection registry for store managers
//!
//! The registry is the single entry point for obtaining managers. It
//! memoizes by configuration signature, so two requests for the same store
//! share one manager and therefore one path table, and handles from either
//! request observe each other's writes.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::config::StoreConfig;
use crate::manager::Manager;
use crate::{Error, Result};

/// Pool of connected managers, keyed by store signature.
#[derive(Debug, Default)]
pub struct Registry {
    managers: RefCell<HashMap<String, Manager>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The manager for a store, connecting on first request.
    ///
    /// Later requests with an equal configuration return a clone of the
    /// same manager.
    pub fn connect(&self, config: &StoreConfig) -> Result<Manager> {
        let signature = config.signature();
        if let Some(manager) = self.managers.borrow().get(&signature) {
            return Ok(manager.clone());
        }
        let manager = Manager::new(config.open()?);
        tracing::info!("Connected store {}", signature);
        self.managers
            .borrow_mut()
            .insert(signature, manager.clone());
        Ok(manager)
    }

    /// The manager for a store URL; see [`StoreConfig::from_url`].
    pub fn resolve(&self, url: &str) -> Result<Manager> {
        self.connect(&StoreConfig::from_url(url)?)
    }

    /// The already-connected manager for a signature, if any.
    pub fn get(&self, signature: &str) -> Option<Manager> {
        self.managers.borrow().get(signature).cloned()
    }

    /// Drop a connection, returning whether one existed.
    ///
    /// Handles already obtained from the manager stay valid; only the
    /// pooling stops.
    pub fn disconnect(&self, signature: &str) -> Result<()> {
        match self.managers.borrow_mut().remove(signature) {
            Some(_) => Ok(()),
            None => Err(Error::invalid_config(
                signature,
                "no connected store with this signature",
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.managers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.borrow().is_empty()
    }

    /// Drop every connection.
    pub fn clear(&self) {
        self.managers.borrow_mut().clear();
    }
}
