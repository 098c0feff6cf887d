//! Per-context filter cache
//!
//! Each logical execution context (a management operation, a connection, ...)
//! gets at most one compiled [`FilterSpec`], built on first use and shared
//! for the rest of the context's lifetime.

use crate::config::FilterConfig;
use crate::filter::{FilterError, FilterSpec, FilterSpecError, apply};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Slot = Arc<Mutex<Option<Arc<FilterSpec>>>>;

pub struct ContextCache<K> {
    config: FilterConfig,
    slots: Mutex<HashMap<K, Slot>>,
    compilations: AtomicUsize,
}

impl<K: Eq + Hash + Clone> ContextCache<K> {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            slots: Mutex::new(HashMap::new()),
            compilations: AtomicUsize::new(0),
        }
    }

    /// Return the context's filter, compiling it if this is the first use.
    ///
    /// Only the context's own slot is locked while compiling: concurrent
    /// callers for the same context wait and receive the first caller's
    /// instance, callers for other contexts are not held up. A failed compile
    /// installs nothing.
    pub fn get_or_compile(&self, context: K) -> Result<Arc<FilterSpec>, FilterSpecError> {
        let slot = Arc::clone(self.lock_slots().entry(context.clone()).or_default());
        let mut installed = lock_slot(&slot);
        if let Some(spec) = installed.as_ref() {
            return Ok(Arc::clone(spec));
        }

        match self.config.compile() {
            Ok(spec) => {
                let spec = Arc::new(spec);
                self.compilations.fetch_add(1, Ordering::Relaxed);
                log::info!(
                    target: crate::LOG_TARGET,
                    "Installed {} filter with {} rules for new context",
                    spec.mode(),
                    spec.rules().len()
                );
                *installed = Some(Arc::clone(&spec));
                Ok(spec)
            }
            Err(e) => {
                // slot lock is always taken after the map lock is released,
                // so holding it here while taking the map lock cannot deadlock
                let mut slots = self.lock_slots();
                if slots
                    .get(&context)
                    .is_some_and(|current| Arc::ptr_eq(current, &slot))
                {
                    slots.remove(&context);
                }
                Err(e)
            }
        }
    }

    /// Classify `class_name` with the context's filter
    pub fn admits(&self, context: K, class_name: &str) -> Result<bool, FilterError> {
        let spec = self.get_or_compile(context)?;
        apply(&spec, class_name)
    }

    pub fn get(&self, context: &K) -> Option<Arc<FilterSpec>> {
        let slot = self.lock_slots().get(context).cloned()?;
        lock_slot(&slot).clone()
    }

    /// Drop the filter of a context that has ended
    pub fn discard(&self, context: &K) -> Option<Arc<FilterSpec>> {
        let slot = self.lock_slots().remove(context)?;
        lock_slot(&slot).take()
    }

    /// Number of contexts with a filter installed or being compiled
    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_slots().is_empty()
    }

    /// Number of successful compilations since creation
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    // maps and slots are only changed by single insert/remove/assign calls,
    // so a poisoned lock still guards consistent data
    fn lock_slots(&self) -> MutexGuard<'_, HashMap<K, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock_slot(slot: &Slot) -> MutexGuard<'_, Option<Arc<FilterSpec>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K: Eq + Hash + Clone> Default for ContextCache<K> {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}
