//! Named registry shared by the database, cache, storage and queue managers.
//!
//! Items are addressed by name; the first item added becomes the default until
//! `set_default` says otherwise.

use parking_lot::RwLock;
use std::{collections::HashMap, fmt, sync::Arc};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManagerError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("no default {kind} configured")]
    NoDefault { kind: &'static str },
}

struct Inner<T: ?Sized> {
    items: HashMap<String, Arc<T>>,
    default: Option<String>,
}

pub struct Manager<T: ?Sized> {
    kind: &'static str,
    inner: RwLock<Inner<T>>,
}

impl<T> Manager<T>
where
    T: ?Sized + Send + Sync,
{
    /// `kind` names the items in errors and logs, e.g. `"cache store"`.
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            inner: RwLock::new(Inner {
                items: HashMap::new(),
                default: None,
            }),
        }
    }

    /// Add (or replace) an item. The first name ever added becomes the default.
    pub fn add(&self, name: impl Into<String>, item: Arc<T>) {
        let name = name.into();
        let mut inner = self.inner.write();
        if inner.default.is_none() {
            inner.default = Some(name.clone());
        }
        inner.items.insert(name, item);
    }

    /// # Errors
    /// Returns [`ManagerError::NotFound`] if no item is registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<T>, ManagerError> {
        self.inner
            .read()
            .items
            .get(name)
            .cloned()
            .ok_or_else(|| ManagerError::NotFound {
                kind: self.kind,
                name: name.to_owned(),
            })
    }

    /// The default item.
    ///
    /// # Errors
    /// Returns [`ManagerError::NoDefault`] while the manager is empty.
    pub fn default_item(&self) -> Result<Arc<T>, ManagerError> {
        let inner = self.inner.read();
        let name = inner
            .default
            .as_deref()
            .ok_or(ManagerError::NoDefault { kind: self.kind })?;
        inner
            .items
            .get(name)
            .cloned()
            .ok_or_else(|| ManagerError::NotFound {
                kind: self.kind,
                name: name.to_owned(),
            })
    }

    #[must_use]
    pub fn default_name(&self) -> Option<String> {
        self.inner.read().default.clone()
    }

    /// # Errors
    /// Returns [`ManagerError::NotFound`] if `name` is not registered.
    pub fn set_default(&self, name: &str) -> Result<(), ManagerError> {
        let mut inner = self.inner.write();
        if !inner.items.contains_key(name) {
            return Err(ManagerError::NotFound {
                kind: self.kind,
                name: name.to_owned(),
            });
        }
        inner.default = Some(name.to_owned());
        Ok(())
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().items.keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().items.is_empty()
    }
}

impl<T: ?Sized> fmt::Debug for Manager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        let mut names: Vec<&String> = inner.items.keys().collect();
        names.sort();
        f.debug_struct("Manager")
            .field("kind", &self.kind)
            .field("items", &names)
            .field("default", &inner.default)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn first_added_becomes_default() {
        let m: Manager<str> = Manager::new("thing");
        assert_eq!(
            m.default_item().unwrap_err(),
            ManagerError::NoDefault { kind: "thing" }
        );

        m.add("a", Arc::from("alpha"));
        m.add("b", Arc::from("beta"));

        assert_eq!(m.default_name().as_deref(), Some("a"));
        assert_eq!(&*m.default_item().unwrap(), "alpha");
        assert_eq!(&*m.get("b").unwrap(), "beta");
        assert_eq!(m.names(), ["a", "b"]);
    }

    #[test]
    fn set_default_requires_known_name() {
        let m: Manager<str> = Manager::new("thing");
        m.add("a", Arc::from("alpha"));
        m.add("b", Arc::from("beta"));

        m.set_default("b").unwrap();
        assert_eq!(&*m.default_item().unwrap(), "beta");

        assert_eq!(
            m.set_default("zzz").unwrap_err(),
            ManagerError::NotFound {
                kind: "thing",
                name: "zzz".to_owned()
            }
        );
        assert_eq!(m.default_name().as_deref(), Some("b"));
    }

    #[test]
    fn get_unknown_is_not_found() {
        let m: Manager<str> = Manager::new("thing");
        assert!(m.is_empty());
        assert!(matches!(m.get("x"), Err(ManagerError::NotFound { .. })));
    }
}
