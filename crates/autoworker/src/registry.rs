//! # Method Registry
//!
//! The registry is the source of truth for what a worker can do. It maps each
//! method name to the body that implements it, and is copied by value into the
//! worker when the boundary is built.
//!
//! ## Philosophy
//!
//! - **First Wins**: A name is bound once. Re-registering a name is an error and
//!   leaves the original binding in place.
//! - **Ordered**: Names iterate in sorted order, so anything derived from the key
//!   set (accessors, manifests) is deterministic.

use std::collections::BTreeMap;

use crate::method::Method;

/// Name bound to a worker built from a single method.
pub const DEFAULT_METHOD: &str = "run";

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Method names must not be empty.
    EmptyName,
    /// The name is already bound to another method.
    Duplicate(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::EmptyName => write!(f, "method name must not be empty"),
            Error::Duplicate(name) => write!(f, "method '{}' is already registered", name),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Mapping from method name to method body.
#[derive(Clone, Debug, Default)]
pub struct MethodRegistry {
    methods: BTreeMap<String, Method>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `method`.
    pub fn register(&mut self, name: impl Into<String>, method: Method) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        if self.methods.contains_key(&name) {
            return Err(Error::Duplicate(name));
        }
        self.methods.insert(name, method);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, method: Method) -> Result<Self> {
        self.register(name, method)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<Method> {
        self.methods.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Method)> {
        self.methods.iter().map(|(name, method)| (name.as_str(), *method))
    }
}

impl From<Method> for MethodRegistry {
    fn from(method: Method) -> Self {
        let mut methods = BTreeMap::new();
        methods.insert(DEFAULT_METHOD.to_string(), method);
        Self { methods }
    }
}
