//! Per-task serving context: the "current request" and "current response".
//!
//! Every request-handling task holds a [`TaskContext`] handed out by a shared
//! [`ServingContext`]. The handle is the only way to reach that task's
//! request and response, so concurrent tasks never observe each other's
//! state, while a timeout monitor can still enumerate every loaded pair
//! through the shared registry.
//!
//! ```
//! use wirecore::context::{ContextError, ServingContext, Slot};
//! use wirecore::http::HeaderMap;
//!
//! let serving: ServingContext<HeaderMap, HeaderMap> = ServingContext::new();
//! let task = serving.task();
//! assert!(matches!(task.current(), Err(ContextError::NotBound { slot: Slot::Request })));
//!
//! task.load(HeaderMap::new(), HeaderMap::new());
//! task.set(Slot::Response, "content-type", "text/plain").unwrap();
//! assert_eq!(task.get(Slot::Response, "Content-Type").unwrap().as_deref(), Some("text/plain"));
//!
//! task.clear();
//! assert!(task.get(Slot::Response, "Content-Type").is_err());
//! ```

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
};

use thiserror::Error;

use crate::http::{HeaderMap, Request, Response};

pub mod serving;

pub use serving::{ServingContext, Shared, TaskContext, TaskId};

/// Type-erased auxiliary bag used to attach collaborator state to a task
/// without the context knowing the collaborators' types.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Create a new empty extensions map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the one it replaced
    pub fn insert<T>(&mut self, value: T) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    /// Get a value from the extensions map
    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Get a mutable reference to a value from the extensions map
    pub fn get_mut<T>(&mut self) -> Option<&mut T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|value| value.downcast_mut::<T>())
    }

    /// Remove a value from the extensions map
    pub fn remove<T>(&mut self) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions").field("len", &self.map.len()).finish()
    }
}

/// One of the two bindings a task can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Request,
    Response,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Request => "request",
            Self::Response => "response",
        })
    }
}

/// Errors raised by the serving context.
///
/// These signal lifecycle defects in the hosting framework, not client errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("no {slot} is bound to the current task")]
    NotBound { slot: Slot },

    #[error("task {0} is already serving")]
    Busy(TaskId),
}

/// Named-field access forwarded through a [`TaskContext`].
///
/// For requests and responses the fields are their headers, so names are
/// case-insensitive.
pub trait Fields {
    fn field(&self, name: &str) -> Option<String>;

    /// Sets a field, returning the previous value.
    fn set_field(&mut self, name: &str, value: String) -> Option<String>;

    /// Removes a field, returning its value.
    fn remove_field(&mut self, name: &str) -> Option<String>;

    fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

impl Fields for HeaderMap {
    fn field(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_owned)
    }

    fn set_field(&mut self, name: &str, value: String) -> Option<String> {
        self.insert(name, value)
    }

    fn remove_field(&mut self, name: &str) -> Option<String> {
        self.remove(name)
    }

    fn has_field(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl Fields for Request {
    fn field(&self, name: &str) -> Option<String> {
        self.headers().field(name)
    }

    fn set_field(&mut self, name: &str, value: String) -> Option<String> {
        self.headers_mut().set_field(name, value)
    }

    fn remove_field(&mut self, name: &str) -> Option<String> {
        self.headers_mut().remove_field(name)
    }

    fn has_field(&self, name: &str) -> bool {
        self.headers().has_field(name)
    }
}

impl Fields for Response {
    fn field(&self, name: &str) -> Option<String> {
        self.headers().field(name)
    }

    fn set_field(&mut self, name: &str, value: String) -> Option<String> {
        self.headers_mut().set_field(name, value)
    }

    fn remove_field(&mut self, name: &str) -> Option<String> {
        self.headers_mut().remove_field(name)
    }

    fn has_field(&self, name: &str) -> bool {
        self.headers().has_field(name)
    }
}
