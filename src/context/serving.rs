//! The registry behind [`ServingContext`] and its per-task handles.
//!
//! Bindings live in a concurrent map keyed by [`TaskId`]. A task only ever
//! touches its own entry through its [`TaskContext`]; the registry as a whole
//! is read by [`ServingContext::servings`] for timeout monitoring.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::{ContextError, Extensions, Fields, Slot};
use crate::http::{Request, Response};

/// A request or response shared between its task and the timeout monitor.
pub type Shared<T> = Arc<RwLock<T>>;

/// Identity of one request-handling task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Serving<Req, Resp> {
    request: Option<Shared<Req>>,
    response: Option<Shared<Resp>>,
    extensions: Arc<Mutex<Extensions>>,
}

impl<Req, Resp> Serving<Req, Resp> {
    fn empty() -> Self {
        Self {
            request: None,
            response: None,
            extensions: Arc::default(),
        }
    }
}

struct Registry<Req, Resp> {
    servings: DashMap<TaskId, Serving<Req, Resp>>,
    next_id: AtomicU64,
}

/// Process-wide registry of per-task request/response bindings.
///
/// Cloning is cheap and every clone refers to the same registry.
pub struct ServingContext<Req = Request, Resp = Response> {
    inner: Arc<Registry<Req, Resp>>,
}

impl<Req, Resp> Clone for ServingContext<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Req, Resp> Default for ServingContext<Req, Resp> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Registry {
                servings: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }
}

impl<Req, Resp> fmt::Debug for ServingContext<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServingContext")
            .field("tasks", &self.inner.servings.len())
            .finish()
    }
}

impl<Req, Resp> ServingContext<Req, Resp> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh task identity in the Empty state.
    pub fn task(&self) -> TaskContext<Req, Resp> {
        loop {
            let id = TaskId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
            // Skip identities a worker pool attached explicitly.
            if let Ok(task) = self.attach(id) {
                return task;
            }
        }
    }

    /// Registers a caller-chosen identity, e.g. a worker index.
    ///
    /// # Errors
    ///
    /// [`ContextError::Busy`] if a live handle already owns `id`; a new
    /// request must not start on an identity still serving a previous one.
    pub fn attach(&self, id: TaskId) -> Result<TaskContext<Req, Resp>, ContextError> {
        match self.inner.servings.entry(id) {
            Entry::Occupied(_) => Err(ContextError::Busy(id)),
            Entry::Vacant(slot) => {
                slot.insert(Serving::empty());
                Ok(TaskContext {
                    id,
                    registry: Arc::clone(&self.inner),
                })
            }
        }
    }

    /// Number of registered tasks, loaded or not.
    pub fn active_tasks(&self) -> usize {
        self.inner.servings.len()
    }

    /// Snapshot of every loaded `(task, request, response)` triple.
    pub fn servings(&self) -> Vec<(TaskId, Shared<Req>, Shared<Resp>)> {
        self.inner
            .servings
            .iter()
            .filter_map(|entry| {
                let serving = entry.value();
                Some((
                    *entry.key(),
                    Arc::clone(serving.request.as_ref()?),
                    Arc::clone(serving.response.as_ref()?),
                ))
            })
            .collect()
    }
}

impl<Req> ServingContext<Req, Response> {
    /// Runs [`Response::check_timeout`] over every loaded response and
    /// returns how many are timed out.
    pub fn check_timeouts(&self) -> usize {
        // Snapshot first so no registry shard is locked while a response is.
        self.servings()
            .into_iter()
            .filter(|(_, _, response)| response.write().check_timeout())
            .count()
    }
}

/// A task's exclusive handle onto its own bindings.
///
/// Dropping the handle clears the bindings and unregisters the identity, so a
/// task that panics mid-request leaks nothing into the next one.
pub struct TaskContext<Req = Request, Resp = Response> {
    id: TaskId,
    registry: Arc<Registry<Req, Resp>>,
}

impl<Req, Resp> fmt::Debug for TaskContext<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext").field("id", &self.id).finish()
    }
}

impl<Req, Resp> TaskContext<Req, Resp> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Binds a request and response, replacing any previous bindings.
    pub fn load(&self, request: Req, response: Resp) {
        self.load_shared(Arc::new(RwLock::new(request)), Arc::new(RwLock::new(response)));
    }

    /// Binds already-shared request and response handles.
    pub fn load_shared(&self, request: Shared<Req>, response: Shared<Resp>) {
        let mut serving = self.registry.servings.entry(self.id).or_insert_with(Serving::empty);
        serving.request = Some(request);
        serving.response = Some(response);
        debug!(task = %self.id, "serving context loaded");
    }

    /// Releases both bindings and the auxiliary bag.
    pub fn clear(&self) {
        if let Some(mut serving) = self.registry.servings.get_mut(&self.id) {
            *serving = Serving::empty();
        }
        debug!(task = %self.id, "serving context cleared");
    }

    pub fn is_loaded(&self) -> bool {
        self.registry
            .servings
            .get(&self.id)
            .is_some_and(|s| s.request.is_some() && s.response.is_some())
    }

    /// The bound request.
    pub fn request(&self) -> Result<Shared<Req>, ContextError> {
        self.registry
            .servings
            .get(&self.id)
            .and_then(|s| s.request.clone())
            .ok_or(ContextError::NotBound { slot: Slot::Request })
    }

    /// The bound response.
    pub fn response(&self) -> Result<Shared<Resp>, ContextError> {
        self.registry
            .servings
            .get(&self.id)
            .and_then(|s| s.response.clone())
            .ok_or(ContextError::NotBound { slot: Slot::Response })
    }

    /// Both bindings.
    ///
    /// # Errors
    ///
    /// [`ContextError::NotBound`] naming the first missing slot.
    pub fn current(&self) -> Result<(Shared<Req>, Shared<Resp>), ContextError> {
        Ok((self.request()?, self.response()?))
    }

    /// Runs `f` with shared access to the bound request.
    pub fn with_request<R>(&self, f: impl FnOnce(&Req) -> R) -> Result<R, ContextError> {
        let request = self.request()?;
        let guard = request.read();
        Ok(f(&guard))
    }

    /// Runs `f` with exclusive access to the bound request.
    pub fn with_request_mut<R>(&self, f: impl FnOnce(&mut Req) -> R) -> Result<R, ContextError> {
        let request = self.request()?;
        let mut guard = request.write();
        Ok(f(&mut guard))
    }

    /// Runs `f` with shared access to the bound response.
    pub fn with_response<R>(&self, f: impl FnOnce(&Resp) -> R) -> Result<R, ContextError> {
        let response = self.response()?;
        let guard = response.read();
        Ok(f(&guard))
    }

    /// Runs `f` with exclusive access to the bound response.
    pub fn with_response_mut<R>(&self, f: impl FnOnce(&mut Resp) -> R) -> Result<R, ContextError> {
        let response = self.response()?;
        let mut guard = response.write();
        Ok(f(&mut guard))
    }

    /// Runs `f` against this task's auxiliary bag.
    ///
    /// No registry lock is held while `f` runs, so it may call back into the
    /// context. The bag itself stays locked: reaching it again from inside `f`
    /// blocks.
    pub fn with_extensions<R>(&self, f: impl FnOnce(&mut Extensions) -> R) -> R {
        let extensions = self
            .registry
            .servings
            .entry(self.id)
            .or_insert_with(Serving::empty)
            .extensions
            .clone();
        let mut guard = extensions.lock();
        f(&mut guard)
    }

    /// Stores collaborator state for the rest of this task's request.
    pub fn insert_extension<T: Send + Sync + 'static>(&self, value: T) -> Option<T> {
        self.with_extensions(|ext| ext.insert(value))
    }

    pub fn extension<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.with_extensions(|ext| ext.get::<T>().cloned())
    }

    pub fn remove_extension<T: Send + Sync + 'static>(&self) -> Option<T> {
        self.with_extensions(|ext| ext.remove::<T>())
    }
}

impl<Req: Fields, Resp: Fields> TaskContext<Req, Resp> {
    /// Reads a field of the object bound to `slot`.
    pub fn get(&self, slot: Slot, name: &str) -> Result<Option<String>, ContextError> {
        match slot {
            Slot::Request => self.with_request(|r| r.field(name)),
            Slot::Response => self.with_response(|r| r.field(name)),
        }
    }

    /// Writes a field of the object bound to `slot`, returning the old value.
    pub fn set(
        &self,
        slot: Slot,
        name: &str,
        value: impl Into<String>,
    ) -> Result<Option<String>, ContextError> {
        let value = value.into();
        match slot {
            Slot::Request => self.with_request_mut(|r| r.set_field(name, value)),
            Slot::Response => self.with_response_mut(|r| r.set_field(name, value)),
        }
    }

    /// Removes a field of the object bound to `slot`, returning its value.
    pub fn delete(&self, slot: Slot, name: &str) -> Result<Option<String>, ContextError> {
        match slot {
            Slot::Request => self.with_request_mut(|r| r.remove_field(name)),
            Slot::Response => self.with_response_mut(|r| r.remove_field(name)),
        }
    }

    /// Checks whether the object bound to `slot` has a field.
    pub fn contains(&self, slot: Slot, name: &str) -> Result<bool, ContextError> {
        match slot {
            Slot::Request => self.with_request(|r| r.has_field(name)),
            Slot::Response => self.with_response(|r| r.has_field(name)),
        }
    }
}

impl<Req, Resp> Drop for TaskContext<Req, Resp> {
    fn drop(&mut self) {
        self.registry.servings.remove(&self.id);
        debug!(task = %self.id, "serving context released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HeaderMap;

    type Context = ServingContext<HeaderMap, HeaderMap>;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn empty_loaded_empty() {
        let serving = Context::new();
        let task = serving.task();
        assert!(!task.is_loaded());
        assert_eq!(
            task.current().unwrap_err(),
            ContextError::NotBound { slot: Slot::Request }
        );

        task.load(headers(&[("host", "a")]), HeaderMap::new());
        assert!(task.is_loaded());
        let (request, _) = task.current().unwrap();
        assert_eq!(request.read().get("Host"), Some("a"));

        task.clear();
        assert!(!task.is_loaded());
        assert!(task.current().is_err());
    }

    #[test]
    fn load_overwrites_previous_bindings() {
        let serving = Context::new();
        let task = serving.task();
        task.load(headers(&[("x", "1")]), HeaderMap::new());
        task.load(headers(&[("x", "2")]), HeaderMap::new());
        assert_eq!(task.get(Slot::Request, "X").unwrap(), Some("2".into()));
    }

    #[test]
    fn forwarding_accessors() {
        let serving = Context::new();
        let task = serving.task();
        task.load(HeaderMap::new(), HeaderMap::new());

        assert_eq!(task.set(Slot::Response, "content-type", "text/html").unwrap(), None);
        assert!(task.contains(Slot::Response, "CONTENT-TYPE").unwrap());
        assert!(!task.contains(Slot::Request, "content-type").unwrap());
        assert_eq!(
            task.delete(Slot::Response, "Content-Type").unwrap(),
            Some("text/html".into())
        );
        assert_eq!(task.get(Slot::Response, "content-type").unwrap(), None);
    }

    #[test]
    fn accessors_fail_when_empty() {
        let serving = Context::new();
        let task = serving.task();
        assert_eq!(
            task.set(Slot::Response, "a", "b").unwrap_err(),
            ContextError::NotBound { slot: Slot::Response }
        );
        assert!(task.contains(Slot::Request, "a").is_err());
        assert!(task.delete(Slot::Request, "a").is_err());
    }

    #[test]
    fn tasks_do_not_see_each_other() {
        let serving = Context::new();
        let first = serving.task();
        let second = serving.task();
        assert_ne!(first.id(), second.id());

        first.load(headers(&[("who", "first")]), HeaderMap::new());
        assert!(second.current().is_err());
        second.load(headers(&[("who", "second")]), HeaderMap::new());
        assert_eq!(first.get(Slot::Request, "who").unwrap(), Some("first".into()));
        assert_eq!(second.get(Slot::Request, "who").unwrap(), Some("second".into()));
    }

    #[test]
    fn attach_rejects_live_identity() {
        let serving = Context::new();
        let worker = serving.attach(TaskId(42)).unwrap();
        assert_eq!(serving.attach(TaskId(42)).unwrap_err(), ContextError::Busy(TaskId(42)));
        drop(worker);
        assert!(serving.attach(TaskId(42)).is_ok());
    }

    #[test]
    fn task_skips_attached_identities() {
        let serving = Context::new();
        let _worker = serving.attach(TaskId(1)).unwrap();
        let task = serving.task();
        assert_ne!(task.id(), TaskId(1));
    }

    #[test]
    fn servings_enumerate_loaded_pairs_only() {
        let serving = Context::new();
        let loaded = serving.task();
        let _idle = serving.task();
        loaded.load(HeaderMap::new(), headers(&[("status", "ok")]));

        let pairs = serving.servings();
        assert_eq!(serving.active_tasks(), 2);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, loaded.id());
        assert_eq!(pairs[0].2.read().get("Status"), Some("ok"));

        loaded.clear();
        assert!(serving.servings().is_empty());
    }

    #[test]
    fn drop_unregisters_task() {
        let serving = Context::new();
        {
            let task = serving.task();
            task.load(HeaderMap::new(), HeaderMap::new());
            assert_eq!(serving.servings().len(), 1);
        }
        assert_eq!(serving.active_tasks(), 0);
        assert!(serving.servings().is_empty());
    }

    #[test]
    fn extensions_are_cleared_with_bindings() {
        let serving = Context::new();
        let task = serving.task();
        task.insert_extension(String::from("session-1"));
        assert_eq!(task.extension::<String>(), Some("session-1".into()));
        task.clear();
        assert_eq!(task.extension::<String>(), None);
        task.insert_extension(5u8);
        assert_eq!(task.remove_extension::<u8>(), Some(5));
    }

    #[test]
    fn extension_closure_can_reenter_context() {
        let serving = Context::new();
        let monitor = serving.clone();
        let (done, finished) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let task = monitor.task();
            task.load(headers(&[("host", "a")]), HeaderMap::new());
            let seen = task.with_extensions(|ext| {
                ext.insert(1u32);
                (
                    task.is_loaded(),
                    task.get(Slot::Request, "Host").unwrap(),
                    monitor.servings().len(),
                )
            });
            let _ = done.send((seen, task.extension::<u32>()));
        });

        let (seen, stored) = finished
            .recv_timeout(std::time::Duration::from_secs(3))
            .expect("context call from inside the extension closure blocked");
        assert_eq!(seen, (true, Some("a".to_owned()), 1));
        assert_eq!(stored, Some(1));
    }

    #[test]
    fn timeout_check_over_loaded_responses() {
        let serving: ServingContext = ServingContext::new();
        let slow = serving.task();
        let fresh = serving.task();
        let line = crate::http::request::RequestLine::parse("GET / HTTP/1.1").unwrap();
        slow.load(
            Request::new(line.clone()),
            Response::default().timeout(std::time::Duration::ZERO),
        );
        fresh.load(Request::new(line), Response::default());

        std::thread::sleep(std::time::Duration::from_millis(2));
        assert_eq!(serving.check_timeouts(), 1);
        assert!(slow.with_response(Response::is_timed_out).unwrap());
        assert!(!fresh.with_response(Response::is_timed_out).unwrap());
    }
}
