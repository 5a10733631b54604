/* 📖 # Why a TodoStore trait?

The request handler only needs five operations. Putting them behind a trait
means the handler never knows it is talking to a Vec in memory, and its tests
can hand it a double (for example one that fails every call) to check the
status mapping in isolation.
*/

use std::sync::Arc;

use parking_lot::RwLock;

use todo_base::TodoResult;

use crate::todo::Todo;

/// Storage for todo items keyed by their id.
///
/// Implementations must keep ids unique and return items by value: callers
/// get clones and cannot reach into the stored collection.
pub trait TodoStore: Send + Sync + 'static {
    /// All items, in insertion order.
    fn list_all(&self) -> TodoResult<Vec<Todo>>;

    /// The item with the given id.
    ///
    /// Fails with `ErrorKind::NotFound` when no item has that id.
    fn get_by_id(&self, id: &str) -> TodoResult<Todo>;

    /// Append a new item and return the stored value.
    ///
    /// Fails with `ErrorKind::Validation` if the id is empty and with
    /// `ErrorKind::Conflict` if the id is taken. Nothing changes on failure.
    fn create(&mut self, todo: Todo) -> TodoResult<Todo>;

    /// Replace every field of the item with the same id, keeping its position.
    ///
    /// Fails with `ErrorKind::Validation` if the id is empty and with
    /// `ErrorKind::NotFound` if no item has that id.
    fn update(&mut self, todo: Todo) -> TodoResult<Todo>;

    /// Remove the item with the given id, if any.
    ///
    /// Deleting an unknown id is not an error; it returns `Ok(None)`.
    fn delete(&mut self, id: &str) -> TodoResult<Option<Todo>>;

    /// Number of stored items.
    fn len(&self) -> TodoResult<usize>;

    fn is_empty(&self) -> TodoResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// A thread-safe handle to a todo store.
///
/// Cloning is cheap (Arc). Each operation holds the lock for its whole
/// duration, so concurrent requests never observe a half-applied change.
#[derive(Clone)]
pub struct StoreHandle(Arc<RwLock<dyn TodoStore>>);

impl StoreHandle {
    pub fn new<S: TodoStore>(store: S) -> Self {
        Self(Arc::new(RwLock::new(store)))
    }

    /// See [`TodoStore::list_all`].
    pub fn list_all(&self) -> TodoResult<Vec<Todo>> {
        self.0.read().list_all()
    }

    /// See [`TodoStore::get_by_id`].
    pub fn get_by_id(&self, id: &str) -> TodoResult<Todo> {
        self.0.read().get_by_id(id)
    }

    /// See [`TodoStore::create`].
    pub fn create(&self, todo: Todo) -> TodoResult<Todo> {
        self.0.write().create(todo)
    }

    /// See [`TodoStore::update`].
    pub fn update(&self, todo: Todo) -> TodoResult<Todo> {
        self.0.write().update(todo)
    }

    /// Update the item, creating it when the id is unknown.
    ///
    /// Both steps run under one write lock, so no other request can create
    /// the same id in between. Returns the stored item and whether it was
    /// newly created.
    pub fn update_or_create(&self, todo: Todo) -> TodoResult<(Todo, bool)> {
        let mut store = self.0.write();
        match store.update(todo.clone()) {
            Ok(updated) => Ok((updated, false)),
            Err(e) if matches!(e.kind(), todo_base::ErrorKind::NotFound { .. }) => {
                store.create(todo).map(|created| (created, true))
            }
            Err(e) => Err(e),
        }
    }

    /// See [`TodoStore::delete`].
    pub fn delete(&self, id: &str) -> TodoResult<Option<Todo>> {
        self.0.write().delete(id)
    }

    pub fn len(&self) -> TodoResult<usize> {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> TodoResult<bool> {
        self.0.read().is_empty()
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle").finish_non_exhaustive()
    }
}
