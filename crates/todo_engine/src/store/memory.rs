/* 📖 # Why a Vec and not a HashMap?

Listing must return items in the order they were created, and the expected
collection size is tiny. A Vec gives insertion order for free; lookups are a
linear scan that stops at the first match, which with unique ids is the only
match. Updates overwrite in place so an item keeps its position.
*/

use tracing::debug;

use todo_base::{ResultExt, TodoError, TodoResult};

use crate::store::traits::TodoStore;
use crate::todo::Todo;

/// An in-memory todo store backed by an insertion-ordered Vec.
///
/// Nothing is persisted; the collection lives as long as the store.
///
/// # Example
///
/// ```
/// use todo_engine::{InMemoryStore, Todo, TodoStore};
///
/// let mut store = InMemoryStore::new();
/// store.create(Todo::new("1", "Bake cake", "", false)).unwrap();
///
/// assert_eq!(store.get_by_id("1").unwrap().title, "Bake cake");
/// assert!(store.create(Todo::new("1", "Again", "", false)).is_err());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    todos: Vec<Todo>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self { todos: Vec::new() }
    }

    /// Create a store pre-populated with `todos`, in order.
    ///
    /// Each item goes through [`TodoStore::create`], so an empty or repeated id
    /// fails the whole call.
    pub fn with_todos(todos: impl IntoIterator<Item = Todo>) -> TodoResult<Self> {
        let mut store = Self::new();
        for todo in todos {
            let id = todo.id.clone();
            store
                .create(todo)
                .with_context(|| format!("seeding todo [{}]", id))?;
        }
        Ok(store)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.todos.iter().position(|todo| todo.id == id)
    }
}

impl TodoStore for InMemoryStore {
    fn list_all(&self) -> TodoResult<Vec<Todo>> {
        Ok(self.todos.clone())
    }

    fn get_by_id(&self, id: &str) -> TodoResult<Todo> {
        self.todos
            .iter()
            .find(|todo| todo.id == id)
            .cloned()
            .ok_or_else(|| Box::new(TodoError::not_found(id)))
    }

    fn create(&mut self, todo: Todo) -> TodoResult<Todo> {
        todo.validate()?;
        if self.position(&todo.id).is_some() {
            return Err(Box::new(TodoError::conflict(todo.id)));
        }
        debug!(id = %todo.id, "storing new todo");
        self.todos.push(todo.clone());
        Ok(todo)
    }

    fn update(&mut self, todo: Todo) -> TodoResult<Todo> {
        todo.validate()?;
        let index = self
            .position(&todo.id)
            .ok_or_else(|| Box::new(TodoError::not_found(&todo.id)))?;
        debug!(id = %todo.id, index, "replacing todo");
        self.todos[index] = todo.clone();
        Ok(todo)
    }

    fn delete(&mut self, id: &str) -> TodoResult<Option<Todo>> {
        let removed = self.position(id).map(|index| self.todos.remove(index));
        debug!(id, removed = removed.is_some(), "deleted todo");
        Ok(removed)
    }

    fn len(&self) -> TodoResult<usize> {
        Ok(self.todos.len())
    }
}
