use serde::{Deserialize, Serialize};

/// Reason reported when an item arrives without an id.
pub const MISSING_ID_MESSAGE: &str = "todo Id cannot be null";

/* 📖 # Why capitalised JSON field names?

Existing clients of the service send and expect `Id`, `Title`, `Desc` and
`Completed`. The Rust fields keep snake_case names and serde renames them on
the wire. Every field defaults to its zero value when absent, so a body like
`{}` still parses and is then rejected by the store for its empty id rather
than by the JSON decoder.
*/

/// A todo item, the only resource the service manages.
///
/// The id is chosen by the client and never generated by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Desc", default)]
    pub desc: String,
    #[serde(rename = "Completed", default)]
    pub completed: bool,
}

impl Todo {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        desc: impl Into<String>,
        completed: bool,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            desc: desc.into(),
            completed,
        }
    }

    /// Checks the single required-field rule: the id must not be empty.
    pub fn validate(&self) -> todo_base::TodoResult<()> {
        if self.id.is_empty() {
            return Err(Box::new(todo_base::TodoError::validation(MISSING_ID_MESSAGE)));
        }
        Ok(())
    }
}
