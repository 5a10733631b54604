use relative_path::RelativePathBuf;
use std::path::Path;

/* 📖 # Why a FilePath type instead of PathBuf?

The service only reads files relative to the directory it was started in (the
config file). FilePath wraps RelativePathBuf so an absolute path can never be
handed to a PAL by accident, and MockPal can key its in-memory files by the
same value RealPal resolves against its base directory.
*/

/// Path relative to the PAL's base directory.
///
/// # Examples
///
/// ```
/// use todo_base::FilePath;
///
/// let path = FilePath::from("todo.toml");
/// assert_eq!(path.to_string(), "todo.toml");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePath(RelativePathBuf);

impl FilePath {
    /// Converts to a std Path, still relative.
    pub fn as_path(&self) -> &Path {
        Path::new(self.0.as_str())
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
