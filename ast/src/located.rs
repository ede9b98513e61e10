use std::{fmt, ops::Deref};

/// A tree node together with the source line it starts on.
#[derive(Debug, Clone)]
pub struct Located<T> {
    pub line: usize,
    pub data: T,
}

impl<T> Eq for Located<T> where T: Eq {}
impl<T> PartialEq for Located<T>
where
    T: PartialEq,
{
    /// This only compares the `data`! I.e. two `Located`s are equal even if
    /// they were found on different lines, as long as the content is the
    /// same.
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<T> Deref for Located<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> fmt::Display for Located<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}", self.data, self.line)
    }
}

impl<T> Located<T> {
    pub fn new(line: usize, data: T) -> Self {
        Located { line, data }
    }

    pub fn map<U, F>(&self, f: F) -> Located<U>
    where
        F: FnOnce(&T) -> U,
    {
        Located {
            line: self.line,
            data: f(&self.data),
        }
    }
}
