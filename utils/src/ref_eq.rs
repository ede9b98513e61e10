//! Identity keys for tree nodes.
//!
//! Two syntactically equal expressions at different places in the program
//! are different nodes, so maps that annotate the tree must not use the
//! derived structural equality. `RefEq` compares and hashes by address.
use std::{fmt, hash::Hasher};

pub struct RefEq<'a, T>(pub &'a T);

impl<'a, T> Clone for RefEq<'a, T> {
    fn clone(&self) -> Self {
        RefEq(self.0)
    }
}

impl<'a, T> Copy for RefEq<'a, T> {}

impl<'a, T> fmt::Debug for RefEq<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefEq({:p})", self.0)
    }
}

impl<'a, T> std::hash::Hash for RefEq<'a, T> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        (self.0 as *const T).hash(state)
    }
}

impl<'a, 'b, T> PartialEq<RefEq<'b, T>> for RefEq<'a, T> {
    fn eq(&self, other: &RefEq<'b, T>) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl<'a, T> Eq for RefEq<'a, T> {}
