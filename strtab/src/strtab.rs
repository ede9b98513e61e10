#![warn(
    clippy::print_stdout,
    clippy::unimplemented,
    clippy::doc_markdown,
    clippy::items_after_statements,
    clippy::match_same_arms,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::use_self,
    clippy::use_debug
)]

//! String table with zero-copy and amortised O(1) insert
//!
//! Identifiers, type names and string constants of the analysed program are
//! interned here once. Two [`Symbol`]s are equal iff they were handed out for
//! the same string, which is decided by pointer comparison.
//!
//! [1]: https://users.rust-lang.org/t/get-ref-to-just-inserted-hashset-element/13021

use std::{
    collections::HashSet,
    fmt,
    hash::{Hash, Hasher},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Unrelated,
    Related { distance: usize },
}

impl Relation {
    pub fn is_related(self) -> bool {
        match self {
            Relation::Unrelated => false,
            Relation::Related { .. } => true,
        }
    }
}

impl std::cmp::Ord for Relation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use self::Relation::*;
        match (self, other) {
            (Unrelated, Unrelated) => std::cmp::Ordering::Equal,
            (Unrelated, _) => std::cmp::Ordering::Greater,
            (_, Unrelated) => std::cmp::Ordering::Less,
            (Related { distance: d1 }, Related { distance: d2 }) => d1.cmp(d2),
        }
    }
}

impl std::cmp::PartialOrd for Relation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

pub trait Relational {
    fn relation(&self, other: &Self) -> Relation;
}

#[derive(Debug, Clone, Copy, Eq, PartialOrd, Ord)]
pub struct Symbol<'f>(&'f str);

impl<'f> Symbol<'f> {
    fn as_raw(&self) -> *const str {
        self.0 as *const str
    }

    pub fn as_str(&self) -> &'f str {
        self.0
    }
}

impl<'f> Relational for Symbol<'f> {
    fn relation(&self, other: &Symbol<'f>) -> Relation {
        let distance = levenshtein::levenshtein(self.0, other.0);
        if distance <= 2 {
            Relation::Related { distance }
        } else {
            Relation::Unrelated
        }
    }
}

/// Returns the candidate closest to `sym` by edit distance, if any of them
/// is related at all. `sym` itself is never suggested.
pub fn most_related<'f, I>(sym: Symbol<'f>, candidates: I) -> Option<Symbol<'f>>
where
    I: IntoIterator<Item = Symbol<'f>>,
{
    candidates
        .into_iter()
        .filter(|candidate| *candidate != sym)
        .map(|candidate| (sym.relation(&candidate), candidate))
        .filter(|(relation, _)| relation.is_related())
        // ties are broken alphabetically to keep diagnostics deterministic
        .min_by(|(r1, c1), (r2, c2)| r1.cmp(r2).then_with(|| c1.cmp(c2)))
        .map(|(_, candidate)| candidate)
}

impl Hash for Symbol<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_raw().hash(state)
    }
}

impl PartialEq for Symbol<'_> {
    fn eq(&self, other: &Symbol<'_>) -> bool {
        self.as_raw() as *const u8 as usize == other.as_raw() as *const u8 as usize
    }
}

impl PartialEq<str> for Symbol<'_> {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl fmt::Display for Symbol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Default)]
pub struct StringTable<'f> {
    entries: HashSet<&'f str>,
}

const STRING_TABLE_SELF_SYMBOL: &str = "self";
const STRING_TABLE_SELF_TYPE_SYMBOL: &str = "SELF_TYPE";

impl<'f> StringTable<'f> {
    pub fn new() -> Self {
        let mut st = StringTable::default();
        st.intern(STRING_TABLE_SELF_SYMBOL);
        st.intern(STRING_TABLE_SELF_TYPE_SYMBOL);
        st
    }

    pub fn intern(&mut self, value: &'f str) -> Symbol<'f> {
        if let Some(existing) = self.entries.get(value) {
            return Symbol(*existing);
        }

        self.entries.insert(value);
        Symbol(value)
    }

    /// Looks up an already interned string without inserting it.
    pub fn lookup(&self, value: &str) -> Option<Symbol<'f>> {
        self.entries.get(value).map(|s| Symbol(*s))
    }

    pub fn self_symbol(&self) -> Symbol<'f> {
        self.well_known(STRING_TABLE_SELF_SYMBOL)
    }

    pub fn self_type_symbol(&self) -> Symbol<'f> {
        self.well_known(STRING_TABLE_SELF_TYPE_SYMBOL)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn well_known(&self, value: &str) -> Symbol<'f> {
        // interned in `new`, and entries are never removed
        self.lookup(value)
            .unwrap_or_else(|| panic!("well-known symbol '{}' missing", value))
    }
}

#[cfg(test)]
mod tests {
    //! Tests ideas are stolen to a not insignificant degree from Reiner

    use super::*;
    use std::collections::HashMap;

    macro_rules! assert_eq_sym {
        ($a:expr, $b:expr) => {
            assert_eq!($a, $b);
            // don't trust that eq impl is based on pointer comparison
            assert_eq!($a.as_raw(), $b.as_raw());
        };
    }

    #[test]
    fn no_duplication() {
        let mut strtab = StringTable::new();
        let init_len = strtab.entries.len();

        let a = strtab.intern("foo");
        let b = strtab.intern("foo");
        let c = strtab.intern("foo");
        assert_eq!(init_len + 1, strtab.entries.len());
        assert_eq_sym!(a, b);
        assert_eq_sym!(a, c);

        let d = strtab.intern("bar");
        let e = strtab.intern("bar");
        let f = strtab.intern("foo");
        assert_eq!(init_len + 2, strtab.entries.len());
        assert_eq_sym!(d, e);
        assert_eq_sym!(a, f);
    }

    #[test]
    fn equal_text_from_different_buffers_is_one_symbol() {
        let first = String::from("Main");
        let second = String::from("Main");
        let mut strtab = StringTable::new();

        let a = strtab.intern(&first);
        let b = strtab.intern(&second);
        assert_eq_sym!(a, b);
    }

    #[test]
    fn can_resize_set() {
        let mut strtab = StringTable::new();
        let init_len = strtab.entries.len();
        strtab.entries.shrink_to_fit();

        let n = 100_000;
        let mut adresses = HashMap::new();

        let src: Vec<_> = (0..n).map(|i| format!("s{}", i)).collect();

        for s in src.iter() {
            let sym = strtab.intern(s).as_raw();
            adresses.insert(s, sym);
        }

        assert_eq!(init_len + n, strtab.entries.len());
        // At this point, the table probably got resized and reallocated, so let's now
        // check if all the symbols are still in the same place

        for i in 0..n {
            let s = format!("s{}", i);
            assert_eq!(
                adresses.remove(&s).unwrap() as *const u8 as usize,
                strtab.lookup(&s).unwrap().as_raw() as *const u8 as usize
            );
        }
    }

    #[test]
    fn can_intern_empty_string() {
        let mut strtab = StringTable::new();

        let pre_len = strtab.entries.len();
        strtab.intern("");
        strtab.intern("");
        strtab.intern("");
        assert_eq!(pre_len + 1, strtab.entries.len());
    }

    #[test]
    fn well_known_symbols_are_preinterned() {
        let mut strtab = StringTable::new();
        assert_eq_sym!(strtab.self_symbol(), strtab.intern("self"));
        assert_eq_sym!(strtab.self_type_symbol(), strtab.intern("SELF_TYPE"));
        assert!(strtab.self_symbol() != strtab.self_type_symbol());
    }

    #[test]
    fn most_related_picks_closest_candidate() {
        let mut strtab = StringTable::new();
        let counter = strtab.intern("counter");
        let candidates = vec![
            strtab.intern("counted"),
            strtab.intern("unrelated"),
            counter,
        ];

        let typo = strtab.intern("countr");
        assert_eq!(Some(counter), most_related(typo, candidates.clone()));

        let far_away = strtab.intern("xyzzy");
        assert_eq!(None, most_related(far_away, candidates));
    }

    #[test]
    fn most_related_never_suggests_itself() {
        let mut strtab = StringTable::new();
        let x = strtab.intern("x");
        assert_eq!(None, most_related(x, vec![x]));
    }
}
