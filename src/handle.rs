use std::fmt;

use ahash::{HashMap, HashMapExt};

/// An interned string identifier.
///
/// `Handle::ABSENT` stands in for "no value" wherever the source metadata omits
/// a name, package or position — callers never need to reach for `Option<Handle>`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(i64);

impl Handle {
    /// The handle returned for the empty string, and for any out-of-range lookup.
    pub const ABSENT: Handle = Handle(-1);

    fn from_index(index: usize) -> Self {
        Handle(index as i64)
    }

    fn as_index(self) -> Option<usize> {
        if self.0 < 0 { None } else { Some(self.0 as usize) }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonicalizes strings to small, cheap-to-compare [`Handle`]s.
///
/// Mirrors the teacher's `Interner<T>`: an arena holding the owned strings plus
/// a reverse map from string to id, so that interning is idempotent and lookups
/// in both directions are O(1).
#[derive(Debug, Default)]
pub struct StringInterner {
    arena: la_arena::Arena<String>,
    string2id: HashMap<String, la_arena::Idx<String>>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self {
            arena: la_arena::Arena::new(),
            string2id: HashMap::new(),
        }
    }

    /// Intern `s`, returning its handle. The empty string always yields [`Handle::ABSENT`].
    pub fn intern(&mut self, s: &str) -> Handle {
        if s.is_empty() {
            return Handle::ABSENT;
        }
        if let Some(idx) = self.string2id.get(s) {
            return Handle::from_index(u32::from(idx.into_raw()) as usize);
        }
        let idx = self.arena.alloc(s.to_owned());
        self.string2id.insert(s.to_owned(), idx);
        Handle::from_index(u32::from(idx.into_raw()) as usize)
    }

    /// Resolve a handle back to its string. Returns `""` for [`Handle::ABSENT`] or
    /// any handle that doesn't belong to this interner.
    pub fn lookup(&self, handle: Handle) -> &str {
        let Some(index) = handle.as_index() else {
            return "";
        };
        if index >= self.arena.len() {
            return "";
        }
        let idx = la_arena::Idx::from_raw(la_arena::RawIdx::from(index as u32));
        self.arena[idx].as_str()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_absent() {
        let mut interner = StringInterner::new();
        assert_eq!(interner.intern(""), Handle::ABSENT);
        assert_eq!(interner.lookup(Handle::ABSENT), "");
    }

    #[test]
    fn interning_is_idempotent() {
        let mut interner = StringInterner::new();
        let a = interner.intern("pkg.Foo");
        let b = interner.intern("pkg.Foo");
        assert_eq!(a, b);
        assert_eq!(interner.lookup(a), "pkg.Foo");
    }

    #[test]
    fn distinct_strings_get_distinct_handles() {
        let mut interner = StringInterner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        assert_ne!(a, b);
    }

    #[test]
    fn out_of_range_lookup_is_empty() {
        let interner = StringInterner::new();
        assert_eq!(interner.lookup(Handle(1234)), "");
    }
}
