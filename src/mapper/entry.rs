//! Name-sorted entry arrays and their copy-on-write primitives.
//!
//! Every table in the mapper (hosts, applications, versions and the three
//! named handler tables) is a `Vec` kept sorted by [`Entry::name`]. Published
//! arrays are never touched again: [`insert`] and [`remove`] return a fresh
//! array that the caller stores with a single atomic swap.

use std::cmp::Ordering;
use std::sync::Arc;

/// Something addressable by name inside a sorted table.
pub trait Entry {
    fn name(&self) -> &str;
}

impl<E: Entry + ?Sized> Entry for Arc<E> {
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Position of `name`: `Ok` when present, `Err` with the insertion point otherwise.
pub fn find<E: Entry>(entries: &[E], name: &str) -> Result<usize, usize> {
    entries.binary_search_by(|e| e.name().cmp(name))
}

pub fn exact_find<'a, E: Entry>(entries: &'a [E], name: &str) -> Option<&'a E> {
    find(entries, name).ok().map(|pos| &entries[pos])
}

/// Case-insensitive lookup; entries must be stored in ASCII lower case.
pub fn exact_find_ignore_case<'a, E: Entry>(entries: &'a [E], name: &str) -> Option<&'a E> {
    entries
        .binary_search_by(|e| compare_ignore_case(e.name(), name))
        .ok()
        .map(|pos| &entries[pos])
}

fn compare_ignore_case(stored: &str, wanted: &str) -> Ordering {
    stored
        .bytes()
        .cmp(wanted.bytes().map(|b| b.to_ascii_lowercase()))
}

/// Copy of `entries` with `entry` spliced in, or `None` if the name is taken.
pub fn insert<E: Entry + Clone>(entries: &[E], entry: E) -> Option<Vec<E>> {
    let pos = find(entries, entry.name()).err()?;
    let mut updated = Vec::with_capacity(entries.len() + 1);
    updated.extend_from_slice(&entries[..pos]);
    updated.push(entry);
    updated.extend_from_slice(&entries[pos..]);
    Some(updated)
}

/// Copy of `entries` without `name`, or `None` if it is absent.
pub fn remove<E: Entry + Clone>(entries: &[E], name: &str) -> Option<Vec<E>> {
    let pos = find(entries, name).ok()?;
    let mut updated = Vec::with_capacity(entries.len() - 1);
    updated.extend_from_slice(&entries[..pos]);
    updated.extend_from_slice(&entries[pos + 1..]);
    Some(updated)
}

/// Copy of `entries` with `entry` inserted, replacing any entry of the same name.
pub fn upsert<E: Entry + Clone>(entries: &[E], entry: E) -> Vec<E> {
    match find(entries, entry.name()) {
        Ok(pos) => {
            let mut updated = entries.to_vec();
            updated[pos] = entry;
            updated
        }
        Err(pos) => {
            let mut updated = Vec::with_capacity(entries.len() + 1);
            updated.extend_from_slice(&entries[..pos]);
            updated.push(entry);
            updated.extend_from_slice(&entries[pos..]);
            updated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Named(&'static str, u32);

    impl Entry for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn names(entries: &[Named]) -> Vec<&str> {
        entries.iter().map(|e| e.0).collect()
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut table = Vec::new();
        for name in ["/m", "/a", "/z", "/c"] {
            table = insert(&table, Named(name, 0)).unwrap();
        }
        assert_eq!(names(&table), vec!["/a", "/c", "/m", "/z"]);
    }

    #[test]
    fn test_insert_rejects_duplicate() {
        let table = vec![Named("/a", 1)];
        assert!(insert(&table, Named("/a", 2)).is_none());
        assert_eq!(table[0].1, 1);
    }

    #[test]
    fn test_insert_then_remove_leaves_siblings() {
        let table = vec![Named("/a", 1), Named("/c", 3)];
        let added = insert(&table, Named("/b", 2)).unwrap();
        assert_eq!(exact_find(&added, "/b"), Some(&Named("/b", 2)));

        let removed = remove(&added, "/b").unwrap();
        assert!(exact_find(&removed, "/b").is_none());
        assert_eq!(removed, table);
    }

    #[test]
    fn test_remove_missing() {
        let table = vec![Named("/a", 1)];
        assert!(remove(&table, "/b").is_none());
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let table = vec![Named("/a", 1), Named("/b", 2)];
        let updated = upsert(&table, Named("/b", 20));
        assert_eq!(updated, vec![Named("/a", 1), Named("/b", 20)]);
        let grown = upsert(&updated, Named("/0", 0));
        assert_eq!(names(&grown), vec!["/0", "/a", "/b"]);
    }

    #[test]
    fn test_find_ignore_case() {
        let table = vec![Named("a.example.com", 1), Named("b.example.com", 2)];
        assert_eq!(exact_find_ignore_case(&table, "B.Example.COM").map(|e| e.1), Some(2));
        assert!(exact_find_ignore_case(&table, "c.example.com").is_none());
    }
}
