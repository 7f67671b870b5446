// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Interned identifiers.
//!
//! Every name in a module (sorts excepted) is an [`Iden`]: a small copyable
//! handle into a process-wide table of strings. Two identifiers are equal
//! exactly when their strings are equal, and they are ordered by their
//! strings so that anything sorted by identifier is deterministic across runs.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Separator between the base of a generated name and its counter.
const FRESH_SEPARATOR: char = '~';

#[derive(Default)]
struct Interner {
    names: Vec<&'static str>,
    ids: HashMap<&'static str, u32>,
    next_fresh: usize,
}

impl Interner {
    fn intern(&mut self, name: &str) -> Iden {
        if let Some(&id) = self.ids.get(name) {
            return Iden {
                id,
                name: self.names[id as usize],
            };
        }
        // Interned strings live as long as the process.
        let name: &'static str = Box::leak(name.to_string().into_boxed_str());
        let id = self.names.len() as u32;
        self.names.push(name);
        self.ids.insert(name, id);
        Iden { id, name }
    }
}

lazy_static! {
    static ref INTERNER: Mutex<Interner> = Mutex::new(Interner::default());
}

// The table is only ever appended to, so it stays consistent even if a
// thread panicked while holding the lock.
fn interner() -> MutexGuard<'static, Interner> {
    INTERNER.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An interned identifier.
///
/// The handle carries its string, so reading or comparing identifiers never
/// touches the table.
#[derive(Copy, Clone)]
pub struct Iden {
    id: u32,
    name: &'static str,
}

impl Iden {
    /// Intern `name`, returning the same identifier for equal strings.
    pub fn new(name: &str) -> Self {
        interner().intern(name)
    }

    /// Create an identifier that has never been handed out before, derived
    /// from `base`.
    ///
    /// Any counter suffix already on `base` is dropped first, so renaming a
    /// generated name again does not grow it.
    pub fn fresh(base: &str) -> Self {
        let base = base.split(FRESH_SEPARATOR).next().unwrap_or(base);
        let mut interner = interner();
        loop {
            let n = interner.next_fresh;
            interner.next_fresh += 1;
            let name = format!("{base}{FRESH_SEPARATOR}{n}");
            if !interner.ids.contains_key(name.as_str()) {
                return interner.intern(&name);
            }
        }
    }

    /// The string this identifier stands for.
    pub fn as_str(self) -> &'static str {
        self.name
    }
}

impl From<&str> for Iden {
    fn from(name: &str) -> Self {
        Iden::new(name)
    }
}

impl PartialEq for Iden {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Iden {}

impl Hash for Iden {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Iden {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Iden {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.id == other.id {
            return Ordering::Equal;
        }
        self.name.cmp(other.name)
    }
}

impl fmt::Display for Iden {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Iden {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl Serialize for Iden {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Iden {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Iden::new(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning() {
        let a = Iden::new("leader");
        let b = Iden::new("leader");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "leader");
        assert_ne!(a, Iden::new("pending"));
    }

    #[test]
    fn test_ordered_by_name() {
        // interned in reverse order on purpose
        let z = Iden::new("zzz_order");
        let a = Iden::new("aaa_order");
        assert!(a < z);
        assert_eq!(a.cmp(&Iden::new("aaa_order")), Ordering::Equal);
        let mut names = vec![z, a, Iden::new("mmm_order")];
        names.sort();
        let names: Vec<_> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["aaa_order", "mmm_order", "zzz_order"]);
    }

    #[test]
    fn test_interning_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| Iden::new("shared_across_threads")))
            .collect();
        let idens: Vec<Iden> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(idens.iter().all(|i| *i == idens[0]));
        assert_eq!(idens[0].as_str(), "shared_across_threads");
    }

    #[test]
    fn test_interning_survives_poisoned_table() {
        let _ = std::thread::spawn(|| {
            let _guard = INTERNER.lock();
            panic!("panic while holding the interner");
        })
        .join();
        assert_eq!(Iden::new("after_poison").as_str(), "after_poison");
        assert_ne!(Iden::fresh("after_poison"), Iden::new("after_poison"));
    }

    #[test]
    fn test_fresh_is_unique() {
        let x1 = Iden::fresh("x");
        let x2 = Iden::fresh("x");
        assert_ne!(x1, x2);
        assert!(x1.as_str().starts_with("x~"));
        let again = Iden::fresh(x1.as_str());
        assert_eq!(again.as_str().matches('~').count(), 1);
    }
}
