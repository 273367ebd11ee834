//! Alias table breaking self-referential schemas into named definitions.
//!
//! Each fingerprint moves through `absent -> provisional -> resolved`. The entry is
//! reserved before descending into the referenced node, so a cycle that loops back to the
//! same fingerprint finds the reservation and stops there.

use crate::error::Result;
use indexmap::IndexMap;
use log::debug;
use std::cell::RefCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasState {
    /// Reserved, definition is still a placeholder
    Provisional,
    Resolved,
}

#[derive(Debug, Clone)]
pub struct AliasEntry<U> {
    pub name: String,
    pub state: AliasState,
    pub definition: U,
}

/// Fingerprint-keyed alias definitions of one generation pass
#[derive(Debug, Clone)]
pub struct AliasTable<U> {
    prefix: String,
    entries: IndexMap<String, AliasEntry<U>>,
}

impl<U> AliasTable<U> {
    /// Creates a table naming its aliases `<prefix>1`, `<prefix>2`, ...
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: IndexMap::new(),
        }
    }

    pub fn lookup(&self, fingerprint: &str) -> Option<&str> {
        self.entries.get(fingerprint).map(|e| e.name.as_str())
    }

    pub fn state(&self, fingerprint: &str) -> Option<AliasState> {
        self.entries.get(fingerprint).map(|e| e.state)
    }

    /// Inserts a provisional entry and returns its generated name
    pub fn reserve(&mut self, fingerprint: String, placeholder: U) -> String {
        let name = format!("{}{}", self.prefix, self.entries.len() + 1);
        self.entries.insert(
            fingerprint,
            AliasEntry {
                name: name.clone(),
                state: AliasState::Provisional,
                definition: placeholder,
            },
        );
        name
    }

    /// Replaces the placeholder of a reserved entry with its real definition
    pub fn resolve(&mut self, fingerprint: &str, definition: U) {
        if let Some(entry) = self.entries.get_mut(fingerprint) {
            entry.definition = definition;
            entry.state = AliasState::Resolved;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Definitions in reservation order
    pub fn definitions(&self) -> impl Iterator<Item = (&str, &U)> {
        self.entries
            .values()
            .map(|e| (e.name.as_str(), &e.definition))
    }

    pub fn into_definitions(self) -> Vec<(String, U)> {
        self.entries
            .into_values()
            .map(|e| (e.name, e.definition))
            .collect()
    }
}

/// Returns the alias name for `fingerprint`, running `produce` only the first time the
/// fingerprint is seen.
///
/// The table must not be borrowed by the caller: `produce` usually walks further down
/// the tree and comes back here for nested references.
pub fn make_alias<U>(
    table: &RefCell<AliasTable<U>>,
    fingerprint: String,
    placeholder: impl FnOnce() -> U,
    produce: impl FnOnce() -> Result<U>,
) -> Result<String> {
    let existing = table.borrow().lookup(&fingerprint).map(str::to_string);
    if let Some(name) = existing {
        return Ok(name);
    }

    let name = table.borrow_mut().reserve(fingerprint.clone(), placeholder());
    debug!(
        "Reserved alias {} for {}",
        name,
        fingerprint.chars().take(12).collect::<String>()
    );

    let definition = produce()?;
    table.borrow_mut().resolve(&fingerprint, definition);
    debug!("Resolved alias {}", name);
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_then_resolve() {
        let mut table = AliasTable::new("Type");
        let name = table.reserve("abc".into(), "any");
        assert_eq!(name, "Type1");
        assert_eq!(table.state("abc"), Some(AliasState::Provisional));

        table.resolve("abc", "string");
        assert_eq!(table.state("abc"), Some(AliasState::Resolved));
        assert_eq!(table.definitions().collect::<Vec<_>>(), vec![("Type1", &"string")]);
    }

    #[test]
    fn test_make_alias_short_circuits_reentry() {
        let table = RefCell::new(AliasTable::new("Type"));
        let mut inner_name = None;

        let name = make_alias(
            &table,
            "self".into(),
            || "placeholder".to_string(),
            || {
                // the referenced node mentions itself again
                let again = make_alias(
                    &table,
                    "self".into(),
                    || unreachable!(),
                    || unreachable!(),
                )?;
                assert_eq!(table.borrow().state("self"), Some(AliasState::Provisional));
                inner_name = Some(again.clone());
                Ok(format!("{{ children: {}[] }}", again))
            },
        )
        .unwrap();

        assert_eq!(name, "Type1");
        assert_eq!(inner_name.as_deref(), Some("Type1"));
        let table = table.into_inner();
        assert_eq!(table.len(), 1);
        assert_eq!(table.state("self"), Some(AliasState::Resolved));
        assert_eq!(
            table.into_definitions(),
            vec![("Type1".to_string(), "{ children: Type1[] }".to_string())]
        );
    }
}
