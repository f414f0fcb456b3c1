// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Symbol table for labels.

use std::collections::HashMap;
use std::io::{self, Write};

/// Label-to-address map. Names are stored upper-cased and looked up
/// case-insensitively. Redefining a label overwrites the earlier address;
/// the last binding made during pass 1 wins and no duplicate diagnostic is
/// raised. Entries are written during pass 1 and read during pass 2.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<String, i64>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, addr: i64) {
        self.entries.insert(name.to_ascii_uppercase(), addr);
    }

    pub fn lookup(&self, name: &str) -> Option<i64> {
        self.entries.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dump<W: Write>(&self, mut out: W) -> io::Result<()> {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        for name in names {
            let val = self.entries[name];
            writeln!(out, "{:<16}: {:04x} ({})", name, val, val)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SymbolTable;

    #[test]
    fn define_and_lookup_are_case_insensitive() {
        let mut table = SymbolTable::new();
        table.define("Start", 0x10);
        assert_eq!(table.lookup("start"), Some(0x10));
        assert_eq!(table.lookup("START"), Some(0x10));
        assert_eq!(table.lookup("other"), None);
    }

    #[test]
    fn redefinition_last_write_wins() {
        let mut table = SymbolTable::new();
        table.define("LOOP", 1);
        table.define("loop", 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("LOOP"), Some(2));
    }

    #[test]
    fn dump_lists_sorted_entries() {
        let mut table = SymbolTable::new();
        table.define("ZETA", 0x1234);
        table.define("ALPHA", 3);
        let mut out = Vec::new();
        table.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "ALPHA           : 0003 (3)\nZETA            : 1234 (4660)\n"
        );
    }
}
