// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Rewindable line stream feeding the two-pass engine.

/// Source text split into lines. Each line keeps its terminator so the
/// statement grammar sees the end-of-line margin as a whitespace token.
/// Calling [`SourceLines::iter`] again rewinds the stream to the start,
/// which is how the engine runs its second pass.
#[derive(Debug, Clone)]
pub struct SourceLines {
    lines: Vec<String>,
}

impl SourceLines {
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split_inclusive('\n').map(str::to_string).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}
