use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

use derive_more::Display;
use rand::Rng;
use regex::Regex;

static FILE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^file(?P<number>\d{8})_.*$").unwrap());
static DIR_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^dir(?P<number>\d{8})_.*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EntryKind {
    #[display("file")]
    File,
    #[display("dir")]
    Directory,
}

impl EntryKind {
    // Keeps every generated name at 255 bytes or less.
    pub fn max_suffix_len(&self) -> usize {
        match self {
            EntryKind::File => 242,
            EntryKind::Directory => 243,
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            EntryKind::File => &FILE_NAME_RE,
            EntryKind::Directory => &DIR_NAME_RE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedName {
    pub kind: EntryKind,
    pub number: u32,
}

impl SequencedName {
    pub fn parse(kind: EntryKind, name: &str) -> Option<Self> {
        let captures = kind.pattern().captures(name)?;
        let number = captures.name("number")?.as_str().parse().ok()?;
        Some(Self { kind, number })
    }

    pub fn matches(kind: EntryKind, name: &str) -> bool {
        kind.pattern().is_match(name)
    }

    pub fn render(&self, suffix_len: usize) -> String {
        format!("{}{:08}_{}", self.kind, self.number, "x".repeat(suffix_len))
    }

    pub fn render_random<R: Rng>(&self, rng: &mut R) -> String {
        let suffix_len = rng.gen_range(0..=self.kind.max_suffix_len());
        self.render(suffix_len)
    }
}

/// Largest existing number for `kind` in `dir` plus one, or 1.
pub fn next_sequenced_name(dir: &Path, kind: EntryKind) -> io::Result<SequencedName> {
    let mut highest = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(parsed) = SequencedName::parse(kind, &name.to_string_lossy()) {
            highest = highest.max(parsed.number);
        }
    }
    Ok(SequencedName {
        kind,
        number: highest + 1,
    })
}
