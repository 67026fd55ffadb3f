//! Test class registry
//!
//! Classes are added with an explicit registration call. The registry also
//! remembers which source lines were selected for each class, so that
//! `tests/smoke.rs:42` only queues the method defined on line 42.

use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::{OnceLock, PoisonError, RwLock};

use tracing::debug;

use super::TestClass;
use crate::error::LoupeError;

/// A `path[:line]` specifier from the command line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    pub path: PathBuf,
    pub line: Option<u32>,
}

impl Selector {
    /// Whether `file` (as recorded by `file!()`) names the same file
    pub fn matches(&self, file: &str) -> bool {
        let wanted = normalize(&self.path);
        let actual = normalize(Path::new(file));
        actual.ends_with(&wanted) || wanted.ends_with(&actual)
    }
}

impl FromStr for Selector {
    type Err = LoupeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(LoupeError::InvalidSelector(s.to_string()));
        }

        match s.rsplit_once(':') {
            Some((path, "")) => Err(LoupeError::InvalidSelector(format!("{path}:"))),
            Some((path, line)) if line.chars().all(|c| c.is_ascii_digit()) => {
                let line = line
                    .parse()
                    .map_err(|_| LoupeError::InvalidSelector(s.to_string()))?;
                if path.is_empty() {
                    return Err(LoupeError::InvalidSelector(s.to_string()));
                }
                Ok(Selector {
                    path: PathBuf::from(path),
                    line: Some(line),
                })
            }
            _ => Ok(Selector {
                path: PathBuf::from(s),
                line: None,
            }),
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

#[derive(Clone, Debug)]
struct Entry {
    class: TestClass,
    line_numbers: Vec<u32>,
    selected: bool,
}

/// Registered classes and their line filters
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class; a class registered again under the same name replaces
    /// the earlier declaration
    pub fn register(&mut self, class: TestClass) {
        debug!("Registering test class {}", class.name());
        let entry = Entry {
            class,
            line_numbers: Vec::new(),
            selected: true,
        };

        match self
            .entries
            .iter_mut()
            .find(|e| e.class.name() == entry.class.name())
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Restrict `class` to methods defined on `line`
    pub fn add_line_number(&mut self, class: &str, line: u32) -> Result<(), LoupeError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.class.name() == class)
            .ok_or_else(|| LoupeError::UnknownClass(class.to_string()))?;
        entry.line_numbers.push(line);
        Ok(())
    }

    /// Apply command-line selectors.
    ///
    /// With no selectors every class stays selected. Otherwise only classes
    /// declared in a named file run, and a selector with a line adds that
    /// line filter to each class of its file.
    pub fn select(&mut self, selectors: &[Selector]) {
        if selectors.is_empty() {
            return;
        }

        for entry in &mut self.entries {
            let matching: Vec<_> = selectors
                .iter()
                .filter(|s| s.matches(entry.class.file()))
                .collect();

            entry.selected = !matching.is_empty();
            entry
                .line_numbers
                .extend(matching.iter().filter_map(|s| s.line));
        }
    }

    pub fn class(&self, name: &str) -> Option<&TestClass> {
        self.entries
            .iter()
            .map(|e| &e.class)
            .find(|class| class.name() == name)
    }

    /// Selected classes with their line filters
    pub fn classes(&self) -> impl Iterator<Item = (&TestClass, &[u32])> {
        self.entries
            .iter()
            .filter(|e| e.selected)
            .map(|e| (&e.class, e.line_numbers.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn global() -> &'static RwLock<Registry> {
    static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(Registry::new()))
}

/// Add `class` to the process-wide registry
pub fn register(class: TestClass) {
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(class);
}

/// Copy of the process-wide registry, taken once registration is over
pub fn snapshot() -> Registry {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
