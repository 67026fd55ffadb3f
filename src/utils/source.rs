//! Source file lookup
//!
//! Test files are referenced by the paths `file!()` records, which are
//! relative to the package being built rather than the working directory.

use std::io;
use std::path::{Path, PathBuf};

/// Find `file` on disk, trying the working directory first and then the
/// manifest directory of the package being run.
pub fn resolve(file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }

    if let Some(manifest_dir) = std::env::var_os("CARGO_MANIFEST_DIR") {
        let candidate = Path::new(&manifest_dir).join(path);
        if candidate.exists() {
            return candidate;
        }
    }

    path.to_path_buf()
}

/// Read every line of `file`
pub fn read_lines(file: &str) -> io::Result<Vec<String>> {
    let content = std::fs::read_to_string(resolve(file))?;
    Ok(content.lines().map(str::to_string).collect())
}

/// 1-based line of the `fn name` definition inside an `impl` block for
/// `fixture`, if the file can be read and holds one
pub fn locate_fn(file: &str, fixture: &str, name: &str) -> Option<u32> {
    let lines = read_lines(file).ok()?;
    let needle = format!("fn {name}");

    let found = impl_blocks(&lines, fixture)
        .flat_map(|range| range.map(|index| (index, &lines[index])))
        .find(|(_, line)| {
            line.trim_start()
                .split_once(&needle)
                .map(|(prefix, rest)| {
                    is_fn_prefix(prefix) && rest.trim_start().starts_with(['(', '<'])
                })
                .unwrap_or(false)
        })
        .map(|(index, _)| index as u32 + 1);
    found
}

/// Last path segment of a type name, without generics:
/// `my_crate::tests::Fixture<u8>` is `Fixture`
pub fn short_type_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Line ranges of the `impl` blocks whose header names `fixture`
fn impl_blocks<'a>(
    lines: &'a [String],
    fixture: &'a str,
) -> impl Iterator<Item = std::ops::Range<usize>> + 'a {
    lines
        .iter()
        .enumerate()
        .filter(move |(_, line)| is_impl_header(line, fixture))
        .map(move |(start, _)| start..block_end(lines, start))
}

fn is_impl_header(line: &str, fixture: &str) -> bool {
    let line = line.trim_start();
    if !(line.starts_with("impl ") || line.starts_with("impl<")) {
        return false;
    }
    let header = line.split('{').next().unwrap_or(line);
    header
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| word == fixture)
}

/// Index one past the line that closes the block opened at `start`
fn block_end(lines: &[String], start: usize) -> usize {
    let mut depth = 0usize;
    let mut opened = false;

    for (index, line) in lines.iter().enumerate().skip(start) {
        for c in line.chars() {
            match c {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        if opened && depth == 0 {
            return index + 1;
        }
    }
    lines.len()
}

/// Only visibility and qualifiers may precede `fn`
fn is_fn_prefix(prefix: &str) -> bool {
    prefix.split_whitespace().all(|word| {
        word.starts_with("pub") || matches!(word, "async" | "const" | "unsafe" | "extern")
    })
}
