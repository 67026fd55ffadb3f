//! Opening a failure in the user's editor

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::LoupeError;
use crate::utils::source;

/// How an editor wants to be told about the line to jump to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorStyle {
    /// `vim +LINE FILE`
    LineFlag,
    /// `code -g FILE:LINE`
    Goto,
    /// `FILE` only
    Plain,
}

impl EditorStyle {
    pub fn for_editor(name: &str) -> Self {
        match name {
            "vim" | "nvim" | "vi" => EditorStyle::LineFlag,
            "code" | "codium" | "code-insiders" => EditorStyle::Goto,
            _ => EditorStyle::Plain,
        }
    }

    /// Terminal editors take over the screen until they exit
    fn is_terminal(self) -> bool {
        self == EditorStyle::LineFlag
    }
}

/// A resolved editor invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub style: EditorStyle,
}

impl EditorCommand {
    /// Resolve `editor` on `PATH` and build the arguments for `file:line`.
    ///
    /// `editor` may carry extra arguments, e.g. `"code --reuse-window"`.
    pub fn new(editor: &str, file: &Path, line: u32) -> Result<Self, LoupeError> {
        let mut words = editor.split_whitespace();
        let name = words.next().ok_or(LoupeError::NoEditor)?;
        let program =
            which::which(name).map_err(|_| LoupeError::EditorNotFound(name.to_string()))?;

        let stem = Path::new(name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(name);
        let style = EditorStyle::for_editor(stem);

        let mut args: Vec<String> = words.map(str::to_string).collect();
        let file = file.display().to_string();
        match style {
            EditorStyle::LineFlag => args.extend([format!("+{line}"), file]),
            EditorStyle::Goto => args.extend(["-g".to_string(), format!("{file}:{line}")]),
            EditorStyle::Plain => args.push(file),
        }

        Ok(Self {
            program,
            args,
            style,
        })
    }

    /// Launch the editor. Terminal editors are waited for, others detach.
    pub fn launch(&self) -> Result<(), LoupeError> {
        debug!("Launching editor: {} {:?}", self.program.display(), self.args);
        let mut command = Command::new(&self.program);
        command.args(&self.args);

        if self.style.is_terminal() {
            command.status()?;
        } else {
            command.spawn()?;
        }
        Ok(())
    }
}

/// Open `file` at `line` in `editor`
pub fn open(editor: Option<&str>, file: &str, line: u32) -> Result<(), LoupeError> {
    let editor = editor.ok_or(LoupeError::NoEditor)?;
    EditorCommand::new(editor, &source::resolve(file), line)?.launch()
}
