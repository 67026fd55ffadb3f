//! Interactive failure pager
//!
//! Shows one failure at a time with a preview of the failing source, and
//! lets the user step through failures, open them in an editor, mark them
//! as fixed or rerun them. The terminal is only in raw mode while a key is
//! being read.

use anyhow::{Context, Result};
use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::queue;
use crossterm::terminal::{self, Clear, ClearType};
use std::io::{self, Write};
use std::process::Command;

use tracing::{debug, warn};

use super::color::{strip, Color, ColorName};
use super::editor;
use super::formatter::{summary, JsonReport};
use crate::models::{Failure, Reporter};
use crate::utils::source;

/// Lines shown on each side of the failing line
const PREVIEW_CONTEXT: usize = 5;

const HELP: &str =
    "j (next) / k (previous) / o (open in editor) / f (mark as fixed) / r (rerun test) / q (quit)";

/// A pager command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Next,
    Previous,
    Open,
    Fix,
    Rerun,
    Quit,
}

impl Action {
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Action::Quit);
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => Some(Action::Next),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::Previous),
            KeyCode::Char('o') => Some(Action::Open),
            KeyCode::Char('f') => Some(Action::Fix),
            KeyCode::Char('r') => Some(Action::Rerun),
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            _ => None,
        }
    }
}

/// Reruns a single failing test
pub trait Rerun {
    fn rerun(&self, failure: &Failure) -> Result<Reporter>;
}

/// Reruns a test in a fresh process, so that a rebuilt binary picks up
/// source edits
pub struct CommandRerunner {
    argv: Vec<String>,
}

impl CommandRerunner {
    /// `argv` is the program and its leading arguments; the current
    /// executable when `None`
    pub fn new(argv: Option<Vec<String>>) -> Result<Self> {
        let argv = match argv {
            Some(argv) if !argv.is_empty() => argv,
            _ => {
                let exe = std::env::current_exe().context("Failed to locate current executable")?;
                vec![exe.display().to_string()]
            }
        };
        Ok(Self { argv })
    }

    fn command(&self, failure: &Failure) -> Command {
        let target = format!("{}::{}", failure.class_name, failure.test_name);
        let mut command = Command::new(&self.argv[0]);
        command.args(&self.argv[1..]).args([
            "--only",
            target.as_str(),
            "--plain",
            "--format",
            "json",
            "--no-color",
        ]);
        command
    }
}

impl Rerun for CommandRerunner {
    fn rerun(&self, failure: &Failure) -> Result<Reporter> {
        debug!("Rerunning {}::{}", failure.class_name, failure.test_name);
        let output = self
            .command(failure)
            .output()
            .with_context(|| format!("Failed to run {}", self.argv[0]))?;

        parse_rerun_output(&output.stdout).with_context(|| {
            format!(
                "Rerun produced no report: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )
        })
    }
}

/// The report is the last JSON object on stdout; anything the test printed
/// comes before it
pub(crate) fn parse_rerun_output(stdout: &[u8]) -> Result<Reporter> {
    let text = String::from_utf8_lossy(stdout);
    let start = text
        .rfind("\n{")
        .map(|index| index + 1)
        .or_else(|| text.starts_with('{').then_some(0))
        .context("no JSON report in output")?;

    let report: JsonReport = serde_json::from_str(text[start..].trim())?;
    Ok(report.reporter)
}

/// What the pager is looking at. Kept free of terminal I/O.
#[derive(Debug)]
pub struct PagerState {
    reporter: Reporter,
    current: usize,
    status: Option<String>,
    color: Color,
}

impl PagerState {
    pub fn new(reporter: Reporter, color: Color) -> Self {
        Self {
            reporter,
            current: 0,
            status: None,
            color,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_failure(&self) -> Option<&Failure> {
        self.reporter.failures().get(self.current)
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn take_status(&mut self) -> Option<String> {
        self.status.take()
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn into_reporter(self) -> Reporter {
        self.reporter
    }

    /// Nothing left to page through
    pub fn is_done(&self) -> bool {
        self.reporter.failures().is_empty()
    }

    pub fn next(&mut self) {
        if self.current + 1 < self.reporter.failures().len() {
            self.current += 1;
        }
    }

    pub fn previous(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    /// Drop the current failure and count its test as passed
    pub fn fix(&mut self) {
        if self.reporter.mark_fixed(self.current).is_some() {
            let last = self.reporter.failures().len().saturating_sub(1);
            self.current = self.current.min(last);
        }
    }

    /// Take in the result of rerunning the current failure
    pub fn apply_rerun(&mut self, rerun: Reporter) {
        match rerun.failures().first() {
            None => {
                self.status = Some(format!(
                    "{}. Press f to remove from list",
                    self.color.paint("Fixed", ColorName::Green)
                ));
            }
            Some(failure) => {
                self.reporter.replace_failure(self.current, failure.clone());
                self.status = Some(self.color.paint("Still failing", ColorName::Red));
            }
        }
    }
}

/// Source lines around a failure: `(line number, text)`, with the message
/// inserted under the failing line (that entry has no number)
pub fn preview(failure: &Failure) -> io::Result<Vec<(Option<u32>, String)>> {
    let lines = source::read_lines(&failure.file)?;
    let index = (failure.line as usize).saturating_sub(1);
    if index >= lines.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} has no line {}", failure.file, failure.line),
        ));
    }

    let failing = &lines[index];
    let indentation = &failing[..failing.len() - failing.trim_start().len()];
    let marker = format!("{indentation}^^^ {}", strip(&failure.message));

    let start = index.saturating_sub(PREVIEW_CONTEXT);
    let end = (index + PREVIEW_CONTEXT + 1).min(lines.len());

    let mut window = Vec::with_capacity(end - start + 1);
    for (offset, line) in lines[start..end].iter().enumerate() {
        let number = start + offset;
        window.push((Some(number as u32 + 1), line.clone()));
        if number == index {
            window.push((None, marker.clone()));
        }
    }
    Ok(window)
}

/// The interactive renderer
pub struct Pager {
    state: PagerState,
    elapsed_secs: f64,
    editor: Option<String>,
    rerunner: Box<dyn Rerun + Send>,
}

impl Pager {
    pub fn new(
        reporter: Reporter,
        elapsed_secs: f64,
        color: Color,
        editor: Option<String>,
        rerunner: Box<dyn Rerun + Send>,
    ) -> Self {
        Self {
            state: PagerState::new(reporter, color),
            elapsed_secs,
            editor,
            rerunner,
        }
    }

    /// Page until the user quits or every failure is fixed; returns the
    /// reporter with the user's fixes applied
    pub fn run(mut self) -> Result<Reporter> {
        let mut stdout = io::stdout();

        loop {
            self.header(&mut stdout)?;

            if self.state.is_done() {
                writeln!(stdout, "All tests passed")?;
                stdout.flush()?;
                break;
            }

            self.file_preview(&mut stdout)?;
            self.footer(&mut stdout)?;

            let Some(action) = read_action()? else {
                continue;
            };
            if !self.handle(action) {
                break;
            }
        }

        Ok(self.state.into_reporter())
    }

    /// Apply one action; false once the user quits
    fn handle(&mut self, action: Action) -> bool {
        match action {
            Action::Next => self.state.next(),
            Action::Previous => self.state.previous(),
            Action::Fix => self.state.fix(),
            Action::Open => self.open_editor(),
            Action::Rerun => self.rerun_failure(),
            Action::Quit => return false,
        }
        true
    }

    fn header(&self, out: &mut impl Write) -> Result<()> {
        let width = terminal::size().map(|(cols, _)| cols).unwrap_or(80);
        let bar = "=".repeat(width as usize);

        queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
        write!(
            out,
            "{bar}\n{}\n{bar}\n",
            summary(self.state.reporter(), self.elapsed_secs, false)
        )?;
        Ok(())
    }

    fn file_preview(&mut self, out: &mut impl Write) -> Result<()> {
        let Some(failure) = self.state.current_failure() else {
            return Ok(());
        };

        match preview(failure) {
            Ok(lines) => {
                for (number, text) in lines {
                    match number {
                        Some(number) => writeln!(out, "{number:>5} | {text}")?,
                        None => writeln!(out, "      | {text}")?,
                    }
                }
            }
            Err(err) => {
                warn!("Failed to preview {}: {}", failure.file, err);
                let status = format!("Cannot preview {}: {err}", failure.file);
                self.state.set_status(status);
            }
        }
        Ok(())
    }

    fn footer(&mut self, out: &mut impl Write) -> Result<()> {
        writeln!(out)?;
        if let Some(status) = self.state.take_status() {
            writeln!(out, "{status}")?;
        }
        if let Some(failure) = self.state.current_failure() {
            writeln!(
                out,
                "[{}/{}] {failure}",
                self.state.current() + 1,
                self.state.reporter().failures().len()
            )?;
        }
        write!(out, "\n{HELP}\n")?;
        out.flush()?;
        Ok(())
    }

    fn open_editor(&mut self) {
        let Some(failure) = self.state.current_failure() else {
            return;
        };

        if let Err(err) = editor::open(self.editor.as_deref(), &failure.file, failure.line) {
            warn!("Failed to open editor: {}", err);
            self.state.set_status(err.to_string());
        }
    }

    fn rerun_failure(&mut self) {
        let Some(failure) = self.state.current_failure().cloned() else {
            return;
        };

        match self.rerunner.rerun(&failure) {
            Ok(reporter) => self.state.apply_rerun(reporter),
            Err(err) => {
                warn!("Rerun of {} failed: {:#}", failure.test_name, err);
                self.state.set_status(format!("Rerun failed: {err:#}"));
            }
        }
    }
}

/// Block for one key press in raw mode
fn read_action() -> Result<Option<Action>> {
    terminal::enable_raw_mode()?;
    let event = loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => break Ok(key),
            Ok(_) => continue,
            Err(err) => break Err(err),
        }
    };
    terminal::disable_raw_mode()?;

    Ok(Action::from_key(event?))
}
