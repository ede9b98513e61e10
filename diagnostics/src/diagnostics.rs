#![warn(
    clippy::print_stdout,
    clippy::unimplemented,
    clippy::doc_markdown,
    clippy::items_after_statements,
    clippy::match_same_arms,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::use_self,
    clippy::use_debug
)]

//! The diagnostics object controls the output of warnings and errors generated
//! by the compiler during semantic analysis.
//! It also tracks the number of warnings and errors generated for flow control.
//!
//! This implementation is NOT thread-safe.

use failure::AsFail;
use std::{
    cell::{Ref, RefCell},
    collections::HashMap,
    fmt,
};
use termcolor::{Color, ColorSpec, WriteColor};

/// Instead of writing errors and warnings generated in the different
/// compiler stages directly to stderr, they are collected in this object.
///
/// This has several advantages:
/// - the output level can be adapted by users.
/// - we have a single source responsible for formatting compiler messages.
/// - later phases (and tests) can inspect what was reported.
pub struct Diagnostics {
    message_count: RefCell<HashMap<MessageLevel, usize>>,
    messages: RefCell<Vec<Diagnostic>>,
    writer: RefCell<Box<dyn WriteColor>>,
}

/// Position of a diagnostic in the analysed program: the file a class was
/// declared in and a line number within that file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub filename: String,
    pub line: usize,
}

impl Location {
    pub fn new(filename: impl Into<String>, line: usize) -> Self {
        Self {
            filename: filename.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.line)
    }
}

#[derive(Debug)]
pub enum MaybeLocated<T> {
    WithoutLocation(T),
    WithLocation(Location, T),
}

impl<T> MaybeLocated<T> {
    pub fn location(&self) -> Option<&Location> {
        match self {
            MaybeLocated::WithoutLocation(_) => None,
            MaybeLocated::WithLocation(location, _) => Some(location),
        }
    }

    pub fn data(&self) -> &T {
        match self {
            MaybeLocated::WithoutLocation(data) | MaybeLocated::WithLocation(_, data) => data,
        }
    }
}

/// A single reported message, kept after it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: MessageLevel,
    pub location: Option<Location>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{}: ", location)?;
        }
        write!(f, "{}: {}", self.level.name(), self.message)
    }
}

impl Diagnostics {
    pub fn new(writer: Box<dyn WriteColor>) -> Self {
        Self {
            writer: RefCell::new(writer),
            messages: RefCell::new(Vec::new()),
            message_count: RefCell::new(HashMap::new()),
        }
    }

    /// True when an error message was emitted, false
    /// if only warnings were emitted.
    pub fn errored(&self) -> bool {
        self.count(MessageLevel::Error) > 0
    }

    pub fn count(&self, level: MessageLevel) -> usize {
        self.message_count
            .borrow()
            .get(&level)
            .cloned()
            .unwrap_or(0)
    }

    /// All messages emitted so far, in emission order.
    pub fn messages(&self) -> Ref<'_, [Diagnostic]> {
        Ref::map(self.messages.borrow(), |messages| messages.as_slice())
    }

    pub fn write_statistics(&self) {
        let mut writer = self.writer.borrow_mut();
        let mut output = ColorOutput::new(&mut **writer);

        output.set_bold(true);

        if self.errored() {
            output.set_color(MessageLevel::Error.color());
            writeln!(
                output.writer(),
                "Compilation halted due to {}",
                match self.count(MessageLevel::Error) {
                    1 => "a static semantic error".to_string(),
                    n => format!("{} static semantic errors", n),
                }
            )
            .ok();
        } else {
            output.set_color(Some(Color::Green));
            writeln!(
                output.writer(),
                "Semantic analysis finished successfully {}",
                match self.count(MessageLevel::Warning) {
                    0 => "without warnings".to_string(),
                    1 => "with a warning".to_string(),
                    n => format!("with {} warnings", n),
                }
            )
            .ok();
        }
    }

    /// Generate an error or a warning that is printed to the
    /// writer given in the `new` constructor. Most of the time
    /// this will be stderr.
    pub fn emit<K: AsFail>(&self, level: MessageLevel, kind: MaybeLocated<K>) {
        let msg = Diagnostic {
            level,
            location: kind.location().cloned(),
            message: kind.data().as_fail().to_string(),
        };

        {
            let mut writer = self.writer.borrow_mut();
            msg.write_colored(&mut **writer);
        }
        self.messages.borrow_mut().push(msg);
        self.increment_level_count(level);
    }

    pub fn warning<K: AsFail>(&self, kind: K) {
        self.emit(MessageLevel::Warning, MaybeLocated::WithoutLocation(kind))
    }

    pub fn error<K: AsFail>(&self, kind: K) {
        self.emit(MessageLevel::Error, MaybeLocated::WithoutLocation(kind))
    }

    pub fn warning_at<K: AsFail>(&self, location: Location, kind: K) {
        self.emit(MessageLevel::Warning, MaybeLocated::WithLocation(location, kind))
    }

    pub fn error_at<K: AsFail>(&self, location: Location, kind: K) {
        self.emit(MessageLevel::Error, MaybeLocated::WithLocation(location, kind))
    }

    fn increment_level_count(&self, level: MessageLevel) {
        let mut message_count = self.message_count.borrow_mut();
        let counter = message_count.entry(level).or_insert(0);
        *counter += 1;
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MessageLevel {
    Error,
    Warning,
}

impl MessageLevel {
    fn color(self) -> Option<Color> {
        // Don't be confused by the return type. `None` means default color!
        match self {
            MessageLevel::Error => Some(Color::Red),
            MessageLevel::Warning => Some(Color::Yellow),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageLevel::Error => "error",
            MessageLevel::Warning => "warning",
        }
    }
}

impl Diagnostic {
    fn write_colored(&self, writer: &mut dyn WriteColor) {
        let mut output = ColorOutput::new(writer);

        if let Some(location) = &self.location {
            output.set_bold(true);
            write!(output.writer(), "{}: ", location).ok();
        }

        output.set_color(self.level.color());
        output.set_bold(true);
        write!(output.writer(), "{}: ", self.level.name()).ok();

        output.set_color(None);
        output.set_bold(false);
        writeln!(output.writer(), "{}", self.message).ok();
    }
}

/// Calls to functions should pass the raw writer, each function should
/// create its own `ColorOutput` object that is dropped on return. This
/// gurantees correct coloring in nested calls.
struct ColorOutput<'a> {
    writer: &'a mut dyn WriteColor,
    spec: ColorSpec,
}

impl<'a> ColorOutput<'a> {
    fn new(writer: &'a mut dyn WriteColor) -> Self {
        writer.reset().ok();

        Self {
            writer,
            spec: ColorSpec::new(),
        }
    }

    fn set_color(&mut self, color: Option<Color>) {
        // ignore coloring failures using ok()
        self.spec.set_fg(color);
        self.writer.set_color(&self.spec).ok();
    }

    fn set_bold(&mut self, yes: bool) {
        self.spec.set_bold(yes);
        self.writer.set_color(&self.spec).ok();
    }

    fn writer(&mut self) -> &mut dyn WriteColor {
        self.writer
    }
}

/// reset to no color by default. Otherwise code that
/// is not color aware will print everything in the
/// color last used.
impl<'a> Drop for ColorOutput<'a> {
    fn drop(&mut self) {
        self.writer.reset().ok();
    }
}
