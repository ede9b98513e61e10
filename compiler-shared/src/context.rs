//! State shared by the hierarchy pass and the type checker of one analysis.
use diagnostics::Diagnostics;
use termcolor::WriteColor;

pub struct Context {
    pub diagnostics: Diagnostics,
}

impl Context {
    pub fn new(writer: Box<dyn WriteColor>) -> Self {
        Self {
            diagnostics: Diagnostics::new(writer),
        }
    }

    /// A context whose messages are only kept in memory. Inspect them via
    /// `diagnostics.messages()`.
    pub fn dummy() -> Self {
        Self::new(Box::new(dummy_writer()))
    }
}

// dummy_writer returns a WriteColor meant for use in tests.
pub fn dummy_writer() -> impl WriteColor {
    termcolor::Buffer::no_color()
}
