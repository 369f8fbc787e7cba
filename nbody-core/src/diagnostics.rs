//! Diagnostics and error reporting for the simulator
//!
//! Input that can be recovered from (a malformed argument replaced by its
//! default, an ignored extra argument) is reported as a diagnostic instead of
//! failing the run.

/// A single warning for the user
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Format a diagnostic for display on the console
pub fn format_diagnostic(diagnostic: &Diagnostic) -> String {
    format!("warning: {}", diagnostic.message)
}

/// Format a runtime error with context
pub fn format_runtime_error(error: &dyn std::error::Error) -> String {
    let mut msg = format!("Runtime error: {}", error);
    let mut source = error.source();
    while let Some(cause) = source {
        msg.push_str(&format!("\n  caused by: {}", cause));
        source = cause.source();
    }
    msg
}
