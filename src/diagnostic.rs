use crate::span::Span;

/// A transpiler diagnostic (error or warning).
///
/// When the kernel was built from source text the diagnostic also carries
/// the offending snippet and its 1-based line / column; units constructed
/// from a pre-built AST produce message-only diagnostics.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
    /// The offending source slice, for textual units.
    pub snippet: Option<String>,
    /// 1-based line of the offending node.
    pub line: Option<u32>,
    /// Bytes between the last preceding newline and the node start.
    pub column: Option<u32>,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: String) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span: None,
            snippet: None,
            line: None,
            column: None,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span: None,
            snippet: None,
            line: None,
            column: None,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach the source location payload: snippet, line, and column
    /// derived from the node's start offset.
    pub fn located(mut self, source: &str, span: Span) -> Self {
        let start = (span.start as usize).min(source.len());
        let end = (span.end as usize).min(source.len()).max(start);
        let (line, col) = crate::span::line_col(source, span.start);
        self.span = Some(span);
        self.snippet = source.get(start..end).map(str::to_string);
        self.line = Some(line);
        self.column = Some(col);
        self
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Render the diagnostic to stderr using ariadne. Falls back to a
    /// plain line when the diagnostic has no span (pre-built-AST units).
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let span = match self.span {
            Some(span) => span,
            None => {
                eprintln!("error: {}", self.message);
                return;
            }
        };

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let mut report = Report::build(kind, filename, span.start as usize)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, span.start as usize..span.end as usize))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report
            .finish()
            .eprint((filename, Source::from(source)))
            .ok();
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}
