use crate::filesystem::FileSystem;
pub use codespan::{ByteIndex, Span};
use codespan_reporting::diagnostic::{
    Diagnostic as CodespanDiagnostic, Label as CodespanLabel, LabelStyle, Severity,
};
pub use codespan_reporting::term::*;
use std::ops::Range;

use crate::filesystem::FileId;

// These diagnostic interfaces implement the same API as the codespan_reporting crate, except
// Label, which does not require a FileId when instantiated. Files are attached late, by
// whichever layer knows which file a template came from.

/// An ordered collection of diagnostics. Fatal errors abort compilation
/// immediately, so in practice this only ever accumulates warnings.
#[derive(Default, Debug)]
pub struct DiagnosticSet {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSet {
    pub fn new() -> DiagnosticSet {
        DiagnosticSet::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }
}

#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub message: String,
    pub labels: Vec<Label>,
    severity: Severity,
}

impl Diagnostic {
    pub fn error() -> Diagnostic {
        Diagnostic {
            message: String::new(),
            labels: vec![],
            severity: Severity::Error,
        }
    }

    pub fn warning() -> Diagnostic {
        Diagnostic {
            message: String::new(),
            labels: vec![],
            severity: Severity::Warning,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_labels(mut self, labels: impl Into<Vec<Label>>) -> Self {
        self.labels = labels.into();
        self
    }

    /// Attach a file to every label that doesn't have one yet.
    pub fn for_file(mut self, file: FileId) -> Self {
        for label in &mut self.labels {
            if label.file.is_none() {
                label.file = Some(file);
            }
        }
        self
    }

    pub fn primary_span(&self) -> Option<Span> {
        self.labels
            .iter()
            .find(|label| label.style == LabelStyle::Primary)
            .map(|label| Span::new(label.range.start as u32, label.range.end as u32))
    }

    pub fn emit_to_terminal(self, files: &FileSystem) {
        use termcolor::{ColorChoice, StandardStream};
        let writer = StandardStream::stderr(ColorChoice::Auto);
        let config = Config::default();
        // Convert to a codespan-reporting diagnostic
        let diagnostic = CodespanDiagnostic::new(self.severity)
            .with_message(self.message)
            .with_labels(
                self.labels
                    .into_iter()
                    .map(|label| {
                        let file = label.file.expect("Must have a file when reporting a label");
                        CodespanLabel::new(label.style, file, label.range)
                            .with_message(label.message)
                    })
                    .collect(),
            );
        emit(&mut writer.lock(), &config, &*files, &diagnostic).expect("Emitting");
    }
}

#[derive(Clone, Debug)]
pub struct Label {
    pub file: Option<FileId>,
    pub style: LabelStyle,
    pub range: Range<usize>,
    pub message: String,
}

impl Label {
    pub fn primary(range: impl Into<Range<usize>>) -> Label {
        Label {
            file: None,
            style: LabelStyle::Primary,
            range: range.into(),
            message: String::new(),
        }
    }

    pub fn secondary(range: impl Into<Range<usize>>) -> Label {
        Label {
            file: None,
            style: LabelStyle::Secondary,
            range: range.into(),
            message: String::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn for_file(mut self, file: FileId) -> Self {
        self.file = Some(file);
        self
    }
}
