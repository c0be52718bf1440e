// Copyright (C) 2025 the Fractum authors. This program is free software: you
// can redistribute it and/or modify it under the terms of the GNU General
// Public License as published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Rendering of compile diagnostics for editor and terminal consumption.
//!
//! The structured [`Diagnostic`] records carry positions in the original DSL
//! source; the renderers here turn them into either one-line summaries or
//! annotated source excerpts.

use std::ops::Range;

use ariadne::{CharSet, Config, Label, Report, ReportKind, Source};

use crate::errors::{Diagnostic, DiagnosticKind};

/// Rendering options for compiler diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticRenderOptions {
    /// Render annotated source excerpts instead of one-line summaries.
    pub source_context: bool,
    pub use_color: bool,
}

impl Default for DiagnosticRenderOptions {
    fn default() -> Self {
        Self {
            source_context: false,
            use_color: false,
        }
    }
}

/// Format a batch of diagnostics against the source they were produced from.
pub fn render_diagnostics(
    source: &str,
    diagnostics: &[Diagnostic],
    options: DiagnosticRenderOptions,
) -> String {
    let mut out = String::new();
    for diagnostic in diagnostics {
        if options.source_context {
            out.push_str(&render_report(source, diagnostic, options.use_color));
        } else {
            out.push_str(&diagnostic.to_string());
            out.push('\n');
        }
    }
    out
}

fn label_text(kind: DiagnosticKind) -> &'static str {
    match kind {
        DiagnosticKind::Syntax => "parser stopped here",
        DiagnosticKind::Semantic => "the problem is here",
        DiagnosticKind::Internal => "while compiling this",
    }
}

fn render_report(source: &str, diagnostic: &Diagnostic, use_color: bool) -> String {
    let span = diagnostic.char_index..diagnostic.char_index + diagnostic.length.max(1);
    let report = Report::build(ReportKind::Error, span.clone())
        .with_config(
            Config::default()
                .with_color(use_color)
                .with_char_set(CharSet::Unicode),
        )
        .with_message(diagnostic.message.clone())
        .with_label(Label::new(span).with_message(label_text(diagnostic.kind)))
        .finish();
    report.write_to_string(Source::from(source))
}

/// Extension trait to write reports into strings without intermediate
/// buffers in callers.
trait ReportWrite {
    fn write_to_string<C: ariadne::Cache<()>>(&self, cache: C) -> String;
}

impl ReportWrite for Report<'_, Range<usize>> {
    fn write_to_string<C: ariadne::Cache<()>>(&self, cache: C) -> String {
        let mut buffer = Vec::new();
        self.write(cache, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap_or_else(|_| String::new())
    }
}
