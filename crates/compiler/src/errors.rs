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

use crate::ast::Position;
use thiserror::Error;

/// Where in the source a compile error was detected.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct CompileContext {
    pub position: Position,
}

impl CompileContext {
    pub fn new(position: Position) -> Self {
        Self { position }
    }
}

/// Errors produced by the compilation pipeline.
///
/// `Parse` variants are syntax errors; everything except `Internal` below it
/// is a semantic error; `Internal` covers generated-source rejection by the
/// host toolchain and other defects that well-typed programs should never
/// trigger.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("failure to parse program @ {}/{}: {message}", context.position.line, context.position.column)]
    Parse {
        context: CompileContext,
        message: String,
    },
    #[error("variable `{1}` used before assignment")]
    UndeclaredVariable(CompileContext, String),
    #[error("cannot assign a complex value to real variable `{1}`")]
    ComplexIntoReal(CompileContext, String),
    #[error("cannot assign to constant `{1}`")]
    AssignToConst(CompileContext, String),
    #[error("unknown function `{1}`")]
    UnknownFunction(CompileContext, String),
    #[error("function `{1}` takes {2} argument(s), {3} given")]
    BadArity(CompileContext, String, usize, usize),
    #[error("path operator `{1}` takes {2} point(s), {3} given")]
    BadPathArity(CompileContext, String, usize, usize),
    #[error("type mismatch: {1}")]
    TypeMismatch(CompileContext, String),
    #[error("unknown trap `{1}`")]
    UnknownTrap(CompileContext, String),
    #[error("unknown palette `{1}`")]
    UnknownPalette(CompileContext, String),
    #[error("duplicate definition of `{1}`")]
    Duplicate(CompileContext, String),
    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl CompileError {
    pub fn context(&self) -> Option<&CompileContext> {
        match self {
            CompileError::Parse { context, .. } => Some(context),
            CompileError::UndeclaredVariable(c, _)
            | CompileError::ComplexIntoReal(c, _)
            | CompileError::AssignToConst(c, _)
            | CompileError::UnknownFunction(c, _)
            | CompileError::BadArity(c, _, _, _)
            | CompileError::BadPathArity(c, _, _, _)
            | CompileError::TypeMismatch(c, _)
            | CompileError::UnknownTrap(c, _)
            | CompileError::UnknownPalette(c, _)
            | CompileError::Duplicate(c, _) => Some(c),
            CompileError::Internal(_) => None,
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        match self {
            CompileError::Parse { .. } => DiagnosticKind::Syntax,
            CompileError::Internal(_) => DiagnosticKind::Internal,
            _ => DiagnosticKind::Semantic,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let position = self
            .context()
            .map(|c| c.position)
            .unwrap_or_default();
        Diagnostic {
            kind: self.kind(),
            line: position.line,
            column: position.column,
            char_index: position.char_index,
            length: position.length,
            message: self.to_string(),
        }
    }
}

/// The three disjoint error classes surfaced to the editor layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DiagnosticKind {
    Syntax,
    Semantic,
    /// The generated target source was rejected by the host toolchain. A
    /// compiler defect, not a user error.
    Internal,
}

/// A single diagnostic record, positioned in the original DSL source so the
/// editor can place inline markers.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub line: usize,
    pub column: usize,
    pub char_index: usize,
    pub length: usize,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            DiagnosticKind::Syntax => "syntax",
            DiagnosticKind::Semantic => "semantic",
            DiagnosticKind::Internal => "internal",
        };
        write!(
            f,
            "{}:{}: {} error: {}",
            self.line, self.column, kind, self.message
        )
    }
}
