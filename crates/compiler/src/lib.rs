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

//! Compilation of the orbit/color fractal DSL: parsing, type resolution and
//! lowering into the typed program form both execution backends consume.
//!
//! The pipeline is [`parse_program`] (source to untyped AST, collecting all
//! syntax diagnostics in one pass) followed by [`compile_fractal`] (a single
//! typed lowering pass that resolves variables, picks real or complex
//! operator forms and allocates the scratch-slot pool). [`compile`] runs
//! both.

#[macro_use]
extern crate pest_derive;

pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod diagnostics;
pub mod errors;
pub mod parse;
pub mod program;
pub mod var_scope;

#[cfg(test)]
mod codegen_tests;

pub use codegen::compile_fractal;
pub use errors::{CompileContext, CompileError, Diagnostic, DiagnosticKind};
pub use parse::{CompileOptions, parse_program};
pub use program::{ColorProgram, FractalProgram, OrbitProgram};
pub use var_scope::GlobalName;

/// Compile DSL source all the way to a [`FractalProgram`].
///
/// Syntax errors are reported as a batch; semantic analysis stops at the
/// first error, so a semantic failure yields a single diagnostic.
pub fn compile(source: &str, options: CompileOptions) -> Result<FractalProgram, Vec<Diagnostic>> {
    let decl = parse_program(source)?;
    compile_fractal(&decl, options).map_err(|e| vec![e.to_diagnostic()])
}
