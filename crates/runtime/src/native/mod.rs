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

//! The native backend: translate the typed program to Rust source, compile
//! it with the host `rustc` as a cdylib and load it with `libloading`.
//!
//! Orbit and color normally compile as separate units so an edit to one
//! section does not recompile the other; `combined_unit` merges them when
//! a caller prefers one build over two. A failure here is never a user
//! error: the program already passed the compiler, so rejection by rustc
//! surfaces as an internal diagnostic and callers fall back to the
//! interpreter.

mod emit;
mod load;

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::io::ErrorKind;
use std::process::Command;
use std::sync::Arc;

use fractum_compiler::errors::{Diagnostic, DiagnosticKind};
use fractum_compiler::program::FractalProgram;
use libloading::Library;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, error};

use crate::factory::Factories;
use crate::native::emit::UnitParts;
pub use crate::native::load::{NativeColor, NativeColorFactory, NativeOrbit, NativeOrbitFactory};

#[derive(Debug, Error)]
pub enum NativeError {
    #[error("no usable rustc on the host: {0}")]
    ToolchainMissing(String),
    #[error("generated unit rejected by rustc: {message}")]
    Rejected {
        message: String,
        diagnostic: Diagnostic,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Load(#[from] libloading::Error),
}

impl NativeError {
    /// Internal-kind diagnostic for surfacing next to compile errors.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            NativeError::Rejected { diagnostic, .. } => diagnostic.clone(),
            other => Diagnostic {
                kind: DiagnosticKind::Internal,
                line: 0,
                column: 0,
                char_index: 0,
                length: 0,
                message: other.to_string(),
            },
        }
    }
}

/// True when the host has a rustc this backend can drive.
pub fn toolchain_available() -> bool {
    Command::new("rustc")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

pub struct NativeCompiler {
    unit_prefix: String,
}

impl Default for NativeCompiler {
    fn default() -> Self {
        Self::new("fractum")
    }
}

impl NativeCompiler {
    pub fn new(unit_prefix: impl Into<String>) -> Self {
        Self {
            unit_prefix: unit_prefix.into(),
        }
    }

    pub fn compile(&self, program: Arc<FractalProgram>) -> Result<Factories, NativeError> {
        let dir = Arc::new(tempfile::tempdir()?);

        let (orbit_lib, color_lib) = if program.options.combined_unit {
            let library =
                self.build_unit(&dir, "combined", emit::emit_unit(&program, UnitParts::Combined))?;
            (library.clone(), library)
        } else {
            let orbit = self.build_unit(&dir, "orbit", emit::emit_unit(&program, UnitParts::Orbit))?;
            let color = self.build_unit(&dir, "color", emit::emit_unit(&program, UnitParts::Color))?;
            (orbit, color)
        };

        let orbit = NativeOrbitFactory::new(program.clone(), orbit_lib, dir.clone())?;
        let color = NativeColorFactory::new(program, color_lib, dir)?;
        Ok(Factories {
            orbit: Arc::new(orbit),
            color: Arc::new(color),
        })
    }

    fn build_unit(
        &self,
        dir: &TempDir,
        unit: &str,
        source: String,
    ) -> Result<Arc<Library>, NativeError> {
        let name = format!("{}_{unit}", self.unit_prefix);
        let source_path = dir.path().join(format!("{name}.rs"));
        let out_path = dir.path().join(format!("{DLL_PREFIX}{name}{DLL_SUFFIX}"));
        std::fs::write(&source_path, &source)?;

        debug!(unit = name, lines = source.lines().count(), "building native unit");
        let output = Command::new("rustc")
            .arg("--edition")
            .arg("2021")
            .arg("--crate-type")
            .arg("cdylib")
            .arg("-O")
            .arg("-o")
            .arg(&out_path)
            .arg(&source_path)
            .output()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    NativeError::ToolchainMissing(e.to_string())
                } else {
                    NativeError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let diagnostic = emit::map_rustc_error(&source, &stderr);
            error!(unit = name, message = diagnostic.message, "rustc rejected generated unit");
            return Err(NativeError::Rejected {
                message: diagnostic.message.clone(),
                diagnostic,
            });
        }

        // Safety: the library was produced by this process moments ago and
        // exports only the functions the emitter wrote.
        let library = unsafe { Library::new(&out_path) }?;
        Ok(Arc::new(library))
    }
}
