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

//! Execution backends for compiled fractal programs.
//!
//! A compiled [`FractalProgram`] turns into a pair of factories, one for
//! orbit instances and one for color instances; render workers each create
//! their own instances so nothing is shared between pixels in flight. The
//! interpreter backend is always available. With the `native` feature the
//! program can instead be translated to Rust, compiled by the host rustc
//! and loaded as a dynamic library, with the interpreter as the fallback
//! when no toolchain is present.

pub mod color;
pub mod factory;
mod interp;
#[cfg(feature = "native")]
pub mod native;
pub mod orbit;
pub mod palette;
pub mod trap;

use std::sync::Arc;

use fractum_compiler::errors::Diagnostic;
use fractum_compiler::parse::CompileOptions;
use fractum_compiler::program::FractalProgram;

pub use crate::color::{Argb, Color};
pub use crate::factory::{ColorFactory, Factories, OrbitFactory};
pub use crate::interp::{InterpretedColor, InterpretedOrbit};
pub use crate::orbit::{Orbit, OrbitTrace, Region};
pub use crate::palette::Palette;
pub use crate::trap::{PathBuilder, Trap};

use crate::factory::{InterpColorFactory, InterpOrbitFactory};

/// Interpreter-backed factories for an already compiled program.
pub fn interp_factories(program: Arc<FractalProgram>) -> Factories {
    Factories {
        orbit: Arc::new(InterpOrbitFactory::new(program.clone())),
        color: Arc::new(InterpColorFactory::new(program)),
    }
}

/// Compile a source text and return interpreter-backed factories.
pub fn build_factories(source: &str, options: CompileOptions) -> Result<Factories, Vec<Diagnostic>> {
    let program = Arc::new(fractum_compiler::compile(source, options)?);
    Ok(interp_factories(program))
}

/// Compile a source text and return native-backed factories, falling back
/// to the interpreter when the host toolchain is missing or rejects the
/// generated unit. Only user errors fail this function.
#[cfg(feature = "native")]
pub fn build_native_factories(
    source: &str,
    options: CompileOptions,
) -> Result<Factories, Vec<Diagnostic>> {
    let program = Arc::new(fractum_compiler::compile(source, options)?);
    match native::NativeCompiler::default().compile(program.clone()) {
        Ok(factories) => Ok(factories),
        Err(err) => {
            tracing::error!(%err, "native backend unavailable, using the interpreter");
            Ok(interp_factories(program))
        }
    }
}
