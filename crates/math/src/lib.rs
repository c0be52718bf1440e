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

//! Numeric primitives shared by the Fractum compiler and its execution
//! backends: the `Complex` pair type and the arithmetic intrinsics the
//! expression compiler lowers to.

mod complex;
mod funcs;

pub use complex::Complex;
pub use funcs::{MathMode, RealFuncs};

/// Tolerance used when comparing backend outputs for equivalence.
pub const EQUIV_EPSILON: f64 = 1e-9;
