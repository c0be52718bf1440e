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

//! The typed, resolved program form shared by both execution backends.
//!
//! The expression compiler lowers the untyped AST into these nodes: every
//! variable reference carries its resolved table index and realness, every
//! complex-producing operation carries the scratch slot the evaluator writes
//! through, and the operator selection (real arithmetic vs. the complex
//! intrinsics) is already decided. Backends only differ in how they execute
//! this tree; they never re-derive types or slots.

use crate::ast::{CompOp, PathOpKind, Position};
use crate::builtins::Func;
use crate::parse::CompileOptions;

/// Index into the pre-allocated numeric scratch pool.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Slot(pub u16);

/// Real-path primitive arithmetic. `^` is absent: even real `^` lowers to
/// [`TypedExpr::RealPow`] with a scratch slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RealOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// The binary complex intrinsics. Real operands are promoted at the point
/// of evaluation; there is no real-path special case for `^` here.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ComplexOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedExpr {
    Const(f64),
    ConstComplex(f64, f64),
    Var {
        index: u16,
        real: bool,
    },
    RealBinary(RealOp, Box<TypedExpr>, Box<TypedExpr>),
    RealPow(Box<TypedExpr>, Box<TypedExpr>, Slot),
    RealNeg(Box<TypedExpr>),
    ComplexBinary(ComplexOp, Box<TypedExpr>, Box<TypedExpr>, Slot),
    ComplexNeg(Box<TypedExpr>, Slot),
    /// `(re, im)` combine; both operands are real.
    Combine(Box<TypedExpr>, Box<TypedExpr>, Slot),
    Call {
        func: Func,
        args: Vec<TypedExpr>,
        /// Scratch slot when the result is complex.
        slot: Option<Slot>,
        real: bool,
    },
}

impl TypedExpr {
    /// Static realness of this expression. Fixed at compile time; never
    /// changes after resolution.
    pub fn is_real(&self) -> bool {
        match self {
            TypedExpr::Const(_) => true,
            TypedExpr::ConstComplex(_, _) => false,
            TypedExpr::Var { real, .. } => *real,
            TypedExpr::RealBinary(_, _, _) => true,
            TypedExpr::RealPow(_, _, _) => true,
            TypedExpr::RealNeg(_) => true,
            TypedExpr::ComplexBinary(_, _, _, _) => false,
            TypedExpr::ComplexNeg(_, _) => false,
            TypedExpr::Combine(_, _, _) => false,
            TypedExpr::Call { real, .. } => *real,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedCond {
    And(Box<TypedCond>, Box<TypedCond>),
    Or(Box<TypedCond>, Box<TypedCond>),
    Xor(Box<TypedCond>, Box<TypedCond>),
    Compare(CompOp, TypedExpr, TypedExpr),
    TrapContains {
        trap: u16,
        arg: TypedExpr,
        negated: bool,
    },
}

/// Statements keep their source position so the native backend can emit
/// location markers into generated source for best-effort error mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedStmt {
    Assign {
        var: u16,
        real_var: bool,
        expr: TypedExpr,
        position: Position,
    },
    If {
        condition: TypedCond,
        then_body: Vec<TypedStmt>,
        else_body: Vec<TypedStmt>,
        position: Position,
    },
}

/// A variable table entry carried for runtime construction and diagnostics.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VarDef {
    pub name: String,
    pub is_real: bool,
    pub is_state: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrapProgram {
    pub name: String,
    pub center: TypedExpr,
    pub ops: Vec<TrapOp>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrapOp {
    pub kind: PathOpKind,
    pub args: Vec<TypedExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteElement {
    pub begin: u32,
    pub end: u32,
    pub steps: u32,
    pub easing: Option<TypedExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteProgram {
    pub name: String,
    pub elements: Vec<PaletteElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColorValue {
    Literal(u32),
    Palette { palette: u16, index: TypedExpr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleProgram {
    pub opacity: TypedExpr,
    pub condition: TypedCond,
    pub color: ColorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitProgram {
    /// Initial region corners (x0, y0, x1, y1).
    pub region: [f64; 4],
    /// Full variable table; the leading `state_len` entries are the state
    /// section shared with the color program.
    pub vars: Vec<VarDef>,
    pub state_len: usize,
    pub traps: Vec<TrapProgram>,
    pub begin: Vec<TypedStmt>,
    pub loop_start: u32,
    pub loop_end: u32,
    pub stop_condition: TypedCond,
    pub loop_body: Vec<TypedStmt>,
    pub end: Vec<TypedStmt>,
    /// Scratch pool size: 1 + the highest slot index requested, or 0 when
    /// no slot was ever needed.
    pub number_slots: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorProgram {
    pub background: u32,
    /// Variable table; the leading `state_len` entries mirror the orbit's
    /// state section, in the same order.
    pub vars: Vec<VarDef>,
    pub state_len: usize,
    pub palettes: Vec<PaletteProgram>,
    pub init: Vec<TypedStmt>,
    pub rules: Vec<RuleProgram>,
    pub number_slots: usize,
}

/// The complete compiled fractal, output of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct FractalProgram {
    pub orbit: OrbitProgram,
    pub color: ColorProgram,
    pub options: CompileOptions,
}
