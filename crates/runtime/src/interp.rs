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

//! The interpreter backend: an exhaustive-match evaluator over the typed
//! program.
//!
//! Always available; the native backend must agree with it within epsilon.
//! Evaluation never allocates: variables live in a table indexed by the
//! compiler-resolved index, complex intermediates go through the scratch
//! pool sized at compile time.

use std::f64::consts::{E, PI};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use fractum_compiler::ast::{CompOp, PathOpKind};
use fractum_compiler::builtins::Func;
use fractum_compiler::program::{
    ComplexOp, FractalProgram, RealOp, TrapProgram, TypedCond, TypedExpr, TypedStmt,
};
use fractum_compiler::var_scope::GlobalName;
use fractum_math::{Complex, EQUIV_EPSILON, MathMode, RealFuncs};

use crate::color::{Argb, Color};
use crate::orbit::{Orbit, OrbitTrace, Region};
use crate::palette::Palette;
use crate::trap::{PathBuilder, Trap};

pub(crate) const VAR_XSTART: usize = GlobalName::Xstart as usize;
pub(crate) const VAR_YSTART: usize = GlobalName::Ystart as usize;
pub(crate) const VAR_N: usize = GlobalName::N as usize;
pub(crate) const VAR_PI: usize = GlobalName::Pi as usize;
pub(crate) const VAR_E: usize = GlobalName::E as usize;
pub(crate) const VAR_S: usize = GlobalName::S as usize;

pub(crate) fn math_mode(fast_math: bool) -> MathMode {
    if fast_math {
        MathMode::Fast
    } else {
        MathMode::Standard
    }
}

/// The mutable evaluation state of one program instance: the variable table
/// and the pre-sized scratch pool.
pub(crate) struct Frame {
    pub vars: Vec<Complex>,
    pub numbers: Vec<Complex>,
    pub funcs: RealFuncs,
    pub time: f64,
}

impl Frame {
    pub fn new(var_count: usize, number_slots: usize, mode: MathMode) -> Self {
        Self {
            vars: vec![Complex::ZERO; var_count],
            numbers: vec![Complex::ZERO; number_slots],
            funcs: RealFuncs::new(mode),
            time: 0.0,
        }
    }

    /// Zero everything and restore the predeclared constants.
    pub fn reset(&mut self) {
        self.vars.fill(Complex::ZERO);
        self.numbers.fill(Complex::ZERO);
        self.vars[VAR_PI] = Complex::real(PI);
        self.vars[VAR_E] = Complex::real(E);
    }

    pub fn eval_real(&mut self, expr: &TypedExpr) -> f64 {
        match expr {
            TypedExpr::Const(v) => *v,
            TypedExpr::Var { index, real: true } => self.vars[*index as usize].re,
            TypedExpr::RealBinary(op, l, r) => {
                let l = self.eval_real(l);
                let r = self.eval_real(r);
                match op {
                    RealOp::Add => l + r,
                    RealOp::Sub => l - r,
                    RealOp::Mul => l * r,
                    RealOp::Div => l / r,
                }
            }
            TypedExpr::RealPow(l, r, slot) => {
                let v = self.eval_real(l).powf(self.eval_real(r));
                self.numbers[slot.0 as usize] = Complex::real(v);
                v
            }
            TypedExpr::RealNeg(inner) => -self.eval_real(inner),
            TypedExpr::Call { .. } => self.eval(expr).re,
            // Complex-typed nodes never reach here along well-typed paths.
            _ => self.eval(expr).re,
        }
    }

    pub fn eval(&mut self, expr: &TypedExpr) -> Complex {
        match expr {
            TypedExpr::Const(v) => Complex::real(*v),
            TypedExpr::ConstComplex(re, im) => Complex::new(*re, *im),
            TypedExpr::Var { index, .. } => self.vars[*index as usize],
            TypedExpr::RealBinary(_, _, _) | TypedExpr::RealPow(_, _, _) | TypedExpr::RealNeg(_) => {
                Complex::real(self.eval_real(expr))
            }
            TypedExpr::ComplexBinary(op, l, r, slot) => {
                let a = self.eval(l);
                let b = self.eval(r);
                let v = match op {
                    ComplexOp::Add => a + b,
                    ComplexOp::Sub => a - b,
                    ComplexOp::Mul => a * b,
                    ComplexOp::Div => a.div(b),
                    ComplexOp::Pow => a.pow(b),
                };
                self.numbers[slot.0 as usize] = v;
                v
            }
            TypedExpr::ComplexNeg(inner, slot) => {
                let v = -self.eval(inner);
                self.numbers[slot.0 as usize] = v;
                v
            }
            TypedExpr::Combine(re, im, slot) => {
                let v = Complex::new(self.eval_real(re), self.eval_real(im));
                self.numbers[slot.0 as usize] = v;
                v
            }
            TypedExpr::Call {
                func, args, slot, ..
            } => {
                let v = self.eval_call(*func, args);
                if let Some(slot) = slot {
                    self.numbers[slot.0 as usize] = v;
                }
                v
            }
        }
    }

    fn eval_call(&mut self, func: Func, args: &[TypedExpr]) -> Complex {
        match func {
            Func::Re => Complex::real(self.eval(&args[0]).re),
            Func::Im => Complex::real(self.eval(&args[0]).im),
            Func::Mod => Complex::real(self.eval(&args[0]).modulus()),
            Func::Pha => Complex::real(self.eval(&args[0]).phase()),
            Func::Abs => Complex::real(self.eval_real(&args[0]).abs()),
            Func::Floor => Complex::real(self.eval_real(&args[0]).floor()),
            Func::Ceil => Complex::real(self.eval_real(&args[0]).ceil()),
            Func::Atan2 => {
                let y = self.eval_real(&args[0]);
                let x = self.eval_real(&args[1]);
                Complex::real(self.funcs.atan2(y, x))
            }
            Func::Hypot => {
                let x = self.eval_real(&args[0]);
                let y = self.eval_real(&args[1]);
                Complex::real(self.funcs.hypot(x, y))
            }
            Func::Min => {
                let a = self.eval_real(&args[0]);
                let b = self.eval_real(&args[1]);
                Complex::real(a.min(b))
            }
            Func::Max => {
                let a = self.eval_real(&args[0]);
                let b = self.eval_real(&args[1]);
                Complex::real(a.max(b))
            }
            Func::Time => Complex::real(self.time),
            Func::Sin => {
                if args[0].is_real() {
                    let x = self.eval_real(&args[0]);
                    Complex::real(self.funcs.sin(x))
                } else {
                    self.eval(&args[0]).sin()
                }
            }
            Func::Cos => {
                if args[0].is_real() {
                    let x = self.eval_real(&args[0]);
                    Complex::real(self.funcs.cos(x))
                } else {
                    self.eval(&args[0]).cos()
                }
            }
            Func::Tan => {
                if args[0].is_real() {
                    let x = self.eval_real(&args[0]);
                    Complex::real(self.funcs.tan(x))
                } else {
                    self.eval(&args[0]).tan()
                }
            }
            Func::Exp => {
                if args[0].is_real() {
                    let x = self.eval_real(&args[0]);
                    Complex::real(self.funcs.exp(x))
                } else {
                    self.eval(&args[0]).exp()
                }
            }
            Func::Log => {
                if args[0].is_real() {
                    let x = self.eval_real(&args[0]);
                    Complex::real(self.funcs.ln(x))
                } else {
                    self.eval(&args[0]).ln()
                }
            }
            Func::Sqrt => {
                if args[0].is_real() {
                    let x = self.eval_real(&args[0]);
                    Complex::real(self.funcs.sqrt(x))
                } else {
                    self.eval(&args[0]).sqrt()
                }
            }
            Func::Pow => {
                let exponent = self.eval_real(&args[1]);
                if args[0].is_real() {
                    Complex::real(self.eval_real(&args[0]).powf(exponent))
                } else {
                    self.eval(&args[0]).pow_real(exponent)
                }
            }
        }
    }

    pub fn eval_cond(&mut self, cond: &TypedCond, traps: &[Trap]) -> bool {
        match cond {
            // Both sides always evaluate so scratch-slot writes match the
            // native backend exactly.
            TypedCond::And(l, r) => {
                let l = self.eval_cond(l, traps);
                let r = self.eval_cond(r, traps);
                l && r
            }
            TypedCond::Or(l, r) => {
                let l = self.eval_cond(l, traps);
                let r = self.eval_cond(r, traps);
                l || r
            }
            TypedCond::Xor(l, r) => {
                let l = self.eval_cond(l, traps);
                let r = self.eval_cond(r, traps);
                l != r
            }
            TypedCond::Compare(op, l, r) => match op {
                CompOp::Eq | CompOp::NEq => {
                    let a = self.eval(l);
                    let b = self.eval(r);
                    let equal = (a - b).modulus() < EQUIV_EPSILON;
                    if *op == CompOp::Eq { equal } else { !equal }
                }
                CompOp::Lt => self.eval_real(l) < self.eval_real(r),
                CompOp::Gt => self.eval_real(l) > self.eval_real(r),
                CompOp::LtE => self.eval_real(l) <= self.eval_real(r),
                CompOp::GtE => self.eval_real(l) >= self.eval_real(r),
            },
            TypedCond::TrapContains { trap, arg, negated } => {
                let z = self.eval(arg);
                traps[*trap as usize].contains((z.re, z.im)) != *negated
            }
        }
    }

    pub fn exec(&mut self, stmts: &[TypedStmt], traps: &[Trap]) {
        for stmt in stmts {
            match stmt {
                TypedStmt::Assign {
                    var,
                    real_var,
                    expr,
                    ..
                } => {
                    // Real assignment keeps the imaginary part zero even
                    // when the value came through the complex path.
                    let value = if *real_var {
                        Complex::real(self.eval_real(expr))
                    } else {
                        self.eval(expr)
                    };
                    self.vars[*var as usize] = value;
                }
                TypedStmt::If {
                    condition,
                    then_body,
                    else_body,
                    ..
                } => {
                    if self.eval_cond(condition, traps) {
                        self.exec(then_body, traps);
                    } else {
                        self.exec(else_body, traps);
                    }
                }
            }
        }
    }
}

/// Build a runtime trap from its program by evaluating center and control
/// points in the given frame.
pub(crate) fn build_trap(frame: &mut Frame, program: &TrapProgram) -> Trap {
    let center = frame.eval(&program.center);
    let mut builder = PathBuilder::new((center.re, center.im));
    for op in &program.ops {
        let points: Vec<(f64, f64)> = op
            .args
            .iter()
            .map(|a| {
                let z = frame.eval(a);
                (z.re, z.im)
            })
            .collect();
        let relative = op.kind.is_relative();
        match op.kind {
            PathOpKind::MoveTo | PathOpKind::MoveRel => builder.move_to(points[0], relative),
            PathOpKind::LineTo | PathOpKind::LineRel => builder.line_to(points[0], relative),
            PathOpKind::ArcTo | PathOpKind::ArcRel => {
                builder.arc_to(points[0], points[1], relative)
            }
            PathOpKind::QuadTo | PathOpKind::QuadRel => {
                builder.quad_to(points[0], points[1], relative)
            }
            PathOpKind::CurveTo | PathOpKind::CurveRel => {
                builder.curve_to(points[0], points[1], points[2], relative)
            }
            PathOpKind::Close => builder.close(),
        }
    }
    builder.finish()
}

/// Interpreter-backed orbit instance.
pub struct InterpretedOrbit {
    program: Arc<FractalProgram>,
    frame: Frame,
    traps: Vec<Trap>,
    region: Region,
    abort: Option<Arc<AtomicBool>>,
}

impl InterpretedOrbit {
    pub fn new(program: Arc<FractalProgram>) -> Self {
        let frame = Frame::new(
            program.orbit.vars.len(),
            program.orbit.number_slots,
            math_mode(program.options.fast_math),
        );
        let region = Region::from_corners(program.orbit.region);
        Self {
            program,
            frame,
            traps: vec![],
            region,
            abort: None,
        }
    }
}

impl Orbit for InterpretedOrbit {
    fn init(&mut self) {
        self.frame.reset();
        let program = self.program.clone();
        self.traps = program
            .orbit
            .traps
            .iter()
            .map(|t| build_trap(&mut self.frame, t))
            .collect();
    }

    fn render(&mut self, point: (f64, f64), mut trace: Option<&mut OrbitTrace>) -> u32 {
        let program = self.program.clone();
        let orbit = &program.orbit;

        self.frame.reset();
        self.frame.vars[VAR_XSTART] = Complex::real(point.0);
        self.frame.vars[VAR_YSTART] = Complex::real(point.1);
        self.frame.vars[VAR_N] = Complex::real(orbit.loop_start as f64);

        self.frame.exec(&orbit.begin, &self.traps);
        for i in (orbit.loop_start + 1)..=orbit.loop_end {
            self.frame.exec(&orbit.loop_body, &self.traps);
            self.frame.vars[VAR_N] = Complex::real(i as f64);
            if let Some(trace) = trace.as_deref_mut() {
                trace.push(self.frame.vars[..orbit.state_len].to_vec());
            }
            if self.frame.eval_cond(&orbit.stop_condition, &self.traps) {
                break;
            }
            if let Some(abort) = &self.abort {
                if abort.load(Ordering::Relaxed) {
                    break;
                }
            }
        }
        self.frame.exec(&orbit.end, &self.traps);
        self.frame.vars[VAR_N].re as u32
    }

    fn state(&self) -> &[Complex] {
        &self.frame.vars[..self.program.orbit.state_len]
    }

    fn region(&self) -> Region {
        self.region
    }

    fn set_time(&mut self, time: f64) {
        self.frame.time = time;
    }

    fn time(&self) -> f64 {
        self.frame.time
    }

    fn set_abort(&mut self, abort: Arc<AtomicBool>) {
        self.abort = Some(abort);
    }

    fn number_slots(&self) -> usize {
        self.program.orbit.number_slots
    }
}

/// Interpreter-backed color instance.
pub struct InterpretedColor {
    program: Arc<FractalProgram>,
    frame: Frame,
    traps: Vec<Trap>,
    palettes: Vec<Palette>,
}

impl InterpretedColor {
    pub fn new(program: Arc<FractalProgram>) -> Self {
        let frame = Frame::new(
            program.color.vars.len(),
            program.color.number_slots,
            math_mode(program.options.fast_math),
        );
        Self {
            program,
            frame,
            traps: vec![],
            palettes: vec![],
        }
    }
}

impl Color for InterpretedColor {
    fn init(&mut self) {
        self.frame.reset();
        let program = self.program.clone();

        // Trap geometry is an orbit-side definition; its expressions index
        // the orbit's variable table and scratch pool, so build them in a
        // frame sized for the orbit program.
        let mut trap_frame = Frame::new(
            program.orbit.vars.len(),
            program.orbit.number_slots,
            math_mode(program.options.fast_math),
        );
        trap_frame.reset();
        self.traps = program
            .orbit
            .traps
            .iter()
            .map(|t| build_trap(&mut trap_frame, t))
            .collect();

        let frame = &mut self.frame;
        self.palettes = program
            .color
            .palettes
            .iter()
            .map(|p| {
                Palette::bake(p, |easing, s| {
                    frame.vars[VAR_S] = Complex::real(s);
                    frame.eval_real(easing)
                })
            })
            .collect();
    }

    fn set_state(&mut self, state: &[Complex]) {
        let n = state.len().min(self.program.color.state_len);
        self.frame.vars[..n].copy_from_slice(&state[..n]);
    }

    fn render(&mut self) -> Argb {
        let program = self.program.clone();
        let color = &program.color;

        self.frame.exec(&color.init, &self.traps);
        let mut out = Argb(color.background);
        for rule in &color.rules {
            if !self.frame.eval_cond(&rule.condition, &self.traps) {
                continue;
            }
            let contribution = match &rule.color {
                fractum_compiler::program::ColorValue::Literal(argb) => Argb(*argb),
                fractum_compiler::program::ColorValue::Palette { palette, index } => {
                    let t = self.frame.eval_real(index);
                    self.palettes[*palette as usize].get(t)
                }
            };
            let opacity = self.frame.eval_real(&rule.opacity);
            out = out.mix(contribution, opacity);
        }
        out
    }

    fn set_time(&mut self, time: f64) {
        self.frame.time = time;
    }

    fn time(&self) -> f64 {
        self.frame.time
    }

    fn number_slots(&self) -> usize {
        self.program.color.number_slots
    }
}
