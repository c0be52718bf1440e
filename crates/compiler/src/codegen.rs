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

//! The expression compiler: a single lowering pass from the untyped AST to
//! the typed program form.
//!
//! Typing is two-valued (real or complex) and decided bottom-up: literals
//! and resolved variables seed the types, operators select their real or
//! complex lowering from operand types, and assignment fixes a variable's
//! type at its first definition. Every complex-producing node is handed a
//! scratch slot from a monotonic counter here, so backends share one
//! pre-sized numeric pool and never allocate during evaluation.
//!
//! Semantic analysis aborts at the first error. Only the parser accumulates
//! multiple diagnostics; by this phase the program is structurally sound and
//! the first type error is the one worth reporting.

use tracing::debug;

use crate::ast::{
    BinaryOp, ColorDecl, ColorExpr, Cond, CondNode, Expr, ExprNode, FractalDecl, OrbitDecl,
    Position, Stmt, StmtNode,
};
use crate::builtins::{ArgKind, builtin};
use crate::errors::{CompileContext, CompileError};
use crate::parse::CompileOptions;
use crate::program::{
    ColorProgram, ColorValue, ComplexOp, FractalProgram, OrbitProgram, PaletteElement,
    PaletteProgram, RealOp, RuleProgram, Slot, TrapOp, TrapProgram, TypedCond, TypedExpr,
    TypedStmt, VarDef,
};
use crate::var_scope::VarScope;

/// Per-program lowering state: the variable registry, the scratch-slot
/// counter, and the name tables for traps and palettes.
struct CompilationContext {
    scope: VarScope,
    number_index: u16,
    traps: Vec<String>,
    palettes: Vec<String>,
}

fn ctxt(position: Position) -> CompileContext {
    CompileContext::new(position)
}

impl CompilationContext {
    fn new() -> Self {
        Self {
            scope: VarScope::new(),
            number_index: 0,
            traps: vec![],
            palettes: vec![],
        }
    }

    /// Hand out the next scratch slot. The counter only grows; its final
    /// value is the pool size the runtime preallocates.
    fn alloc_slot(&mut self) -> Slot {
        let slot = Slot(self.number_index);
        self.number_index += 1;
        slot
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<TypedExpr, CompileError> {
        match &expr.node {
            ExprNode::Real(v) => Ok(TypedExpr::Const(*v)),
            ExprNode::Imaginary(v) => Ok(TypedExpr::ConstComplex(0.0, *v)),
            ExprNode::Id(name) => {
                let Some(index) = self.scope.find(name) else {
                    return Err(CompileError::UndeclaredVariable(
                        ctxt(expr.position),
                        name.clone(),
                    ));
                };
                // A state variable read before any assignment has fixed its
                // type is complex from here on.
                if self.scope.decl(index).is_real.is_none() {
                    self.scope.fix_type(index, false);
                }
                let real = self.scope.decl(index).is_real == Some(true);
                Ok(TypedExpr::Var { index, real })
            }
            ExprNode::Binary(op, l, r) => {
                let lhs = self.compile_expr(l)?;
                let rhs = self.compile_expr(r)?;
                if lhs.is_real() && rhs.is_real() {
                    let node = match op {
                        BinaryOp::Add => {
                            TypedExpr::RealBinary(RealOp::Add, Box::new(lhs), Box::new(rhs))
                        }
                        BinaryOp::Sub => {
                            TypedExpr::RealBinary(RealOp::Sub, Box::new(lhs), Box::new(rhs))
                        }
                        BinaryOp::Mul => {
                            TypedExpr::RealBinary(RealOp::Mul, Box::new(lhs), Box::new(rhs))
                        }
                        BinaryOp::Div => {
                            TypedExpr::RealBinary(RealOp::Div, Box::new(lhs), Box::new(rhs))
                        }
                        // Real `^` still routes through a scratch slot; the
                        // pool must be sized as if it produced a complex
                        // intermediate.
                        BinaryOp::Pow => {
                            let slot = self.alloc_slot();
                            TypedExpr::RealPow(Box::new(lhs), Box::new(rhs), slot)
                        }
                    };
                    Ok(node)
                } else {
                    let complex_op = match op {
                        BinaryOp::Add => ComplexOp::Add,
                        BinaryOp::Sub => ComplexOp::Sub,
                        BinaryOp::Mul => ComplexOp::Mul,
                        BinaryOp::Div => ComplexOp::Div,
                        BinaryOp::Pow => ComplexOp::Pow,
                    };
                    let slot = self.alloc_slot();
                    Ok(TypedExpr::ComplexBinary(
                        complex_op,
                        Box::new(lhs),
                        Box::new(rhs),
                        slot,
                    ))
                }
            }
            ExprNode::Neg(inner) => {
                let operand = self.compile_expr(inner)?;
                if operand.is_real() {
                    Ok(TypedExpr::RealNeg(Box::new(operand)))
                } else {
                    let slot = self.alloc_slot();
                    Ok(TypedExpr::ComplexNeg(Box::new(operand), slot))
                }
            }
            ExprNode::Combine(re, im) => {
                let re = self.compile_expr(re)?;
                let im = self.compile_expr(im)?;
                if !re.is_real() || !im.is_real() {
                    return Err(CompileError::TypeMismatch(
                        ctxt(expr.position),
                        "both parts of a (re, im) pair must be real".to_string(),
                    ));
                }
                let slot = self.alloc_slot();
                Ok(TypedExpr::Combine(Box::new(re), Box::new(im), slot))
            }
            ExprNode::Call { name, args } => {
                let Some(descriptor) = builtin(name) else {
                    return Err(CompileError::UnknownFunction(
                        ctxt(expr.position),
                        name.clone(),
                    ));
                };
                if args.len() != descriptor.args.len() {
                    return Err(CompileError::BadArity(
                        ctxt(expr.position),
                        name.clone(),
                        descriptor.args.len(),
                        args.len(),
                    ));
                }
                let mut compiled = Vec::with_capacity(args.len());
                let mut args_real = Vec::with_capacity(args.len());
                for (arg, kind) in args.iter().zip(descriptor.args) {
                    let typed = self.compile_expr(arg)?;
                    if *kind == ArgKind::Real && !typed.is_real() {
                        return Err(CompileError::TypeMismatch(
                            ctxt(arg.position),
                            format!("argument of `{name}` must be real"),
                        ));
                    }
                    args_real.push(typed.is_real());
                    compiled.push(typed);
                }
                let real = descriptor.func.result_is_real(&args_real);
                let slot = if real { None } else { Some(self.alloc_slot()) };
                Ok(TypedExpr::Call {
                    func: descriptor.func,
                    args: compiled,
                    slot,
                    real,
                })
            }
        }
    }

    /// A real-valued expression where the surface requires one.
    fn compile_real_expr(&mut self, expr: &Expr, what: &str) -> Result<TypedExpr, CompileError> {
        let typed = self.compile_expr(expr)?;
        if !typed.is_real() {
            return Err(CompileError::TypeMismatch(
                ctxt(expr.position),
                format!("{what} must be real"),
            ));
        }
        Ok(typed)
    }

    fn compile_cond(&mut self, cond: &Cond) -> Result<TypedCond, CompileError> {
        match &cond.node {
            CondNode::And(l, r) => Ok(TypedCond::And(
                Box::new(self.compile_cond(l)?),
                Box::new(self.compile_cond(r)?),
            )),
            CondNode::Or(l, r) => Ok(TypedCond::Or(
                Box::new(self.compile_cond(l)?),
                Box::new(self.compile_cond(r)?),
            )),
            CondNode::Xor(l, r) => Ok(TypedCond::Xor(
                Box::new(self.compile_cond(l)?),
                Box::new(self.compile_cond(r)?),
            )),
            CondNode::Compare(op, l, r) => {
                let lhs = self.compile_expr(l)?;
                let rhs = self.compile_expr(r)?;
                if op.is_ordered() && (!lhs.is_real() || !rhs.is_real()) {
                    return Err(CompileError::TypeMismatch(
                        ctxt(cond.position),
                        format!("ordered comparison `{op}` requires real operands"),
                    ));
                }
                // Equality never crosses the real/complex divide either.
                if lhs.is_real() != rhs.is_real() {
                    return Err(CompileError::TypeMismatch(
                        ctxt(cond.position),
                        format!("comparison `{op}` mixes real and complex operands"),
                    ));
                }
                Ok(TypedCond::Compare(*op, lhs, rhs))
            }
            CondNode::Trap { name, arg, negated } => {
                let Some(trap) = self.traps.iter().position(|t| t == name) else {
                    return Err(CompileError::UnknownTrap(ctxt(cond.position), name.clone()));
                };
                let arg = self.compile_expr(arg)?;
                Ok(TypedCond::TrapContains {
                    trap: trap as u16,
                    arg,
                    negated: *negated,
                })
            }
        }
    }

    fn compile_stmts(&mut self, stmts: &[Stmt]) -> Result<Vec<TypedStmt>, CompileError> {
        stmts.iter().map(|s| self.compile_stmt(s)).collect()
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<TypedStmt, CompileError> {
        match &stmt.node {
            StmtNode::Assign { name, expr } => {
                // The value is compiled first: `x = x + 1` with `x` never
                // assigned is a use-before-assignment, not a declaration.
                let value = self.compile_expr(expr)?;
                let index = match self.scope.find(name) {
                    Some(index) => {
                        let decl = self.scope.decl(index);
                        if decl.constant {
                            return Err(CompileError::AssignToConst(
                                ctxt(stmt.position),
                                name.clone(),
                            ));
                        }
                        match decl.is_real {
                            // A real variable never widens to complex.
                            Some(true) if !value.is_real() => {
                                return Err(CompileError::ComplexIntoReal(
                                    ctxt(stmt.position),
                                    name.clone(),
                                ));
                            }
                            None => self.scope.fix_type(index, value.is_real()),
                            _ => {}
                        }
                        index
                    }
                    None => {
                        self.scope
                            .declare_in_current(name, Some(value.is_real()), false, false)
                    }
                };
                let real_var = self.scope.decl(index).is_real == Some(true);
                Ok(TypedStmt::Assign {
                    var: index,
                    real_var,
                    expr: value,
                    position: stmt.position,
                })
            }
            StmtNode::If {
                condition,
                then_body,
                else_body,
            } => {
                let condition = self.compile_cond(condition)?;
                self.scope.push_scope();
                let then_body = self.compile_stmts(then_body);
                self.scope.pop_scope();
                self.scope.push_scope();
                let else_body = self.compile_stmts(else_body);
                self.scope.pop_scope();
                Ok(TypedStmt::If {
                    condition,
                    then_body: then_body?,
                    else_body: else_body?,
                    position: stmt.position,
                })
            }
        }
    }

    /// The finished variable table. A state variable that was declared but
    /// never read or written stays complex.
    fn var_defs(&self) -> Vec<VarDef> {
        self.scope
            .decls()
            .iter()
            .map(|d| VarDef {
                name: d.name.clone(),
                is_real: d.is_real.unwrap_or(false),
                is_state: d.is_state,
            })
            .collect()
    }
}

fn compile_orbit(decl: &OrbitDecl) -> Result<OrbitProgram, CompileError> {
    let mut ctx = CompilationContext::new();

    // User state variables immediately follow the predeclared globals, so
    // the leading `state_len` entries of the table form the section shared
    // with the color program.
    for (name, position) in &decl.state {
        if ctx.scope.find(name).is_some() {
            return Err(CompileError::Duplicate(ctxt(*position), name.clone()));
        }
        ctx.scope.declare_in_current(name, None, true, false);
    }

    let mut traps = Vec::with_capacity(decl.traps.len());
    for trap in &decl.traps {
        if ctx.traps.contains(&trap.name) {
            return Err(CompileError::Duplicate(
                ctxt(trap.position),
                trap.name.clone(),
            ));
        }
        let center = ctx.compile_expr(&trap.center)?;
        let mut ops = Vec::with_capacity(trap.ops.len());
        for op in &trap.ops {
            if op.args.len() != op.kind.arity() {
                return Err(CompileError::BadPathArity(
                    ctxt(op.position),
                    op.kind.keyword().to_string(),
                    op.kind.arity(),
                    op.args.len(),
                ));
            }
            let args = op
                .args
                .iter()
                .map(|a| ctx.compile_expr(a))
                .collect::<Result<Vec<_>, _>>()?;
            ops.push(TrapOp { kind: op.kind, args });
        }
        ctx.traps.push(trap.name.clone());
        traps.push(TrapProgram {
            name: trap.name.clone(),
            center,
            ops,
        });
    }

    let begin = ctx.compile_stmts(&decl.begin)?;
    let stop_condition = ctx.compile_cond(&decl.loop_decl.condition)?;
    let loop_body = ctx.compile_stmts(&decl.loop_decl.body)?;
    let end = ctx.compile_stmts(&decl.end)?;

    debug!(
        vars = ctx.scope.len(),
        slots = ctx.number_index,
        traps = traps.len(),
        "compiled orbit program"
    );
    Ok(OrbitProgram {
        region: decl.region,
        vars: ctx.var_defs(),
        state_len: ctx.scope.state_len(),
        traps,
        begin,
        loop_start: decl.loop_decl.start,
        loop_end: decl.loop_decl.end,
        stop_condition,
        loop_body,
        end,
        number_slots: ctx.number_index as usize,
    })
}

fn compile_color(decl: &ColorDecl, orbit: &OrbitProgram) -> Result<ColorProgram, CompileError> {
    let mut ctx = CompilationContext::new();

    // Coloring conditions may test containment against the orbit's traps.
    ctx.traps = orbit.traps.iter().map(|t| t.name.clone()).collect();

    // Mirror the orbit's state section so the leading entries of both
    // variable tables align index-for-index. The globals are already in
    // place from `VarScope::new`; only the user state variables follow.
    for def in orbit.vars.iter().take(orbit.state_len) {
        if ctx.scope.find(&def.name).is_none() {
            ctx.scope
                .declare_in_current(&def.name, Some(def.is_real), true, false);
        }
    }

    let mut palettes = Vec::with_capacity(decl.palettes.len());
    for palette in &decl.palettes {
        if ctx.palettes.contains(&palette.name) {
            return Err(CompileError::Duplicate(
                ctxt(palette.position),
                palette.name.clone(),
            ));
        }
        let mut elements = Vec::with_capacity(palette.elements.len());
        for element in &palette.elements {
            let easing = element
                .easing
                .as_ref()
                .map(|e| ctx.compile_real_expr(e, "palette easing"))
                .transpose()?;
            elements.push(PaletteElement {
                begin: element.begin,
                end: element.end,
                steps: element.steps,
                easing,
            });
        }
        ctx.palettes.push(palette.name.clone());
        palettes.push(PaletteProgram {
            name: palette.name.clone(),
            elements,
        });
    }

    let init = ctx.compile_stmts(&decl.init)?;

    let mut rules = Vec::with_capacity(decl.rules.len());
    for rule in &decl.rules {
        let condition = ctx.compile_cond(&rule.condition)?;
        let opacity = ctx.compile_real_expr(&rule.opacity, "rule opacity")?;
        let color = match &rule.body {
            ColorExpr::Literal(argb, _) => ColorValue::Literal(*argb),
            ColorExpr::Palette {
                name,
                index,
                position,
            } => {
                let Some(palette) = ctx.palettes.iter().position(|p| p == name) else {
                    return Err(CompileError::UnknownPalette(ctxt(*position), name.clone()));
                };
                let index = ctx.compile_real_expr(index, "palette index")?;
                ColorValue::Palette {
                    palette: palette as u16,
                    index,
                }
            }
        };
        rules.push(RuleProgram {
            opacity,
            condition,
            color,
        });
    }

    debug!(
        vars = ctx.scope.len(),
        slots = ctx.number_index,
        palettes = palettes.len(),
        rules = rules.len(),
        "compiled color program"
    );
    Ok(ColorProgram {
        background: decl.background,
        vars: ctx.var_defs(),
        state_len: ctx.scope.state_len(),
        palettes,
        init,
        rules,
        number_slots: ctx.number_index as usize,
    })
}

/// Lower a parsed fractal declaration into the typed program form. The
/// orbit is compiled first so its resolved state section can be mirrored
/// into the color program's variable table.
pub fn compile_fractal(
    decl: &FractalDecl,
    options: CompileOptions,
) -> Result<FractalProgram, CompileError> {
    let orbit = compile_orbit(&decl.orbit)?;
    let color = compile_color(&decl.color, &orbit)?;
    Ok(FractalProgram {
        orbit,
        color,
        options,
    })
}
