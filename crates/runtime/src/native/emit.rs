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

//! Rust source emission for the native backend.
//!
//! The generated unit is self-contained: an inline complex struct, the real
//! and complex intrinsics (fast-math variants substituted when the program
//! was compiled with that option), and `extern "C"` entry points over a
//! plain state struct. Trap containment, palette lookup, the abort flag and
//! trace recording call back into the host through a function-pointer
//! table, so geometry and gradients are evaluated exactly once host-side.
//!
//! Every statement is preceded by a `// dsl:line:col` marker; when rustc
//! rejects the unit (a compiler defect, not a user error) the marker
//! closest above the reported line gives a best-effort position in the
//! original DSL source.

use std::fmt::Write;

use fractum_compiler::ast::CompOp;
use fractum_compiler::builtins::Func;
use fractum_compiler::errors::{Diagnostic, DiagnosticKind};
use fractum_compiler::program::{
    ColorValue, ComplexOp, FractalProgram, OrbitProgram, RealOp, TypedCond, TypedExpr, TypedStmt,
};

use crate::interp::{VAR_E, VAR_N, VAR_PI, VAR_XSTART, VAR_YSTART};

/// Which halves of the program a unit carries.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum UnitParts {
    Orbit,
    Color,
    Combined,
}

pub(crate) fn emit_unit(program: &FractalProgram, parts: UnitParts) -> String {
    let mut out = String::new();
    out.push_str("// generated by fractum-runtime; do not edit\n");
    out.push_str(
        "#![allow(dead_code, unused_variables, unused_mut, unused_parens, unused_unsafe)]\n\n",
    );
    out.push_str(&prelude(program.options.fast_math));
    if matches!(parts, UnitParts::Orbit | UnitParts::Combined) {
        emit_orbit(&mut out, program);
    }
    if matches!(parts, UnitParts::Color | UnitParts::Combined) {
        emit_color(&mut out, program);
    }
    out
}

fn prelude(fast_math: bool) -> String {
    let reals = if fast_math { FAST_REALS } else { STD_REALS };
    format!("{PRELUDE_SHARED}{reals}")
}

// The shared portion of every generated unit.
const PRELUDE_SHARED: &str = r#"use std::f64::consts::{E, PI};
use std::os::raw::c_void;

const EQ_EPS: f64 = 1e-9;

#[repr(C)]
#[derive(Copy, Clone)]
pub struct C { pub re: f64, pub im: f64 }

fn c(re: f64, im: f64) -> C { C { re, im } }
fn cr(re: f64) -> C { C { re, im: 0.0 } }
fn cadd(a: C, b: C) -> C { c(a.re + b.re, a.im + b.im) }
fn csub(a: C, b: C) -> C { c(a.re - b.re, a.im - b.im) }
fn cmul(a: C, b: C) -> C { c(a.re * b.re - a.im * b.im, a.re * b.im + a.im * b.re) }
fn cdiv(a: C, b: C) -> C {
    let d = b.re * b.re + b.im * b.im;
    c((a.re * b.re + a.im * b.im) / d, (a.im * b.re - a.re * b.im) / d)
}
fn cneg(a: C) -> C { c(-a.re, -a.im) }
fn cmod(a: C) -> f64 { a.re.hypot(a.im) }
fn cpha(a: C) -> f64 { a.im.atan2(a.re) }
fn cpowr(a: C, e: f64) -> C {
    let m = cmod(a).powf(e);
    let p = cpha(a) * e;
    c(m * p.cos(), m * p.sin())
}
fn cpow(a: C, b: C) -> C {
    if b.im == 0.0 { return cpowr(a, b.re); }
    cexp(cmul(b, cln(a)))
}
fn csqrt(a: C) -> C {
    let m = cmod(a).sqrt();
    let p = cpha(a) / 2.0;
    c(m * p.cos(), m * p.sin())
}
fn cexp(a: C) -> C {
    let m = a.re.exp();
    c(m * a.im.cos(), m * a.im.sin())
}
fn cln(a: C) -> C { c(cmod(a).ln(), cpha(a)) }
fn csin(a: C) -> C { c(a.re.sin() * a.im.cosh(), a.re.cos() * a.im.sinh()) }
fn ccos(a: C) -> C { c(a.re.cos() * a.im.cosh(), -a.re.sin() * a.im.sinh()) }
fn ctan(a: C) -> C { cdiv(csin(a), ccos(a)) }
fn ceq(a: C, b: C) -> bool { cmod(csub(a, b)) < EQ_EPS }

fn lerp8(a: u32, b: u32, t: f64) -> u32 {
    ((a as f64 + (b as f64 - a as f64) * t).round() as u32) & 0xFF
}
fn mixc(a: u32, b: u32, t: f64) -> u32 {
    let t = t.clamp(0.0, 1.0);
    (lerp8((a >> 24) & 0xFF, (b >> 24) & 0xFF, t) << 24)
        | (lerp8((a >> 16) & 0xFF, (b >> 16) & 0xFF, t) << 16)
        | (lerp8((a >> 8) & 0xFF, (b >> 8) & 0xFF, t) << 8)
        | lerp8(a & 0xFF, b & 0xFF, t)
}

#[repr(C)]
pub struct Host {
    pub ctx: *mut c_void,
    pub trap_contains: unsafe extern "C" fn(*mut c_void, u32, f64, f64) -> u32,
    pub palette_get: unsafe extern "C" fn(*mut c_void, u32, f64) -> u32,
    pub should_abort: unsafe extern "C" fn(*mut c_void) -> u32,
    pub trace_step: unsafe extern "C" fn(*mut c_void, *const C, usize),
}

"#;

const STD_REALS: &str = r#"fn rsin(x: f64) -> f64 { x.sin() }
fn rcos(x: f64) -> f64 { x.cos() }
fn rtan(x: f64) -> f64 { x.tan() }
fn rexp(x: f64) -> f64 { x.exp() }

"#;

// Must match fractum-math's fast module so the backends agree.
const FAST_REALS: &str = r#"const TWO_PI: f64 = 2.0 * PI;
fn rsin(x: f64) -> f64 {
    let mut x = x % TWO_PI;
    if x >= PI { x -= TWO_PI; } else if x < -PI { x += TWO_PI; }
    let b = 4.0 / PI;
    let q = -4.0 / (PI * PI);
    let y = b * x + q * x * x.abs();
    0.775 * y + 0.225 * y * y.abs()
}
fn rcos(x: f64) -> f64 { rsin(x + PI / 2.0) }
fn rtan(x: f64) -> f64 { rsin(x) / rcos(x) }
fn rexp(x: f64) -> f64 {
    if !(-16.0..=16.0).contains(&x) { return x.exp(); }
    let mut y = 1.0 + x / 256.0;
    for _ in 0..8 { y *= y; }
    y
}

"#;

fn flit(v: f64) -> String {
    format!("({v:?}_f64)")
}

/// Emits statements as three-address style lines so every complex
/// intermediate lands in its scratch slot exactly as the interpreter
/// writes it.
struct Emitter {
    out: String,
    tmp: usize,
    indent: usize,
}

impl Emitter {
    fn new(indent: usize) -> Self {
        Self {
            out: String::new(),
            tmp: 0,
            indent,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn fresh(&mut self) -> String {
        let name = format!("t{}", self.tmp);
        self.tmp += 1;
        name
    }

    fn real_expr(&mut self, expr: &TypedExpr) -> String {
        match expr {
            TypedExpr::Const(v) => flit(*v),
            TypedExpr::Var { index, real: true } => format!("o.vars[{index}].re"),
            TypedExpr::RealBinary(op, l, r) => {
                let l = self.real_expr(l);
                let r = self.real_expr(r);
                let op = match op {
                    RealOp::Add => "+",
                    RealOp::Sub => "-",
                    RealOp::Mul => "*",
                    RealOp::Div => "/",
                };
                format!("({l} {op} {r})")
            }
            TypedExpr::RealPow(l, r, slot) => {
                let base = self.real_expr(l);
                let exp = self.real_expr(r);
                let t = self.fresh();
                self.line(&format!("let {t} = ({base}).powf({exp});"));
                self.line(&format!("o.ns[{}] = cr({t});", slot.0));
                t
            }
            TypedExpr::RealNeg(inner) => {
                let inner = self.real_expr(inner);
                format!("(-{inner})")
            }
            TypedExpr::Call { .. } => self.call_expr(expr),
            // Complex-typed nodes never reach here along well-typed paths.
            _ => {
                let z = self.complex_expr(expr);
                format!("{z}.re")
            }
        }
    }

    fn complex_expr(&mut self, expr: &TypedExpr) -> String {
        match expr {
            TypedExpr::Const(v) => format!("cr({})", flit(*v)),
            TypedExpr::ConstComplex(re, im) => format!("c({}, {})", flit(*re), flit(*im)),
            TypedExpr::Var { index, .. } => format!("o.vars[{index}]"),
            TypedExpr::RealBinary(_, _, _) | TypedExpr::RealPow(_, _, _) | TypedExpr::RealNeg(_) => {
                let r = self.real_expr(expr);
                format!("cr({r})")
            }
            TypedExpr::ComplexBinary(op, l, r, slot) => {
                let a = self.complex_expr(l);
                let b = self.complex_expr(r);
                let func = match op {
                    ComplexOp::Add => "cadd",
                    ComplexOp::Sub => "csub",
                    ComplexOp::Mul => "cmul",
                    ComplexOp::Div => "cdiv",
                    ComplexOp::Pow => "cpow",
                };
                let t = self.fresh();
                self.line(&format!("let {t} = {func}({a}, {b});"));
                self.line(&format!("o.ns[{}] = {t};", slot.0));
                t
            }
            TypedExpr::ComplexNeg(inner, slot) => {
                let a = self.complex_expr(inner);
                let t = self.fresh();
                self.line(&format!("let {t} = cneg({a});"));
                self.line(&format!("o.ns[{}] = {t};", slot.0));
                t
            }
            TypedExpr::Combine(re, im, slot) => {
                let re = self.real_expr(re);
                let im = self.real_expr(im);
                let t = self.fresh();
                self.line(&format!("let {t} = c({re}, {im});"));
                self.line(&format!("o.ns[{}] = {t};", slot.0));
                t
            }
            TypedExpr::Call { real, .. } => {
                if *real {
                    let r = self.call_expr(expr);
                    format!("cr({r})")
                } else {
                    self.call_expr(expr)
                }
            }
        }
    }

    /// A builtin call. Returns an f64-typed fragment for real-valued
    /// functions and a C-typed fragment otherwise.
    fn call_expr(&mut self, expr: &TypedExpr) -> String {
        let TypedExpr::Call {
            func, args, slot, ..
        } = expr
        else {
            unreachable!("call_expr on a non-call node");
        };
        let fragment = match func {
            Func::Re => {
                let a = self.complex_expr(&args[0]);
                format!("({a}.re)")
            }
            Func::Im => {
                let a = self.complex_expr(&args[0]);
                format!("({a}.im)")
            }
            Func::Mod => {
                let a = self.complex_expr(&args[0]);
                format!("cmod({a})")
            }
            Func::Pha => {
                let a = self.complex_expr(&args[0]);
                format!("cpha({a})")
            }
            Func::Abs => {
                let x = self.real_expr(&args[0]);
                format!("({x}).abs()")
            }
            Func::Floor => {
                let x = self.real_expr(&args[0]);
                format!("({x}).floor()")
            }
            Func::Ceil => {
                let x = self.real_expr(&args[0]);
                format!("({x}).ceil()")
            }
            Func::Atan2 => {
                let y = self.real_expr(&args[0]);
                let x = self.real_expr(&args[1]);
                format!("({y}).atan2({x})")
            }
            Func::Hypot => {
                let x = self.real_expr(&args[0]);
                let y = self.real_expr(&args[1]);
                format!("({x}).hypot({y})")
            }
            Func::Min => {
                let a = self.real_expr(&args[0]);
                let b = self.real_expr(&args[1]);
                format!("({a}).min({b})")
            }
            Func::Max => {
                let a = self.real_expr(&args[0]);
                let b = self.real_expr(&args[1]);
                format!("({a}).max({b})")
            }
            Func::Time => "o.time".to_string(),
            Func::Sin | Func::Cos | Func::Tan | Func::Exp | Func::Log | Func::Sqrt => {
                if args[0].is_real() {
                    let x = self.real_expr(&args[0]);
                    let name = match func {
                        Func::Sin => "rsin",
                        Func::Cos => "rcos",
                        Func::Tan => "rtan",
                        Func::Exp => "rexp",
                        Func::Log => return format!("({x}).ln()"),
                        _ => return format!("({x}).sqrt()"),
                    };
                    format!("{name}({x})")
                } else {
                    let a = self.complex_expr(&args[0]);
                    let name = match func {
                        Func::Sin => "csin",
                        Func::Cos => "ccos",
                        Func::Tan => "ctan",
                        Func::Exp => "cexp",
                        Func::Log => "cln",
                        _ => "csqrt",
                    };
                    format!("{name}({a})")
                }
            }
            Func::Pow => {
                let exp = self.real_expr(&args[1]);
                if args[0].is_real() {
                    let base = self.real_expr(&args[0]);
                    format!("({base}).powf({exp})")
                } else {
                    let base = self.complex_expr(&args[0]);
                    format!("cpowr({base}, {exp})")
                }
            }
        };
        match slot {
            Some(slot) => {
                let t = self.fresh();
                self.line(&format!("let {t} = {fragment};"));
                self.line(&format!("o.ns[{}] = {t};", slot.0));
                t
            }
            None => fragment,
        }
    }

    fn cond_expr(&mut self, cond: &TypedCond) -> String {
        match cond {
            // Bitwise bool operators keep evaluation eager, matching the
            // interpreter's slot writes.
            TypedCond::And(l, r) => {
                let l = self.cond_expr(l);
                let r = self.cond_expr(r);
                format!("({l} & {r})")
            }
            TypedCond::Or(l, r) => {
                let l = self.cond_expr(l);
                let r = self.cond_expr(r);
                format!("({l} | {r})")
            }
            TypedCond::Xor(l, r) => {
                let l = self.cond_expr(l);
                let r = self.cond_expr(r);
                format!("({l} ^ {r})")
            }
            TypedCond::Compare(op, l, r) => match op {
                CompOp::Eq | CompOp::NEq => {
                    let a = self.complex_expr(l);
                    let b = self.complex_expr(r);
                    if *op == CompOp::Eq {
                        format!("ceq({a}, {b})")
                    } else {
                        format!("(!ceq({a}, {b}))")
                    }
                }
                _ => {
                    let a = self.real_expr(l);
                    let b = self.real_expr(r);
                    let op = match op {
                        CompOp::Lt => "<",
                        CompOp::Gt => ">",
                        CompOp::LtE => "<=",
                        CompOp::GtE => ">=",
                        _ => unreachable!(),
                    };
                    format!("({a} {op} {b})")
                }
            },
            TypedCond::TrapContains { trap, arg, negated } => {
                let z = self.complex_expr(arg);
                let t = self.fresh();
                self.line(&format!("let {t} = {z};"));
                let cmp = if *negated { "==" } else { "!=" };
                format!(
                    "(unsafe {{ (o.host.trap_contains)(o.host.ctx, {trap}u32, {t}.re, {t}.im) }} {cmp} 0)"
                )
            }
        }
    }

    fn stmts(&mut self, stmts: &[TypedStmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &TypedStmt) {
        match stmt {
            TypedStmt::Assign {
                var,
                real_var,
                expr,
                position,
            } => {
                self.line(&format!("// dsl:{}:{}", position.line, position.column));
                if *real_var {
                    let value = self.real_expr(expr);
                    self.line(&format!("o.vars[{var}] = cr({value});"));
                } else {
                    let value = self.complex_expr(expr);
                    self.line(&format!("o.vars[{var}] = {value};"));
                }
            }
            TypedStmt::If {
                condition,
                then_body,
                else_body,
                position,
            } => {
                self.line(&format!("// dsl:{}:{}", position.line, position.column));
                let cond = self.cond_expr(condition);
                self.line(&format!("if {cond} {{"));
                self.indent += 1;
                self.stmts(then_body);
                self.indent -= 1;
                if else_body.is_empty() {
                    self.line("}");
                } else {
                    self.line("} else {");
                    self.indent += 1;
                    self.stmts(else_body);
                    self.indent -= 1;
                    self.line("}");
                }
            }
        }
    }
}

fn emit_state_struct(out: &mut String, name: &str, prefix: &str, vars: usize, slots: usize) {
    let _ = write!(
        out,
        r#"#[repr(C)]
pub struct {name} {{
    vars: [C; {vars}],
    ns: [C; {slots}],
    time: f64,
    host: Host,
}}

#[no_mangle]
pub unsafe extern "C" fn {prefix}_new(host: Host) -> *mut {name} {{
    Box::into_raw(Box::new({name} {{
        vars: [cr(0.0); {vars}],
        ns: [cr(0.0); {slots}],
        time: 0.0,
        host,
    }}))
}}

#[no_mangle]
pub unsafe extern "C" fn {prefix}_free(o: *mut {name}) {{
    drop(Box::from_raw(o));
}}

#[no_mangle]
pub unsafe extern "C" fn {prefix}_init(o: *mut {name}) {{
    let o = &mut *o;
    o.vars = [cr(0.0); {vars}];
    o.ns = [cr(0.0); {slots}];
    o.vars[{pi}] = cr(PI);
    o.vars[{e}] = cr(E);
}}

#[no_mangle]
pub unsafe extern "C" fn {prefix}_set_time(o: *mut {name}, t: f64) {{
    (*o).time = t;
}}

#[no_mangle]
pub unsafe extern "C" fn {prefix}_time(o: *const {name}) -> f64 {{
    (*o).time
}}

#[no_mangle]
pub unsafe extern "C" fn {prefix}_state(o: *const {name}, out: *mut C, len: usize) {{
    let o = &*o;
    let n = if len < {vars} {{ len }} else {{ {vars} }};
    std::ptr::copy_nonoverlapping(o.vars.as_ptr(), out, n);
}}

"#,
        pi = VAR_PI,
        e = VAR_E,
    );
}

fn emit_orbit(out: &mut String, program: &FractalProgram) {
    let orbit: &OrbitProgram = &program.orbit;
    emit_state_struct(
        out,
        "Orbit",
        "fractum_orbit",
        orbit.vars.len(),
        orbit.number_slots,
    );

    let mut body = Emitter::new(1);
    body.line(&format!("o.vars = [cr(0.0); {}];", orbit.vars.len()));
    body.line(&format!("o.vars[{VAR_PI}] = cr(PI);"));
    body.line(&format!("o.vars[{VAR_E}] = cr(E);"));
    body.line(&format!("o.vars[{VAR_XSTART}] = cr(x);"));
    body.line(&format!("o.vars[{VAR_YSTART}] = cr(y);"));
    body.line(&format!("o.vars[{VAR_N}] = cr({}.0);", orbit.loop_start));
    body.stmts(&orbit.begin);
    body.line(&format!("let mut i: u32 = {};", orbit.loop_start));
    body.line(&format!("while i < {} {{", orbit.loop_end));
    body.indent += 1;
    body.line("i += 1;");
    body.stmts(&orbit.loop_body);
    body.line(&format!("o.vars[{VAR_N}] = cr(i as f64);"));
    body.line("if record != 0 {");
    body.indent += 1;
    body.line(&format!(
        "unsafe {{ (o.host.trace_step)(o.host.ctx, o.vars.as_ptr(), {}) }};",
        orbit.state_len
    ));
    body.indent -= 1;
    body.line("}");
    let stop = body.cond_expr(&orbit.stop_condition);
    body.line(&format!("if {stop} {{ break; }}"));
    body.line("if unsafe { (o.host.should_abort)(o.host.ctx) } != 0 { break; }");
    body.indent -= 1;
    body.line("}");
    body.stmts(&orbit.end);
    body.line(&format!("o.vars[{VAR_N}].re as u32"));

    let _ = write!(
        out,
        r#"#[no_mangle]
pub unsafe extern "C" fn fractum_orbit_render(o: *mut Orbit, x: f64, y: f64, record: u32) -> u32 {{
    let o = &mut *o;
{}}}

"#,
        body.out
    );
}

fn emit_color(out: &mut String, program: &FractalProgram) {
    let color = &program.color;
    emit_state_struct(
        out,
        "Color",
        "fractum_color",
        color.vars.len(),
        color.number_slots,
    );

    let _ = write!(
        out,
        r#"#[no_mangle]
pub unsafe extern "C" fn fractum_color_set_state(o: *mut Color, state: *const C, len: usize) {{
    let o = &mut *o;
    let n = if len < {state_len} {{ len }} else {{ {state_len} }};
    std::ptr::copy_nonoverlapping(state, o.vars.as_mut_ptr(), n);
}}

"#,
        state_len = color.state_len
    );

    let mut body = Emitter::new(1);
    body.stmts(&color.init);
    body.line(&format!("let mut out: u32 = {:#010X};", color.background));
    for rule in &color.rules {
        let cond = body.cond_expr(&rule.condition);
        body.line(&format!("if {cond} {{"));
        body.indent += 1;
        let contribution = match &rule.color {
            ColorValue::Literal(argb) => format!("{argb:#010X}u32"),
            ColorValue::Palette { palette, index } => {
                let t = body.real_expr(index);
                format!("unsafe {{ (o.host.palette_get)(o.host.ctx, {palette}u32, {t}) }}")
            }
        };
        let opacity = body.real_expr(&rule.opacity);
        body.line(&format!("out = mixc(out, {contribution}, {opacity});"));
        body.indent -= 1;
        body.line("}");
    }
    body.line("out");

    let _ = write!(
        out,
        r#"#[no_mangle]
pub unsafe extern "C" fn fractum_color_render(o: *mut Color) -> u32 {{
    let o = &mut *o;
{}}}

"#,
        body.out
    );
}

/// Map a rustc failure back to DSL source via the emitted `// dsl:` markers:
/// take the first reported error line and the closest marker above it.
pub(crate) fn map_rustc_error(generated: &str, stderr: &str) -> Diagnostic {
    let message = stderr
        .lines()
        .find(|l| l.starts_with("error"))
        .unwrap_or("generated source rejected by rustc")
        .to_string();

    let mut position = None;
    if let Some(loc) = stderr.lines().find_map(|l| {
        let rest = l.trim().strip_prefix("--> ")?;
        let mut parts = rest.rsplitn(3, ':');
        let _col = parts.next()?;
        let line: usize = parts.next()?.parse().ok()?;
        Some(line)
    }) {
        for (idx, text) in generated.lines().enumerate() {
            if idx + 1 > loc {
                break;
            }
            if let Some(marker) = text.trim().strip_prefix("// dsl:") {
                let mut parts = marker.split(':');
                if let (Some(line), Some(column)) = (
                    parts.next().and_then(|p| p.parse().ok()),
                    parts.next().and_then(|p| p.parse().ok()),
                ) {
                    position = Some((line, column));
                }
            }
        }
    }

    let (line, column) = position.unwrap_or((0, 0));
    Diagnostic {
        kind: DiagnosticKind::Internal,
        line,
        column,
        char_index: 0,
        length: 0,
        message,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fractum_compiler::parse::CompileOptions;

    use super::{UnitParts, emit_unit, map_rustc_error};

    fn program(source: &str) -> Arc<fractum_compiler::program::FractalProgram> {
        Arc::new(fractum_compiler::compile(source, CompileOptions::default()).unwrap())
    }

    const MANDELBROT: &str = r#"
        fractal {
            orbit(-2,-2,2,2) [z] {
                z = (0,0);
                loop 0,100 (mod(z) > 2) {
                    z = z*z + (xstart, ystart);
                }
            }
            color(#FF000000) {
                rule (n < 100) [1] { #FFFFFFFF }
            }
        }
    "#;

    #[test]
    fn test_emitted_unit_shape() {
        let program = program(MANDELBROT);
        let source = emit_unit(&program, UnitParts::Combined);
        assert!(source.contains("fractum_orbit_render"));
        assert!(source.contains("fractum_color_render"));
        assert!(source.contains("cmul"));
        // Slot stores for the three complex producers in the loop body.
        assert!(source.contains("o.ns[1]"));
        assert!(source.contains("o.ns[3]"));
        // Statement markers present for error mapping.
        assert!(source.contains("// dsl:"));
    }

    #[test]
    fn test_prologue_indices_follow_the_global_table() {
        use fractum_compiler::var_scope::GlobalName;

        let program = program(MANDELBROT);
        let source = emit_unit(&program, UnitParts::Orbit);
        let pi = GlobalName::Pi as usize;
        let e = GlobalName::E as usize;
        let n = GlobalName::N as usize;
        assert!(source.contains(&format!("o.vars[{pi}] = cr(PI);")));
        assert!(source.contains(&format!("o.vars[{e}] = cr(E);")));
        assert!(source.contains(&format!("o.vars[{}] = cr(x);", GlobalName::Xstart as usize)));
        assert!(source.contains(&format!("o.vars[{}] = cr(y);", GlobalName::Ystart as usize)));
        assert!(source.contains(&format!("o.vars[{n}].re as u32")));
    }

    #[test]
    fn test_fast_math_swaps_intrinsics() {
        let program = Arc::new(
            fractum_compiler::compile(
                MANDELBROT,
                CompileOptions {
                    fast_math: true,
                    combined_unit: false,
                },
            )
            .unwrap(),
        );
        let source = emit_unit(&program, UnitParts::Orbit);
        assert!(source.contains("0.775"));
        let standard = emit_unit(&self::program(MANDELBROT), UnitParts::Orbit);
        assert!(!standard.contains("0.775"));
    }

    #[test]
    fn test_rustc_error_maps_to_marker() {
        let generated = "fn f() {\n// dsl:7:9\nlet x = ;\n}\n";
        let stderr = "error: expected expression\n  --> unit.rs:3:9\n";
        let diagnostic = map_rustc_error(generated, stderr);
        assert_eq!(diagnostic.line, 7);
        assert_eq!(diagnostic.column, 9);
    }
}
