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

//! End-to-end tests for the typed lowering pass: parse a whole program,
//! compile it, and inspect the typed form or the error.

use pretty_assertions::assert_eq;
use test_case::test_case;
use unindent::unindent;

use crate::ast::FractalDecl;
use crate::codegen::compile_fractal;
use crate::errors::CompileError;
use crate::parse::{CompileOptions, parse_program};
use crate::program::{FractalProgram, TypedCond, TypedExpr, TypedStmt};

fn parse(source: &str) -> FractalDecl {
    parse_program(source).expect("program should parse")
}

fn compile_ok(source: &str) -> FractalProgram {
    compile_fractal(&parse(source), CompileOptions::default()).expect("program should compile")
}

fn compile_err(source: &str) -> CompileError {
    compile_fractal(&parse(source), CompileOptions::default())
        .expect_err("program should not compile")
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
fn test_mandelbrot_lowers() {
    let program = compile_ok(&unindent(MANDELBROT));

    // 6 predeclared globals plus the declared state variable `z`.
    assert_eq!(program.orbit.state_len, 7);
    let z = program.orbit.vars.last().unwrap();
    assert_eq!(z.name, "z");
    assert!(!z.is_real);
    assert!(z.is_state);

    assert_eq!(program.orbit.loop_start, 0);
    assert_eq!(program.orbit.loop_end, 100);
    assert_eq!(program.orbit.begin.len(), 1);
    assert_eq!(program.orbit.loop_body.len(), 1);

    // The color variable table mirrors the orbit's state section.
    assert_eq!(program.color.state_len, program.orbit.state_len);
    for (o, c) in program
        .orbit
        .vars
        .iter()
        .zip(&program.color.vars)
        .take(program.orbit.state_len)
    {
        assert_eq!(o.name, c.name);
        assert_eq!(o.is_real, c.is_real);
    }
    assert_eq!(program.color.rules.len(), 1);
    assert_eq!(program.color.background, 0xFF000000);
}

#[test]
fn test_slot_pool_counts_complex_producers() {
    let program = compile_ok(&unindent(MANDELBROT));
    // begin: one combine. body: z*z, the (xstart, ystart) combine, and the
    // outer addition. `mod(z)` is real-valued and takes no slot.
    assert_eq!(program.orbit.number_slots, 4);
    assert_eq!(program.color.number_slots, 0);
}

#[test]
fn test_real_pow_takes_a_slot() {
    let source = unindent(
        r#"
        fractal {
            orbit(-1,-1,1,1) {
                x = 2^3;
                loop 0,10 (x > 1) { }
            }
            color(#FF000000) { }
        }
    "#,
    );
    let program = compile_ok(&source);
    assert_eq!(program.orbit.number_slots, 1);
    let TypedStmt::Assign { expr, real_var, .. } = &program.orbit.begin[0] else {
        panic!("expected an assignment");
    };
    assert!(real_var);
    assert!(matches!(expr, TypedExpr::RealPow(_, _, _)));
}

#[test]
fn test_complex_into_real_reports_assignment_site() {
    let source = unindent(
        r#"
        fractal {
            orbit(-1,-1,1,1) {
                x = 1;
                x = (1,2);
                loop 0,10 (x > 1) { }
            }
            color(#FF000000) { }
        }
    "#,
    );
    let err = compile_err(&source);
    let CompileError::ComplexIntoReal(context, name) = &err else {
        panic!("expected ComplexIntoReal, got {err:?}");
    };
    assert_eq!(name, "x");
    assert_eq!(context.position.line, 4);

    let diagnostic = err.to_diagnostic();
    assert_eq!(diagnostic.line, 4);
    assert!(diagnostic.message.contains('x'));
}

#[test]
fn test_ordered_comparison_rejects_complex() {
    let source = unindent(
        r#"
        fractal {
            orbit(-1,-1,1,1) [z] {
                z = (0,0);
                loop 0,10 (z > 1) { }
            }
            color(#FF000000) { }
        }
    "#,
    );
    assert!(matches!(
        compile_err(&source),
        CompileError::TypeMismatch(_, _)
    ));
}

#[test]
fn test_equality_rejects_mixed_operands() {
    let source = unindent(
        r#"
        fractal {
            orbit(-1,-1,1,1) {
                x = 1;
                loop 0,10 (x = (1,2)) { }
            }
            color(#FF000000) { }
        }
    "#,
    );
    assert!(matches!(
        compile_err(&source),
        CompileError::TypeMismatch(_, _)
    ));
}

#[test]
fn test_equality_allows_complex() {
    let source = unindent(
        r#"
        fractal {
            orbit(-1,-1,1,1) [z] {
                z = (0,0);
                loop 0,10 (z = (1,0)) { z = z + (1,0); }
            }
            color(#FF000000) { }
        }
    "#,
    );
    compile_ok(&source);
}

#[test_case("x = frob(1);" => matches CompileError::UnknownFunction(_, _); "unknown function")]
#[test_case("x = sin(1, 2);" => matches CompileError::BadArity(_, _, 1, 2); "bad arity")]
#[test_case("pi = 3;" => matches CompileError::AssignToConst(_, _); "assign to constant")]
#[test_case("xstart = 0;" => matches CompileError::AssignToConst(_, _); "assign to input")]
#[test_case("x = y + 1;" => matches CompileError::UndeclaredVariable(_, _); "use before assignment")]
#[test_case("x = atan2((1,2), 1);" => matches CompileError::TypeMismatch(_, _); "real argument required")]
#[test_case("x = ((1,2), 1);" => matches CompileError::TypeMismatch(_, _); "combine needs real parts")]
fn test_begin_statement_errors(stmt: &str) -> CompileError {
    let source = format!(
        "fractal {{\n    orbit(-1,-1,1,1) {{\n        {stmt}\n        loop 0,10 (n < 10) {{ }}\n    }}\n    color(#FF000000) {{ }}\n}}\n"
    );
    compile_err(&source)
}

#[test]
fn test_if_branch_scope_is_discarded() {
    let source = unindent(
        r#"
        fractal {
            orbit(-1,-1,1,1) {
                x = 0;
                loop 0,10 (x > 1) {
                    if (n > 1) { t = 1; }
                    x = t;
                }
            }
            color(#FF000000) { }
        }
    "#,
    );
    let err = compile_err(&source);
    let CompileError::UndeclaredVariable(_, name) = err else {
        panic!("expected UndeclaredVariable, got {err:?}");
    };
    assert_eq!(name, "t");
}

#[test]
fn test_untyped_state_defaults_complex_on_first_use() {
    let source = unindent(
        r#"
        fractal {
            orbit(-1,-1,1,1) [w] {
                x = w;
                loop 0,10 (n < 10) { }
            }
            color(#FF000000) { }
        }
    "#,
    );
    let program = compile_ok(&source);
    let w = program.orbit.vars.iter().find(|v| v.name == "w").unwrap();
    assert!(!w.is_real);
    let x = program.orbit.vars.iter().find(|v| v.name == "x").unwrap();
    assert!(!x.is_real);
}

#[test]
fn test_trap_declaration_and_containment() {
    let source = unindent(
        r#"
        fractal {
            orbit(-2,-2,2,2) [z] {
                trap ring ((0,0)) {
                    moveto((1,0));
                    lineto((0,1));
                    close();
                }
                z = (0,0);
                loop 0,10 (trap ring (z)) {
                    z = z + (0.1, 0.1);
                }
            }
            color(#FF000000) { }
        }
    "#,
    );
    let program = compile_ok(&source);
    assert_eq!(program.orbit.traps.len(), 1);
    assert_eq!(program.orbit.traps[0].ops.len(), 3);
}

#[test]
fn test_trap_usable_in_color_rule() {
    let source = unindent(
        r#"
        fractal {
            orbit(-2,-2,2,2) [z] {
                trap ring ((0,0)) {
                    moveto((1,0));
                    lineto((0,1));
                    close();
                }
                z = (0,0);
                loop 0,10 (mod(z) > 2) {
                    z = z + (0.1, 0.1);
                }
            }
            color(#FF000000) {
                rule (trap ring (z)) [1] { #FFFFFFFF }
            }
        }
    "#,
    );
    let program = compile_ok(&source);
    assert!(matches!(
        program.color.rules[0].condition,
        TypedCond::TrapContains { trap: 0, .. }
    ));
}

#[test]
fn test_trap_path_arity_checked() {
    let source = unindent(
        r#"
        fractal {
            orbit(-2,-2,2,2) {
                trap box ((0,0)) {
                    moveto((1,0), (0,1));
                }
                loop 0,10 (n < 10) { }
            }
            color(#FF000000) { }
        }
    "#,
    );
    let err = compile_err(&source);
    let CompileError::BadPathArity(_, name, expected, given) = err else {
        panic!("expected BadPathArity, got {err:?}");
    };
    assert_eq!(name, "moveto");
    assert_eq!(expected, 1);
    assert_eq!(given, 2);
}

#[test]
fn test_unknown_trap_in_condition() {
    let source = unindent(
        r#"
        fractal {
            orbit(-2,-2,2,2) [z] {
                z = (0,0);
                loop 0,10 (trap nowhere (z)) { }
            }
            color(#FF000000) { }
        }
    "#,
    );
    assert!(matches!(
        compile_err(&source),
        CompileError::UnknownTrap(_, _)
    ));
}

#[test]
fn test_duplicate_state_variable() {
    let source = unindent(
        r#"
        fractal {
            orbit(-1,-1,1,1) [a, a] {
                loop 0,10 (n < 10) { }
            }
            color(#FF000000) { }
        }
    "#,
    );
    assert!(matches!(
        compile_err(&source),
        CompileError::Duplicate(_, _)
    ));
}

#[test]
fn test_duplicate_palette_rejected() {
    let source = unindent(
        r#"
        fractal {
            orbit(-1,-1,1,1) {
                loop 0,10 (n < 10) { }
            }
            color(#FF000000) {
                palette p { [#FF000000, #FFFFFFFF, 10]; }
                palette p { [#FF000000, #FFFFFFFF, 10]; }
            }
        }
    "#,
    );
    let err = compile_err(&source);
    let CompileError::Duplicate(_, name) = err else {
        panic!("expected Duplicate, got {err:?}");
    };
    assert_eq!(name, "p");
}

#[test]
fn test_unknown_palette_in_rule() {
    let source = unindent(
        r#"
        fractal {
            orbit(-1,-1,1,1) {
                loop 0,10 (n < 10) { }
            }
            color(#FF000000) {
                rule (n > 0) [1] { missing[n] }
            }
        }
    "#,
    );
    assert!(matches!(
        compile_err(&source),
        CompileError::UnknownPalette(_, _)
    ));
}

#[test]
fn test_rule_opacity_must_be_real() {
    let source = unindent(
        r#"
        fractal {
            orbit(-1,-1,1,1) {
                loop 0,10 (n < 10) { }
            }
            color(#FF000000) {
                rule (n > 0) [(1,2)] { #FFFFFFFF }
            }
        }
    "#,
    );
    assert!(matches!(
        compile_err(&source),
        CompileError::TypeMismatch(_, _)
    ));
}

#[test]
fn test_palette_easing_uses_s() {
    let source = unindent(
        r#"
        fractal {
            orbit(-1,-1,1,1) {
                loop 0,10 (n < 10) { }
            }
            color(#FF000000) {
                palette grad {
                    [#FF000000, #FFFFFFFF, 64, s^2];
                }
                rule (n > 0) [1] { grad[n] }
            }
        }
    "#,
    );
    let program = compile_ok(&source);
    let element = &program.color.palettes[0].elements[0];
    assert!(element.easing.is_some());
    // The easing `s^2` is a real pow, which still takes a slot.
    assert_eq!(program.color.number_slots, 1);
}
