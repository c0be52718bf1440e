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

//! Whole-pipeline scenarios against the interpreter backend: compile a
//! source text, run orbit and color instances, check the pixels.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use pretty_assertions::assert_eq;
use test_case::test_case;
use unindent::unindent;

use fractum_compiler::parse::CompileOptions;
use fractum_runtime::{Argb, Factories, build_factories};

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

fn factories(source: &str) -> Factories {
    build_factories(&unindent(source), CompileOptions::default())
        .expect("program should compile")
}

fn render_pixel(factories: &Factories, point: (f64, f64)) -> (u32, Argb) {
    let mut orbit = factories.orbit.create();
    orbit.init();
    let count = orbit.render(point, None);

    let mut color = factories.color.create();
    color.init();
    color.set_state(orbit.state());
    (count, color.render())
}

// The origin never escapes, so the loop runs out and the rule stays off;
// a far point escapes on the first iteration and colors white.
#[test_case((0.0, 0.0), 100, 0xFF000000 ; "interior point runs the loop out")]
#[test_case((2.0, 2.0), 1, 0xFFFFFFFF ; "exterior point escapes immediately")]
fn test_mandelbrot_pixels(point: (f64, f64), count: u32, argb: u32) {
    let factories = factories(MANDELBROT);
    let (actual_count, pixel) = render_pixel(&factories, point);
    assert_eq!(actual_count, count);
    assert_eq!(pixel, Argb(argb));
}

#[test]
fn test_trace_records_one_snapshot_per_iteration() {
    let factories = factories(MANDELBROT);
    let mut orbit = factories.orbit.create();
    orbit.init();

    let mut trace = vec![];
    let count = orbit.render((2.0, 2.0), Some(&mut trace));
    assert_eq!(count, 1);
    assert_eq!(trace.len(), 1);
    // Snapshots carry the shared state section: 6 globals plus `z`.
    assert_eq!(trace[0].len(), 7);

    trace.clear();
    orbit.render((0.0, 0.0), Some(&mut trace));
    assert_eq!(trace.len(), 100);
}

#[test]
fn test_abort_flag_stops_iteration() {
    let factories = factories(MANDELBROT);
    let mut orbit = factories.orbit.create();
    orbit.init();

    let abort = Arc::new(AtomicBool::new(true));
    orbit.set_abort(abort);
    // The flag is checked after each iteration, so exactly one runs.
    assert_eq!(orbit.render((0.0, 0.0), None), 1);
}

#[test]
fn test_rules_accumulate_in_declaration_order() {
    let factories = factories(
        r#"
        fractal {
            orbit(-2,-2,2,2) {
                loop 0,10 (n >= 10) { }
            }
            color(#FF000000) {
                rule (n > 0) [0.5] { #FFFF0000 }
                rule (n > 0) [0.5] { #FF0000FF }
            }
        }
    "#,
    );
    let (_, pixel) = render_pixel(&factories, (0.0, 0.0));
    let expected = Argb(0xFF000000)
        .mix(Argb(0xFFFF0000), 0.5)
        .mix(Argb(0xFF0000FF), 0.5);
    assert_eq!(pixel, expected);
}

#[test]
fn test_disjoint_rules_are_order_independent() {
    let head = r#"
        fractal {
            orbit(-2,-2,2,2) [z] {
                z = (0,0);
                loop 0,100 (mod(z) > 2) {
                    z = z*z + (xstart, ystart);
                }
            }
            color(#FF000000) {
    "#;
    let tail = "    }\n}\n";
    let rule_a = "        rule (n < 100) [1] { #FFFF0000 }\n";
    let rule_b = "        rule (n >= 100) [1] { #FF0000FF }\n";

    let forward = factories(&format!("{head}{rule_a}{rule_b}{tail}"));
    let backward = factories(&format!("{head}{rule_b}{rule_a}{tail}"));
    for point in [(0.0, 0.0), (2.0, 2.0), (0.3, 0.5)] {
        assert_eq!(
            render_pixel(&forward, point).1,
            render_pixel(&backward, point).1
        );
    }
}

#[test]
fn test_trap_stops_orbit() {
    let factories = factories(
        r#"
        fractal {
            orbit(-2,-2,2,2) [z] {
                trap box ((0,0)) {
                    moveto((1,1));
                    lineto((1,-1));
                    lineto((-1,-1));
                    lineto((-1,1));
                    close();
                }
                z = (2,0);
                loop 0,10 (trap box (z)) {
                    z = z - (0.3,0);
                }
            }
            color(#FF000000) { }
        }
    "#,
    );
    let mut orbit = factories.orbit.create();
    orbit.init();
    // z walks left from 2 by 0.3 per step; it enters the box at 0.8.
    assert_eq!(orbit.render((0.0, 0.0), None), 4);
}

#[test]
fn test_trap_condition_in_color_rule() {
    let factories = factories(
        r#"
        fractal {
            orbit(-2,-2,2,2) [z] {
                trap box ((0,0)) {
                    moveto((1,1));
                    lineto((1,-1));
                    lineto((-1,-1));
                    lineto((-1,1));
                    close();
                }
                z = (xstart, ystart);
                loop 0,1 (n >= 1) { }
            }
            color(#FF000000) {
                rule (trap box (z)) [1] { #FFFFFFFF }
            }
        }
    "#,
    );
    assert_eq!(render_pixel(&factories, (0.5, 0.5)).1, Argb(0xFFFFFFFF));
    assert_eq!(render_pixel(&factories, (1.5, 0.0)).1, Argb(0xFF000000));
}

#[test]
fn test_palette_rule_indexes_baked_table() {
    let factories = factories(
        r#"
        fractal {
            orbit(-2,-2,2,2) [z] {
                z = (0,0);
                loop 0,100 (mod(z) > 2) {
                    z = z*z + (xstart, ystart);
                }
            }
            color(#FF000000) {
                palette grad {
                    [#FF000000, #FFFFFFFF, 100];
                }
                rule (n >= 0) [1] { grad[n] }
            }
        }
    "#,
    );
    // The far point escapes at n = 1: entry 1 of a 100-step black-to-white
    // ramp, so each channel is round(255 / 100).
    let (_, pixel) = render_pixel(&factories, (2.0, 2.0));
    assert_eq!(pixel.red(), 3);
    assert_eq!(pixel.alpha(), 0xFF);
}

#[test]
fn test_time_binds_into_programs() {
    let factories = factories(
        r#"
        fractal {
            orbit(-2,-2,2,2) [z] {
                z = (time(), 0);
                loop 0,10 (mod(z) > 2) {
                    z = z + (1,0);
                }
            }
            color(#FF000000) { }
        }
    "#,
    );
    let mut orbit = factories.orbit.create();
    orbit.init();
    orbit.set_time(2.5);
    assert_eq!(orbit.time(), 2.5);
    // z starts at 2.5 and escapes immediately; with time 0 it takes longer.
    assert_eq!(orbit.render((0.0, 0.0), None), 1);
    orbit.set_time(0.0);
    assert_eq!(orbit.render((0.0, 0.0), None), 3);
}

#[test]
fn test_factories_share_nothing_across_threads() {
    let factories = factories(MANDELBROT);
    let points: Vec<(f64, f64)> = (0..16)
        .map(|i| (-2.0 + 0.25 * i as f64, 0.4))
        .collect();

    let run = |factories: Factories, points: Vec<(f64, f64)>| {
        std::thread::spawn(move || {
            let mut orbit = factories.orbit.create();
            orbit.init();
            points
                .iter()
                .map(|p| orbit.render(*p, None))
                .collect::<Vec<u32>>()
        })
    };

    let a = run(factories.clone(), points.clone());
    let b = run(factories, points);
    assert_eq!(a.join().unwrap(), b.join().unwrap());
}

#[test]
fn test_region_comes_from_orbit_header() {
    let factories = factories(MANDELBROT);
    let orbit = factories.orbit.create();
    let region = orbit.region();
    assert_eq!(region.width(), 4.0);
    assert_eq!(region.height(), 4.0);
}
