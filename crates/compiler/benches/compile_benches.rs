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

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use fractum_compiler::{CompileOptions, compile, parse_program};

const MANDELBROT: &str = r#"
    fractal {
        orbit(-2,-2,2,2) [z] {
            z = (0,0);
            loop 0,1000 (mod(z) > 2) {
                z = z*z + (xstart, ystart);
            }
        }
        color(#FF000000) {
            palette grad {
                [#FF000000, #FFFFFFFF, 256, s^2];
            }
            init {
                t = n / 1000;
            }
            rule (n < 1000) [1] { grad[t] }
        }
    }
"#;

const JULIA_TRAPS: &str = r#"
    fractal {
        orbit(-2,-2,2,2) [z, d] {
            trap ring ((0,0)) {
                moveto((1,0));
                quadto((1,1), (0,1));
                quadto((-1,1), (-1,0));
                quadto((-1,-1), (0,-1));
                quadto((1,-1), (1,0));
                close();
            }
            z = (xstart, ystart);
            d = (0,0);
            loop 0,500 (mod(z) > 4 | trap ring (z)) {
                z = z^2 + (0.285, 0.01);
                if (mod(z) < mod(d)) { d = z; }
            }
        }
        color(#FF000000) {
            palette cool {
                [#FF000080, #FF00FFFF, 128];
                [#FF00FFFF, #FFFFFFFF, 128, s*s];
            }
            init {
                t = mod(d) * 64;
            }
            rule (n < 500) [1] { cool[t] }
            rule (n >= 500) [0.5] { #FF101010 }
        }
    }
"#;

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.bench_function("mandelbrot", |b| {
        b.iter(|| parse_program(black_box(MANDELBROT)).unwrap())
    });
    group.bench_function("julia_traps", |b| {
        b.iter(|| parse_program(black_box(JULIA_TRAPS)).unwrap())
    });
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    group.bench_function("mandelbrot", |b| {
        b.iter(|| compile(black_box(MANDELBROT), CompileOptions::default()).unwrap())
    });
    group.bench_function("julia_traps", |b| {
        b.iter(|| compile(black_box(JULIA_TRAPS), CompileOptions::default()).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_parse, bench_compile);
criterion_main!(benches);
