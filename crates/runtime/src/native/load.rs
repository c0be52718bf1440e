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

//! Loading compiled units and bridging them to the backend traits.
//!
//! Each instance owns a state struct inside the loaded library plus a host
//! context on this side of the boundary. The generated code calls back for
//! trap containment, palette lookups, the abort flag and trace recording,
//! so those stay implemented once, host-side.

use std::os::raw::c_void;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use fractum_compiler::program::FractalProgram;
use fractum_math::Complex;
use libloading::Library;
use tempfile::TempDir;

use crate::color::{Argb, Color};
use crate::factory::{ColorFactory, OrbitFactory};
use crate::interp::{Frame, VAR_S, build_trap, math_mode};
use crate::orbit::{Orbit, OrbitTrace, Region};
use crate::palette::Palette;
use crate::trap::Trap;

/// Mirror of the generated unit's complex struct. `fractum_math::Complex`
/// is not `repr(C)`, so values cross the boundary through this layout.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
struct CComplex {
    re: f64,
    im: f64,
}

impl From<Complex> for CComplex {
    fn from(z: Complex) -> Self {
        Self { re: z.re, im: z.im }
    }
}

impl From<CComplex> for Complex {
    fn from(z: CComplex) -> Self {
        Complex::new(z.re, z.im)
    }
}

/// Mirror of the generated unit's `Host` struct. Field order is ABI.
#[repr(C)]
struct HostTable {
    ctx: *mut c_void,
    trap_contains: unsafe extern "C" fn(*mut c_void, u32, f64, f64) -> u32,
    palette_get: unsafe extern "C" fn(*mut c_void, u32, f64) -> u32,
    should_abort: unsafe extern "C" fn(*mut c_void) -> u32,
    trace_step: unsafe extern "C" fn(*mut c_void, *const CComplex, usize),
}

/// Host-side state one generated instance calls back into. Boxed so its
/// address is stable for the lifetime of the instance.
#[derive(Default)]
struct HostCtx {
    traps: Vec<Trap>,
    palettes: Vec<Palette>,
    abort: Option<Arc<AtomicBool>>,
    trace: Vec<Vec<Complex>>,
}

unsafe extern "C" fn trap_contains_cb(ctx: *mut c_void, trap: u32, re: f64, im: f64) -> u32 {
    let ctx = &*(ctx as *const HostCtx);
    u32::from(
        ctx.traps
            .get(trap as usize)
            .is_some_and(|t| t.contains((re, im))),
    )
}

unsafe extern "C" fn palette_get_cb(ctx: *mut c_void, palette: u32, t: f64) -> u32 {
    let ctx = &*(ctx as *const HostCtx);
    ctx.palettes
        .get(palette as usize)
        .map(|p| p.get(t).0)
        .unwrap_or_default()
}

unsafe extern "C" fn should_abort_cb(ctx: *mut c_void) -> u32 {
    let ctx = &*(ctx as *const HostCtx);
    u32::from(
        ctx.abort
            .as_ref()
            .is_some_and(|abort| abort.load(Ordering::Relaxed)),
    )
}

unsafe extern "C" fn trace_step_cb(ctx: *mut c_void, state: *const CComplex, len: usize) {
    let ctx = &mut *(ctx as *mut HostCtx);
    let state = std::slice::from_raw_parts(state, len);
    ctx.trace
        .push(state.iter().map(|z| Complex::from(*z)).collect());
}

fn host_table(ctx: &mut HostCtx) -> HostTable {
    HostTable {
        ctx: ctx as *mut HostCtx as *mut c_void,
        trap_contains: trap_contains_cb,
        palette_get: palette_get_cb,
        should_abort: should_abort_cb,
        trace_step: trace_step_cb,
    }
}

#[derive(Copy, Clone)]
pub(crate) struct OrbitVtable {
    new: unsafe extern "C" fn(HostTable) -> *mut c_void,
    free: unsafe extern "C" fn(*mut c_void),
    init: unsafe extern "C" fn(*mut c_void),
    set_time: unsafe extern "C" fn(*mut c_void, f64),
    time: unsafe extern "C" fn(*const c_void) -> f64,
    state: unsafe extern "C" fn(*const c_void, *mut CComplex, usize),
    render: unsafe extern "C" fn(*mut c_void, f64, f64, u32) -> u32,
}

impl OrbitVtable {
    pub(crate) fn resolve(library: &Library) -> Result<Self, libloading::Error> {
        unsafe {
            Ok(Self {
                new: *library.get(b"fractum_orbit_new")?,
                free: *library.get(b"fractum_orbit_free")?,
                init: *library.get(b"fractum_orbit_init")?,
                set_time: *library.get(b"fractum_orbit_set_time")?,
                time: *library.get(b"fractum_orbit_time")?,
                state: *library.get(b"fractum_orbit_state")?,
                render: *library.get(b"fractum_orbit_render")?,
            })
        }
    }
}

#[derive(Copy, Clone)]
pub(crate) struct ColorVtable {
    new: unsafe extern "C" fn(HostTable) -> *mut c_void,
    free: unsafe extern "C" fn(*mut c_void),
    init: unsafe extern "C" fn(*mut c_void),
    set_time: unsafe extern "C" fn(*mut c_void, f64),
    time: unsafe extern "C" fn(*const c_void) -> f64,
    set_state: unsafe extern "C" fn(*mut c_void, *const CComplex, usize),
    render: unsafe extern "C" fn(*mut c_void) -> u32,
}

impl ColorVtable {
    pub(crate) fn resolve(library: &Library) -> Result<Self, libloading::Error> {
        unsafe {
            Ok(Self {
                new: *library.get(b"fractum_color_new")?,
                free: *library.get(b"fractum_color_free")?,
                init: *library.get(b"fractum_color_init")?,
                set_time: *library.get(b"fractum_color_set_time")?,
                time: *library.get(b"fractum_color_time")?,
                set_state: *library.get(b"fractum_color_set_state")?,
                render: *library.get(b"fractum_color_render")?,
            })
        }
    }
}

/// Build the orbit's traps host-side. Trap expressions index the orbit's
/// variable table and scratch pool, so the frame is sized for the orbit
/// program no matter which instance is asking.
fn build_traps(program: &FractalProgram) -> Vec<Trap> {
    let mut frame = Frame::new(
        program.orbit.vars.len(),
        program.orbit.number_slots,
        math_mode(program.options.fast_math),
    );
    frame.reset();
    program
        .orbit
        .traps
        .iter()
        .map(|t| build_trap(&mut frame, t))
        .collect()
}

pub struct NativeOrbit {
    program: Arc<FractalProgram>,
    vtable: OrbitVtable,
    raw: *mut c_void,
    ctx: Box<HostCtx>,
    state: Vec<Complex>,
    region: Region,
    _library: Arc<Library>,
}

// The raw instance pointer is owned by this struct alone; moving it to
// another worker thread is fine, sharing it is not.
unsafe impl Send for NativeOrbit {}

impl NativeOrbit {
    pub(crate) fn new(
        program: Arc<FractalProgram>,
        vtable: OrbitVtable,
        library: Arc<Library>,
    ) -> Self {
        let mut ctx = Box::new(HostCtx::default());
        let raw = unsafe { (vtable.new)(host_table(&mut ctx)) };
        let state = vec![Complex::ZERO; program.orbit.state_len];
        let region = Region::from_corners(program.orbit.region);
        Self {
            program,
            vtable,
            raw,
            ctx,
            state,
            region,
            _library: library,
        }
    }
}

impl Drop for NativeOrbit {
    fn drop(&mut self) {
        unsafe { (self.vtable.free)(self.raw) };
    }
}

impl Orbit for NativeOrbit {
    fn init(&mut self) {
        self.ctx.traps = build_traps(&self.program);
        unsafe { (self.vtable.init)(self.raw) };
    }

    fn render(&mut self, point: (f64, f64), trace: Option<&mut OrbitTrace>) -> u32 {
        self.ctx.trace.clear();
        let record = u32::from(trace.is_some());
        let count = unsafe { (self.vtable.render)(self.raw, point.0, point.1, record) };

        let mut buffer = vec![CComplex { re: 0.0, im: 0.0 }; self.state.len()];
        unsafe { (self.vtable.state)(self.raw, buffer.as_mut_ptr(), buffer.len()) };
        for (dst, src) in self.state.iter_mut().zip(&buffer) {
            *dst = Complex::from(*src);
        }

        if let Some(out) = trace {
            out.append(&mut self.ctx.trace);
        }
        count
    }

    fn state(&self) -> &[Complex] {
        &self.state
    }

    fn region(&self) -> Region {
        self.region
    }

    fn set_time(&mut self, time: f64) {
        unsafe { (self.vtable.set_time)(self.raw, time) };
    }

    fn time(&self) -> f64 {
        unsafe { (self.vtable.time)(self.raw) }
    }

    fn set_abort(&mut self, abort: Arc<AtomicBool>) {
        self.ctx.abort = Some(abort);
    }

    fn number_slots(&self) -> usize {
        self.program.orbit.number_slots
    }
}

pub struct NativeColor {
    program: Arc<FractalProgram>,
    vtable: ColorVtable,
    raw: *mut c_void,
    ctx: Box<HostCtx>,
    _library: Arc<Library>,
}

unsafe impl Send for NativeColor {}

impl NativeColor {
    pub(crate) fn new(
        program: Arc<FractalProgram>,
        vtable: ColorVtable,
        library: Arc<Library>,
    ) -> Self {
        let mut ctx = Box::new(HostCtx::default());
        let raw = unsafe { (vtable.new)(host_table(&mut ctx)) };
        Self {
            program,
            vtable,
            raw,
            ctx,
            _library: library,
        }
    }
}

impl Drop for NativeColor {
    fn drop(&mut self) {
        unsafe { (self.vtable.free)(self.raw) };
    }
}

impl Color for NativeColor {
    fn init(&mut self) {
        let program = self.program.clone();
        self.ctx.traps = build_traps(&program);

        // Easing expressions were compiled against the color program, so
        // bake with a color-sized frame sweeping the `s` global.
        let mut frame = Frame::new(
            program.color.vars.len(),
            program.color.number_slots,
            math_mode(program.options.fast_math),
        );
        frame.reset();
        self.ctx.palettes = program
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

        unsafe { (self.vtable.init)(self.raw) };
    }

    fn set_state(&mut self, state: &[Complex]) {
        let buffer: Vec<CComplex> = state.iter().map(|z| CComplex::from(*z)).collect();
        unsafe { (self.vtable.set_state)(self.raw, buffer.as_ptr(), buffer.len()) };
    }

    fn render(&mut self) -> Argb {
        Argb(unsafe { (self.vtable.render)(self.raw) })
    }

    fn set_time(&mut self, time: f64) {
        unsafe { (self.vtable.set_time)(self.raw, time) };
    }

    fn time(&self) -> f64 {
        unsafe { (self.vtable.time)(self.raw) }
    }

    fn number_slots(&self) -> usize {
        self.program.color.number_slots
    }
}

/// Keeps the loaded library and its temporary build directory alive for as
/// long as any factory clone or instance exists.
pub struct NativeOrbitFactory {
    program: Arc<FractalProgram>,
    vtable: OrbitVtable,
    library: Arc<Library>,
    _dir: Arc<TempDir>,
}

impl NativeOrbitFactory {
    pub(crate) fn new(
        program: Arc<FractalProgram>,
        library: Arc<Library>,
        dir: Arc<TempDir>,
    ) -> Result<Self, libloading::Error> {
        let vtable = OrbitVtable::resolve(&library)?;
        Ok(Self {
            program,
            vtable,
            library,
            _dir: dir,
        })
    }
}

impl OrbitFactory for NativeOrbitFactory {
    fn create(&self) -> Box<dyn Orbit> {
        Box::new(NativeOrbit::new(
            self.program.clone(),
            self.vtable,
            self.library.clone(),
        ))
    }
}

pub struct NativeColorFactory {
    program: Arc<FractalProgram>,
    vtable: ColorVtable,
    library: Arc<Library>,
    _dir: Arc<TempDir>,
}

impl NativeColorFactory {
    pub(crate) fn new(
        program: Arc<FractalProgram>,
        library: Arc<Library>,
        dir: Arc<TempDir>,
    ) -> Result<Self, libloading::Error> {
        let vtable = ColorVtable::resolve(&library)?;
        Ok(Self {
            program,
            vtable,
            library,
            _dir: dir,
        })
    }
}

impl ColorFactory for NativeColorFactory {
    fn create(&self) -> Box<dyn Color> {
        Box::new(NativeColor::new(
            self.program.clone(),
            self.vtable,
            self.library.clone(),
        ))
    }
}
