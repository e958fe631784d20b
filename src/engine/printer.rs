//! Output streams.
//!
//! A printer owns its sink exclusively, so printers are never copied; every
//! entry point here borrows the printer mutably (keep) and reports failures.

use std::io::Write;

use super::aff::RawAff;
use super::constraint::RawConstraint;
use super::ctx::Ctx;
use super::format;
use super::map::{RawBasicMap, RawMap, RawUnionMap};
use super::mat::RawMat;
use super::object::Obj;
use super::point::RawPoint;
use super::schedule::RawSchedule;
use super::set::{RawBasicSet, RawSet, RawUnionSet};
use super::space::RawSpace;
use super::val::RawVal;
use super::{Format, Stat};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Sink {
    Stdout,
    Buffer(String),
}

/// Payload of a printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterData {
    sink: Sink,
    format: Format,
}

/// Engine printer object.
pub type RawPrinter = Obj<PrinterData>;

/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn printer_to_str(ctx: *mut Ctx) -> *mut RawPrinter {
    // SAFETY: forwarded from the caller.
    unsafe {
        Obj::alloc(
            ctx,
            PrinterData {
                sink: Sink::Buffer(String::new()),
                format: Format::Isl,
            },
        )
    }
}

/// # Safety
///
/// `ctx` must be a live context.
pub unsafe fn printer_to_stdout(ctx: *mut Ctx) -> *mut RawPrinter {
    // SAFETY: forwarded from the caller.
    unsafe {
        Obj::alloc(
            ctx,
            PrinterData {
                sink: Sink::Stdout,
                format: Format::Isl,
            },
        )
    }
}

/// # Safety
///
/// `p` must be null or a live printer owned by the caller.
pub unsafe fn printer_free(p: *mut RawPrinter) {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::free(p) }
}

/// # Safety
///
/// `p` must be a live printer (keep).
pub unsafe fn printer_get_ctx(p: *const RawPrinter) -> *mut Ctx {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::ctx(p) }
}

/// # Safety
///
/// `p` must be a live printer (keep).
pub unsafe fn printer_set_output_format(p: *mut RawPrinter, format: Format) {
    // SAFETY: printers are never shared.
    unsafe { Obj::get_mut(p) }.format = format;
}

/// # Safety
///
/// `p` must be a live printer (keep).
pub unsafe fn printer_get_output_format(p: *const RawPrinter) -> Format {
    // SAFETY: forwarded from the caller.
    unsafe { Obj::get(p) }.format
}

/// Write raw text (keep).
///
/// # Safety
///
/// `p` must be a live printer.
pub unsafe fn printer_print_str(p: *mut RawPrinter, text: &str) -> Stat {
    // SAFETY: printers are never shared.
    let data = unsafe { Obj::get_mut(p) };
    let written = match &mut data.sink {
        Sink::Buffer(buffer) => {
            buffer.push_str(text);
            Ok(())
        }
        Sink::Stdout => std::io::stdout().lock().write_all(text.as_bytes()),
    };
    match written {
        Ok(()) => Stat::Ok,
        Err(err) => {
            // SAFETY: forwarded from the caller.
            unsafe { Obj::report(p, format!("write failed: {}", err)) };
            Stat::Error
        }
    }
}

/// Buffered output so far; `None` for stdout printers (keep).
///
/// # Safety
///
/// `p` must be a live printer.
pub unsafe fn printer_get_str(p: *const RawPrinter) -> Option<String> {
    // SAFETY: forwarded from the caller.
    match &unsafe { Obj::get(p) }.sink {
        Sink::Buffer(buffer) => Some(buffer.clone()),
        Sink::Stdout => None,
    }
}

/// Drain the buffered output; `None` for stdout printers (keep).
///
/// # Safety
///
/// `p` must be a live printer.
pub unsafe fn printer_take_str(p: *mut RawPrinter) -> Option<String> {
    // SAFETY: printers are never shared.
    match &mut unsafe { Obj::get_mut(p) }.sink {
        Sink::Buffer(buffer) => Some(std::mem::take(buffer)),
        Sink::Stdout => None,
    }
}

/// # Safety
///
/// `p` must be a live printer (keep).
pub unsafe fn printer_flush(p: *mut RawPrinter) -> Stat {
    // SAFETY: forwarded from the caller.
    let data = unsafe { Obj::get(p) };
    if data.sink != Sink::Stdout {
        return Stat::Ok;
    }
    match std::io::stdout().lock().flush() {
        Ok(()) => Stat::Ok,
        Err(err) => {
            // SAFETY: forwarded from the caller.
            unsafe { Obj::report(p, format!("flush failed: {}", err)) };
            Stat::Error
        }
    }
}

unsafe fn emit<T>(p: *mut RawPrinter, obj: *const Obj<T>, render: fn(&T, Format) -> Result<String, String>) -> Stat {
    // SAFETY: forwarded from the caller.
    unsafe {
        let format = Obj::get(p).format;
        match render(Obj::get(obj), format) {
            Ok(text) => printer_print_str(p, &text),
            Err(message) => {
                Obj::report(p, message);
                Stat::Error
            }
        }
    }
}

macro_rules! print_fn {
    ($name:ident, $raw:ty, $render:expr) => {
        /// Print an object in the printer's output format (keep, keep).
        ///
        /// # Safety
        ///
        /// Both pointers must be live objects.
        pub unsafe fn $name(p: *mut RawPrinter, obj: *const $raw) -> Stat {
            // SAFETY: forwarded from the caller.
            unsafe { emit(p, obj, $render) }
        }
    };
}

print_fn!(printer_print_space, RawSpace, format::space);
print_fn!(printer_print_val, RawVal, format::val);
print_fn!(printer_print_aff, RawAff, format::aff);
print_fn!(printer_print_constraint, RawConstraint, format::constraint);
print_fn!(printer_print_basic_set, RawBasicSet, |s, f| format::poly(&s.0, f));
print_fn!(printer_print_set, RawSet, |s, f| format::poly(&s.0, f));
print_fn!(printer_print_union_set, RawUnionSet, |s, f| format::union(&s.0, f));
print_fn!(printer_print_basic_map, RawBasicMap, |m, f| format::poly(&m.0, f));
print_fn!(printer_print_map, RawMap, |m, f| format::poly(&m.0, f));
print_fn!(printer_print_union_map, RawUnionMap, |m, f| format::union(&m.0, f));
print_fn!(printer_print_point, RawPoint, format::point);
print_fn!(printer_print_mat, RawMat, format::mat);
print_fn!(printer_print_schedule, RawSchedule, format::schedule);
