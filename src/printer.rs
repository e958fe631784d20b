//! Text output for every printable kind.
//!
//! A [`Printer`] is a cursor over one engine output stream: either stdout or an
//! in-memory buffer. It is bound to a [`Context`], owns its stream exclusively
//! (so it is not `Clone`), and carries an [`OutputFormat`].
//!
//! Kinds become printable by implementing [`Print`] next to their other methods;
//! the printer itself knows nothing about individual kinds. Every printable
//! handle also implements [`Display`](std::fmt::Display) in the native format.
//!
//! # Example
//!
//! ```
//! use isle::{Context, OutputFormat, Printer, Set};
//!
//! let ctx = Context::new();
//! let set = Set::parse(&ctx, "{ A[a, b] : 0 <= a <= 9 and b >= 2 }")?;
//!
//! let mut printer = Printer::to_buffer(&ctx)?;
//! printer.set_format(OutputFormat::C);
//! printer.print(&set)?;
//! assert_eq!(printer.contents().as_deref(), Some("a >= 0 && a <= 9 && b >= 2"));
//!
//! assert_eq!(set.to_string(), "{ A[a, b] : 0 <= a <= 9 and b >= 2 }");
//! # Ok::<(), isle::Error>(())
//! ```

use std::fmt;
use std::ptr::NonNull;

use crate::context::Context;
use crate::engine::printer::{
    printer_flush, printer_free, printer_get_output_format, printer_get_str, printer_print_str,
    printer_set_output_format, printer_take_str, printer_to_stdout, printer_to_str, RawPrinter,
};
use crate::engine::{Format, Stat};
use crate::error::{ErrorKind, Result};
use crate::handle::Handle;
use crate::kind::ResourceKind;

/// Output grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// The engine's own notation; parsers accept it back.
    #[default]
    Isl,
    /// C expressions.
    C,
    /// Omega calculator notation.
    Omega,
    /// PolyLib constraint matrices.
    PolyLib,
    /// PolyLib matrices with headers.
    ExtPolyLib,
    /// LaTeX.
    Latex,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Isl => Format::Isl,
            OutputFormat::C => Format::C,
            OutputFormat::Omega => Format::Omega,
            OutputFormat::PolyLib => Format::PolyLib,
            OutputFormat::ExtPolyLib => Format::ExtPolyLib,
            OutputFormat::Latex => Format::Latex,
        }
    }
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Isl => OutputFormat::Isl,
            Format::C => OutputFormat::C,
            Format::Omega => OutputFormat::Omega,
            Format::PolyLib => OutputFormat::PolyLib,
            Format::ExtPolyLib => OutputFormat::ExtPolyLib,
            Format::Latex => OutputFormat::Latex,
        }
    }
}

/// Printer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrinterOptions {
    format: OutputFormat,
}

impl PrinterOptions {
    /// Native format.
    pub fn new() -> Self {
        Self::default()
    }

    /// Output format to start with.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Configured output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

/// Something a [`Printer`] can emit.
pub trait Print {
    /// Write `self` to `printer` in its current format.
    fn print_to(&self, printer: &mut Printer) -> Result<()>;
}

/// An engine output stream.
pub struct Printer {
    ctx: Context,
    ptr: NonNull<RawPrinter>,
}

// SAFETY: the printer owns its stream exclusively.
unsafe impl Send for Printer {}

impl Printer {
    fn adopt(ctx: &Context, ptr: *mut RawPrinter) -> Result<Self> {
        match NonNull::new(ptr) {
            Some(ptr) => Ok(Printer {
                ctx: ctx.clone(),
                ptr,
            }),
            None => Err(ctx.failure(ErrorKind::ConstructionFailure).context("opening printer")),
        }
    }

    /// Printer collecting output in memory.
    pub fn to_buffer(ctx: &Context) -> Result<Self> {
        // SAFETY: the context is live.
        Self::adopt(ctx, unsafe { printer_to_str(ctx.as_ptr()) })
    }

    /// Printer writing to standard output.
    pub fn to_stdout(ctx: &Context) -> Result<Self> {
        // SAFETY: the context is live.
        Self::adopt(ctx, unsafe { printer_to_stdout(ctx.as_ptr()) })
    }

    /// Apply `options`.
    pub fn with_options(mut self, options: PrinterOptions) -> Self {
        self.set_format(options.format());
        self
    }

    /// Switch the output format for subsequent prints.
    pub fn set_format(&mut self, format: OutputFormat) -> &mut Self {
        // SAFETY: the stream is live and owned by `self`.
        unsafe { printer_set_output_format(self.ptr.as_ptr(), format.into()) };
        self
    }

    /// Current output format.
    pub fn format(&self) -> OutputFormat {
        // SAFETY: the stream is live.
        unsafe { printer_get_output_format(self.ptr.as_ptr()) }.into()
    }

    /// Print `item`.
    pub fn print<T: Print + ?Sized>(&mut self, item: &T) -> Result<&mut Self> {
        item.print_to(self)?;
        Ok(self)
    }

    /// Print raw text.
    pub fn print_str(&mut self, text: &str) -> Result<&mut Self> {
        // SAFETY: the stream is live and owned by `self`.
        self.emit(|p| unsafe { printer_print_str(p, text) })?;
        Ok(self)
    }

    /// Everything buffered so far; `None` for stdout printers.
    pub fn contents(&self) -> Option<String> {
        // SAFETY: the stream is live.
        unsafe { printer_get_str(self.ptr.as_ptr()) }
    }

    /// Drain the buffer; `None` for stdout printers.
    pub fn take_contents(&mut self) -> Option<String> {
        // SAFETY: the stream is live and owned by `self`.
        unsafe { printer_take_str(self.ptr.as_ptr()) }
    }

    /// Flush a stdout printer.
    pub fn flush(&mut self) -> Result<()> {
        // SAFETY: the stream is live and owned by `self`.
        self.emit(|p| unsafe { printer_flush(p) })
    }

    /// The context the printer reports to.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Run one engine print call against the stream.
    pub(crate) fn emit(&mut self, call: impl FnOnce(*mut RawPrinter) -> Stat) -> Result<()> {
        match call(self.ptr.as_ptr()) {
            Stat::Ok => Ok(()),
            Stat::Error => Err(self.ctx.failure(ErrorKind::ConstructionFailure)),
        }
    }
}

impl Drop for Printer {
    fn drop(&mut self) {
        // SAFETY: the stream is owned by `self` and never shared.
        unsafe { printer_free(self.ptr.as_ptr()) }
    }
}

impl fmt::Debug for Printer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Printer")
            .field("format", &self.format())
            .field("buffered", &self.contents().map(|s| s.len()))
            .finish()
    }
}

impl<K: ResourceKind> fmt::Display for Handle<K>
where
    Handle<K>: Print,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = Printer::to_buffer(self.context()).map_err(|_| fmt::Error)?;
        printer.print(self).map_err(|_| fmt::Error)?;
        f.write_str(&printer.take_contents().unwrap_or_default())
    }
}

/// Implement [`Print`] for a handle type through one engine print function.
macro_rules! printable {
    ($ty:ty, $engine:path) => {
        impl $crate::printer::Print for $ty {
            fn print_to(&self, printer: &mut $crate::printer::Printer) -> $crate::error::Result<()> {
                // SAFETY: the stream and the resource are both live for the call.
                printer.emit(|p| unsafe { $engine(p, self.as_ptr()) })
            }
        }
    };
}

pub(crate) use printable;
