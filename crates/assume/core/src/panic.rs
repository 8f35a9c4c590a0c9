//! Panic capture.
//!
//! Assertions in Rust report by panicking, so both the scoped evaluator and
//! the phase runner need to catch a panic and still know where it happened.
//! A process-wide hook is installed once; on threads that are inside
//! [`catch`] it records the panic location (and a backtrace when
//! `RUST_BACKTRACE` enables capture) instead of printing. Everywhere else it
//! defers to the hook that was installed before it.

use assume_types::SourceLocation;
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Once;

static INSTALL_HOOK: Once = Once::new();

thread_local! {
    static CAPTURE_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

/// Messages std panics with for runtime faults. These are bugs in the code
/// under test, not failed assertions.
const RUNTIME_FAULT_PREFIXES: &[&str] = &[
    "called `Option::unwrap()`",
    "called `Result::unwrap()`",
    "called `Result::unwrap_err()`",
    "index out of bounds",
    "attempt to divide by zero",
    "attempt to calculate the remainder with a divisor of zero",
    "already borrowed",
    "already mutably borrowed",
    "RefCell already borrowed",
    "RefCell already mutably borrowed",
    "byte index ",
    "range start index ",
    "range end index ",
    "slice index starts at ",
];

/// Whether `message` is one of std's runtime fault panics
pub fn is_runtime_fault(message: &str) -> bool {
    RUNTIME_FAULT_PREFIXES
        .iter()
        .any(|prefix| message.starts_with(prefix))
        || (message.starts_with("attempt to ") && message.ends_with(" with overflow"))
}

/// Symbol prefixes of frames owned by the panic machinery or by these crates
const INTERNAL_FRAMES: &[&str] = &[
    "assume::",
    "assume_harness::",
    "assume_types::",
    "std::",
    "core::",
    "alloc::",
    "<std::",
    "<core::",
    "<alloc::",
    "rust_begin_unwind",
    "__rust",
    "<unknown>",
];

/// Frames where a [`catch`] boundary starts; nothing past them is user code
const BOUNDARY_FRAMES: &[&str] = &[
    "assume::",
    "assume_harness::",
    "std::panicking::",
    "__rust_try",
];

fn is_internal_frame(symbol: &str) -> bool {
    INTERNAL_FRAMES.iter().any(|prefix| symbol.starts_with(prefix))
}

fn is_boundary_frame(symbol: &str) -> bool {
    BOUNDARY_FRAMES.iter().any(|prefix| symbol.starts_with(prefix))
        || symbol.contains("catch_unwind")
}

/// Symbol named by a backtrace line: a `"  12: symbol"` frame header or an
/// indented inlined symbol. `at file:line` lines name none.
fn frame_symbol(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with("at ") {
        return None;
    }
    match trimmed.split_once(": ") {
        Some((index, symbol)) if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) => {
            Some(symbol)
        }
        _ => Some(trimmed),
    }
}

struct Frame<'a> {
    symbol: &'a str,
    detail: Vec<&'a str>,
}

/// Cut a rendered backtrace down to the user's frames.
///
/// Leading frames of the panic machinery and of these crates are dropped,
/// and the trace ends where the enclosing [`catch`] boundary begins. Frames
/// are renumbered from zero. Returns `None` when no user frame remains.
pub fn trim_backtrace(rendered: &str) -> Option<String> {
    let mut frames: Vec<Frame<'_>> = Vec::new();
    for line in rendered.lines() {
        match frame_symbol(line) {
            Some(symbol) => frames.push(Frame {
                symbol,
                detail: Vec::new(),
            }),
            None => {
                if let Some(frame) = frames.last_mut() {
                    frame.detail.push(line);
                }
            }
        }
    }

    let start = frames.iter().position(|frame| !is_internal_frame(frame.symbol))?;
    let end = frames[start..]
        .iter()
        .position(|frame| is_boundary_frame(frame.symbol))
        .map_or(frames.len(), |offset| start + offset);

    let mut kept = &frames[start..end];
    while let Some((last, rest)) = kept.split_last() {
        if !is_internal_frame(last.symbol) {
            break;
        }
        kept = rest;
    }
    if kept.is_empty() {
        return None;
    }

    let mut out = String::new();
    for (index, frame) in kept.iter().enumerate() {
        out.push_str(&format!("{:>4}: {}\n", index, frame.symbol));
        for line in &frame.detail {
            out.push_str(line);
            out.push('\n');
        }
    }
    Some(out)
}

/// Panic payload for assertion kinds other than the built-in string panics.
///
/// Raise it with [`raise_assertion`]; scoped evaluations treat it exactly like
/// a failing `assert!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    kind: Cow<'static, str>,
    message: String,
}

impl AssertionFailure {
    pub const DEFAULT_KIND: &'static str = "AssertionFailure";

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: Cow::Borrowed(Self::DEFAULT_KIND),
            message: message.into(),
        }
    }

    /// Name the assertion kind, e.g. `"ChecksumMismatch"`
    pub fn with_kind(mut self, kind: impl Into<Cow<'static, str>>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

/// Panic with an [`AssertionFailure`] payload
#[track_caller]
pub fn raise_assertion(failure: AssertionFailure) -> ! {
    std::panic::panic_any(failure)
}

#[derive(Debug, Clone, Default)]
struct PanicSite {
    location: Option<SourceLocation>,
    backtrace: Option<String>,
}

/// A panic caught by [`catch`].
pub struct CaughtPanic {
    payload: Box<dyn Any + Send>,
    site: PanicSite,
}

impl CaughtPanic {
    /// Whether the payload is an assertion kind: a string panic (what
    /// `assert!` and friends produce) or an [`AssertionFailure`].
    ///
    /// String panics std raises for runtime faults, such as `unwrap()` on
    /// `None` or an out-of-bounds index, are not assertions.
    pub fn is_assertion(&self) -> bool {
        if self.payload.is::<AssertionFailure>() {
            return true;
        }
        match self.text_payload() {
            Some(message) => !is_runtime_fault(message),
            None => false,
        }
    }

    fn text_payload(&self) -> Option<&str> {
        self.payload
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| self.payload.downcast_ref::<&'static str>().copied())
    }

    /// Name of the payload's kind
    pub fn kind(&self) -> &str {
        match self.payload.downcast_ref::<AssertionFailure>() {
            Some(failure) => failure.kind(),
            None if self.is_assertion() => "assertion",
            None => "panic",
        }
    }

    /// Text of the payload, as the default panic hook would print it
    pub fn message(&self) -> String {
        if let Some(message) = self.text_payload() {
            message.to_string()
        } else if let Some(failure) = self.payload.downcast_ref::<AssertionFailure>() {
            failure.to_string()
        } else {
            "Box<dyn Any>".to_string()
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.site.location.as_ref()
    }

    pub fn backtrace(&self) -> Option<&str> {
        self.site.backtrace.as_deref()
    }

    pub fn payload(&self) -> &(dyn Any + Send) {
        &*self.payload
    }

    /// Render the panic the way the default hook reports it
    pub fn render(&self) -> String {
        let mut out = match self.site.location {
            Some(ref location) => format!(
                "panicked at {}:{}:{}:\n{}",
                location.file,
                location.line,
                location.column,
                self.message()
            ),
            None => format!("panicked:\n{}", self.message()),
        };
        if let Some(ref backtrace) = self.site.backtrace {
            out.push_str("\nstack backtrace:\n");
            out.push_str(backtrace);
        }
        out
    }

    /// Continue unwinding with the original payload.
    ///
    /// The panic site is handed back to the thread so an enclosing [`catch`]
    /// still sees where the panic happened.
    pub fn resume(self) -> ! {
        let CaughtPanic { payload, site } = self;
        let _ = LAST_PANIC.try_with(|last| *last.borrow_mut() = Some(site));
        std::panic::resume_unwind(payload)
    }

    /// Give up the payload without re-raising
    pub fn into_payload(self) -> Box<dyn Any + Send> {
        self.payload
    }
}

impl fmt::Debug for CaughtPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaughtPanic")
            .field("kind", &self.kind())
            .field("message", &self.message())
            .field("location", &self.site.location)
            .finish()
    }
}

struct CaptureDepth;

impl CaptureDepth {
    fn enter() -> Self {
        CAPTURE_DEPTH.with(|depth| depth.set(depth.get() + 1));
        CaptureDepth
    }
}

impl Drop for CaptureDepth {
    fn drop(&mut self) {
        let _ = CAPTURE_DEPTH.try_with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let capturing = CAPTURE_DEPTH.try_with(|depth| depth.get() > 0).unwrap_or(false);
            if !capturing {
                previous(info);
                return;
            }
            let site = PanicSite {
                location: info.location().map(SourceLocation::from),
                backtrace: capture_backtrace(),
            };
            let _ = LAST_PANIC.try_with(|last| *last.borrow_mut() = Some(site));
        }));
    });
}

/// Backtrace of the current thread, trimmed to user frames, when capture is
/// enabled
pub fn capture_backtrace() -> Option<String> {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => trim_backtrace(&backtrace.to_string()),
        _ => None,
    }
}

/// Run `f`, catching any panic it raises without printing it
pub fn catch<F, R>(f: F) -> Result<R, CaughtPanic>
where
    F: FnOnce() -> R,
{
    install_hook();
    let _ = LAST_PANIC.try_with(|last| last.borrow_mut().take());

    let result = {
        let _depth = CaptureDepth::enter();
        std::panic::catch_unwind(AssertUnwindSafe(f))
    };

    result.map_err(|payload| {
        let site = LAST_PANIC
            .try_with(|last| last.borrow_mut().take())
            .ok()
            .flatten()
            .unwrap_or_default();
        CaughtPanic { payload, site }
    })
}
