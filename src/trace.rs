//! Chrome trace output.
//!
//! Recipes run on many threads at once, so the trace sits behind a mutex and
//! every event carries the id of the thread that produced it, which the
//! trace viewer shows as separate tracks.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

static TRACE: Mutex<Option<Trace>> = Mutex::new(None);
/// Checked before touching the mutex, so disabled tracing costs nothing.
static ENABLED: AtomicBool = AtomicBool::new(false);
static NEXT_TID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static TID: usize = NEXT_TID.fetch_add(1, Ordering::Relaxed);
}

struct Event<'a> {
    name: &'a str,
    tid: usize,
    start: Instant,
    end: Instant,
}

struct Trace {
    start: Instant,
    w: BufWriter<File>,
}

impl Trace {
    fn new(path: &str) -> std::io::Result<Self> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "[")?;
        Ok(Trace {
            start: Instant::now(),
            w,
        })
    }

    fn write_event(&mut self, event: &Event) -> std::io::Result<()> {
        write!(self.w, "{{ \"pid\": 0, \"tid\": {}, \"name\": ", event.tid)?;
        // Target names are arbitrary text, so they need real JSON escaping.
        serde_json::to_writer(&mut self.w, event.name)?;
        write!(
            self.w,
            ", \"ts\": {}, \"ph\": \"X\", \"dur\": {} }}",
            event.start.duration_since(self.start).as_micros(),
            event.end.duration_since(event.start).as_micros(),
        )
    }

    fn write(&mut self, event: &Event) -> std::io::Result<()> {
        self.write_event(event)?;
        writeln!(self.w, ",")
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.write_event(&Event {
            name: "main",
            tid: 0,
            start: self.start,
            end: Instant::now(),
        })?;
        writeln!(self.w, "]")?;
        self.w.flush()
    }
}

pub fn open(path: &str) -> std::io::Result<()> {
    let trace = Trace::new(path)?;
    *TRACE.lock().unwrap() = Some(trace);
    ENABLED.store(true, Ordering::Release);
    Ok(())
}

/// Run f, recording it as an event named `name`.
pub fn span<T>(name: &str, f: impl FnOnce() -> T) -> T {
    if !ENABLED.load(Ordering::Acquire) {
        return f();
    }
    let start = Instant::now();
    let result = f();
    let event = Event {
        name,
        tid: TID.with(|tid| *tid),
        start,
        end: Instant::now(),
    };
    if let Some(t) = TRACE.lock().unwrap().as_mut() {
        // Tracing is best-effort; a failed write shouldn't fail the build.
        let _ = t.write(&event);
    }
    result
}

#[inline]
pub fn scope<T>(name: &'static str, f: impl FnOnce() -> T) -> T {
    span(name, f)
}

pub fn close() -> std::io::Result<()> {
    ENABLED.store(false, Ordering::Release);
    if let Some(mut t) = TRACE.lock().unwrap().take() {
        return t.close();
    }
    Ok(())
}
