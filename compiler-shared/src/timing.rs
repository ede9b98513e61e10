//! Wall-clock time of the analysis phases.
//!
//! `timed_scope!("hierarchy")` records how long the rest of the enclosing
//! block takes. Phases may nest, a phase that starts while another one is
//! still running is listed below it. [`print`] reports what was recorded,
//! controlled by the environment:
//!
//! * `MEASURE_STDERR`: a table on stderr
//! * `MEASURE_JSON=<path>`: `{"phases": [{"label", "depth", "millis"}]}`

use failure::{Error, ResultExt};
use serde_derive::Serialize;
use std::{
    fmt,
    fs::File,
    sync::Mutex,
    time::{Duration, Instant},
};

lazy_static::lazy_static! {
    static ref PHASES: Mutex<Vec<Span>> = Mutex::new(Vec::new());
}

/// Running phase. The phase ends when the guard is dropped.
pub struct PhaseGuard {
    label: &'static str,
    start: Instant,
}

impl PhaseGuard {
    pub fn new(label: &'static str) -> Self {
        PhaseGuard {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        let span = Span {
            label: self.label,
            start: self.start,
            stop: Instant::now(),
        };
        // a poisoned collector only loses timings
        if let Ok(mut phases) = PHASES.lock() {
            phases.push(span);
        }
    }
}

/// Times the rest of the enclosing block under the given label.
#[macro_export]
macro_rules! timed_scope {
    ($label:expr) => {
        let _phase = $crate::timing::PhaseGuard::new($label);
    };
}

#[derive(Debug, Clone, Copy)]
struct Span {
    label: &'static str,
    start: Instant,
    stop: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTiming {
    pub label: &'static str,
    /// Number of phases still running when this one started.
    pub depth: usize,
    pub millis: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub phases: Vec<PhaseTiming>,
}

impl Report {
    fn from_spans(mut spans: Vec<Span>) -> Self {
        spans.sort_by_key(|span| span.start);

        let mut running: Vec<Span> = Vec::new();
        let phases = spans
            .into_iter()
            .map(|span| {
                running.retain(|outer| outer.stop > span.start);
                let timing = PhaseTiming {
                    label: span.label,
                    depth: running.len(),
                    millis: duration_millis(span.stop.duration_since(span.start)),
                };
                running.push(span);
                timing
            })
            .collect();
        Report { phases }
    }

    /// Everything recorded by this process so far.
    pub fn collect() -> Self {
        let spans = match PHASES.lock() {
            Ok(phases) => phases.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        Self::from_spans(spans)
    }
}

fn duration_millis(duration: Duration) -> u64 {
    duration.as_secs() * 1000 + u64::from(duration.subsec_millis())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LABEL_WIDTH: usize = 40;
        for phase in &self.phases {
            let indent = "  ".repeat(phase.depth);
            writeln!(
                f,
                "{}{:<width$} {:>6}ms",
                indent,
                phase.label,
                phase.millis,
                width = LABEL_WIDTH.saturating_sub(indent.len())
            )?;
        }
        Ok(())
    }
}

/// Reports the recorded phases as requested by `MEASURE_STDERR` and
/// `MEASURE_JSON`. Does nothing if neither is set.
pub fn print() -> Result<(), Error> {
    let to_stderr = std::env::var_os("MEASURE_STDERR").is_some();
    let json_path = std::env::var_os("MEASURE_JSON");
    if !to_stderr && json_path.is_none() {
        return Ok(());
    }

    let report = Report::collect();
    if to_stderr {
        eprint!("phase timings\n{}", report);
    }
    if let Some(path) = json_path {
        let file = File::create(&path)
            .with_context(|_| format!("cannot create timing file {:?}", path))?;
        serde_json::to_writer(file, &report).context("cannot write timings")?;
    }
    Ok(())
}
