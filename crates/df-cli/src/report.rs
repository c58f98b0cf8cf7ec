//! Human-readable scan output on stderr.

use std::io::Write;

use df_inference::{EnsembleSummary, ScanReporter, ScanResult, StepReport};

/// Prints step banners, progress lines, step summaries and the evolution tables.
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    // Console output is best effort; a closed stderr must not abort the scan.
    fn emit(&mut self, text: std::fmt::Arguments<'_>) {
        let _ = self.out.write_fmt(text);
    }
}

impl<W: Write> ScanReporter for ConsoleReporter<W> {
    fn step_started(&mut self, step: usize, sample_size: u64) {
        tracing::info!(step, sample_size, "step started");
        self.emit(format_args!("\nStarting with N={sample_size}\n\n"));
    }

    fn progress(&mut self, step: usize, processed: u64) {
        tracing::debug!(step, processed, "progress");
        self.emit(format_args!("  .... {processed} particles processed ....\n"));
    }

    fn step_finished(&mut self, report: &StepReport) {
        let p = &report.point;
        self.emit(format_args!(
            "Done!\n\nNumber of positive: {}\nv1 = {} ± {}\n\nNumber of negative: {}\nv1 = {} ± {}\n\n",
            report.n_pos,
            report.fit_pos.slope(),
            report.fit_pos.slope_error(),
            report.n_neg,
            report.fit_neg.slope(),
            report.fit_neg.slope_error(),
        ));
        if p.fit_failed {
            self.emit(format_args!("Total v1 = n/a (fit failed)\n"));
        } else {
            self.emit(format_args!("Total v1 = {} ± {}  (SoD {:.3})\n", p.v1, p.v1_error, p.sod));
        }
    }

    fn scan_finished(&mut self, result: &ScanResult) {
        self.emit(format_args!("\n\nv1 Evolution data:\n\n"));
        self.emit(format_args!("{:>12}  {:>14}  {:>14}\n", "N", "v1", "error"));
        for e in &result.v1_vs_n {
            self.emit(format_args!("{:>12}  {:>14.6e}  {:>14.6e}\n", e.x, e.y, e.ey));
        }
        self.emit(format_args!("\n\nSoD Evolution data:\n\n"));
        self.emit(format_args!("{:>12}  {:>14}\n", "N", "SoD"));
        for g in &result.sod_vs_n {
            self.emit(format_args!("{:>12}  {:>14.4}\n", g.x, g.y));
        }
        self.emit(format_args!("\n"));
        let _ = self.out.flush();
    }
}

/// Per-step ensemble table.
pub fn write_ensemble_table<W: Write>(out: &mut W, summary: &EnsembleSummary) -> std::io::Result<()> {
    writeln!(out, "\n{} runs, expected observed v1 = {:.6e}\n", summary.n_runs, summary.expected_v1)?;
    writeln!(
        out,
        "{:>12}  {:>12}  {:>12}  {:>12}  {:>9}  {:>7}  {:>7}  {:>6}",
        "N", "mean v1", "std v1", "mean err", "mean SoD", "cov 1s", "cov 2s", "failed"
    )?;
    for s in &summary.steps {
        writeln!(
            out,
            "{:>12}  {:>12.4e}  {:>12.4e}  {:>12.4e}  {:>9.3}  {:>7.3}  {:>7.3}  {:>6}",
            s.sample_size,
            s.mean_v1,
            s.std_v1,
            s.mean_v1_error,
            s.mean_sod,
            s.coverage_1sigma,
            s.coverage_2sigma,
            s.n_failed
        )?;
    }
    out.flush()
}
