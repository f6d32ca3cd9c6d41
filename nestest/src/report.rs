//! Result lines: one per unit, indented by section depth, padded to width.
//!
//! ```text
//! math ....................................................... PASSED
//!     divide_by_zero ......................................... PASSED
//! ```

use std::io::{self, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::warn;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::outcome::CapturedOutput;
use crate::core::tree::UnitTree;
use crate::core::unit::UnitId;

/// Indentation per section level.
pub const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Passed => "PASSED",
            Verdict::Failed => "FAILED",
        }
    }

    fn color(self) -> Color {
        match self {
            Verdict::Passed => Color::Green,
            Verdict::Failed => Color::Red,
        }
    }
}

/// Everything on a result line before the verdict label.
///
/// The line is `indent name ..... VERDICT`, exactly `width` columns when the
/// name fits with at least one dot. Longer names are cut and end in `...`.
pub fn line_prefix(name: &str, depth: usize, width: usize, verdict: Verdict) -> String {
    let indent = INDENT.repeat(depth);
    let fixed = indent.width() + 1 + verdict.label().width();
    let room = width.saturating_sub(fixed);
    let name_width = name.width();

    if name_width + 2 <= room {
        let dots = room - name_width - 1;
        return format!("{indent}{name} {} ", ".".repeat(dots));
    }
    format!("{indent}{}... ", truncate_to_width(name, room.saturating_sub(3)))
}

pub fn format_line(name: &str, depth: usize, width: usize, verdict: Verdict) -> String {
    format!("{}{}", line_prefix(name, depth, width, verdict), verdict.label())
}

fn truncate_to_width(text: &str, max: usize) -> &str {
    let mut used = 0;
    for (idx, ch) in text.char_indices() {
        used += ch.width().unwrap_or(0);
        if used > max {
            return &text[..idx];
        }
    }
    text
}

/// Writes unit results and owns the suite-wide pass flag.
pub struct Reporter {
    out: Box<dyn WriteColor>,
    suite_passed: bool,
    passed: usize,
    failed: usize,
}

impl Reporter {
    pub fn new(out: Box<dyn WriteColor>) -> Self {
        Self {
            out,
            suite_passed: true,
            passed: 0,
            failed: 0,
        }
    }

    pub fn stdout(choice: ColorChoice) -> Self {
        Self::new(Box::new(StandardStream::stdout(choice)))
    }

    /// Redirect later output. The pass flag and counts carry over.
    pub fn set_output(&mut self, out: Box<dyn WriteColor>) {
        if let Err(err) = self.out.flush() {
            warn!(err = %err, "failed to flush previous report output");
        }
        self.out = out;
    }

    /// False once any unit failed unexpectedly. Never becomes true again.
    pub fn suite_passed(&self) -> bool {
        self.suite_passed
    }

    /// `(passed, failed)` units printed so far.
    pub fn counts(&self) -> (usize, usize) {
        (self.passed, self.failed)
    }

    /// Print `unit`'s result once. Later calls return `None` and print nothing.
    ///
    /// A unit passes when its own body recorded no failure; the expect-fail
    /// inversion has already been applied by the isolator.
    pub fn print_result(
        &mut self,
        tree: &mut UnitTree,
        unit: UnitId,
        default_width: usize,
    ) -> Option<Verdict> {
        if !tree.get_mut(unit).mark_printed() {
            return None;
        }
        let width = tree.effective_print_width(unit, default_width);
        let unit = tree.get(unit);
        let verdict = if unit.failures().is_empty() {
            Verdict::Passed
        } else {
            Verdict::Failed
        };

        match verdict {
            Verdict::Passed => self.passed += 1,
            Verdict::Failed => {
                self.failed += 1;
                self.suite_passed = false;
            }
        }

        let depth = unit.section_depth();
        let result = unit
            .failures()
            .iter()
            .try_for_each(|failure| self.write_failure(depth, &failure.message))
            .and_then(|()| self.write_line(unit.friendly_name(), depth, width, verdict));
        if let Err(err) = result {
            warn!(err = %err, unit = unit.friendly_name(), "failed to write result");
        }
        Some(verdict)
    }

    /// Print a debug diagnostic under the unit at `depth`.
    pub fn diagnostic(&mut self, depth: usize, message: &str) {
        let indent = INDENT.repeat(depth + 1);
        let result = message
            .lines()
            .try_for_each(|line| writeln!(self.out, "{indent}-- {line}"));
        if let Err(err) = result {
            warn!(err = %err, "failed to write diagnostic");
        }
    }

    /// Replay an isolated run's output under the unit at `depth`.
    pub fn replay(&mut self, depth: usize, output: &CapturedOutput) {
        let indent = INDENT.repeat(depth + 1);
        let result = output.streams().try_for_each(|(label, text)| {
            text.lines()
                .try_for_each(|line| writeln!(self.out, "{indent}{label} | {line}"))
        });
        if let Err(err) = result {
            warn!(err = %err, "failed to replay isolated output");
        }
    }

    fn write_failure(&mut self, depth: usize, message: &str) -> io::Result<()> {
        let indent = INDENT.repeat(depth + 1);
        let mut lines = message.lines();
        if let Some(first) = lines.next() {
            self.out
                .set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            write!(self.out, "{indent}! ")?;
            self.out.reset()?;
            writeln!(self.out, "{first}")?;
        }
        for line in lines {
            writeln!(self.out, "{indent}  {line}")?;
        }
        Ok(())
    }

    fn write_line(
        &mut self,
        name: &str,
        depth: usize,
        width: usize,
        verdict: Verdict,
    ) -> io::Result<()> {
        write!(self.out, "{}", line_prefix(name, depth, width, verdict))?;
        self.out
            .set_color(ColorSpec::new().set_fg(Some(verdict.color())).set_bold(true))?;
        write!(self.out, "{}", verdict.label())?;
        self.out.reset()?;
        writeln!(self.out)?;
        self.out.flush()
    }
}
