//! Outcome classification and reporting.

use itertools::Itertools;
use nonempty::{nonempty, NonEmpty};
use std::io::Write;
use tracing::{debug, info};

use crate::client::ProbeError;
use crate::model::{Outcome, Verdict};

/// Markers expected in a browser-action reply.
pub const DEFAULT_MARKERS: [&str; 2] = ["Chrome DevTools", "puppeteer"];

/// Sink for human-facing output.
///
/// Library code never prints directly; everything the operator sees goes
/// through a reporter.
pub trait Reporter {
    /// Emit one complete line.
    fn emit(&mut self, line: &str);

    /// Show a text fragment as it arrives. Does nothing by default.
    fn progress(&mut self, _text: &str) {}
}

/// Writes to standard output, showing fragments without line breaks.
#[derive(Debug, Default)]
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn emit(&mut self, line: &str) {
        println!("{}", line);
    }

    fn progress(&mut self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

/// Routes output into `tracing` events.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn emit(&mut self, line: &str) {
        info!("{}", line);
    }

    fn progress(&mut self, text: &str) {
        debug!(fragment = %text, "stream text");
    }
}

/// Records everything it is given.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    pub lines: Vec<String>,
    pub fragments: Vec<String>,
}

impl Reporter for Transcript {
    fn emit(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn progress(&mut self, text: &str) {
        self.fragments.push(text.to_string());
    }
}

/// Decides success by substring containment against a fixed set of markers.
///
/// # Example
/// ```
/// use chatprobe::classify::Classifier;
/// use chatprobe::model::Verdict;
///
/// let classifier = Classifier::default();
/// let outcome = classifier.classify("Opened Chrome DevTools".to_string());
/// assert_eq!(outcome.verdict, Verdict::Success);
/// ```
#[derive(Debug, Clone)]
pub struct Classifier {
    markers: NonEmpty<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        let [first, second] = DEFAULT_MARKERS;
        Self::new(nonempty![first.to_string(), second.to_string()])
    }
}

impl Classifier {
    pub fn new(markers: NonEmpty<String>) -> Self {
        Self { markers }
    }

    /// Build a classifier from any list of markers, rejecting an empty list.
    pub fn from_markers<I, S>(markers: I) -> Result<Self, ProbeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let markers: Vec<String> = markers.into_iter().map(Into::into).collect();
        NonEmpty::from_vec(markers)
            .map(Self::new)
            .ok_or_else(|| ProbeError::Config("at least one expected marker is required".to_string()))
    }

    pub fn markers(&self) -> &NonEmpty<String> {
        &self.markers
    }

    /// First marker contained in `text`.
    pub fn find_marker(&self, text: &str) -> Option<&str> {
        self.markers
            .iter()
            .find(|marker| text.contains(marker.as_str()))
            .map(String::as_str)
    }

    pub fn classify(&self, text: String) -> Outcome {
        let matched = self.find_marker(&text).map(str::to_string);
        let verdict = if matched.is_some() {
            Verdict::Success
        } else {
            Verdict::Failure
        };

        debug!(%verdict, matched = ?matched, chars = text.chars().count(), "classified stream");

        Outcome {
            verdict,
            text,
            matched,
        }
    }

    /// Classify `text` and report the final text and verdict.
    pub fn classify_and_report<R>(&self, text: String, reporter: &mut R) -> Outcome
    where
        R: Reporter + ?Sized,
    {
        let outcome = self.classify(text);

        reporter.emit("");
        reporter.emit("--- Final Validation ---");
        reporter.emit(&outcome.text);

        match &outcome.matched {
            Some(marker) => reporter.emit(&format!(
                "Success! The response contained the expected marker \"{}\".",
                marker
            )),
            None => reporter.emit(&format!(
                "Failed! The response contained none of: {}.",
                self.markers.iter().map(|m| format!("\"{}\"", m)).join(", ")
            )),
        }

        outcome
    }
}
