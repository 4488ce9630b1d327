use std::error::Error as StdError;
use std::fmt;

/// Result of a single step or operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Warned(String),
    Failed(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub step: String,
    pub outcome: Outcome,
}

/// Collects user-facing lines and step outcomes for one run.
///
/// Lines are echoed to stdout unless the reporter was created with
/// [`Reporter::quiet`]; they are always kept for inspection.
#[derive(Debug, Default)]
pub struct Reporter {
    echo: bool,
    lines: Vec<String>,
    steps: Vec<StepRecord>,
}

pub const RULE_WIDTH: usize = 60;

impl Reporter {
    pub fn stdout() -> Self {
        Self { echo: true, ..Self::default() }
    }

    pub fn quiet() -> Self {
        Self::default()
    }

    pub fn banner(&mut self, title: &str) {
        self.line(title.to_string());
        self.rule();
    }

    pub fn rule(&mut self) {
        self.line("=".repeat(RULE_WIDTH));
    }

    pub fn section(&mut self, title: &str) {
        self.line(String::new());
        self.line(title.to_string());
    }

    pub fn ok(&mut self, message: impl fmt::Display) {
        self.line(format!("   ✅ {}", message));
    }

    pub fn warn(&mut self, message: impl fmt::Display) {
        self.line(format!("   ⚠️  {}", message));
    }

    pub fn fail(&mut self, message: impl fmt::Display) {
        self.line(format!("   ❌ {}", message));
    }

    pub fn detail(&mut self, message: impl fmt::Display) {
        self.line(format!("      {}", message));
    }

    pub fn plain(&mut self, message: impl fmt::Display) {
        self.line(message.to_string());
    }

    /// Prints every `source()` below `error`; the error itself is reported by the caller
    pub fn trace(&mut self, error: &(dyn StdError + 'static)) {
        let mut previous = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            if !previous.ends_with(&text) {
                self.line(format!("      caused by: {}", text));
            }
            previous = text;
            source = cause.source();
        }
    }

    pub fn record(&mut self, step: impl Into<String>, outcome: Outcome) {
        let step = step.into();
        match &outcome {
            Outcome::Passed => log::debug!("{}: passed", step),
            Outcome::Warned(reason) => log::warn!("{}: {}", step, reason),
            Outcome::Failed(reason) => log::error!("{}: {}", step, reason),
        }
        self.steps.push(StepRecord { step, outcome });
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|record| record.outcome.is_failure()).count()
    }

    pub fn warnings(&self) -> usize {
        self.steps.iter().filter(|record| matches!(record.outcome, Outcome::Warned(_))).count()
    }

    pub fn exit_code(&self) -> i32 {
        if self.failures() == 0 {
            0
        } else {
            1
        }
    }

    fn line(&mut self, text: String) {
        if self.echo {
            println!("{}", text);
        }
        self.lines.push(text);
    }
}

/// First `max` characters of `text`, never splitting a code point
pub fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
