// UI layer: terminal prompts through `dialoguer`, the loading spinner and
// the result bar through `indicatif`. The workflow talks to these through
// the `Prompter` and `Renderer` traits so it can run against scripted
// fakes in tests.

use crate::report::Report;
use crossterm::style::Stylize;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io;
use std::time::Duration;

/// Checks a line of input, returning the message to show when rejected.
pub type Validator = fn(&str) -> Result<(), String>;

/// Asks the user things and returns the answers.
pub trait Prompter {
    /// Single choice from `items`, returning the chosen index.
    fn select(&mut self, prompt: &str, items: &[String]) -> io::Result<usize>;

    /// Free text. Rejected input is asked again until `validator` passes.
    fn input(
        &mut self,
        prompt: &str,
        default: Option<&str>,
        validator: Option<Validator>,
    ) -> io::Result<String>;

    /// Yes/no question.
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

/// `Prompter` on the real terminal.
///
/// Note: `Select::interact()` is keyboard-driven: use arrow keys and
/// Enter to choose an option.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn select(&mut self, prompt: &str, items: &[String]) -> io::Result<usize> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact()
    }

    fn input(
        &mut self,
        prompt: &str,
        default: Option<&str>,
        validator: Option<Validator>,
    ) -> io::Result<String> {
        let mut input = Input::<String>::new();
        input.with_prompt(prompt);
        if let Some(default) = default {
            input.default(default.to_string());
        }
        if let Some(validator) = validator {
            input.validate_with(move |value: &String| validator(value));
        }
        input.interact_text()
    }

    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        Confirm::new().with_prompt(prompt).interact()
    }
}

/// Shows what the workflow is doing and what it found.
pub trait Renderer {
    /// Start a spinner with `message`, replacing any running one.
    fn start(&mut self, message: &str);

    /// Stop the spinner and mark the step done.
    fn succeed(&mut self, message: &str);

    /// Stop the spinner and mark the step failed.
    fn fail(&mut self, message: &str);

    /// Stop the spinner without a message. No-op when none is running.
    fn stop(&mut self);

    /// Draw the progress bar for a finished report.
    fn show(&mut self, report: &Report);

    /// A plain line for the user (errors, hints).
    fn notice(&mut self, message: &str);
}

const BAR_WIDTH: u64 = 40;
const BAR_STEPS: u64 = 1000;

/// `Renderer` on the real terminal.
#[derive(Default)]
pub struct TerminalRenderer {
    spinner: Option<ProgressBar>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        TerminalRenderer::default()
    }

    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl Renderer for TerminalRenderer {
    fn start(&mut self, message: &str) {
        self.clear_spinner();
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn succeed(&mut self, message: &str) {
        self.clear_spinner();
        println!("{} {}", "✔".green(), message);
    }

    fn fail(&mut self, message: &str) {
        self.clear_spinner();
        println!("{} {}", "✖".red(), message);
    }

    fn stop(&mut self) {
        self.clear_spinner();
    }

    fn show(&mut self, report: &Report) {
        self.clear_spinner();
        let bar = ProgressBar::with_draw_target(Some(BAR_STEPS), ProgressDrawTarget::stdout());
        let template = format!("╢{{bar:{BAR_WIDTH}}}╟ {{msg}}");
        bar.set_style(
            ProgressStyle::with_template(&template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█░"),
        );
        if bar.is_hidden() {
            // not a terminal: print the numbers only
            println!("{report}");
            return;
        }
        println!("{}", report.project.clone().bold());
        bar.set_position((report.ratio() * BAR_STEPS as f64).round() as u64);
        bar.abandon_with_message(report.summary());
        println!();
    }

    fn notice(&mut self, message: &str) {
        self.clear_spinner();
        println!("\n{message}");
    }
}
