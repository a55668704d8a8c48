//! Terminal coloring for the CLI.

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use is_terminal::IsTerminal;

/// When the CLI colors its output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Color when writing to a terminal
    #[default]
    Auto,
    Always,
    Never,
}

/// Decides per stream whether to color, honoring `NO_COLOR`.
#[derive(Debug, Clone, Copy)]
pub struct ColorHelper {
    stdout: bool,
    stderr: bool,
}

impl ColorHelper {
    pub fn new(mode: ColorMode) -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self::resolve(
            mode,
            no_color,
            std::io::stdout().is_terminal(),
            std::io::stderr().is_terminal(),
        )
    }

    fn resolve(mode: ColorMode, no_color: bool, stdout_tty: bool, stderr_tty: bool) -> Self {
        let enabled = |is_tty: bool| {
            !no_color
                && match mode {
                    ColorMode::Always => true,
                    ColorMode::Never => false,
                    ColorMode::Auto => is_tty,
                }
        };
        Self {
            stdout: enabled(stdout_tty),
            stderr: enabled(stderr_tty),
        }
    }

    pub fn should_color_stdout(&self) -> bool {
        self.stdout
    }

    pub fn should_color_stderr(&self) -> bool {
        self.stderr
    }

    /// Error label for stderr
    pub fn error(&self, text: &str) -> ColoredString {
        if self.stderr {
            text.red().bold()
        } else {
            text.normal()
        }
    }

    /// Colorize rendered Markdown for terminal output.
    ///
    /// Headings turn bold blue, the italic hint lines dim. Everything else
    /// passes through untouched, so piping the output keeps valid Markdown.
    pub fn markdown(&self, text: &str) -> String {
        if !self.stdout {
            return text.to_string();
        }

        text.lines()
            .map(|line| {
                if line.starts_with('#') {
                    line.blue().bold().to_string()
                } else if line.starts_with('*') && line.ends_with('*') && !line.starts_with("**") {
                    line.dimmed().to_string()
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_mode_parses_case_insensitively() {
        assert_eq!(ColorMode::from_str("auto", true), Ok(ColorMode::Auto));
        assert_eq!(ColorMode::from_str("ALWAYS", true), Ok(ColorMode::Always));
        assert_eq!(ColorMode::from_str("never", true), Ok(ColorMode::Never));
        assert!(ColorMode::from_str("sometimes", true).is_err());
    }

    #[test]
    fn no_color_wins_over_always() {
        let helper = ColorHelper::resolve(ColorMode::Always, true, true, true);
        assert!(!helper.should_color_stdout());
        assert!(!helper.should_color_stderr());

        let helper = ColorHelper::resolve(ColorMode::Auto, false, true, false);
        assert!(helper.should_color_stdout());
        assert!(!helper.should_color_stderr());
    }

    #[test]
    fn plain_output_leaves_markdown_untouched() {
        let helper = ColorHelper::resolve(ColorMode::Never, false, true, true);
        let text = "## Tags (1 results)\n\n- `kita`";
        assert_eq!(helper.markdown(text), text);
    }
}
