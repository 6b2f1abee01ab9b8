//! Classification of shell input lines.

/// What the user asked the shell to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Leave the shell.
    Exit,
    /// Show the command list.
    Help,
    /// Clear the screen and reprint the banner.
    Clear,
    /// Probe and print system status.
    Status,
    /// Blank input.
    Empty,
    /// Anything else, trimmed.
    Question(String),
}

const EXIT_WORDS: &[&str] = &["exit", "quit", "sair", "q"];
const HELP_WORDS: &[&str] = &["help", "ajuda", "h", "?"];
const CLEAR_WORDS: &[&str] = &["clear", "limpar", "cls"];
const STATUS_WORDS: &[&str] = &["status", "info", "s"];

impl ShellCommand {
    /// Classify one input line. Control words match case-insensitively after
    /// trimming; every other non-blank line is a question.
    pub fn parse(line: &str) -> Self {
        let input = line.trim();
        if input.is_empty() {
            return ShellCommand::Empty;
        }

        let word = input.to_lowercase();
        let word = word.as_str();
        if EXIT_WORDS.contains(&word) {
            ShellCommand::Exit
        } else if HELP_WORDS.contains(&word) {
            ShellCommand::Help
        } else if CLEAR_WORDS.contains(&word) {
            ShellCommand::Clear
        } else if STATUS_WORDS.contains(&word) {
            ShellCommand::Status
        } else {
            ShellCommand::Question(input.to_string())
        }
    }
}
