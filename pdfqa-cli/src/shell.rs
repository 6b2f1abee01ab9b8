//! Interactive question loop.
//!
//! Lines are read on a dedicated thread so the async side can race each
//! read, and each answer, against Ctrl+C.

use std::io::{self, Write};
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use pdfqa_rag::RagSearch;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::command::ShellCommand;
use crate::render;

const PROMPT: &str = "\nMake a question: ";
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Dispatches shell commands against a ready [`RagSearch`], writing all
/// user-facing text to `out`.
pub struct Session<'a, W: Write> {
    search: &'a RagSearch,
    out: W,
}

impl<'a, W: Write> Session<'a, W> {
    pub fn new(search: &'a RagSearch, out: W) -> Self {
        Self { search, out }
    }

    /// Consume the session, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn banner(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", render::banner())
    }

    /// Handle one input line.
    pub async fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        match ShellCommand::parse(line) {
            ShellCommand::Exit => {
                writeln!(self.out, "\nThank you for using RAG Chat. Goodbye!")?;
                return Ok(Flow::Exit);
            }
            ShellCommand::Help => write!(self.out, "{}", render::help())?,
            ShellCommand::Clear => {
                write!(self.out, "{CLEAR_SCREEN}")?;
                self.banner()?;
            }
            ShellCommand::Status => {
                let status = self.search.system_status().await;
                writeln!(self.out, "{}", render::status_report(&status))?;
            }
            ShellCommand::Empty => {
                writeln!(self.out, "Empty input. Type a question or \"help\" to see commands.")?;
            }
            ShellCommand::Question(question) => self.ask(&question).await?,
        }
        Ok(Flow::Continue)
    }

    async fn ask(&mut self, question: &str) -> io::Result<()> {
        writeln!(self.out, "\nProcessing your question...")?;
        writeln!(self.out, "Searching PDF knowledge...")?;
        self.out.flush()?;

        let started = Instant::now();
        let answer = self.search.generate_answer(question).await;
        writeln!(self.out, "{}", render::answer_block(question, &answer, started.elapsed()))
    }
}

/// One result from the line reader thread.
enum ReadOutcome {
    Line(String),
    Interrupted,
    Eof,
    Failed(String),
}

/// A rustyline editor living on its own thread. Each call to
/// [`read_line`](LineReader::read_line) reads exactly one line.
struct LineReader {
    requests: std_mpsc::Sender<String>,
    lines: mpsc::UnboundedReceiver<ReadOutcome>,
}

impl LineReader {
    fn spawn() -> Result<Self> {
        let (request_tx, request_rx) = std_mpsc::channel::<String>();
        let (line_tx, line_rx) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name("pdfqa-readline".into())
            .spawn(move || {
                let mut editor = match DefaultEditor::new() {
                    Ok(editor) => editor,
                    Err(e) => {
                        let _ = line_tx.send(ReadOutcome::Failed(format!("no terminal: {e}")));
                        return;
                    }
                };
                while let Ok(prompt) = request_rx.recv() {
                    let outcome = match editor.readline(&prompt) {
                        Ok(line) => {
                            if !line.trim().is_empty() {
                                let _ = editor.add_history_entry(line.as_str());
                            }
                            ReadOutcome::Line(line)
                        }
                        Err(ReadlineError::Interrupted) => ReadOutcome::Interrupted,
                        Err(ReadlineError::Eof) => ReadOutcome::Eof,
                        Err(e) => ReadOutcome::Failed(e.to_string()),
                    };
                    if line_tx.send(outcome).is_err() {
                        break;
                    }
                }
            })
            .context("failed to start input thread")?;

        Ok(Self { requests: request_tx, lines: line_rx })
    }

    async fn read_line(&mut self, prompt: &str) -> ReadOutcome {
        // A failed send means the thread is gone; it may still have queued
        // the reason, so fall through to the receiver.
        let _ = self.requests.send(prompt.to_string());
        self.lines.recv().await.unwrap_or(ReadOutcome::Eof)
    }
}

/// Run the shell until the user exits or interrupts. The store connection
/// is released on every exit path.
pub async fn run(search: &RagSearch) -> Result<()> {
    let mut reader = LineReader::spawn()?;
    let mut session = Session::new(search, io::stdout());
    session.banner()?;
    println!("\nSystem ready! Type your question or \"help\" to see commands.");

    let result = chat_loop(&mut session, &mut reader).await;

    println!("Cleaning up resources...");
    search.shutdown().await;
    result
}

async fn chat_loop<W: Write>(session: &mut Session<'_, W>, reader: &mut LineReader) -> Result<()> {
    loop {
        let outcome = tokio::select! {
            outcome = reader.read_line(PROMPT) => outcome,
            _ = tokio::signal::ctrl_c() => ReadOutcome::Interrupted,
        };

        let line = match outcome {
            ReadOutcome::Line(line) => line,
            ReadOutcome::Interrupted => {
                println!("\nInterruption detected (Ctrl+C). Chat closed by user.");
                return Ok(());
            }
            ReadOutcome::Eof => {
                debug!("input closed");
                println!("\nGoodbye!");
                return Ok(());
            }
            ReadOutcome::Failed(message) => {
                warn!(error = %message, "failed to read input");
                return Err(anyhow!("could not read input: {message}"));
            }
        };

        let flow = tokio::select! {
            flow = session.handle_line(&line) => flow,
            _ = tokio::signal::ctrl_c() => {
                println!("\nInterruption detected (Ctrl+C). Chat closed by user.");
                return Ok(());
            }
        };

        match flow {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => return Ok(()),
            Err(e) => {
                warn!(error = %e, "failed to write output");
                println!("\nUnexpected error during processing: {e}");
                println!("You can try again, type \"status\" to check the system, or \"exit\" to quit.");
            }
        }
    }
}
