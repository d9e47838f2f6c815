use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::future::Future;
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;

use toolwire_tool_runtime::{ToolCallRecord, TurnOutcome};

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const USER_PROMPT: Color = Color::Green;
    const ASSISTANT_TEXT: Color = Color::Cyan;
    const TOOL_CALL: Color = Color::Yellow;
    const TOOL_RESULT: Color = Color::DarkGreen;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
    const HEADER: Color = Color::Magenta;
}

/// Longest tool result echoed to the terminal.
const MAX_RESULT_CHARS: usize = 500;

/// What the user typed at the prompt.
#[derive(Debug, PartialEq)]
pub enum Input {
    Line(String),
    Empty,
    Exit,
}

/// Classify one raw line. `None` means stdin closed.
pub fn parse_input(raw: Option<&str>) -> Input {
    let Some(raw) = raw else {
        return Input::Exit;
    };
    match raw.trim() {
        "" => Input::Empty,
        "exit" | "quit" | "/exit" | "/quit" => Input::Exit,
        text => Input::Line(text.to_string()),
    }
}

/// Read stdin lines on a dedicated thread. The channel closes at EOF.
///
/// A plain thread, not `spawn_blocking`, so a read still pending at exit
/// does not hold up runtime shutdown.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Wait for the next line, or `Exit` if `interrupt` fires first.
pub async fn next_input<I>(lines: &mut mpsc::UnboundedReceiver<String>, interrupt: I) -> Input
where
    I: Future<Output = ()>,
{
    tokio::select! {
        biased;
        line = lines.recv() => parse_input(line.as_deref()),
        _ = interrupt => Input::Exit,
    }
}

fn truncate(content: &str) -> String {
    match content.char_indices().nth(MAX_RESULT_CHARS) {
        Some((cut, _)) => format!("{}... ({} chars total)", &content[..cut], content.chars().count()),
        None => content.to_string(),
    }
}

/// Terminal I/O for the interactive REPL.
pub struct Terminal;

impl Terminal {
    pub fn print_banner(&self, provider: &str, model: &str, tools_from: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("toolwire-chat"),
            ResetColor,
            Print(" - tool-calling chat over MCP\n"),
            SetForegroundColor(Colors::DIM),
            Print(format!("Provider: {} | Model: {} | Tools: {}\n", provider, model, tools_from)),
            Print("Type 'exit' or 'quit' to end. Ctrl+C cancels the current turn, or exits at the prompt.\n"),
            Print("---\n"),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_prompt(&self) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            Print("\n"),
            SetForegroundColor(Colors::USER_PROMPT),
            Print("you> "),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    fn display_tool_call(&self, record: &ToolCallRecord) -> Result<()> {
        let mut stdout = io::stdout();
        let (color, label, content) = if record.result.success {
            (Colors::TOOL_RESULT, "result", record.result.data_text())
        } else {
            (
                Colors::ERROR,
                "error",
                record.result.error.clone().unwrap_or_default(),
            )
        };
        execute!(
            stdout,
            SetForegroundColor(Colors::TOOL_CALL),
            Print(format!(
                "[tool: {}] {}\n",
                record.call.name,
                serde_json::Value::Object(record.call.arguments.clone())
            )),
            SetForegroundColor(color),
            Print(format!("  [{} {}]: {}\n", record.call.name, label, truncate(&content))),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Show each tool call of the turn, then the answer.
    pub fn display_outcome(&self, outcome: &TurnOutcome) -> Result<()> {
        for record in &outcome.tool_calls {
            self.display_tool_call(record)?;
        }
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ASSISTANT_TEXT),
            Print(format!("{}\n", outcome.answer)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ERROR),
            Print(format!("Error: {}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_info(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }
}
