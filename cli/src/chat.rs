use std::io::{self, BufRead, Write};

use qcr_ai::retrieve::QueryHandler;
use qcr_ai::session::{ChatSession, Role};
use qcr_core::error::AppError;

use crate::commands::AppContext;
use crate::output;

const HELP: &str = "Ask a question about past quality cases. Commands: /history, /clear, /exit";

pub fn run(ctx: &AppContext) -> Result<(), AppError> {
    let handler = ctx.query_handler()?;
    if !handler.is_ready() {
        eprintln!(
            "No index at {}. Run `qcr build` first.",
            ctx.settings.index_path.display()
        );
    }
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut session = ChatSession::new();
    chat_loop(&handler, &mut session, stdin.lock(), stdout.lock())
}

/// Read questions line by line until `/exit` or end of input.
///
/// A failed question is reported and the session continues.
pub(crate) fn chat_loop<R: BufRead, W: Write>(
    handler: &QueryHandler,
    session: &mut ChatSession,
    input: R,
    mut out: W,
) -> Result<(), AppError> {
    let io_err = |e: io::Error| AppError::new("CHAT_IO_FAILED", "Failed to write chat output").with_details(e.to_string());

    writeln!(out, "{HELP}").map_err(io_err)?;
    prompt(&mut out).map_err(io_err)?;
    for line in input.lines() {
        let line = line.map_err(|e| {
            AppError::new("CHAT_IO_FAILED", "Failed to read chat input").with_details(e.to_string())
        })?;
        let line = line.trim();
        match line {
            "" => {}
            "/exit" | "/quit" => break,
            "/clear" => {
                session.clear();
                writeln!(out, "History cleared.").map_err(io_err)?;
            }
            "/history" => writeln!(out, "{}", format_history(session)).map_err(io_err)?,
            "/help" => writeln!(out, "{HELP}").map_err(io_err)?,
            question => {
                session.push_user(question);
                match handler.handle_query(question, true) {
                    Ok(res) => {
                        writeln!(out, "{}\n", output::format_answer(&res)).map_err(io_err)?;
                        session.push_assistant(res.answer, res.sources);
                    }
                    Err(e) => {
                        tracing::warn!(code = %e.code, details = ?e.details, "question failed");
                        writeln!(out, "Sorry, that question could not be answered: {e}").map_err(io_err)?;
                    }
                }
            }
        }
        prompt(&mut out).map_err(io_err)?;
    }
    writeln!(out).map_err(io_err)?;
    Ok(())
}

fn prompt<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "> ")?;
    out.flush()
}

fn format_history(session: &ChatSession) -> String {
    if session.is_empty() {
        return "No messages yet.".to_string();
    }
    session
        .turns()
        .iter()
        .map(|t| {
            let who = match t.role {
                Role::User => "You",
                Role::Assistant => "Assistant",
            };
            format!("[{}] {who}: {}", t.at, t.content.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}
