//! Interactive terminal chat against a running gateway.
//!
//! Chunks are echoed raw as they stream in; once the answer is complete the
//! raw echo is erased and the turn is printed again as rendered markdown.

use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use crossterm::style::Stylize;
use crossterm::{cursor, execute, terminal};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use termimad::MadSkin;

use crate::client::{ChatClient, ChatTranscript, Role, Turn};

const PROMPT: &str = "tú> ";

enum Command {
    Send(String),
    Clear,
    Help,
    Exit,
}

fn parse_command(line: &str) -> Command {
    match line.trim() {
        "/salir" | "/exit" | "/quit" => Command::Exit,
        "/limpiar" | "/clear" => Command::Clear,
        "/ayuda" | "/help" => Command::Help,
        other => Command::Send(other.to_string()),
    }
}

/// Terminal rows taken by `text` when printed at `width` columns.
fn rows_used(text: &str, width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = text
        .split('\n')
        .map(|line| line.chars().count().div_ceil(width).max(1))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".concierge").join("history"))
}

fn print_help() {
    println!("Escriba su consulta y pulse Enter.");
    println!("  /limpiar  borra la conversación");
    println!("  /salir    termina la sesión");
}

fn print_label(role: Role) {
    let label = match role {
        Role::User => role.label().bold().cyan(),
        Role::Assistant => role.label().bold().dark_yellow(),
    };
    println!("{label}");
}

fn render_turn(skin: &MadSkin, turn: &Turn) {
    if turn.is_error {
        println!("{}", turn.content.as_str().red());
    } else {
        skin.print_text(&turn.content);
    }
}

/// Run the chat loop until EOF or `/salir`.
pub async fn run_repl(gateway_url: &str) -> anyhow::Result<()> {
    let client = ChatClient::new(gateway_url)?;
    let skin = MadSkin::default();
    let interactive = std::io::stdout().is_terminal();
    let mut transcript = ChatTranscript::new();

    let mut rl = DefaultEditor::new()?;
    let history = history_path();
    if let Some(path) = &history {
        let _ = rl.load_history(path);
    }

    println!("{}", "Concierge".bold());
    println!("Conectado a {}. Escriba /ayuda para ver los comandos.\n", gateway_url);

    loop {
        let line = match tokio::task::block_in_place(|| rl.readline(PROMPT)) {
            Ok(line) => line,
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => continue,
            Err(e) => return Err(e.into()),
        };

        let message = match parse_command(&line) {
            Command::Exit => break,
            Command::Help => {
                print_help();
                continue;
            }
            Command::Clear => {
                transcript.clear();
                if interactive {
                    execute!(
                        std::io::stdout(),
                        terminal::Clear(terminal::ClearType::All),
                        cursor::MoveTo(0, 0)
                    )?;
                }
                continue;
            }
            Command::Send(text) => text,
        };

        let Some(message) = transcript.begin_submit(&message) else {
            continue;
        };
        let _ = rl.add_history_entry(message.as_str());

        print_label(Role::Assistant);
        let mut stdout = std::io::stdout();
        let result = client
            .stream_message(&message, |chunk| {
                transcript.push_chunk(chunk);
                print!("{chunk}");
                let _ = stdout.flush();
            })
            .await;

        match result {
            Ok(_) => {
                let streamed = transcript.streaming().to_string();
                if interactive {
                    let (width, _) = terminal::size().unwrap_or((80, 24));
                    let up = rows_used(&streamed, width).saturating_sub(1);
                    execute!(stdout, cursor::MoveToColumn(0))?;
                    if up > 0 {
                        execute!(stdout, cursor::MoveToPreviousLine(up))?;
                    }
                    execute!(stdout, terminal::Clear(terminal::ClearType::FromCursorDown))?;
                }
                if let Some(turn) = transcript.finish() {
                    if interactive {
                        render_turn(&skin, turn);
                    } else {
                        println!();
                    }
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Chat request failed");
                println!();
                if let Some(turn) = transcript.fail() {
                    render_turn(&skin, turn);
                }
                eprintln!("{} {e}", "error:".red().bold());
            }
        }
        println!();
    }

    if let Some(path) = &history {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        let _ = rl.save_history(path);
    }
    Ok(())
}
