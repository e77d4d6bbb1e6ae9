use forum_view_core::{DocumentService, ForumSession, UploadFile};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::opener::BrowserOpener;
use crate::render::render_view;

pub const HELP: &str = "\
commands:
  text <words>     add a local note (not uploaded)
  upload <path>    upload a .pdf or .docx file
  search <query>   search documents and show the AI response
  open <n>         open document [n] of the current list
  refresh          reload the document list
  show             print the current list
  help             print this message
  quit             leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Text(String),
    Upload(Option<PathBuf>),
    Search(String),
    Open(Option<usize>),
    Refresh,
    Show,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Option<ShellCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "text" | "note" => ShellCommand::Text(rest.to_string()),
        "upload" => ShellCommand::Upload((!rest.is_empty()).then(|| PathBuf::from(rest))),
        "search" => ShellCommand::Search(rest.to_string()),
        "open" => ShellCommand::Open(rest.parse().ok()),
        "refresh" | "list" => ShellCommand::Refresh,
        "show" => ShellCommand::Show,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => ShellCommand::Unknown(other.to_string()),
    };
    Some(command)
}

enum Input {
    Line(Option<String>),
    Applied(Option<bool>),
}

/// Reads commands from stdin until `quit` or end of input. Network calls run
/// in the background; their results are printed as they land.
pub async fn run<S>(mut session: ForumSession<S>, opener: BrowserOpener) -> anyhow::Result<()>
where
    S: DocumentService + 'static,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");
    let _startup = session.spawn_refresh_documents();

    loop {
        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line?),
            applied = session.next_event() => Input::Applied(applied),
        };

        let line = match input {
            Input::Applied(Some(_)) => {
                print!("{}", render_view(&session.view(), session.store().notice()));
                continue;
            }
            Input::Applied(None) => continue,
            Input::Line(None) => break,
            Input::Line(Some(line)) => line,
        };

        let Some(command) = parse_command(&line) else {
            continue;
        };

        match command {
            ShellCommand::Text(text) => {
                if session.add_text_entry(text) {
                    print!("{}", render_view(&session.view(), session.store().notice()));
                } else {
                    println!("nothing to add");
                }
            }
            ShellCommand::Upload(path) => {
                let file = match path {
                    Some(path) => match UploadFile::from_path(&path).await {
                        Ok(file) => Some(file),
                        Err(error) => {
                            warn!(path = %path.display(), error = %error, "cannot read upload");
                            println!("cannot upload {}: {error}", path.display());
                            continue;
                        }
                    },
                    None => None,
                };
                let _upload = session.spawn_upload(file);
            }
            ShellCommand::Search(query) => {
                if session.spawn_search(query).is_none() {
                    println!("type something to search for");
                }
            }
            ShellCommand::Open(Some(index)) => {
                if let Err(error) = session.open_document(index, &opener).await {
                    println!("cannot open [{index}]: {error}");
                }
            }
            ShellCommand::Open(None) => println!("usage: open <n>"),
            ShellCommand::Refresh => {
                let _refresh = session.spawn_refresh_documents();
            }
            ShellCommand::Show => {
                print!("{}", render_view(&session.view(), session.store().notice()));
            }
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Quit => break,
            ShellCommand::Unknown(verb) => println!("unknown command `{verb}`, try `help`"),
        }
    }

    session.shutdown();
    Ok(())
}
