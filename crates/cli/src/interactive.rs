//! Page-by-page image selection over stdin.

use std::io::{self, BufRead, Write};

use anyhow::{Context, bail};
use owo_colors::OwoColorize;
use pluck_core::{Phase, Pluck, PluckError, Session, SessionEvent, fetch_file};

use crate::echo::{DownloadBar, print_candidate, print_error, print_info, print_success, print_warning};
use crate::{Args, save_archive};

const HELP: &str = "n/p next/prev page · g <N> go to page · t <N..> toggle · sp/cp select/clear page · \
                    sa/ca select/clear all · go package · r start over · q quit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Next,
    Prev,
    Page(usize),
    Toggle(Vec<usize>),
    SelectPage,
    ClearPage,
    SelectAll,
    ClearAll,
    Package,
    Restart,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Command::Empty;
        };
        let numbers: Option<Vec<usize>> = words.map(|w| w.parse().ok()).collect();

        match (head.to_lowercase().as_str(), numbers) {
            ("n" | "next", _) => Command::Next,
            ("p" | "prev", _) => Command::Prev,
            ("g" | "page", Some(n)) if n.len() == 1 => Command::Page(n[0]),
            ("t" | "toggle", Some(n)) if !n.is_empty() && n.iter().all(|i| *i > 0) => Command::Toggle(n),
            ("sp", _) => Command::SelectPage,
            ("cp", _) => Command::ClearPage,
            ("sa", _) => Command::SelectAll,
            ("ca", _) => Command::ClearAll,
            ("go" | "package", _) => Command::Package,
            ("r" | "restart", _) => Command::Restart,
            ("h" | "help" | "?", _) => Command::Help,
            ("q" | "quit" | "exit", _) => Command::Quit,
            _ => Command::Unknown(line.trim().to_string()),
        }
    }
}

/// First 1-based item number past the end of the candidate list.
fn first_unknown(items: &[usize], total: usize) -> Option<usize> {
    items.iter().copied().find(|n| *n > total)
}

fn prompt(label: &str) {
    eprint!("{} ", format!("{}>", label).bright_blue());
    let _ = io::stderr().flush();
}

fn render(session: &Session) {
    let cursor = session.cursor();
    eprintln!(
        "\n{} {}",
        format!("Page {}/{}", cursor.page(), cursor.total_pages()).bold(),
        format!(
            "· {} of {} selected",
            session.selection().included_count(),
            session.candidates().len()
        )
        .dimmed()
    );
    for (candidate, included) in session.page_items() {
        print_candidate(candidate, included);
    }
}

fn report(err: &PluckError) {
    if err.is_soft() || matches!(err, PluckError::InvalidPhase { .. } | PluckError::NoSuchItem(_)) {
        print_warning(&err.to_string());
    } else {
        print_error(&err.to_string());
    }
}

async fn discover(session: &mut Session, url: &str, html_file: Option<&str>) -> Result<usize, PluckError> {
    match html_file {
        Some(path) => {
            let html = fetch_file(path)?;
            session.load_document(url, &html)
        }
        None => session.discover(url).await,
    }
}

/// Runs the selection loop until `q` or end of input.
pub async fn run(pluck: Pluck, args: &Args) -> anyhow::Result<()> {
    if args.html.as_deref() == Some("-") {
        bail!("--html - cannot be combined with --interactive; stdin carries the commands");
    }

    let mut session = Session::new(pluck);
    let mut bar = DownloadBar::default();
    session.subscribe(Box::new(move |event: &SessionEvent| {
        if let SessionEvent::Progress(progress) = event {
            bar.update(*progress);
        }
    }));

    let mut pending = Some((args.url.clone(), args.html.clone()));
    let mut lines = io::stdin().lock().lines();

    loop {
        if session.phase() == Phase::AwaitingInput {
            let (url, html_file) = match pending.take() {
                Some(first) => first,
                None => {
                    prompt("url");
                    let Some(line) = lines.next() else {
                        return Ok(());
                    };
                    let line = line.context("Failed to read from stdin")?;
                    if Command::parse(&line) == Command::Quit {
                        return Ok(());
                    }
                    (line.trim().to_string(), None)
                }
            };

            match discover(&mut session, &url, html_file.as_deref()).await {
                Ok(count) => {
                    print_info(&format!("Found {} images", count));
                    eprintln!("{}", HELP.dimmed());
                    render(&session);
                }
                Err(e) => report(&e),
            }
            continue;
        }

        prompt("pluck");
        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line.context("Failed to read from stdin")?;

        let outcome = match Command::parse(&line) {
            Command::Quit => return Ok(()),
            Command::Empty => continue,
            Command::Help => {
                eprintln!("{}", HELP.dimmed());
                continue;
            }
            Command::Unknown(text) => {
                print_warning(&format!("Unknown command: {} (h for help)", text));
                continue;
            }
            Command::Next => session.next_page().map(|_| ()),
            Command::Prev => session.prev_page().map(|_| ()),
            Command::Page(page) => session.go_to_page(page).map(|_| ()),
            Command::Toggle(items) => match first_unknown(&items, session.candidates().len()) {
                Some(n) => {
                    print_warning(&format!("No image #{} (1-{} available)", n, session.candidates().len()));
                    continue;
                }
                None => items.iter().try_for_each(|n| session.toggle(n - 1).map(|_| ())),
            },
            Command::SelectPage => session.select_page(),
            Command::ClearPage => session.clear_page(),
            Command::SelectAll => session.select_all(),
            Command::ClearAll => session.clear_all(),
            Command::Restart => {
                session.start_over();
                continue;
            }
            Command::Package => match session.package().await {
                Ok(archive) => {
                    let path = args.output_path(archive);
                    save_archive(archive, &path)?;
                    print_success("Type r to start over or q to quit");
                    continue;
                }
                Err(e) => Err(e),
            },
        };

        match outcome {
            Ok(()) => render(&session),
            Err(e) => report(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("n"), Command::Next);
        assert_eq!(Command::parse("  prev "), Command::Prev);
        assert_eq!(Command::parse("g 3"), Command::Page(3));
        assert_eq!(Command::parse("t 1 4 9"), Command::Toggle(vec![1, 4, 9]));
        assert_eq!(Command::parse("CA"), Command::ClearAll);
        assert_eq!(Command::parse("go"), Command::Package);
        assert_eq!(Command::parse(""), Command::Empty);
        assert_eq!(Command::parse("q"), Command::Quit);
    }

    #[test]
    fn test_first_unknown_item() {
        assert_eq!(first_unknown(&[1, 25], 25), None);
        assert_eq!(first_unknown(&[1, 99, 30], 25), Some(99));
        assert_eq!(first_unknown(&[1], 0), Some(1));
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert_eq!(Command::parse("t"), Command::Unknown("t".to_string()));
        assert_eq!(Command::parse("t 0"), Command::Unknown("t 0".to_string()));
        assert_eq!(Command::parse("t x"), Command::Unknown("t x".to_string()));
        assert_eq!(Command::parse("g 1 2"), Command::Unknown("g 1 2".to_string()));
    }
}
