//! src/main.rs
//! Terminal file dialog: pick files or directories and print the result.
//!
//! ```text
//! valkyrie [open|save|open-many|dir|dir-only] [--filter "Label (*.c *.h);;All (*)"] [START]
//! ```
//!
//! Preferences (working directory, view, sort order, hidden files) persist in
//! the `[FileDialog]` group of the Valkyrie rc file.

use std::{io, panic::PanicHookInfo, process::ExitCode};

use anyhow::{Context, Result, bail};
use crossterm::{
    event::DisableMouseCapture,
    execute,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};
use tracing::{error, info};

use valkyrie_core::{
    LocalBackend, Logger,
    controller::TerminalRunner,
    dialog::{
        DialogSession, convenience::DialogRequest, get_existing_directory, get_open_file_name,
        get_open_file_names, get_save_file_name,
    },
};
use vkconfig::VkConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Open,
    Save,
    OpenMany,
    Dir { dirs_only: bool },
}

#[derive(Debug)]
struct Args {
    command: Command,
    request: DialogRequest,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut command = Command::Open;
        let mut request = DialogRequest::new();
        let mut seen_command = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--filter" | "-f" => {
                    let filter = args.next().context("--filter needs a value")?;
                    request = request.filter(filter);
                }
                "--caption" | "-c" => {
                    let caption = args.next().context("--caption needs a value")?;
                    request = request.caption(caption);
                }
                "open" | "save" | "open-many" | "dir" | "dir-only" if !seen_command => {
                    seen_command = true;
                    command = match arg.as_str() {
                        "save" => Command::Save,
                        "open-many" => Command::OpenMany,
                        "dir" => Command::Dir { dirs_only: false },
                        "dir-only" => Command::Dir { dirs_only: true },
                        _ => Command::Open,
                    };
                }
                flag if flag.starts_with('-') => bail!("unknown option {flag}"),
                _ => {
                    if request.start.is_some() {
                        bail!("more than one start location given");
                    }
                    request = request.start(arg);
                }
            }
        }

        Ok(Self { command, request })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    setup_panic_handler();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("valkyrie: {e:#}");
            return ExitCode::from(2);
        }
    };

    // A store that cannot start is fatal.
    let mut config = match VkConfig::open() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("valkyrie: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(args, &mut config).await {
        Ok(selection) => {
            if let Err(e) = config.sync() {
                error!(error = %e, "Could not save preferences");
                eprintln!("valkyrie: {e}");
            }
            if selection.is_empty() {
                return ExitCode::from(1);
            }
            for item in selection {
                println!("{item}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Dialog failed");
            eprintln!("valkyrie: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, config: &mut VkConfig) -> Result<Vec<String>> {
    Logger::init_tracing(&config.logs_dir()).context("Failed to initialize logging")?;
    info!(command = ?args.command, "Starting");

    let session = DialogSession::load(&*config).shared();
    let (backend, backend_rx) = LocalBackend::new();
    let backend = Box::new(backend);
    let mut runner = TerminalRunner::new(backend_rx).context("Failed to initialize terminal")?;

    let outcome = match args.command {
        Command::Open => get_open_file_name(&mut runner, backend, &session, &args.request)
            .await
            .map(Vec::from_iter),
        Command::Save => get_save_file_name(&mut runner, backend, &session, &args.request)
            .await
            .map(Vec::from_iter),
        Command::OpenMany => {
            get_open_file_names(&mut runner, backend, &session, &args.request).await
        }
        Command::Dir { dirs_only } => {
            get_existing_directory(&mut runner, backend, &session, &args.request, dirs_only)
                .await
                .map(Vec::from_iter)
        }
    };

    runner.restore().context("Failed to restore terminal")?;
    let selection = outcome.context("Dialog runtime error")?;

    session.borrow().save(config);
    info!(count = selection.len(), "Application exited cleanly");
    Ok(selection)
}

fn setup_panic_handler() {
    let original_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info: &PanicHookInfo<'_>| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen, DisableMouseCapture);

        error!("Application panicked: {}", panic_info);
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_to_open_without_arguments() {
        let args = parse(&[]).expect("parse");
        assert_eq!(args.command, Command::Open);
        assert!(args.request.start.is_none());
    }

    #[test]
    fn command_filter_and_start() {
        let args = parse(&["save", "--filter", "C (*.c)", "/tmp/out.c"]).expect("parse");
        assert_eq!(args.command, Command::Save);
        assert_eq!(args.request.filter.as_deref(), Some("C (*.c)"));
        assert_eq!(args.request.start.as_deref(), Some("/tmp/out.c"));
    }

    #[test]
    fn directory_commands() {
        assert_eq!(
            parse(&["dir-only"]).expect("parse").command,
            Command::Dir { dirs_only: true }
        );
        assert_eq!(
            parse(&["dir", "/srv"]).expect("parse").command,
            Command::Dir { dirs_only: false }
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["--filter"]).is_err());
        assert!(parse(&["/a", "/b"]).is_err());
    }
}
