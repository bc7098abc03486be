mod config;
mod executor;
mod matcher;
mod model;
mod notify;
mod state;
mod store;
mod window;

#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crate::config::load_config;
use crate::executor::{Dispatcher, SystemLauncher};
use crate::model::{SettingsPatch, Shortcut, ShortcutInput, ShortcutPatch};
use crate::notify::{DialogNotifier, LogNotifier, Notifier};
use crate::state::Launchpad;
use crate::store::{RecordStore, StorePaths};
use crate::window::HeadlessWindow;
use log::info;
use std::sync::Arc;
use std::time::Duration;

/// How long a run without `--wait` lingers for quick commands to report.
const COMMAND_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Report failures in the log only, without dialogs
    #[arg(long, global = true)]
    no_dialog: bool,

    /// Wait for launched commands to finish instead of leaving them running
    #[arg(long, global = true)]
    wait: bool,

    #[command(subcommand)]
    request: Option<Request>,
}

#[derive(Subcommand, Debug)]
enum Request {
    /// Show all shortcuts in display order
    List,
    /// Show shortcuts matching a query
    Find { query: Vec<String> },
    /// Run the best match, or search the web when nothing matches
    Launch { query: Vec<String> },
    /// Run the shortcut at an index
    Run {
        #[arg(allow_negative_numbers = true)]
        index: i64,
    },
    /// Search the web
    Search { query: Vec<String> },
    /// Append a shortcut
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        path: String,
        /// url, app, command or folder
        #[arg(long = "type", default_value = "app")]
        kind: String,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete the shortcut at an index
    Remove {
        #[arg(allow_negative_numbers = true)]
        index: i64,
    },
    /// Change fields of the shortcut at an index
    Update {
        #[arg(allow_negative_numbers = true)]
        index: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        path: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Show settings
    Settings,
    /// Change settings
    Set {
        #[arg(long)]
        theme: Option<String>,
        #[arg(long)]
        start_at_login: Option<bool>,
        #[arg(long)]
        max_results: Option<u32>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // 1. Load Config
    let config = load_config()?;
    let data_dir = config.data_dir();
    info!("Using data directory {:?}", data_dir);

    // 2. Wire collaborators
    let notifier: Arc<dyn Notifier> = if args.no_dialog || !config.general.dialogs {
        Arc::new(LogNotifier)
    } else {
        Arc::new(DialogNotifier)
    };
    let launcher = Arc::new(SystemLauncher::new(config.general.shell.clone()));
    let window = Arc::new(HeadlessWindow);

    // 3. Load store
    let store = RecordStore::open(StorePaths::in_dir(&data_dir), Arc::clone(&notifier));
    info!("Auto-launch at login: {}", store.settings().start_at_login);

    let dispatcher = Dispatcher::new(
        launcher.clone(),
        notifier,
        window.clone(),
        config.general.search_url.clone(),
    );
    let mut launchpad = Launchpad::new(store, dispatcher, window);

    // 4. Serve one request
    handle(&mut launchpad, args.request.unwrap_or(Request::List))?;

    // 5. Let quick commands report their failures; long ones keep running
    if args.wait {
        launcher.drain();
    } else {
        launcher.drain_for(Some(COMMAND_GRACE));
    }
    Ok(())
}

fn handle(launchpad: &mut Launchpad, request: Request) -> Result<()> {
    match request {
        Request::List => print_shortcuts(launchpad.get_shortcuts(), None),
        Request::Find { query } => {
            let indices = launchpad.find(&query.join(" "));
            print_shortcuts(launchpad.get_shortcuts(), Some(indices.as_slice()));
        }
        Request::Launch { query } => launchpad.launch(&query.join(" ")),
        Request::Run { index } => {
            let shortcut = usize::try_from(index)
                .ok()
                .and_then(|i| launchpad.get_shortcuts().get(i))
                .cloned();
            match shortcut {
                Some(shortcut) => launchpad.execute_shortcut(&shortcut),
                None => eprintln!("No shortcut at index {}", index),
            }
        }
        Request::Search { query } => launchpad.search_fallback(&query.join(" ")),
        Request::Add { name, path, kind, icon } => {
            let shortcuts = launchpad.add_shortcut(ShortcutInput {
                name,
                path,
                kind: kind.into(),
                icon,
                ..Default::default()
            });
            print_shortcuts(shortcuts, None);
        }
        Request::Remove { index } => print_shortcuts(launchpad.delete_shortcut(index), None),
        Request::Update { index, name, path, kind, icon } => {
            let patch = ShortcutPatch {
                name,
                path,
                kind: kind.map(Into::into),
                icon,
                ..Default::default()
            };
            print_shortcuts(launchpad.update_shortcut(index, patch), None);
        }
        Request::Settings => println!("{}", serde_json::to_string_pretty(launchpad.get_settings())?),
        Request::Set { theme, start_at_login, max_results } => {
            let settings = launchpad.update_settings(SettingsPatch {
                theme,
                start_at_login,
                max_results,
            });
            println!("{}", serde_json::to_string_pretty(settings)?);
        }
    }
    Ok(())
}

fn print_shortcuts(shortcuts: &[Shortcut], only: Option<&[usize]>) {
    let all: Vec<usize> = (0..shortcuts.len()).collect();
    for &i in only.unwrap_or(&all) {
        let s = &shortcuts[i];
        println!("{:>3}  [{}] {}  ({})  {}", i, s.display_icon(), s.name, s.kind.label(), s.path);
    }
}
