use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use slint::ComponentHandle;
use tracing_subscriber::EnvFilter;

use caisse::catalog::ConsoleState;
use caisse::config::ScanConfig;
use caisse::db::SqliteCatalog;
use caisse::event_handlers::{Console, setup_event_handlers};

#[derive(Parser, Debug)]
#[command(name = "caisse", version, about = "Console de caisse et de scan")]
struct Cli {
    /// Scan configuration file. Missing keys take their defaults.
    #[arg(long, default_value = "caisse.json")]
    config: PathBuf,

    /// Console snapshot that replaces the database contents before the
    /// window opens.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ScanConfig::load(&cli.config)?;

    let mut catalog = SqliteCatalog::open(&config.database_path)?;
    if let Some(snapshot) = &cli.snapshot {
        let state = ConsoleState::load(snapshot)?;
        catalog.import_state(&state)?;
    }

    let console = Rc::new(RefCell::new(Console::new(catalog, &config)));
    let ui = caisse::ui::MainWindow::new()?;
    let _timers = setup_event_handlers(console, &ui);

    ui.run()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_config_without_snapshot() {
        let cli = Cli::try_parse_from(["caisse"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("caisse.json"));
        assert_eq!(cli.snapshot, None);
    }

    #[test]
    fn takes_config_and_snapshot_options() {
        let cli = Cli::try_parse_from([
            "caisse",
            "--config",
            "/etc/caisse.json",
            "--snapshot",
            "export.json",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/caisse.json"));
        assert_eq!(cli.snapshot, Some(PathBuf::from("export.json")));
    }

    #[test]
    fn positional_paths_are_rejected() {
        assert!(Cli::try_parse_from(["caisse", "caisse.json"]).is_err());
    }
}
