use std::io;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use port_management::config::Config;
use port_management::fleet::Fleet;
use port_management::menu::Console;
use port_management::sample_data;
use port_management::store::JsonDirStore;

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Logs go to stderr so the menu owns stdout
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let store = JsonDirStore::open(&config.data_dir)
        .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;
    let mut fleet = Fleet::open(Box::new(store.clone()))?;

    if fleet.is_empty() && config.sample_data {
        fleet = sample_data::generate(config.seed)?;
        fleet.attach_store(Box::new(store));
        fleet.save()?;
        tracing::info!(seed = config.seed, "populated empty store with sample data");
    }

    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout());
    console.run(&mut fleet)?;
    Ok(())
}
