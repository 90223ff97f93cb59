use azure_pip_migration::azure::{select_subscriptions, AzCliClient, PublicIpClient};
use azure_pip_migration::cli::{Cli, Commands};
use azure_pip_migration::config::MigrationConfig;
use azure_pip_migration::inventory::{build_inventory, CsvFileStore, InventoryStore};
use azure_pip_migration::orchestrator::{run_cleanup, run_create, run_validate, PhaseOutcome};
use azure_pip_migration::output::print_summary;
use azure_pip_migration::validation::NetworkProber;
use clap::Parser;
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    log4rs::init_file("log4rs.yml", Default::default()).expect("Error initializing log4rs");
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut config = MigrationConfig::load(&cli.config)?;
    if let Some(batch_size) = cli.batch_size {
        log::info!("batch size overridden to {batch_size} for this invocation");
        config.batch_size = batch_size;
    }

    // Ctrl-C stops the running phase between records, never mid-record.
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_on_signal = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, finishing the current record then stopping");
            cancel_on_signal.store(true, Ordering::SeqCst);
        }
    });

    let client = AzCliClient::new();
    let store = CsvFileStore::new(&config.output_dir);

    let outcome = match cli.command {
        Commands::Discovery => {
            log::info!("#Start discovery");
            let subscriptions = select_subscriptions(&config, client.list_subscriptions()?)?;
            let records = build_inventory(&client, &subscriptions);
            store.save(&records)?;
            print_summary(&records);
            PhaseOutcome::default()
        }
        Commands::Create => {
            log::info!("#Start create (dry_run={})", cli.dry_run);
            let mut records = store.load()?;
            let outcome = run_create(&client, &mut records, &config, cli.dry_run, &cancel);
            store.save(&records)?;
            print_summary(&records);
            outcome.log("create");
            outcome
        }
        Commands::Validate => {
            log::info!("#Start validate");
            let mut records = store.load()?;
            let prober = NetworkProber::new(config.probe_timeout());
            let outcome = run_validate(&prober, &mut records, &config, &cancel).await;
            store.save(&records)?;
            print_summary(&records);
            outcome.log("validate");
            outcome
        }
        Commands::Cleanup { confirm } => {
            log::info!("#Start cleanup (confirm={confirm}, dry_run={})", cli.dry_run);
            let mut records = store.load()?;
            let now = chrono::Utc::now();
            let result = run_cleanup(&client, &mut records, &config, confirm, cli.dry_run, now, &cancel);
            // Even an aborted cleanup leaves the records untouched, but a
            // partially failed one must still be persisted.
            store.save(&records)?;
            let outcome = result?;
            print_summary(&records);
            outcome.log("cleanup");
            outcome
        }
        Commands::Report => {
            let records = store.load()?;
            print_summary(&records);
            PhaseOutcome::default()
        }
    };

    if outcome.has_failures() {
        log::error!("{} record(s) ended in Failed during this invocation", outcome.failed);
        std::process::exit(1);
    }
    Ok(())
}
