use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use waypoint::app::script::{self, Script, ScriptReport};
use waypoint::app::{AppCoordinator, AppEvent, Credentials, Services, ViewRegistry};
use waypoint::config::Config;
use waypoint::coordinator::{CoordinatorTree, LifecycleEvent};
use waypoint::host::{InMemorySurface, NavigationHost, Transition};
use waypoint::logging::init_tracing;
use waypoint::shutdown::Shutdown;

const SCRIPT_GRACE: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "waypoint", version, about = "Runs the demo navigation flow headlessly")]
struct Cli {
    /// Config file (default: ~/.config/waypoint/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = waypoint::app::DEMO_EMAIL)]
    email: String,

    #[arg(long, default_value = waypoint::app::DEMO_PASSWORD)]
    password: String,

    /// Account to open from the dashboard
    #[arg(long, default_value = "acc-1")]
    account: String,

    /// Make the account service fail
    #[arg(long)]
    fail_accounts: bool,

    /// Simulated animation time per surface transition
    #[arg(long, default_value_t = 0)]
    transition_ms: u64,

    /// Simulated service latency
    #[arg(long, default_value_t = 20)]
    latency_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_tracing(&config.logging);

    let surface = Arc::new(InMemorySurface::with_delay(Duration::from_millis(
        cli.transition_ms,
    )));
    let host = Arc::new(NavigationHost::new(surface.clone(), &config.navigation));

    let services = Services::demo(Duration::from_millis(cli.latency_ms));
    services.accounts.set_unavailable(cli.fail_accounts);
    let views = ViewRegistry::default();

    let mut tree = CoordinatorTree::<AppEvent>::new(Arc::clone(&host), &config.contract);
    let mut lifecycle = tree.subscribe();
    tree.launch(|| AppCoordinator::new(services, views.clone()))
        .await
        .context("failed to launch the app flow")?;

    let shutdown = Shutdown::new();
    let ctrl_c = shutdown.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.signal();
        }
    });

    let mut driver = {
        let done = shutdown.handle();
        let script = Script {
            credentials: Credentials::new(cli.email, cli.password),
            account: cli.account,
        };
        tokio::spawn(async move {
            let report = script::play(&views, &script).await;
            done.signal();
            report
        })
    };

    let completion = tree.run(shutdown.handle()).await;
    // After Ctrl-C the script may be waiting on a screen that will never come.
    let report = match tokio::time::timeout(SCRIPT_GRACE, &mut driver).await {
        Ok(joined) => Some(joined.context("demo script panicked")?),
        Err(_) => {
            driver.abort();
            None
        }
    };

    println!("transitions:");
    for transition in surface.transitions() {
        match transition {
            Transition::Present(route) => println!("  present  {route}"),
            Transition::ReplaceTop(route) => println!("  replace  {route}"),
            Transition::Dismiss => println!("  dismiss"),
            Transition::Remove(route) => println!("  remove   {route}"),
        }
    }

    println!("lifecycle:");
    while let Ok(event) = lifecycle.try_recv() {
        match event {
            LifecycleEvent::Started { id, name, .. } => println!("  started  {name} {id}"),
            LifecycleEvent::Finished { id, name, reason, .. } => {
                println!("  finished {name} {id} ({reason})")
            }
        }
    }

    if let Some(report) = report {
        print_report(&report)?;
    }
    if let Some(completion) = completion {
        println!("root {} finished: {}", completion.id, completion.reason);
    }
    Ok(())
}

fn print_report(report: &ScriptReport) -> anyhow::Result<()> {
    if let Some(token) = &report.token {
        println!("token: {}", serde_json::to_string(token)?);
    }
    if let Some(reason) = &report.rejection {
        println!("login rejected: {reason}");
    }
    println!("accounts: {}", report.accounts.len());
    if let Some(account) = &report.detail {
        println!("opened: {}", serde_json::to_string_pretty(account)?);
    }
    if let Some(failure) = &report.failure {
        println!("failed: {failure}");
    }
    println!("signed out: {}", report.signed_out);
    Ok(())
}
