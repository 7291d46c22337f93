//! Prints every change of a database until interrupted.
//!
//! Usage:
//! - `cargo run -p changes_feed --example follow_changes -- <DATABASE> [SINCE]`
//!
//! The server defaults to `http://127.0.0.1:5984/`; override it with `COUCHDB_URL`
//! (credentials may be embedded). Log verbosity follows `RUST_LOG`.

use std::{env, error::Error, sync::Arc, time::Duration};

use changes_feed::{
    Change, ChangeListener, ChangeNotifier, CloseReason, CouchDatabase, Seq, StartOptions,
};
use tracing_subscriber::EnvFilter;

struct PrintListener;

impl ChangeListener for PrintListener {
    fn on_change(&self, change: &Change) {
        let seq = change
            .seq
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let rev = change.latest_rev().unwrap_or("-");
        let marker = if change.deleted { " (deleted)" } else { "" };
        println!("{seq}\t{}\t{rev}{marker}", change.id);
    }

    fn on_closed(&self, reason: &CloseReason) {
        eprintln!("feed closed: {reason}");
    }
}

fn usage() {
    eprintln!("usage: follow_changes <DATABASE> [SINCE]");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let Some(db_name) = args.next() else {
        usage();
        return Ok(());
    };
    let since = args.next().map(|raw| raw.parse::<Seq>()).transpose()?;

    let server = env::var("COUCHDB_URL").unwrap_or_else(|_| "http://127.0.0.1:5984/".to_string());
    let database = Arc::new(CouchDatabase::parse(&server)?);

    let notifier = ChangeNotifier::new(database, Some(&db_name), since)?;
    notifier.add_listener(Arc::new(PrintListener));

    let from = notifier
        .start(StartOptions::new().heartbeat(Duration::from_secs(30)))
        .await?;
    eprintln!("following `{db_name}` from {from}; ctrl-c to stop");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            if notifier.stop().is_ok() {
                notifier.closed().await;
            }
        }
        _ = notifier.closed() => {}
    }

    let stats = notifier.stats();
    eprintln!(
        "delivered {} changes, dropped {} lines; resume with since={}",
        stats.changes_delivered,
        stats.records_dropped,
        notifier.since().map(|seq| seq.to_string()).unwrap_or_default()
    );
    Ok(())
}
