//! Opens one session, prints events and closes after a few of them
//!
//! Run with: cargo run --example open -- https://example.com/events [max_events]

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use sseload::{ChannelSink, Engine, EngineConfig, OpenParams, TransportConfig};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| "https://example.com/events".to_string());
    let max_events: usize = args.next().map(|n| n.parse()).transpose()?.unwrap_or(10);

    // Ctrl-C releases the session without calling any more handlers
    let context = CancellationToken::new();
    tokio::spawn({
        let context = context.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                context.cancel();
            }
        }
    });

    let (sink, mut samples) = ChannelSink::new(256);
    let totals = tokio::spawn(async move {
        let mut totals = BTreeMap::<&'static str, f64>::new();
        while let Some(set) = samples.recv().await {
            for sample in set.samples {
                *totals.entry(sample.metric.name()).or_default() += sample.value;
            }
        }
        totals
    });

    let engine = Engine::new(
        EngineConfig::new().tag("demo", "open"),
        TransportConfig::new(),
        Arc::new(sink),
    )?
    .with_context(context);

    let received = Arc::new(AtomicUsize::new(0));
    let params = OpenParams::new().header("Cache-Control", "no-cache");

    println!("Connecting to {url}...");
    let summary = engine
        .open(&url, params, |client| {
            let received = received.clone();
            client
                .on_open(|session| {
                    println!("Connection opened to {}", session.url());
                    Ok(())
                })
                .on_event(move |session, event| {
                    println!("Event type: {}", event.name);
                    println!("Data: {}", event.data);
                    if !event.id.is_empty() {
                        println!("ID: {}", event.id);
                    }
                    println!("---");
                    if received.fetch_add(1, Ordering::Relaxed) + 1 >= max_events {
                        session.close();
                    }
                    Ok(())
                })
                .on_error(|session, err| {
                    eprintln!("Error: {err}");
                    session.close();
                    Ok(())
                });
            Ok(())
        })
        .await?;

    if summary.is_error() {
        eprintln!("Connection failed: {}", summary.error);
    } else {
        println!("Status {} from {}", summary.status, summary.url);
    }

    drop(engine);
    for (metric, total) in totals.await? {
        println!("{metric}: {total}");
    }
    Ok(())
}
