use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures::StreamExt;
use statuskeep_core::{StatusSaver, StatusSnapshot};
use tracing::{info, warn};

pub async fn paths(saver: &StatusSaver) -> Result<()> {
    if saver.sources().is_empty() {
        println!("no installed vendor apps detected");
    }
    for source in saver.sources() {
        let state = if source.path().is_dir() {
            "present"
        } else {
            "missing"
        };
        println!(
            "{:<8} {:<8} {:<7} {}",
            format!("{:?}", source.vendor),
            format!("{:?}", source.epoch),
            state,
            source
        );
    }
    println!("save dir {}", saver.save_directory().path().display());
    Ok(())
}

pub async fn scan(saver: &StatusSaver, json: bool) -> Result<()> {
    let snapshot = saver.refresh().await;
    if json {
        let rendered = serde_json::to_string_pretty(snapshot.as_ref())
            .context("failed to render snapshot")?;
        println!("{rendered}");
    } else {
        print_snapshot(&snapshot);
    }
    Ok(())
}

pub async fn download(
    saver: &StatusSaver,
    names: &[String],
    all: bool,
) -> Result<()> {
    let snapshot = saver.refresh().await;
    let targets: Vec<_> = if all {
        snapshot.items.iter().filter(|item| !item.downloaded).collect()
    } else {
        let mut picked = Vec::with_capacity(names.len());
        for name in names {
            match snapshot.find(name) {
                Some(item) => picked.push(item),
                None => bail!("no recent status named {name}"),
            }
        }
        picked
    };

    let mut failed = 0usize;
    for item in &targets {
        match saver.try_download(item).await {
            Ok(saved) => println!("saved {}", saved.display()),
            Err(err) => {
                failed += 1;
                eprintln!("failed {}: {err}", item.name);
            }
        }
    }
    info!(saved = targets.len() - failed, failed, "download run finished");
    if failed > 0 {
        bail!("{failed} of {} downloads failed", targets.len());
    }
    Ok(())
}

pub async fn watch(saver: &StatusSaver, interval_secs: u64) -> Result<()> {
    watch_until(saver, interval_secs, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "could not listen for interrupts");
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Refresh on every tick and print each publish until `stop` resolves.
async fn watch_until(
    saver: &StatusSaver,
    interval_secs: u64,
    stop: impl Future<Output = ()>,
) -> Result<()> {
    let mut stop = std::pin::pin!(stop);
    let mut updates = saver.observe_statuses().into_stream();
    let mut ticker =
        tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    // The first tick fires immediately; start already queued a refresh.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut stop => {
                info!("interrupted; stopping");
                return Ok(());
            }
            _ = ticker.tick() => saver.request_refresh(),
            next = updates.next() => match next {
                Some(snapshot) if snapshot.generation > 0 => {
                    print_snapshot(&snapshot);
                }
                Some(_) => {}
                None => {
                    warn!("refresh worker stopped");
                    return Ok(());
                }
            },
        }
    }
}

fn print_snapshot(snapshot: &StatusSnapshot) {
    println!(
        "generation {}: {} images, {} videos",
        snapshot.generation,
        snapshot.images(),
        snapshot.videos()
    );
    if !snapshot.access.broad_read {
        println!("  (storage read access not granted)");
    }
    for item in snapshot.items.iter() {
        let mark = if item.downloaded { "*" } else { " " };
        println!("{mark} {:<5} {}", item.media_type.to_string(), item.name);
    }
}
