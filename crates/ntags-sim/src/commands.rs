//! Subcommand implementations.

use anyhow::{bail, Result};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use ntags::codec;
use ntags::{Phase, SessionView, SimTag, SimTransport, TagHandle, TagReader, Termination, TransportEvent};
use ntags_conf::{NtagsConfig, SimConfig};

/// Build a simulated radio loaded with the configured tags.
pub fn build_transport(sim: &SimConfig) -> (Arc<SimTransport>, UnboundedReceiver<TransportEvent>) {
    let (transport, events) = SimTransport::new();
    transport.set_available(sim.available);

    for tag in &sim.tags {
        tracing::debug!(tag = %tag.id, capability = %tag.capability, "Loading sim tag");
        transport.insert_tag(tag.id.as_str(), SimTag::from_config(tag));
    }

    (Arc::new(transport), events)
}

/// Tags to tap: the requested ids, or every configured tag in order.
fn taps_for(config: &NtagsConfig, requested: &[String]) -> Vec<TagHandle> {
    if requested.is_empty() {
        config.sim.tags.iter().map(|t| TagHandle::new(t.id.as_str())).collect()
    } else {
        requested.iter().map(|id| TagHandle::new(id.as_str())).collect()
    }
}

/// Reason the session failed, if it did.
fn failure(view: &SessionView) -> Option<&str> {
    match view.phase {
        Phase::Terminated(Termination::Failed(ref reason)) => Some(reason.as_str()),
        _ => None,
    }
}

fn print_view(view: &SessionView, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
    } else {
        println!("{}", view.status);
        for text in &view.results {
            println!("  - {}", text);
        }
    }
    Ok(())
}

/// Start a scan session and tap each tag against it.
pub async fn read(config: &NtagsConfig, taps: &[String], json: bool) -> Result<()> {
    let taps = taps_for(config, taps);
    if taps.is_empty() {
        bail!("No tags to tap. Pass --tap or add [[sim.tags]] to the config.");
    }

    let (transport, mut events) = build_transport(&config.sim);
    let reader = TagReader::new(transport.clone(), config.session.clone());

    reader.start_scanning().await;
    reader.drain(&mut events).await;
    if !reader.is_active() {
        print_view(&reader.view(), json)?;
        bail!("{}", reader.status());
    }

    for tag in &taps {
        if !transport.tap(std::slice::from_ref(tag)) {
            tracing::warn!(tag = %tag, "Session ended, skipping remaining taps");
            break;
        }
        reader.drain(&mut events).await;

        if !json {
            println!("[{}]", tag);
        }
        print_view(&reader.view(), json)?;
    }

    let view = reader.view();
    if let Some(reason) = failure(&view) {
        bail!("Scan failed: {}", reason);
    }

    reader.close().await;
    reader.drain(&mut events).await;
    Ok(())
}

/// Start a write session and tap one tag against it.
pub async fn write(config: &NtagsConfig, text: &str, tap: Option<&str>, json: bool) -> Result<()> {
    let tag = match tap {
        Some(id) => TagHandle::new(id),
        None => match config.sim.tags.first() {
            Some(t) => TagHandle::new(t.id.as_str()),
            None => bail!("No tag to write to. Pass --tap or add [[sim.tags]] to the config."),
        },
    };

    let (transport, mut events) = build_transport(&config.sim);
    let reader = TagReader::new(transport.clone(), config.session.clone());

    reader.start_writing(text).await;
    reader.drain(&mut events).await;
    if !reader.is_active() {
        print_view(&reader.view(), json)?;
        bail!("{}", reader.status());
    }

    transport.tap(std::slice::from_ref(&tag));
    reader.drain(&mut events).await;

    let view = reader.view();
    print_view(&view, json)?;
    if let Some(reason) = failure(&view) {
        bail!("Write failed: {}", reason);
    }

    if !json {
        if let Some(state) = transport.tag(&tag) {
            println!("[{}]", tag);
            for text in codec::decode_all(&state.records.unwrap_or_default()) {
                println!("  - {}", text);
            }
        }
    }

    Ok(())
}
