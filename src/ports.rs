//! MIDI port discovery and connection
//!
//! Thin midir layer: enumerate ports, match one by numeric index or
//! case-insensitive name pattern, and wire the selected pair to a
//! [`DeviceSession`]. Endpoint policy beyond name matching is out of scope.

use crate::session::{DeviceSession, Transport};
use anyhow::{Context, Result};
use async_trait::async_trait;
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

const CLIENT_NAME: &str = "pacer-link";

/// Information about a MIDI port
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub index: usize,
    pub name: String,
}

/// Discover input ports
pub fn discover_input_ports() -> Result<Vec<PortInfo>> {
    let midi_in = MidiInput::new(CLIENT_NAME)?;
    let mut port_infos = Vec::new();
    for (index, port) in midi_in.ports().iter().enumerate() {
        if let Ok(name) = midi_in.port_name(port) {
            port_infos.push(PortInfo { index, name });
        }
    }
    Ok(port_infos)
}

/// Discover output ports
pub fn discover_output_ports() -> Result<Vec<PortInfo>> {
    let midi_out = MidiOutput::new(CLIENT_NAME)?;
    let mut port_infos = Vec::new();
    for (index, port) in midi_out.ports().iter().enumerate() {
        if let Ok(name) = midi_out.port_name(port) {
            port_infos.push(PortInfo { index, name });
        }
    }
    Ok(port_infos)
}

/// Match a pattern against discovered ports: numeric index, else substring
pub fn match_port<'a>(ports: &'a [PortInfo], pattern: &str) -> Option<&'a PortInfo> {
    if let Ok(index) = pattern.parse::<usize>() {
        return ports.iter().find(|p| p.index == index);
    }
    let pattern = pattern.to_lowercase();
    ports.iter().find(|p| p.name.to_lowercase().contains(&pattern))
}

/// Connect an input port and feed every inbound message to the session
///
/// The returned connection must be kept alive for the callback to run.
pub fn connect_input(
    session: Arc<DeviceSession>,
    pattern: &str,
) -> Result<MidiInputConnection<()>> {
    let mut midi_in = MidiInput::new(CLIENT_NAME)?;
    // midir filters sysex out by default; this whole crate is sysex
    midi_in.ignore(Ignore::None);

    let ports = discover_input_ports()?;
    let info = match_port(&ports, pattern)
        .with_context(|| format!("no input port matching '{}'", pattern))?;
    let port = midi_in
        .ports()
        .into_iter()
        .nth(info.index)
        .context("input port disappeared during connect")?;

    info!("input: {}", info.name);
    let conn = midi_in
        .connect(
            &port,
            CLIENT_NAME,
            move |_timestamp, data, _| {
                session.ingest_message(data);
            },
            (),
        )
        .map_err(|e| anyhow::anyhow!("failed to connect input: {}", e))?;
    Ok(conn)
}

/// Connect an input port and forward raw messages to a callback (monitor mode)
pub fn connect_input_raw<F>(pattern: &str, on_message: F) -> Result<MidiInputConnection<()>>
where
    F: Fn(&[u8]) + Send + 'static,
{
    let mut midi_in = MidiInput::new(CLIENT_NAME)?;
    midi_in.ignore(Ignore::None);

    let ports = discover_input_ports()?;
    let info = match_port(&ports, pattern)
        .with_context(|| format!("no input port matching '{}'", pattern))?;
    let port = midi_in
        .ports()
        .into_iter()
        .nth(info.index)
        .context("input port disappeared during connect")?;

    info!("monitoring: {}", info.name);
    let conn = midi_in
        .connect(
            &port,
            CLIENT_NAME,
            move |_timestamp, data, _| on_message(data),
            (),
        )
        .map_err(|e| anyhow::anyhow!("failed to connect input: {}", e))?;
    Ok(conn)
}

/// [`Transport`] over a midir output connection
pub struct MidirTransport {
    port_name: String,
    conn: Mutex<MidiOutputConnection>,
}

impl MidirTransport {
    /// Open the output port matching `pattern`
    pub fn connect(pattern: &str) -> Result<Self> {
        let midi_out = MidiOutput::new(CLIENT_NAME)?;
        let ports = discover_output_ports()?;
        let info = match_port(&ports, pattern)
            .with_context(|| format!("no output port matching '{}'", pattern))?;
        let port = midi_out
            .ports()
            .into_iter()
            .nth(info.index)
            .context("output port disappeared during connect")?;

        let conn = midi_out
            .connect(&port, CLIENT_NAME)
            .map_err(|e| anyhow::anyhow!("failed to connect output: {}", e))?;
        Ok(Self {
            port_name: info.name.clone(),
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl Transport for MidirTransport {
    fn name(&self) -> &str {
        &self.port_name
    }

    async fn send(&self, frame: &[u8]) -> Result<()> {
        debug!(bytes = frame.len(), "sending frame");
        self.conn
            .lock()
            .send(frame)
            .map_err(|e| anyhow::anyhow!("midi send failed: {}", e))
    }
}
