//! Hardware bridge: runs a [`PolyMux`] between two MIDI ports.
//!
//! The midir input callback is the host's message callback; a dedicated
//! thread supplies the heartbeat. Both reach the router through one mutex,
//! held for a single handler call at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use polymux_core::{MemoryParamStore, PolyMux, HEARTBEAT_PERIOD};
use polymux_midi::{ChannelMessage, MidiBatch};

use crate::{Error, Result};

/// Ports to bridge, matched by case-insensitive name substring.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub input: String,
    pub output: String,
    /// Client name shown to the OS MIDI layer.
    pub client_name: String,
}

impl BridgeConfig {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            client_name: "polymux".to_string(),
        }
    }
}

/// Port names available on this machine.
#[derive(Debug, Clone, Default)]
pub struct MidiPorts {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

pub struct Bridge {
    router: Arc<Mutex<PolyMux>>,
    connection: Option<MidiInputConnection<MidiOutputConnection>>,
    running: Arc<AtomicBool>,
    heartbeat: Option<JoinHandle<()>>,
}

impl Bridge {
    pub fn list_ports() -> Result<MidiPorts> {
        let input = MidiInput::new("polymux-port-list")?;
        let output = MidiOutput::new("polymux-port-list")?;

        Ok(MidiPorts {
            inputs: input
                .ports()
                .iter()
                .filter_map(|port| input.port_name(port).ok())
                .collect(),
            outputs: output
                .ports()
                .iter()
                .filter_map(|port| output.port_name(port).ok())
                .collect(),
        })
    }

    /// Open both ports and start routing through `router`.
    pub fn connect(config: &BridgeConfig, router: PolyMux) -> Result<Self> {
        let mut midi_input = MidiInput::new(&config.client_name)?;
        midi_input.ignore(Ignore::None);
        let midi_output = MidiOutput::new(&config.client_name)?;

        let in_port = midi_input
            .ports()
            .into_iter()
            .find(|port| {
                midi_input
                    .port_name(port)
                    .is_ok_and(|name| name_matches(&name, &config.input))
            })
            .ok_or_else(|| {
                Error::MidiDevice(format!(
                    "No MIDI input device found matching '{}'",
                    config.input
                ))
            })?;

        let out_port = midi_output
            .ports()
            .into_iter()
            .find(|port| {
                midi_output
                    .port_name(port)
                    .is_ok_and(|name| name_matches(&name, &config.output))
            })
            .ok_or_else(|| {
                Error::MidiDevice(format!(
                    "No MIDI output device found matching '{}'",
                    config.output
                ))
            })?;

        let out_name = midi_output
            .port_name(&out_port)
            .unwrap_or_else(|_| config.output.clone());
        let in_name = midi_input
            .port_name(&in_port)
            .unwrap_or_else(|_| config.input.clone());

        let out_connection = midi_output.connect(&out_port, "polymux-out")?;

        let router = Arc::new(Mutex::new(router));
        let callback_router = Arc::clone(&router);
        let connection = midi_input.connect(
            &in_port,
            "polymux-in",
            move |_timestamp, bytes, out: &mut MidiOutputConnection| {
                handle_input(&callback_router, bytes, out);
            },
            out_connection,
        )?;

        tracing::info!("Bridging '{}' -> '{}'", in_name, out_name);

        let running = Arc::new(AtomicBool::new(true));
        let heartbeat = spawn_heartbeat(Arc::clone(&router), Arc::clone(&running))?;

        Ok(Self {
            router,
            connection: Some(connection),
            running,
            heartbeat: Some(heartbeat),
        })
    }

    /// Shared handle to the running router.
    pub fn router(&self) -> Arc<Mutex<PolyMux>> {
        Arc::clone(&self.router)
    }

    /// Stop routing and return the parameters as they are now (including training).
    pub fn close(mut self) -> MemoryParamStore {
        self.shutdown();
        *self.router.lock().params()
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(connection) = self.connection.take() {
            let (_input, output) = connection.close();
            output.close();
        }
        if let Some(handle) = self.heartbeat.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn handle_input(router: &Mutex<PolyMux>, bytes: &[u8], out: &mut MidiOutputConnection) {
    // System and malformed messages never reach the router
    let Some(msg) = ChannelMessage::from_bytes(bytes) else {
        send_bytes(out, bytes);
        return;
    };

    let mut batch = MidiBatch::new();
    let forward = router.lock().route(&msg, &mut batch);

    if forward {
        send_bytes(out, bytes);
    }
    for msg in &batch {
        send_bytes(out, &msg.to_bytes()[..msg.wire_len()]);
    }
}

fn send_bytes(out: &mut MidiOutputConnection, bytes: &[u8]) {
    if let Err(e) = out.send(bytes) {
        tracing::debug!("Failed to send MIDI message: {}", e);
    }
}

fn spawn_heartbeat(
    router: Arc<Mutex<PolyMux>>,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("polymux-heartbeat".to_string())
        .spawn(move || {
            while running.load(Ordering::SeqCst) {
                thread::sleep(HEARTBEAT_PERIOD);
                router.lock().on_heartbeat();
            }
        })?;
    Ok(handle)
}

fn name_matches(name: &str, pattern: &str) -> bool {
    name.to_lowercase().contains(&pattern.to_lowercase())
}
