//! Client network thread and the frame driver that feeds the session
//!
//! The UDP socket lives on a dedicated thread running its own tokio runtime.
//! Decoded packets are moved to the render thread over a channel, so the
//! session state is only ever touched by the render loop.

use crate::game::ClientGameState;
use crate::interpolation::InterpolationConfig;
use crate::sync::SyncConfig;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use rand::Rng;
use shared::{fixed_step_duration, Packet, TickClock, HEARTBEAT_INTERVAL_MS, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep};

/// Longest frame time fed into the fixed-step accumulator
const MAX_FRAME_TIME: f32 = 0.25;

/// Events moved from the network thread to the render thread
#[derive(Debug)]
pub enum NetworkEvent {
    PacketReceived(Packet),
    ConnectionLost { reason: String },
}

/// Requests from the render thread to the network thread
#[derive(Debug)]
pub enum NetworkCommand {
    Disconnect,
}

/// Artificial network conditions applied to every packet
#[derive(Debug, Clone, Copy, Default)]
pub struct LatencySimulation {
    /// Simulated round trip; half is added in each direction
    pub fake_ping_ms: u64,
    /// Extra random delay per received packet, which can reorder them
    pub jitter_ms: u64,
}

impl LatencySimulation {
    fn inbound_delay(&self) -> Option<Duration> {
        if self.fake_ping_ms == 0 && self.jitter_ms == 0 {
            return None;
        }

        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        Some(Duration::from_millis(self.fake_ping_ms / 2 + jitter))
    }
}

/// Turns variable frame times into whole fixed simulation steps
#[derive(Debug, Clone)]
pub struct FixedStepper {
    step: f32,
    accumulator: f32,
}

impl FixedStepper {
    pub fn new(step: f32) -> Self {
        Self {
            step,
            accumulator: 0.0,
        }
    }

    /// Adds a frame's time and returns how many fixed steps are now due
    pub fn accumulate(&mut self, delta_time: f32) -> u32 {
        self.accumulator += delta_time.clamp(0.0, MAX_FRAME_TIME);

        let mut steps = 0;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            steps += 1;
        }
        steps
    }

    pub fn step(&self) -> f32 {
        self.step
    }
}

/// Render-thread end of the network thread's channels
pub struct NetworkHandle {
    events: mpsc::UnboundedReceiver<NetworkEvent>,
    commands: mpsc::UnboundedSender<NetworkCommand>,
    thread: Option<JoinHandle<()>>,
}

impl NetworkHandle {
    /// Wraps existing channels without a backing thread
    pub fn from_channels(
        events: mpsc::UnboundedReceiver<NetworkEvent>,
        commands: mpsc::UnboundedSender<NetworkCommand>,
    ) -> Self {
        Self {
            events,
            commands,
            thread: None,
        }
    }

    /// Next event from the network thread, without blocking
    pub fn try_recv(&mut self) -> Option<NetworkEvent> {
        self.events.try_recv().ok()
    }

    /// Asks the network thread to disconnect and waits for it to finish
    pub fn shutdown(mut self) {
        let _ = self.commands.send(NetworkCommand::Disconnect);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Network thread panicked");
            }
        }
    }
}

/// Starts the network thread and sends the connection request
pub fn spawn_network_thread(
    server_addr: SocketAddr,
    latency: LatencySimulation,
) -> Result<NetworkHandle, Box<dyn std::error::Error>> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let thread = std::thread::Builder::new()
        .name("network".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Failed to start network runtime: {}", e);
                    let _ = event_tx.send(NetworkEvent::ConnectionLost {
                        reason: e.to_string(),
                    });
                    return;
                }
            };

            let result = runtime.block_on(run_network(
                server_addr,
                latency,
                event_tx.clone(),
                command_rx,
            ));

            if let Err(e) = result {
                error!("Network thread stopped: {}", e);
                let _ = event_tx.send(NetworkEvent::ConnectionLost {
                    reason: e.to_string(),
                });
            }
        })?;

    Ok(NetworkHandle {
        events: event_rx,
        commands: command_tx,
        thread: Some(thread),
    })
}

async fn send_packet(
    socket: &UdpSocket,
    server_addr: SocketAddr,
    packet: &Packet,
    latency: LatencySimulation,
) -> Result<(), Box<dyn std::error::Error>> {
    if latency.fake_ping_ms > 0 {
        sleep(Duration::from_millis(latency.fake_ping_ms / 2)).await;
    }

    let data = serialize(packet)?;
    socket.send_to(&data, server_addr).await?;
    Ok(())
}

/// Hands a packet to the render thread, after the simulated delay if any
fn deliver(
    packet: Packet,
    latency: LatencySimulation,
    event_tx: &mpsc::UnboundedSender<NetworkEvent>,
) -> bool {
    match latency.inbound_delay() {
        Some(delay) => {
            let sender = event_tx.clone();
            tokio::spawn(async move {
                sleep(delay).await;
                let _ = sender.send(NetworkEvent::PacketReceived(packet));
            });
            !event_tx.is_closed()
        }
        None => event_tx.send(NetworkEvent::PacketReceived(packet)).is_ok(),
    }
}

async fn run_network(
    server_addr: SocketAddr,
    latency: LatencySimulation,
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
    mut command_rx: mpsc::UnboundedReceiver<NetworkCommand>,
) -> Result<(), Box<dyn std::error::Error>> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;

    info!("Connecting to server at {}...", server_addr);
    let connect = Packet::Connect {
        client_version: PROTOCOL_VERSION,
    };
    send_packet(&socket, server_addr, &connect, latency).await?;

    let mut heartbeat_interval = interval(Duration::from_millis(HEARTBEAT_INTERVAL_MS));
    let mut buffer = [0u8; 2048];

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buffer) => {
                match result {
                    Ok((len, addr)) => {
                        if addr != server_addr {
                            debug!("Ignoring datagram from {}", addr);
                            continue;
                        }

                        match deserialize::<Packet>(&buffer[0..len]) {
                            Ok(packet) => {
                                if !deliver(packet, latency, &event_tx) {
                                    info!("Render thread gone, stopping network thread");
                                    break;
                                }
                            }
                            Err(e) => warn!("Failed to deserialize packet: {}", e),
                        }
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        sleep(Duration::from_millis(10)).await;
                    }
                }
            },

            _ = heartbeat_interval.tick() => {
                if let Err(e) = send_packet(&socket, server_addr, &Packet::Heartbeat, latency).await {
                    error!("Error sending heartbeat: {}", e);
                }
            },

            command = command_rx.recv() => {
                match command {
                    Some(NetworkCommand::Disconnect) | None => {
                        if let Err(e) = send_packet(&socket, server_addr, &Packet::Disconnect, LatencySimulation::default()).await {
                            warn!("Error sending disconnect: {}", e);
                        }
                        info!("Disconnected from server");
                        break;
                    }
                }
            },
        }
    }

    Ok(())
}

/// Frame driver: applies network events and runs the session's scheduler entry points
pub struct Client {
    network: NetworkHandle,
    state: Option<ClientGameState>,
    stepper: FixedStepper,
    sync_config: SyncConfig,
    interpolation_config: InterpolationConfig,
}

impl Client {
    pub fn new(
        network: NetworkHandle,
        sync_config: SyncConfig,
        interpolation_config: InterpolationConfig,
    ) -> Self {
        Self {
            network,
            state: None,
            stepper: FixedStepper::new(fixed_step_duration(shared::DEFAULT_TICK_RATE)),
            sync_config,
            interpolation_config,
        }
    }

    /// Runs one render frame
    pub fn frame(&mut self, delta_time: f32) {
        while let Some(event) = self.network.try_recv() {
            self.handle_event(event);
        }

        if let Some(state) = self.state.as_mut() {
            for _ in 0..self.stepper.accumulate(delta_time) {
                state.on_fixed_step();
            }
            state.on_render_frame(delta_time);
        }
    }

    /// Applies one network event, creating or dropping the session as needed
    pub fn handle_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::PacketReceived(Packet::Connected {
                client_id,
                tick,
                ticks_between_position_updates,
                tick_rate,
            }) => {
                info!(
                    "Connected! Client ID: {} (server tick {}, {}Hz)",
                    client_id, tick, tick_rate
                );

                let step = fixed_step_duration(tick_rate);
                self.stepper = FixedStepper::new(step);
                self.state = Some(ClientGameState::new(
                    client_id,
                    TickClock::new(tick, ticks_between_position_updates),
                    self.sync_config,
                    self.interpolation_config,
                    step,
                ));
            }

            NetworkEvent::PacketReceived(Packet::Disconnected { reason }) => {
                warn!("Disconnected: {}", reason);
                self.state = None;
            }

            NetworkEvent::PacketReceived(packet) => match self.state.as_mut() {
                Some(state) => state.handle_packet(packet),
                None => debug!("Ignoring packet before connection: {:?}", packet),
            },

            NetworkEvent::ConnectionLost { reason } => {
                error!("Connection lost: {}", reason);
                self.state = None;
            }
        }
    }

    /// The active session, if connected
    pub fn state(&self) -> Option<&ClientGameState> {
        self.state.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_some()
    }

    /// Disconnects from the server and joins the network thread
    pub fn shutdown(self) {
        self.network.shutdown();
    }
}
