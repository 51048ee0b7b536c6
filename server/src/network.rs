//! Server network layer handling UDP communications and the tick loop

use crate::client_manager::ClientManager;
use crate::game::GameState;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{fixed_step_duration, Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
        entity_id: Option<u32>,
    },
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
    },
}

/// Main server coordinating networking and the authoritative tick loop
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game_state: GameState,
    tick_rate: u32,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_rate: u32,
        max_clients: usize,
        ticks_between_position_updates: u16,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            game_state: GameState::new(ticks_between_position_updates),
            tick_rate: tick_rate.max(1),
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Address the server socket is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Adds server-driven entities that wander the world
    pub fn spawn_wanderers(&mut self, count: usize) {
        let mut rng = rand::thread_rng();
        for _ in 0..count {
            self.game_state.spawn_wanderer(&mut rng);
        }
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client in timed_out {
                    info!("Client {} timed out", client.id);
                    let message = ServerMessage::ClientTimeout {
                        client_id: client.id,
                        entity_id: client.entity_id,
                    };
                    if let Err(e) = server_tx.send(message) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { packet }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Removes a client's entity and tells everyone else it is gone
    fn despawn_client_entity(&mut self, entity_id: Option<u32>) {
        if let Some(entity_id) = entity_id {
            if self.game_state.remove_entity(entity_id) {
                self.broadcast_packet(Packet::EntityRemoved { entity_id });
            }
        }
    }

    /// Processes incoming packets
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    let reason = format!(
                        "Unsupported client version {} (server speaks {})",
                        client_version, PROTOCOL_VERSION
                    );
                    self.send_packet(Packet::Disconnected { reason }, addr);
                    return;
                }

                // Remove existing connection if present
                let existing = {
                    let mut clients = self.clients.write().await;
                    match clients.find_client_by_addr(addr) {
                        Some(existing_id) => clients.remove_client(&existing_id),
                        None => None,
                    }
                };

                if let Some(existing) = existing {
                    info!("Removing existing client {} from {}", existing.id, addr);
                    self.despawn_client_entity(existing.entity_id);
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                match client_id {
                    Some(client_id) => {
                        let entity_id = self.game_state.spawn_wanderer(&mut rand::thread_rng());
                        {
                            let mut clients = self.clients.write().await;
                            clients.set_entity(client_id, entity_id);
                        }

                        self.send_packet(
                            Packet::Connected {
                                client_id,
                                tick: self.game_state.current_tick(),
                                ticks_between_position_updates: self
                                    .game_state
                                    .ticks_between_position_updates(),
                                tick_rate: self.tick_rate,
                            },
                            addr,
                        );

                        for update in self.game_state.initial_updates() {
                            self.send_packet(update, addr);
                        }
                    }
                    None => {
                        self.send_packet(
                            Packet::Disconnected {
                                reason: "Server full".to_string(),
                            },
                            addr,
                        );
                    }
                }
            }

            Packet::Heartbeat => {
                let mut clients = self.clients.write().await;
                let known = match clients.find_client_by_addr(addr) {
                    Some(client_id) => clients.refresh(client_id),
                    None => false,
                };

                if !known {
                    debug!("Heartbeat from unknown address {}", addr);
                }
            }

            Packet::Disconnect => {
                let removed = {
                    let mut clients = self.clients.write().await;
                    match clients.find_client_by_addr(addr) {
                        Some(client_id) => clients.remove_client(&client_id),
                        None => None,
                    }
                };

                if let Some(client) = removed {
                    self.despawn_client_entity(client.entity_id);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Runs one fixed simulation step
    ///
    /// Broadcasts the tick on sync ticks, moves the world, broadcasts
    /// positions on update ticks, then advances the clock.
    fn run_tick(&mut self, dt: f32) {
        if self.game_state.should_send_sync() {
            let tick = self.game_state.current_tick();
            debug!("Broadcasting sync at tick {}", tick);
            self.broadcast_packet(Packet::Sync { tick });
        }

        self.game_state.step(dt);

        if self.game_state.should_send_positions() {
            for update in self.game_state.take_position_updates() {
                self.broadcast_packet(update);
            }
        }

        self.game_state.advance_tick();
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let dt = fixed_step_duration(self.tick_rate);
        let mut tick_interval = interval(Duration::from_secs_f32(dt));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

        info!("Server started successfully at {}Hz", self.tick_rate);

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { entity_id, .. }) => {
                            self.despawn_client_entity(entity_id);
                        },
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    self.run_tick(dt);

                    if self.game_state.current_tick() % 500 == 0 {
                        let client_count = {
                            let clients = self.clients.read().await;
                            clients.len()
                        };

                        debug!("Tick {}: {} clients, {} entities",
                               self.game_state.current_tick(), client_count, self.game_state.entity_count());
                    }
                },
            }
        }

        Ok(())
    }
}
