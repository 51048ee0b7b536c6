//! Client connection management for the multiplayer server
//!
//! This module handles the server-side bookkeeping of connected clients:
//! - Client connection lifecycle (connect, disconnect, timeout)
//! - Capacity limits and id assignment
//! - Heartbeat-driven liveness tracking
//!
//! Clients only send connection and heartbeat packets; every connected
//! client is represented in the world by one entity the server moves.

use log::info;
use shared::CLIENT_TIMEOUT_SECS;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Represents a connected client
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// World entity representing this client, if one was spawned
    pub entity_id: Option<u32>,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            entity_id: None,
        }
    }

    pub fn refresh_last_seen(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Checks if the client has exceeded the connection timeout
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
///
/// Enforces the server capacity limit and hands out client ids starting at 1.
pub struct ClientManager {
    clients: HashMap<u32, Client>,
    next_client_id: u32,
    max_clients: usize,
    timeout: Duration,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
            timeout: Duration::from_secs(CLIENT_TIMEOUT_SECS),
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns Some(client_id) if successful, None if server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        Some(client_id)
    }

    /// Removes a client, returning it if it was connected
    pub fn remove_client(&mut self, client_id: &u32) -> Option<Client> {
        let removed = self.clients.remove(client_id);
        if let Some(client) = &removed {
            info!("Client {} disconnected", client.id);
        }
        removed
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn get_client(&self, client_id: &u32) -> Option<&Client> {
        self.clients.get(client_id)
    }

    pub fn set_entity(&mut self, client_id: u32, entity_id: u32) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.entity_id = Some(entity_id);
        }
    }

    /// Records activity from a client, returning false if it is unknown
    pub fn refresh(&mut self, client_id: u32) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                client.refresh_last_seen();
                true
            }
            None => false,
        }
    }

    /// Removes clients that have gone quiet and returns them
    pub fn check_timeouts(&mut self) -> Vec<Client> {
        let timeout = self.timeout;
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        timed_out
            .iter()
            .filter_map(|client_id| self.remove_client(client_id))
            .collect()
    }

    /// Gets all client IDs and their network addresses
    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
