use log::{debug, info};
use rand::Rng;
use shared::{
    Packet, Tick, TickClock, Vec3, ENTITY_RADIUS, SYNC_INTERVAL_TICKS, WORLD_HEIGHT, WORLD_WIDTH,
};
use std::collections::BTreeMap;

const MIN_WANDER_SPEED: f32 = 40.0;
const MAX_WANDER_SPEED: f32 = 160.0;

/// A server-driven entity whose position is replicated to clients
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: u32,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Set when the next replicated update must skip interpolation
    pub teleported: bool,
}

impl Entity {
    pub fn new(id: u32, position: Vec3, velocity: Vec3) -> Self {
        Self {
            id,
            position,
            velocity,
            teleported: true,
        }
    }

    /// Moves the entity, bouncing vertically and wrapping horizontally
    ///
    /// Wrapping from one side of the world to the other is a teleport.
    pub fn update_position(&mut self, dt: f32) {
        self.position = self.position.add(&self.velocity.scale(dt));

        if self.position.y < ENTITY_RADIUS {
            self.position.y = ENTITY_RADIUS;
            self.velocity.y = self.velocity.y.abs();
        } else if self.position.y > WORLD_HEIGHT - ENTITY_RADIUS {
            self.position.y = WORLD_HEIGHT - ENTITY_RADIUS;
            self.velocity.y = -self.velocity.y.abs();
        }

        if self.position.x > WORLD_WIDTH {
            self.position.x -= WORLD_WIDTH;
            self.teleported = true;
        } else if self.position.x < 0.0 {
            self.position.x += WORLD_WIDTH;
            self.teleported = true;
        }
    }
}

/// Authoritative world: the server tick clock and every replicated entity
#[derive(Debug, Clone)]
pub struct GameState {
    pub clock: TickClock,
    entities: BTreeMap<u32, Entity>,
    next_entity_id: u32,
}

impl GameState {
    /// Creates an empty world with its clock at tick 0
    pub fn new(ticks_between_position_updates: u16) -> Self {
        Self {
            clock: TickClock::new(0, ticks_between_position_updates),
            entities: BTreeMap::new(),
            next_entity_id: 1,
        }
    }

    /// Adds an entity and returns its id; its first update is a teleport
    pub fn add_entity(&mut self, position: Vec3, velocity: Vec3) -> u32 {
        let entity_id = self.next_entity_id;
        self.next_entity_id += 1;

        info!(
            "Added entity {} at ({:.1}, {:.1})",
            entity_id, position.x, position.y
        );
        self.entities
            .insert(entity_id, Entity::new(entity_id, position, velocity));
        entity_id
    }

    /// Spawns an entity at a random position moving in a random direction
    pub fn spawn_wanderer<R: Rng>(&mut self, rng: &mut R) -> u32 {
        let position = Vec3::new(
            rng.gen_range(ENTITY_RADIUS..WORLD_WIDTH - ENTITY_RADIUS),
            rng.gen_range(ENTITY_RADIUS..WORLD_HEIGHT - ENTITY_RADIUS),
            0.0,
        );

        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let speed = rng.gen_range(MIN_WANDER_SPEED..MAX_WANDER_SPEED);
        let velocity = Vec3::new(angle.cos() * speed, angle.sin() * speed, 0.0);

        self.add_entity(position, velocity)
    }

    /// Removes an entity, returning false if it did not exist
    pub fn remove_entity(&mut self, entity_id: u32) -> bool {
        if self.entities.remove(&entity_id).is_some() {
            info!("Removed entity {}", entity_id);
            true
        } else {
            false
        }
    }

    pub fn entity(&self, entity_id: u32) -> Option<&Entity> {
        self.entities.get(&entity_id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick()
    }

    pub fn ticks_between_position_updates(&self) -> u16 {
        self.clock.ticks_between_position_updates()
    }

    /// True on ticks where the server tick is broadcast to clients
    pub fn should_send_sync(&self) -> bool {
        self.clock.is_sync_tick(SYNC_INTERVAL_TICKS)
    }

    /// True on ticks where entity positions are broadcast to clients
    pub fn should_send_positions(&self) -> bool {
        let interval = self.ticks_between_position_updates().max(1);
        self.current_tick() % interval == 0
    }

    /// Moves every entity by one fixed step
    pub fn step(&mut self, dt: f32) {
        for entity in self.entities.values_mut() {
            entity.update_position(dt);
        }
    }

    pub fn advance_tick(&mut self) {
        self.clock.advance();
    }

    /// Builds one position update per entity stamped with the current tick
    ///
    /// Pending teleport flags are consumed.
    pub fn take_position_updates(&mut self) -> Vec<Packet> {
        let tick = self.current_tick();

        self.entities
            .values_mut()
            .map(|entity| {
                let is_teleport = std::mem::take(&mut entity.teleported);
                if is_teleport {
                    debug!("Entity {} teleports at tick {}", entity.id, tick);
                }

                Packet::PositionUpdate {
                    entity_id: entity.id,
                    tick,
                    is_teleport,
                    position: entity.position,
                }
            })
            .collect()
    }

    /// Teleport updates placing every entity for a client that just connected
    pub fn initial_updates(&self) -> Vec<Packet> {
        let tick = self.current_tick();

        self.entities
            .values()
            .map(|entity| Packet::PositionUpdate {
                entity_id: entity.id,
                tick,
                is_teleport: true,
                position: entity.position,
            })
            .collect()
    }
}
