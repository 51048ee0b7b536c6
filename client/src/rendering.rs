use macroquad::prelude::*;
use shared::{Vec3, ENTITY_RADIUS, WORLD_HEIGHT, WORLD_WIDTH};

const FLOOR_HEIGHT: f32 = 20.0;

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub connected: bool,
    pub client_id: Option<u32>,
    pub current_tick: u16,
    pub interpolation_tick: u16,
    pub entity_count: usize,
    pub pending_snapshots: usize,
    pub fake_ping_ms: u64,
    pub jitter_ms: u64,
}

pub struct Renderer {
    width: f32,
    height: f32,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Result<Self, Box<dyn std::error::Error>> {
        if width == 0 || height == 0 {
            return Err("window dimensions must be non-zero".into());
        }

        Ok(Renderer {
            width: width as f32,
            height: height as f32,
        })
    }

    /// Draws every entity at its interpolated position; z is ignored
    pub fn render(&mut self, entities: &[(u32, Vec3)], config: UiConfig) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        self.draw_floor();

        for (id, position) in entities {
            let (x, y) = self.world_to_screen(position);
            self.draw_entity(*id, x, y);
        }

        self.draw_ui(config);
    }

    /// Scales world coordinates onto the window
    pub fn world_to_screen(&self, position: &Vec3) -> (f32, f32) {
        let usable_height = self.height - FLOOR_HEIGHT;
        (
            position.x / WORLD_WIDTH * self.width,
            position.y / WORLD_HEIGHT * usable_height,
        )
    }

    fn draw_floor(&mut self) {
        draw_rectangle(
            0.0,
            self.height - FLOOR_HEIGHT,
            self.width,
            FLOOR_HEIGHT,
            Color::from_rgba(68, 68, 68, 255),
        );
    }

    fn draw_entity(&mut self, id: u32, x: f32, y: f32) {
        let radius = ENTITY_RADIUS * self.width / WORLD_WIDTH;

        draw_circle(x, y, radius, entity_color(id));
        draw_circle_lines(x, y, radius, 2.0, WHITE);
        draw_text(&id.to_string(), x - 4.0, y - radius - 4.0, 14.0, WHITE);
    }

    fn draw_ui(&mut self, config: UiConfig) {
        let x = 10.0;
        let mut y = 20.0;
        let line_height = 16.0;

        let connection_color = if config.connected { GREEN } else { RED };
        draw_rectangle(x, y - 8.0, 8.0, 8.0, connection_color);
        let connection_text = match config.client_id {
            Some(id) => format!("CON #{}", id),
            None => "CON".to_string(),
        };
        draw_text(&connection_text, x + 12.0, y, 14.0, WHITE);

        if !config.connected {
            return;
        }

        y += line_height;
        draw_text(
            &format!(
                "tick {}  interp {}",
                config.current_tick, config.interpolation_tick
            ),
            x,
            y,
            14.0,
            WHITE,
        );

        y += line_height;
        draw_text(
            &format!(
                "{} entities, {} buffered",
                config.entity_count, config.pending_snapshots
            ),
            x,
            y,
            14.0,
            WHITE,
        );

        if config.fake_ping_ms > 0 || config.jitter_ms > 0 {
            y += line_height;
            draw_text(
                &format!("sim {}ms +{}ms jitter", config.fake_ping_ms, config.jitter_ms),
                x,
                y,
                14.0,
                YELLOW,
            );
        }
    }
}

fn entity_color(id: u32) -> Color {
    match id % 8 {
        0 => WHITE,
        1 => RED,
        2 => GREEN,
        3 => BLUE,
        4 => YELLOW,
        5 => MAGENTA,
        6 => Color::from_rgba(0, 255, 255, 255),
        _ => Color::from_rgba(136, 136, 136, 255),
    }
}
