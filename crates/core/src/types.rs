use std::fmt;

use serde::{Deserialize, Serialize};

/// Window identifier (HWND on Windows, synthetic id on the stub platform)
pub type WindowId = u64;

/// Screen-coordinate rectangle, corners inclusive of (x1, y1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }.normalized()
    }

    /// Swap corners so that x1 <= x2 and y1 <= y2.
    pub fn normalized(self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.x1 as f64 + self.x2 as f64) / 2.0,
            (self.y1 as f64 + self.y2 as f64) / 2.0,
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x1 && p.x <= self.x2 && p.y >= self.y1 && p.y <= self.y2
    }

    /// Clamp a point into the rectangle, each axis independently.
    pub fn clamp(&self, p: Point) -> Point {
        Point {
            x: p.x.clamp(self.x1, self.x2),
            y: p.y.clamp(self.y1, self.y2),
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})-({},{})", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Absolute screen point, stored as an `[x, y]` pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Raw screenshot pixel data (BGRA)
#[derive(Debug, Clone)]
pub struct Capture {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
}

impl Capture {
    /// Tightly packed BGRA buffer filled with one color.
    pub fn solid(width: u32, height: u32, bgra: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&bgra);
        }
        Self { data, width, height, bytes_per_row: width * 4 }
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, bgra: [u8; 4]) {
        let idx = (y * self.bytes_per_row + x * 4) as usize;
        self.data[idx..idx + 4].copy_from_slice(&bgra);
    }
}

/// The three tracked vital resources, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Health,
    Mana,
    Stamina,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Health, ResourceKind::Mana, ResourceKind::Stamina];

    pub fn index(self) -> usize {
        match self {
            ResourceKind::Health => 0,
            ResourceKind::Mana => 1,
            ResourceKind::Stamina => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Health => "Health",
            ResourceKind::Mana => "Mana",
            ResourceKind::Stamina => "Stamina",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "health" | "hp" => Ok(ResourceKind::Health),
            "mana" | "mp" => Ok(ResourceKind::Mana),
            "stamina" | "sp" => Ok(ResourceKind::Stamina),
            other => Err(format!("unknown resource '{}'", other)),
        }
    }
}

/// One HSV triple on the OpenCV 8-bit scale (H 0..=180, S/V 0..=255)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

/// Inclusive HSV color band a bar's fill is expected to fall in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub low: Hsv,
    pub high: Hsv,
}

impl HsvRange {
    pub const HEALTH: HsvRange = HsvRange { low: Hsv::new(0, 100, 100), high: Hsv::new(10, 255, 255) };
    pub const MANA: HsvRange = HsvRange { low: Hsv::new(100, 100, 100), high: Hsv::new(140, 255, 255) };
    pub const STAMINA: HsvRange = HsvRange { low: Hsv::new(40, 100, 100), high: Hsv::new(80, 255, 255) };

    pub fn contains(&self, px: Hsv) -> bool {
        (self.low.h..=self.high.h).contains(&px.h)
            && (self.low.s..=self.high.s).contains(&px.s)
            && (self.low.v..=self.high.v).contains(&px.v)
    }

    pub fn for_resource(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Health => Self::HEALTH,
            ResourceKind::Mana => Self::MANA,
            ResourceKind::Stamina => Self::STAMINA,
        }
    }
}

/// A configured vital bar, resolved from settings for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceBar {
    pub kind: ResourceKind,
    /// `None` while the user hasn't selected an area: the bar is inert and reads 100%.
    pub region: Option<Rect>,
    pub color_range: HsvRange,
    pub threshold: f64,
    pub potion_key: String,
    pub cooldown_secs: f64,
}

/// Reference frame for ring targeting and target clamping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameWindowFrame {
    pub rect: Rect,
    pub window_id: Option<WindowId>,
}

impl GameWindowFrame {
    pub fn new(rect: Rect) -> Self {
        Self { rect: rect.normalized(), window_id: None }
    }
}

/// Window discovered by a `WindowLocator`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub id: WindowId,
    pub title: String,
    pub rect: Rect,
}

/// Controller lifecycle as seen from the outside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
}

/// Everything the presentation layer reads about the controller
#[derive(Debug, Clone)]
pub struct ControllerStatus {
    pub state: RunState,
    pub ticks: u64,
    /// Hysteresis-filtered percent per resource, indexed by `ResourceKind::index`
    pub percents: [f64; 3],
    pub potions_used: [u64; 3],
    pub spells_cast: u64,
    pub casts_since_target_change: u32,
    pub ring_offset: Option<(f64, f64)>,
    pub last_target: Option<Point>,
    pub last_error: Option<String>,
}

impl Default for ControllerStatus {
    fn default() -> Self {
        Self {
            state: RunState::Idle,
            ticks: 0,
            percents: [100.0; 3],
            potions_used: [0; 3],
            spells_cast: 0,
            casts_since_target_change: 0,
            ring_offset: None,
            last_target: None,
            last_error: None,
        }
    }
}
