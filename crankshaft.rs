//! crankshaft - Geometry and animation state for a crank/piston mechanism
//! No heap allocation, no_std compatible

#![no_std]

use core::f32::consts::PI;
use core::fmt::Write;

use heapless::String;
use log::{debug, info, trace};
use thiserror::Error;

#[cfg(feature = "embedded-graphics")]
pub mod render;

/// One full crank revolution, in degrees
pub const FULL_TURN: f32 = 360.0;

/// Formatted speed readout. Wide enough for any finite f32 with one decimal.
pub type SpeedText = String<48>;

/// Point in surface coordinates (X right, Y down)
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box in surface coordinates
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn center(&self) -> Point2D {
        Point2D::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

// Layout, timing and speed configuration. Built once, never mutated.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Settings {
    // Drawing surface
    pub canvas_width: u32,
    pub canvas_height: u32,

    // Crank
    pub origin: Point2D,
    pub crank_radius: f32,
    pub pin_radius: u32,

    // Piston
    pub piston_width: f32,
    pub piston_height: f32,

    // Cylinder
    pub cylinder_x: f32,
    pub cylinder_y: f32,
    pub cylinder_width: f32,
    pub cylinder_height: f32,
    pub flange_length: f32,

    // Stroke widths
    pub heavy_stroke: u32,
    pub light_stroke: u32,

    // Timing
    pub tick_interval_ms: u32,
    pub degrees_per_tick: f32,

    // Initial state and speed control
    pub initial_angle: f32,
    pub initial_speed: f32,
    pub speed_step: f32,
}

impl Default for Settings {
    fn default() -> Self {
        let origin = Point2D::new(200.0, 200.0);
        let cylinder_height = 80.0;
        Self {
            canvas_width: 720,
            canvas_height: 400,
            origin,
            crank_radius: 80.0,
            pin_radius: 5,
            piston_width: 56.0,
            piston_height: 80.0,
            cylinder_x: 450.0,
            cylinder_y: origin.y - cylinder_height / 2.0,
            cylinder_width: 220.0,
            cylinder_height,
            flange_length: 20.0,
            heavy_stroke: 3,
            light_stroke: 1,
            tick_interval_ms: 100,
            degrees_per_tick: 10.0,
            initial_angle: 270.0,
            initial_speed: 1.0,
            speed_step: 1.0,
        }
    }
}

/// Layout problems detected before the first frame is drawn
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum SettingsError {
    #[error("crank radius must be positive and finite, got {0}")]
    InvalidCrankRadius(f32),
    #[error("piston {piston_width}x{piston_height} does not fit a {cylinder_width}x{cylinder_height} cylinder")]
    PistonDoesNotFit {
        piston_width: f32,
        piston_height: f32,
        cylinder_width: f32,
        cylinder_height: f32,
    },
    #[error("tick interval must be at least 1 ms")]
    ZeroTickInterval,
    #[error("speed step must be positive and finite, got {0}")]
    InvalidSpeedStep(f32),
    #[error("mechanism does not fit on a {width}x{height} canvas")]
    OutOfCanvas { width: u32, height: u32 },
    #[error("speed must be non-negative and finite, got {0}")]
    InvalidSpeed(f32),
    #[error("angle must lie in [0, 360), got {0}")]
    AngleOutOfRange(f32),
}

impl Settings {
    pub fn cylinder(&self) -> Bounds {
        Bounds {
            x: self.cylinder_x,
            y: self.cylinder_y,
            width: self.cylinder_width,
            height: self.cylinder_height,
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.crank_radius.is_finite() && self.crank_radius > 0.0) {
            return Err(SettingsError::InvalidCrankRadius(self.crank_radius));
        }

        let piston_fits = self.piston_width > 0.0
            && self.piston_height > 0.0
            && self.piston_width <= self.cylinder_width
            && self.piston_height <= self.cylinder_height;
        if !piston_fits {
            return Err(SettingsError::PistonDoesNotFit {
                piston_width: self.piston_width,
                piston_height: self.piston_height,
                cylinder_width: self.cylinder_width,
                cylinder_height: self.cylinder_height,
            });
        }

        if self.tick_interval_ms == 0 {
            return Err(SettingsError::ZeroTickInterval);
        }

        if !(self.speed_step.is_finite() && self.speed_step > 0.0) {
            return Err(SettingsError::InvalidSpeedStep(self.speed_step));
        }

        let reach = self.crank_radius + self.pin_radius as f32;
        let cylinder = self.cylinder();
        let width = self.canvas_width as f32;
        let height = self.canvas_height as f32;
        let inside = self.origin.x - reach >= 0.0
            && self.origin.y - reach >= 0.0
            && self.origin.x + reach <= width
            && self.origin.y + reach <= height
            && cylinder.x >= 0.0
            && cylinder.right() <= width
            && cylinder.y - self.flange_length >= 0.0
            && cylinder.bottom() + self.flange_length <= height;
        if !inside {
            return Err(SettingsError::OutOfCanvas {
                width: self.canvas_width,
                height: self.canvas_height,
            });
        }

        AnimationState::new(self.initial_angle, self.initial_speed).validate()
    }
}

/// Point at `angle_degrees` on a circle of `radius` around `origin`
pub fn point_on_circle(radius: f32, angle_degrees: f32, origin: Point2D) -> Point2D {
    let radians = angle_degrees * (PI / 180.0);
    Point2D::new(
        origin.x + radius * libm::cosf(radians),
        origin.y + radius * libm::sinf(radians),
    )
}

/// Horizontal piston position for a crank angle.
///
/// The piston mirrors the crank pin's horizontal offset from the origin,
/// shifted so that the leftmost pin position lands on `cylinder_x`. The
/// connecting rod length plays no part: this is a kinematic sketch, not a
/// slider-crank solution.
pub fn piston_x(origin: Point2D, radius: f32, angle_degrees: f32, cylinder_x: f32) -> f32 {
    let pin = point_on_circle(radius, angle_degrees, origin);
    cylinder_x + (pin.x - origin.x) + radius
}

/// Keeps the piston inside `[cylinder_x, cylinder_x + cylinder_width - piston_width]`.
///
/// Never panics. NaN lands on the upper bound, and a piston wider than the
/// cylinder pins to `cylinder_x`.
pub fn clamp_piston_x(x: f32, cylinder_x: f32, cylinder_width: f32, piston_width: f32) -> f32 {
    let min_x = cylinder_x;
    let max_x = cylinder_x + cylinder_width - piston_width;
    x.min(max_x).max(min_x)
}

/// Every position one render pass needs
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frame {
    pub angle_degrees: f32,
    pub origin: Point2D,
    pub crank_radius: f32,
    pub crank_pin: Point2D,
    pub counter_pin: Point2D,
    pub cylinder: Bounds,
    pub piston: Bounds,
    pub wrist_pin: Point2D,
}

impl Frame {
    pub fn at(settings: &Settings, angle_degrees: f32) -> Self {
        let origin = settings.origin;
        let radius = settings.crank_radius;
        let cylinder = settings.cylinder();

        let x = piston_x(origin, radius, angle_degrees, cylinder.x);
        let x = clamp_piston_x(x, cylinder.x, cylinder.width, settings.piston_width);
        let piston = Bounds {
            x,
            y: cylinder.y + (cylinder.height - settings.piston_height) / 2.0,
            width: settings.piston_width,
            height: settings.piston_height,
        };

        Self {
            angle_degrees,
            origin,
            crank_radius: radius,
            crank_pin: point_on_circle(radius, angle_degrees, origin),
            counter_pin: point_on_circle(radius, angle_degrees + FULL_TURN / 2.0, origin),
            cylinder,
            piston,
            wrist_pin: piston.center(),
        }
    }
}

/// Mutable animation state, owned by the [`Controller`]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AnimationState {
    pub angle_degrees: f32,
    pub speed_multiplier: f32,
}

impl AnimationState {
    pub const fn new(angle_degrees: f32, speed_multiplier: f32) -> Self {
        Self {
            angle_degrees,
            speed_multiplier,
        }
    }

    /// Speed must be finite and non-negative, the angle within [0, 360)
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.speed_multiplier.is_finite() && self.speed_multiplier >= 0.0) {
            return Err(SettingsError::InvalidSpeed(self.speed_multiplier));
        }
        if !(self.angle_degrees >= 0.0 && self.angle_degrees < FULL_TURN) {
            return Err(SettingsError::AngleOutOfRange(self.angle_degrees));
        }
        Ok(())
    }

    /// Moves the crank by `speed_multiplier * degrees_per_tick`.
    ///
    /// Crossing a full turn resets the angle to zero. A single step that
    /// already spans a full turn wraps by remainder instead, otherwise the
    /// crank would stick at zero.
    pub fn advance(&mut self, degrees_per_tick: f32) {
        let step = self.speed_multiplier * degrees_per_tick;
        self.angle_degrees += step;
        if self.angle_degrees >= FULL_TURN {
            self.angle_degrees = if step >= FULL_TURN {
                libm::fmodf(self.angle_degrees, FULL_TURN)
            } else {
                0.0
            };
            trace!("Crank wrapped to {:.1} deg", self.angle_degrees);
        }
    }

    pub fn speed_up(&mut self, step: f32) {
        self.speed_multiplier += step;
    }

    /// Slows down, never below zero: the crank stops but does not reverse
    pub fn slow_down(&mut self, step: f32) {
        self.speed_multiplier = (self.speed_multiplier - step).max(0.0);
    }
}

/// Keys the controller reacts to
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Escape,
}

impl Key {
    /// Maps a logical key name ("Up", "ArrowDown", "Escape", ...) to a key
    pub fn from_name(name: &str) -> Option<Self> {
        let is = |candidate: &str| name.eq_ignore_ascii_case(candidate);
        if is("up") || is("arrowup") {
            Some(Key::Up)
        } else if is("down") || is("arrowdown") {
            Some(Key::Down)
        } else if is("escape") || is("esc") {
            Some(Key::Escape)
        } else {
            None
        }
    }
}

/// Work items delivered to the controller, one at a time
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Tick,
    KeyPress(Key),
}

/// Text sink for the current speed
pub trait SpeedDisplay {
    fn show_speed(&mut self, text: &str);
}

/// Best-effort close of whatever hosts the drawing surface
pub trait HostWindow {
    fn request_close(&mut self);
}

/// Speed with one fractional digit, e.g. "4.0"
pub fn format_speed(speed: f32) -> SpeedText {
    let mut text = SpeedText::new();
    let _ = write!(&mut text, "{:.1}", speed);
    text
}

/// Serial consumer for ticks and key presses
pub struct Controller {
    settings: Settings,
    state: AnimationState,
}

impl Controller {
    pub fn new(settings: Settings) -> Result<Self, SettingsError> {
        let state = AnimationState::new(settings.initial_angle, settings.initial_speed);
        Self::with_state(settings, state)
    }

    pub fn with_state(settings: Settings, state: AnimationState) -> Result<Self, SettingsError> {
        settings.validate()?;
        state.validate()?;
        Ok(Self { settings, state })
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn speed_text(&self) -> SpeedText {
        format_speed(self.state.speed_multiplier)
    }

    /// Frame for the current angle, without advancing
    pub fn frame(&self) -> Frame {
        Frame::at(&self.settings, self.state.angle_degrees)
    }

    /// Returns the frame to draw for this tick, then advances the crank
    pub fn tick(&mut self) -> Frame {
        let frame = self.frame();
        self.state.advance(self.settings.degrees_per_tick);
        frame
    }

    pub fn key_press<D, H>(&mut self, key: Key, display: &mut D, host: &mut H)
    where
        D: SpeedDisplay,
        H: HostWindow,
    {
        match key {
            Key::Up => {
                self.state.speed_up(self.settings.speed_step);
                self.publish_speed(display);
            }
            Key::Down => {
                self.state.slow_down(self.settings.speed_step);
                self.publish_speed(display);
            }
            Key::Escape => {
                info!("Close requested");
                host.request_close();
            }
        }
    }

    /// Applies one event. Ticks yield the frame to render.
    pub fn handle<D, H>(&mut self, event: Event, display: &mut D, host: &mut H) -> Option<Frame>
    where
        D: SpeedDisplay,
        H: HostWindow,
    {
        match event {
            Event::Tick => Some(self.tick()),
            Event::KeyPress(key) => {
                self.key_press(key, display, host);
                None
            }
        }
    }

    fn publish_speed<D: SpeedDisplay>(&self, display: &mut D) {
        let text = self.speed_text();
        debug!("Speed: {}", text);
        display.show_speed(&text);
    }
}
