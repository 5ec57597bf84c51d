//! main.rs - Desktop simulator for the crankshaft animation
//! Owns the window, the tick timer and the speed readout

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::Rgb565,
    prelude::*,
    primitives::Rectangle,
    text::{Baseline, Text},
};
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
};
use log::info;

use crankshaft::render::{self, Palette};
use crankshaft::{Controller, Event, HostWindow, Key, Settings, SpeedDisplay, SpeedText};

const LABEL_HEIGHT: u32 = 20;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

const PALETTE: Palette<Rgb565> = Palette {
    background: Rgb565::WHITE,
    ink: Rgb565::BLACK,
};

/// Fixed-interval timer. Late ticks are coalesced rather than replayed.
struct Ticker {
    interval: Duration,
    next: Instant,
}

impl Ticker {
    fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            next: start,
        }
    }

    fn poll(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        self.next += self.interval;
        if self.next <= now {
            self.next = now + self.interval;
        }
        true
    }

    fn remaining(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }
}

/// Speed readout strip under the canvas, redrawn only when the text changes
struct SpeedLabel {
    text: SpeedText,
    dirty: bool,
}

impl SpeedLabel {
    fn new(text: SpeedText) -> Self {
        Self { text, dirty: true }
    }

    fn draw<D>(&mut self, target: &mut D, area: Rectangle) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        target.fill_solid(&area, PALETTE.background)?;

        let style = MonoTextStyle::new(&FONT_6X10, PALETTE.ink);
        let line = format!("Speed: {}", self.text);
        Text::with_baseline(&line, area.top_left + Point::new(5, 5), style, Baseline::Top)
            .draw(target)?;

        let hint = "Up/Down: Speed | Esc: Quit";
        let hint_x = area.size.width as i32 - 6 * hint.len() as i32 - 5;
        Text::with_baseline(hint, area.top_left + Point::new(hint_x, 5), style, Baseline::Top)
            .draw(target)?;

        self.dirty = false;
        Ok(())
    }
}

impl SpeedDisplay for SpeedLabel {
    fn show_speed(&mut self, text: &str) {
        self.text.clear();
        let _ = self.text.push_str(text);
        self.dirty = true;
    }
}

#[derive(Default)]
struct Host {
    close_requested: bool,
}

impl HostWindow for Host {
    fn request_close(&mut self) {
        self.close_requested = true;
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::default();
    let mut controller = Controller::new(settings).context("invalid mechanism layout")?;

    let canvas = Rectangle::new(
        Point::zero(),
        Size::new(settings.canvas_width, settings.canvas_height),
    );
    let label_area = Rectangle::new(
        Point::new(0, settings.canvas_height as i32),
        Size::new(settings.canvas_width, LABEL_HEIGHT),
    );

    let mut display: SimulatorDisplay<Rgb565> = SimulatorDisplay::new(Size::new(
        settings.canvas_width,
        settings.canvas_height + LABEL_HEIGHT,
    ));
    let output_settings = OutputSettingsBuilder::new().scale(1).build();
    let mut window = Window::new("Crankshaft", &output_settings);

    let mut label = SpeedLabel::new(controller.speed_text());
    let mut host = Host::default();
    let mut ticker = Ticker::new(
        Duration::from_millis(settings.tick_interval_ms.into()),
        Instant::now(),
    );

    info!("=== Crankshaft ===");
    info!("Controls:");
    info!("  Up: Faster");
    info!("  Down: Slower (stops at 0)");
    info!("  Esc: Quit");

    'running: loop {
        if ticker.poll(Instant::now()) {
            if let Some(frame) = controller.handle(Event::Tick, &mut label, &mut host) {
                render::draw_frame(&mut display.cropped(&canvas), &frame, &settings, &PALETTE)?;
            }
        }
        if label.dirty {
            label.draw(&mut display, label_area)?;
        }
        window.update(&display);

        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,
                SimulatorEvent::KeyDown { keycode, .. } => {
                    let name = format!("{:?}", keycode);
                    if let Some(key) = Key::from_name(&name) {
                        controller.handle(Event::KeyPress(key), &mut label, &mut host);
                    }
                }
                _ => {}
            }
        }

        if host.close_requested {
            break;
        }

        thread::sleep(ticker.remaining(Instant::now()).min(POLL_INTERVAL));
    }

    info!("Crankshaft stopped");
    Ok(())
}
