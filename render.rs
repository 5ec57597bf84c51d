//! render.rs - Draws a mechanism frame onto any embedded-graphics target

use embedded_graphics::{
    prelude::*,
    primitives::{Circle, Line, Polyline, PrimitiveStyle, Rectangle},
};

use crate::{Bounds, Frame, Point2D, Settings};

/// Background and ink colors
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Palette<C> {
    pub background: C,
    pub ink: C,
}

/// Rounds a surface coordinate to the pixel grid
fn to_point(p: Point2D) -> Point {
    Point::new(libm::roundf(p.x) as i32, libm::roundf(p.y) as i32)
}

fn to_size(width: f32, height: f32) -> Size {
    Size::new(libm::roundf(width) as u32, libm::roundf(height) as u32)
}

/// Clears the target, then draws crankshaft, cylinder and piston in that order
pub fn draw_frame<D>(
    target: &mut D,
    frame: &Frame,
    settings: &Settings,
    palette: &Palette<D::Color>,
) -> Result<(), D::Error>
where
    D: DrawTarget,
{
    target.clear(palette.background)?;
    draw_crankshaft(target, frame, settings, palette.ink)?;
    draw_cylinder(target, &frame.cylinder, settings, palette.ink)?;
    draw_piston(target, frame, settings, palette.ink)?;
    Ok(())
}

fn dot<D>(target: &mut D, center: Point2D, radius: u32, color: D::Color) -> Result<(), D::Error>
where
    D: DrawTarget,
{
    Circle::with_center(to_point(center), radius * 2 + 1)
        .into_styled(PrimitiveStyle::with_fill(color))
        .draw(target)
}

fn draw_crankshaft<D>(
    target: &mut D,
    frame: &Frame,
    settings: &Settings,
    ink: D::Color,
) -> Result<(), D::Error>
where
    D: DrawTarget,
{
    // Orbit
    let diameter = libm::roundf(frame.crank_radius * 2.0) as u32;
    Circle::with_center(to_point(frame.origin), diameter)
        .into_styled(PrimitiveStyle::with_stroke(ink, settings.heavy_stroke))
        .draw(target)?;

    // Pivot and both pins
    dot(target, frame.origin, settings.pin_radius, ink)?;
    dot(target, frame.crank_pin, settings.pin_radius, ink)?;
    dot(target, frame.counter_pin, settings.pin_radius, ink)?;

    Line::new(to_point(frame.crank_pin), to_point(frame.counter_pin))
        .into_styled(PrimitiveStyle::with_stroke(ink, settings.light_stroke))
        .draw(target)
}

fn draw_cylinder<D>(
    target: &mut D,
    cylinder: &Bounds,
    settings: &Settings,
    ink: D::Color,
) -> Result<(), D::Error>
where
    D: DrawTarget,
{
    let style = PrimitiveStyle::with_stroke(ink, settings.heavy_stroke);
    let top_left = Point2D::new(cylinder.x, cylinder.y);
    let bottom_left = Point2D::new(cylinder.x, cylinder.bottom());

    // Bore, open on the crank side
    let bore = [
        to_point(top_left),
        to_point(Point2D::new(cylinder.right(), cylinder.y)),
        to_point(Point2D::new(cylinder.right(), cylinder.bottom())),
        to_point(bottom_left),
    ];
    Polyline::new(&bore).into_styled(style).draw(target)?;

    // Flanges
    Line::new(
        to_point(top_left),
        to_point(Point2D::new(cylinder.x, cylinder.y - settings.flange_length)),
    )
    .into_styled(style)
    .draw(target)?;
    Line::new(
        to_point(bottom_left),
        to_point(Point2D::new(cylinder.x, cylinder.bottom() + settings.flange_length)),
    )
    .into_styled(style)
    .draw(target)
}

fn draw_piston<D>(
    target: &mut D,
    frame: &Frame,
    settings: &Settings,
    ink: D::Color,
) -> Result<(), D::Error>
where
    D: DrawTarget,
{
    let piston = &frame.piston;
    Rectangle::new(
        to_point(Point2D::new(piston.x, piston.y)),
        to_size(piston.width, piston.height),
    )
    .into_styled(PrimitiveStyle::with_fill(ink))
    .draw(target)?;

    // Connecting rod, rigid and unarticulated
    Line::new(to_point(frame.crank_pin), to_point(frame.wrist_pin))
        .into_styled(PrimitiveStyle::with_stroke(ink, settings.heavy_stroke))
        .draw(target)?;

    dot(target, frame.wrist_pin, settings.pin_radius, ink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::mock_display::MockDisplay;
    use embedded_graphics::pixelcolor::BinaryColor;

    const PALETTE: Palette<BinaryColor> = Palette {
        background: BinaryColor::Off,
        ink: BinaryColor::On,
    };

    // Scaled-down layout that fits the 64x64 mock display
    fn small_settings() -> Settings {
        Settings {
            canvas_width: 64,
            canvas_height: 64,
            origin: Point2D::new(16.0, 32.0),
            crank_radius: 10.0,
            pin_radius: 1,
            piston_width: 8.0,
            piston_height: 16.0,
            cylinder_x: 36.0,
            cylinder_y: 24.0,
            cylinder_width: 24.0,
            cylinder_height: 16.0,
            flange_length: 4.0,
            heavy_stroke: 1,
            light_stroke: 1,
            ..Settings::default()
        }
    }

    fn render(settings: &Settings, angle: f32) -> MockDisplay<BinaryColor> {
        let mut display = MockDisplay::new();
        display.set_allow_overdraw(true);
        draw_frame(&mut display, &Frame::at(settings, angle), settings, &PALETTE).unwrap();
        display
    }

    #[test]
    fn test_small_settings_are_valid() {
        assert_eq!(small_settings().validate(), Ok(()));
    }

    #[test]
    fn test_to_point_rounds() {
        assert_eq!(to_point(Point2D::new(279.6, 199.4)), Point::new(280, 199));
        assert_eq!(to_point(Point2D::new(-0.6, 0.4)), Point::new(-1, 0));
    }

    #[test]
    fn test_piston_follows_crank() {
        let settings = small_settings();
        let inside_far_end = Point::new(55, 30);

        let display = render(&settings, 0.0);
        assert_eq!(display.get_pixel(inside_far_end), Some(BinaryColor::On));

        let display = render(&settings, 180.0);
        assert_eq!(display.get_pixel(inside_far_end), Some(BinaryColor::Off));
        assert_eq!(display.get_pixel(Point::new(40, 30)), Some(BinaryColor::On));
    }

    #[test]
    fn test_mechanism_parts_are_drawn() {
        let settings = small_settings();
        let display = render(&settings, 90.0);

        // Pivot, cylinder top, flange tip
        assert_eq!(display.get_pixel(Point::new(16, 32)), Some(BinaryColor::On));
        assert_eq!(display.get_pixel(Point::new(48, 24)), Some(BinaryColor::On));
        assert_eq!(display.get_pixel(Point::new(36, 20)), Some(BinaryColor::On));
        assert_eq!(display.get_pixel(Point::new(36, 44)), Some(BinaryColor::On));

        // Corner of the surface stays clear
        assert_eq!(display.get_pixel(Point::new(63, 0)), Some(BinaryColor::Off));
    }

    fn ink_near(display: &MockDisplay<BinaryColor>, center: Point, reach: i32) -> bool {
        (-reach..=reach).any(|dy| {
            (-reach..=reach).any(|dx| {
                display.get_pixel(center + Point::new(dx, dy)) == Some(BinaryColor::On)
            })
        })
    }

    #[test]
    fn test_crankshaft_and_rod_are_drawn() {
        // Large pins and a narrow piston so each part owns some pixels
        let settings = Settings {
            pin_radius: 3,
            piston_width: 4.0,
            ..small_settings()
        };
        assert_eq!(settings.validate(), Ok(()));

        // Pins at (26, 32) and (6, 32), piston at x 56..60, wrist pin at (58, 32)
        let display = render(&settings, 0.0);
        assert!(ink_near(&display, Point::new(16, 22), 2), "orbit");
        assert_eq!(display.get_pixel(Point::new(10, 32)), Some(BinaryColor::On), "pin line");
        assert_eq!(display.get_pixel(Point::new(40, 32)), Some(BinaryColor::On), "rod");
        assert_eq!(display.get_pixel(Point::new(61, 32)), Some(BinaryColor::On), "wrist pin");

        // Pins at (16, 42) and (16, 22)
        let display = render(&settings, 90.0);
        assert_eq!(display.get_pixel(Point::new(16, 45)), Some(BinaryColor::On), "crank pin");
        assert_eq!(display.get_pixel(Point::new(16, 19)), Some(BinaryColor::On), "counter pin");
    }

    #[test]
    fn test_clear_removes_previous_frame() {
        let settings = small_settings();
        let mut display = render(&settings, 0.0);
        draw_frame(&mut display, &Frame::at(&settings, 180.0), &settings, &PALETTE).unwrap();

        assert_eq!(display.get_pixel(Point::new(55, 30)), Some(BinaryColor::Off));
    }

    #[test]
    fn test_redraw_is_pixel_identical() {
        let settings = small_settings();
        let first = render(&settings, 42.0);
        let second = render(&settings, 42.0);

        for y in 0..64 {
            for x in 0..64 {
                let p = Point::new(x, y);
                assert_eq!(first.get_pixel(p), second.get_pixel(p), "pixel {:?}", p);
            }
        }
    }
}
