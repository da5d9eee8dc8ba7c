//! Frame annotation for the MJPEG view
//!
//! Draws tracked boxes, centroid markers, and the counting line onto a
//! frame. Purely cosmetic; counting never depends on the drawn output.

use crate::counting::CountingLine;
use crate::error::Result;
use crate::frame::Frame;
use crate::tracker_client::TrackedBox;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, Rgb};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

const COLOR_CAR: Rgb<u8> = Rgb([255, 204, 0]);
const COLOR_MOTORCYCLE: Rgb<u8> = Rgb([0, 153, 255]);
const COLOR_BUS: Rgb<u8> = Rgb([51, 51, 255]);
const COLOR_TRUCK: Rgb<u8> = Rgb([102, 255, 102]);
const COLOR_UNKNOWN: Rgb<u8> = Rgb([255, 255, 255]);
const COLOR_CENTROID: Rgb<u8> = Rgb([255, 0, 0]);
const COLOR_LINE_IDLE: Rgb<u8> = Rgb([255, 0, 0]);
const COLOR_LINE_CROSSED: Rgb<u8> = Rgb([0, 255, 0]);

fn class_color(class_id: i64) -> Rgb<u8> {
    match class_id {
        2 => COLOR_CAR,
        3 => COLOR_MOTORCYCLE,
        5 => COLOR_BUS,
        7 => COLOR_TRUCK,
        _ => COLOR_UNKNOWN,
    }
}

/// Draw boxes, centroids, and the counting line onto a copy of the frame
///
/// The line flashes green on frames where a crossing was counted.
pub fn annotate(
    frame: &Frame,
    boxes: &[TrackedBox],
    line: &CountingLine,
    crossed: bool,
) -> Frame {
    let mut img = frame.to_image();
    let (width, height) = (frame.width as i32, frame.height as i32);

    for tracked in boxes {
        let color = class_color(tracked.class_id);
        let x = (tracked.x1 as i32).clamp(0, width - 1);
        let y = (tracked.y1 as i32).clamp(0, height - 1);
        let w = ((tracked.x2 - tracked.x1) as i32).clamp(1, width - x);
        let h = ((tracked.y2 - tracked.y1) as i32).clamp(1, height - y);
        draw_hollow_rect_mut(&mut img, Rect::at(x, y).of_size(w as u32, h as u32), color);

        let centroid = tracked.centroid();
        draw_filled_circle_mut(
            &mut img,
            (centroid.x as i32, centroid.y as i32),
            3,
            COLOR_CENTROID,
        );
    }

    let line_color = if crossed {
        COLOR_LINE_CROSSED
    } else {
        COLOR_LINE_IDLE
    };
    draw_line_segment_mut(
        &mut img,
        (line.a.x as f32, line.a.y as f32),
        (line.b.x as f32, line.b.y as f32),
        line_color,
    );

    Frame::from_image(img)
}

/// Encode a frame as JPEG at the given quality
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode(
        &frame.data,
        frame.width,
        frame.height,
        ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
}
