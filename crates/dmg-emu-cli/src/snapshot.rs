use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use dmg_emu_core::ppu::{FrameBuffer, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Map 2-bit colour numbers to 8-bit grey levels.
pub fn frame_to_gray(frame: &FrameBuffer, palette: [u8; 4]) -> Vec<u8> {
    frame
        .iter()
        .flat_map(|row| row.iter())
        .map(|&px| palette[(px & 0x03) as usize])
        .collect()
}

pub fn write_png(path: &Path, frame: &FrameBuffer, palette: [u8; 4]) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let w = BufWriter::new(File::create(path)?);
    let mut encoder = png::Encoder::new(w, SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32);
    encoder.set_color(png::ColorType::Grayscale);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().map_err(io::Error::other)?;
    writer
        .write_image_data(&frame_to_gray(frame, palette))
        .map_err(io::Error::other)?;
    writer.finish().map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PALETTE;
    use std::io::BufReader;

    #[test]
    fn gray_levels_follow_palette() {
        let mut frame = [[0u8; SCREEN_WIDTH]; SCREEN_HEIGHT];
        frame[0][1] = 1;
        frame[0][2] = 2;
        frame[143][159] = 3;
        let gray = frame_to_gray(&frame, DEFAULT_PALETTE);
        assert_eq!(gray.len(), SCREEN_WIDTH * SCREEN_HEIGHT);
        assert_eq!(&gray[..3], &[0xFF, 0xAA, 0x55]);
        assert_eq!(gray[gray.len() - 1], 0x00);
    }

    #[test]
    fn writes_a_decodable_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shots").join("frame.png");
        let frame = [[2u8; SCREEN_WIDTH]; SCREEN_HEIGHT];
        write_png(&path, &frame, DEFAULT_PALETTE).unwrap();

        let decoder = png::Decoder::new(BufReader::new(File::open(&path).unwrap()));
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size().unwrap()];
        let info = reader.next_frame(&mut buf).unwrap();
        assert_eq!((info.width, info.height), (160, 144));
        assert_eq!(info.color_type, png::ColorType::Grayscale);
        assert!(buf[..info.buffer_size()].iter().all(|&g| g == 0x55));
    }
}
