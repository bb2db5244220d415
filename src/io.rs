use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ImageEncoder, ImageError, RgbaImage};

/// Error type for flattened raster export
#[derive(Debug)]
pub enum SaveError {
    /// No destination was given; nothing is written.
    EmptyPath,
    Io(std::io::Error),
    Encode(ImageError),
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::EmptyPath => write!(f, "no output path given"),
            SaveError::Io(e) => write!(f, "I/O error: {}", e),
            SaveError::Encode(e) => write!(f, "Encode error: {}", e),
        }
    }
}

impl std::error::Error for SaveError {}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<ImageError> for SaveError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::IoError(io) => SaveError::Io(io),
            other => SaveError::Encode(other),
        }
    }
}

/// Encode `image` as an RGBA PNG at `path`, replacing any existing file.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), SaveError> {
    if path.as_os_str().is_empty() {
        return Err(SaveError::EmptyPath);
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let encoder = PngEncoder::new(&mut writer);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn empty_path_is_rejected_before_io() {
        let img = RgbaImage::new(2, 2);
        assert!(matches!(save_png(&img, Path::new("")), Err(SaveError::EmptyPath)));
    }

    #[test]
    fn png_round_trips_losslessly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let mut img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 1, Rgba([200, 100, 50, 77]));
        save_png(&img, &path).unwrap();
        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back, img);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.png");
        let img = RgbaImage::new(1, 1);
        assert!(matches!(save_png(&img, &path), Err(SaveError::Io(_))));
    }
}
