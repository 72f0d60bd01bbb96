use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use image::ImageError;
use vizsim_core::{Error, ImageLoader, Raster, Result};

/// Loads images from the local filesystem, converting to 8-bit RGB
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageLoader;

impl ImageLoader for FsImageLoader {
    fn read(&self, path: &Path) -> Result<Raster> {
        if !path.exists() {
            return Err(Error::load(path, "file not found"));
        }
        let image = image::open(path).map_err(|e| match e {
            ImageError::IoError(io) if io.kind() == ErrorKind::NotFound => {
                Error::load(path, "file not found")
            }
            other => Error::load(path, other),
        })?;
        Ok(image.to_rgb8())
    }
}

/// Decode an in-memory encoded image (PNG, JPEG)
pub fn decode(bytes: &[u8]) -> Result<Raster> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| Error::load("<memory>", e))
}

/// File extensions the loader can decode
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Decodable image files directly inside `dir`, sorted by path
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_missing_file() {
        let err = FsImageLoader.read(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }

    #[test]
    fn test_roundtrip_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        RgbImage::from_pixel(5, 3, Rgb([200, 10, 10])).save(&path).unwrap();

        let raster = FsImageLoader.read(&path).unwrap();
        assert_eq!(raster.dimensions(), (5, 3));
        assert_eq!(raster.get_pixel(4, 2), &Rgb([200, 10, 10]));
    }

    #[test]
    fn test_undecodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(matches!(FsImageLoader.read(&path), Err(Error::Load { .. })));
        assert!(matches!(decode(b"nope"), Err(Error::Load { .. })));
    }

    #[test]
    fn test_list_images() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names: Vec<_> = list_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.jpg", "b.PNG"]);
        assert!(matches!(list_images(&dir.path().join("absent")), Err(Error::Io(_))));
    }
}
