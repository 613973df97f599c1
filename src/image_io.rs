use std::path::{Path, PathBuf};
use std::fs;
use image::{GrayImage, ImageFormat, RgbImage};

use crate::errors::{FoodFinderError, Result};

/// Extensions accepted when scanning a directory of tray photographs
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Represents an input image with its metadata
pub struct InputImage {
    pub image: RgbImage,
    pub path: PathBuf,
    pub filename: String,
}

/// Get all tray images from a directory (recursively), sorted by path
pub fn get_image_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(FoodFinderError::InvalidPath(dir_path.to_path_buf()));
    }

    if !dir_path.is_dir() {
        return Err(FoodFinderError::Config(format!(
            "{} is not a directory", dir_path.display()
        )));
    }

    let mut image_files = Vec::new();
    find_image_files_recursive(dir_path, &mut image_files)?;
    image_files.sort();

    Ok(image_files)
}

fn find_image_files_recursive(dir_path: &Path, result: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();

        if path.is_dir() {
            find_image_files_recursive(&path, result)?;
        } else if path.is_file() && has_image_extension(&path) {
            result.push(path);
        }
    }

    Ok(())
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Load a tray photograph as 8-bit RGB
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    let filename = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| FoodFinderError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let image = image::open(path)?.to_rgb8();

    Ok(InputImage {
        image,
        path: path.to_path_buf(),
        filename,
    })
}

/// Save a single-channel mask as PNG, creating parent directories
pub fn save_mask<P: AsRef<Path>>(mask: &GrayImage, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    mask.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_image_extensions() {
        assert!(has_image_extension(Path::new("tray1/food_image.jpg")));
        assert!(has_image_extension(Path::new("LEFTOVER1.JPEG")));
        assert!(has_image_extension(Path::new("mask.png")));
        assert!(!has_image_extension(Path::new("notes.txt")));
        assert!(!has_image_extension(Path::new("README")));
    }

    #[test]
    fn missing_directory_is_invalid_path() {
        let result = get_image_files_in_dir("/definitely/not/here");
        assert!(matches!(result, Err(FoodFinderError::InvalidPath(_))));
    }
}
