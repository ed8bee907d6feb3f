use std::fs;
use std::io;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::Local;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use thiserror::Error;

use crate::settings::Settings;

const JPEG_QUALITY: u8 = 95;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create save directory {path}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode {path}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Writes captured frames into the save directory under the
/// `{prefix}_{timestamp}.{format}` naming rule.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    save_directory: PathBuf,
    file_prefix: String,
    file_format: String,
    timestamp_format: String,
}

impl OutputWriter {
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_rules(
            settings.save_directory.clone(),
            &settings.file_prefix,
            &settings.file_format,
            &settings.timestamp_format,
        )
    }

    pub fn with_rules(
        save_directory: PathBuf,
        file_prefix: &str,
        file_format: &str,
        timestamp_format: &str,
    ) -> Self {
        Self {
            save_directory,
            file_prefix: file_prefix.to_string(),
            file_format: file_format.to_lowercase(),
            timestamp_format: timestamp_format.to_string(),
        }
    }

    pub fn save_directory(&self) -> &Path {
        &self.save_directory
    }

    /// Output filename for the current moment; a custom stem takes
    /// precedence over the prefix/timestamp rule.
    pub fn build_file_name(&self, custom_name: Option<&str>) -> String {
        match custom_name {
            Some(stem) => format!("{stem}.{}", self.file_format),
            None => self.file_name_with_stamp(&timestamp_stamp(&self.timestamp_format)),
        }
    }

    pub fn file_name_with_stamp(&self, stamp: &str) -> String {
        format!("{}_{stamp}.{}", self.file_prefix, self.file_format)
    }

    /// Write the frame to disk, creating the save directory if absent.
    /// Returns the absolute path of the new file.
    pub fn save_screenshot(
        &self,
        image: &RgbaImage,
        custom_name: Option<&str>,
    ) -> StorageResult<PathBuf> {
        fs::create_dir_all(&self.save_directory).map_err(|source| {
            StorageError::CreateDirectory {
                path: self.save_directory.clone(),
                source,
            }
        })?;

        let path = self.save_directory.join(self.build_file_name(custom_name));
        self.encode_to(&path, image)?;

        Ok(fs::canonicalize(&path).unwrap_or(path))
    }

    fn encode_to(&self, path: &Path, image: &RgbaImage) -> StorageResult<()> {
        match self.file_format.as_str() {
            "png" => {
                let file = create_output_file(path)?;
                let encoder = PngEncoder::new_with_quality(
                    BufWriter::new(file),
                    CompressionType::Best,
                    FilterType::Adaptive,
                );
                encoder
                    .write_image(
                        image.as_raw(),
                        image.width(),
                        image.height(),
                        ExtendedColorType::Rgba8,
                    )
                    .map_err(|source| StorageError::Encode {
                        path: path.to_path_buf(),
                        source,
                    })
            }
            "jpg" | "jpeg" => {
                // JPEG carries no alpha channel
                let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
                let file = create_output_file(path)?;
                let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY);
                encoder
                    .write_image(
                        rgb.as_raw(),
                        rgb.width(),
                        rgb.height(),
                        ExtendedColorType::Rgb8,
                    )
                    .map_err(|source| StorageError::Encode {
                        path: path.to_path_buf(),
                        source,
                    })
            }
            // every other format goes through the extension-driven default
            // encoder settings
            _ => DynamicImage::ImageRgba8(image.clone())
                .save(path)
                .map_err(|source| StorageError::Encode {
                    path: path.to_path_buf(),
                    source,
                }),
        }
    }
}

/// Format the current local time, tolerating malformed user-configured
/// strftime strings.
fn timestamp_stamp(format: &str) -> String {
    use std::fmt::Write as _;

    let now = Local::now();
    let mut stamp = String::new();
    if write!(stamp, "{}", now.format(format)).is_err() || stamp.is_empty() {
        tracing::warn!(timestamp_format = format, "invalid timestamp format; using default");
        stamp = now.format("%Y%m%d_%H%M%S").to_string();
    }
    stamp
}

fn create_output_file(path: &Path) -> StorageResult<fs::File> {
    fs::File::create(path).map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_output_dir(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("snapstamp-storage-{name}-{}", std::process::id()));
        path
    }

    fn sample_frame() -> RgbaImage {
        RgbaImage::from_pixel(32, 24, image::Rgba([120, 40, 200, 255]))
    }

    #[test]
    fn file_name_follows_prefix_timestamp_rule() {
        let writer = OutputWriter::with_rules(
            PathBuf::from("/tmp"),
            "screenshot",
            "png",
            "%Y%m%d_%H%M%S",
        );
        assert_eq!(
            writer.file_name_with_stamp("20260807_141503"),
            "screenshot_20260807_141503.png"
        );
    }

    #[test]
    fn custom_name_takes_precedence_over_the_rule() {
        let writer = OutputWriter::with_rules(PathBuf::from("/tmp"), "screenshot", "png", "%Y");
        assert_eq!(writer.build_file_name(Some("before-upgrade")), "before-upgrade.png");
    }

    #[test]
    fn format_extension_is_lowercased() {
        let writer = OutputWriter::with_rules(PathBuf::from("/tmp"), "shot", "JPG", "%Y");
        assert_eq!(writer.file_name_with_stamp("2026"), "shot_2026.jpg");
    }

    #[test]
    fn malformed_timestamp_format_falls_back_to_the_default() {
        let stamp = timestamp_stamp("%Q-nope");
        assert_eq!(stamp.len(), "20260807_141503".len());
        assert!(stamp.chars().all(|ch| ch.is_ascii_digit() || ch == '_'));
    }

    #[test]
    fn save_creates_the_directory_and_writes_png() {
        let dir = temp_output_dir("png");
        let writer = OutputWriter::with_rules(dir.clone(), "screenshot", "png", "%Y%m%d_%H%M%S");

        let path = writer
            .save_screenshot(&sample_frame(), None)
            .expect("png save should succeed");

        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("screenshot_"));
        assert!(name.ends_with(".png"));

        let decoded = image::open(&path).expect("saved png should decode");
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 24);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn save_writes_jpeg_with_custom_name() {
        let dir = temp_output_dir("jpg");
        let writer = OutputWriter::with_rules(dir.clone(), "shot", "jpg", "%Y");

        let path = writer
            .save_screenshot(&sample_frame(), Some("meeting-notes"))
            .expect("jpeg save should succeed");

        assert!(path.ends_with("meeting-notes.jpg"));
        let decoded = image::open(&path).expect("saved jpeg should decode");
        assert_eq!(decoded.width(), 32);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn other_formats_use_the_default_encoder() {
        let dir = temp_output_dir("bmp");
        let writer = OutputWriter::with_rules(dir.clone(), "shot", "bmp", "%Y");

        let path = writer
            .save_screenshot(&sample_frame(), Some("raw-dump"))
            .expect("bmp save should succeed");
        assert!(path.ends_with("raw-dump.bmp"));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn unknown_extension_surfaces_an_encode_error() {
        let dir = temp_output_dir("unknown");
        let writer = OutputWriter::with_rules(dir.clone(), "shot", "not-a-format", "%Y");

        let err = writer
            .save_screenshot(&sample_frame(), Some("mystery"))
            .expect_err("unknown format should fail to encode");
        assert!(matches!(err, StorageError::Encode { .. }));

        let _ = fs::remove_dir_all(dir);
    }
}
