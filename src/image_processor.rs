//! # Image Processing Module
//!
//! Questo modulo è il worker di ottimizzazione: trasforma una singola immagine
//! sorgente in un output ottimizzato, calcolando le metriche before/after.
//! Tutta la codifica avviene in-process tramite le crate codec (`image`,
//! `webp`, `ravif`), nessun tool esterno.
//!
//! ## Pipeline per file:
//! 1. Lettura `original_bytes` dalla dimensione del file sorgente
//! 2. Decode dell'immagine (errore = risultato `Error`, mai abort del batch)
//! 3. Se richiesto un resize: correzione orientamento EXIF, poi resize
//!    bounded che preserva l'aspect ratio (mai upscale)
//! 4. Risoluzione formato target (`original` mantiene il formato sorgente)
//! 5. Normalizzazione color-mode per i formati opachi (RGB8/Luma8 passano
//!    invariati, il resto viene convertito a RGB8)
//! 6. Encode con quality solo per i formati lossy; la compressione "best
//!    effort" lossless è sempre attiva (PNG: CompressionType::Best)
//! 7. Copia best-effort dei metadata EXIF se `preserve_metadata` è attivo
//! 8. Lettura `optimized_bytes` dall'output scritto
//!
//! ## Error handling:
//! `process()` non fallisce mai oltre il proprio boundary: ogni errore viene
//! loggato e ripiegato in un `OptimizationResult` con status `Error`, dove
//! `optimized_bytes == original_bytes` (no-op, non un file svanito).

use crate::config::{Config, TargetFormat};
use crate::error::OptimizeError;
use crate::file_manager::FileManager;
use crate::result::OptimizationResult;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use img_parts::ImageEXIF;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Concrete encoding format resolved for one output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Avif,
}

/// Optimization worker for single image files
pub struct ImageProcessor {
    config: Config,
}

impl ImageProcessor {
    /// Create a new image processor with the provided configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Optimize one source file into the output directory.
    ///
    /// Never fails past its own boundary: every per-file error is folded
    /// into the returned result.
    pub fn process(&self, src_path: &Path) -> OptimizationResult {
        let filename = src_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let original_bytes = fs::metadata(src_path).map(|m| m.len()).unwrap_or(0);

        match self.optimize(src_path) {
            Ok((optimized_bytes, output_path)) => {
                let result = OptimizationResult::success(
                    filename,
                    original_bytes,
                    optimized_bytes,
                    output_path.display().to_string(),
                );
                info!(
                    "Optimized {} | {} -> {} | {:.2}%",
                    result.filename,
                    FileManager::format_size(original_bytes),
                    FileManager::format_size(optimized_bytes),
                    result.reduction_pct
                );
                result
            }
            Err(e) => {
                error!("Failed: {} - {}", filename, e);
                OptimizationResult::failure(filename, original_bytes, e.to_string())
            }
        }
    }

    fn optimize(&self, src_path: &Path) -> Result<(u64, PathBuf), OptimizeError> {
        let mut img = image::open(src_path)?;

        let mut orientation = 1;
        if self.config.wants_resize() {
            // Resize must operate on the visually-correct orientation
            orientation = read_orientation(src_path);
            img = apply_orientation(img, orientation);
            img = resize_bounded(img, self.config.max_width, self.config.max_height);
        }

        let format = self.resolve_format(src_path)?;
        let output_path = self.resolve_output_path(src_path);
        debug!(
            "Encoding {} as {:?} -> {}",
            src_path.display(),
            format,
            output_path.display()
        );

        let img = normalize_color(img, format);
        let mut encoded = encode(&img, format, self.config.quality)?;

        if self.config.preserve_metadata {
            // Best-effort: a source without EXIF or an unsupported container
            // leaves the encoded bytes untouched
            if let Some(with_exif) = copy_exif(src_path, &encoded, format, orientation != 1) {
                encoded = with_exif;
            }
        }

        fs::write(&output_path, &encoded)?;
        let optimized_bytes = fs::metadata(&output_path)?.len();
        Ok((optimized_bytes, output_path))
    }

    /// Resolve the encoding format: a forced target wins, `original` keeps
    /// the source format
    fn resolve_format(&self, src_path: &Path) -> Result<OutputFormat, OptimizeError> {
        match self.config.target_format {
            TargetFormat::Jpg => Ok(OutputFormat::Jpeg),
            TargetFormat::Png => Ok(OutputFormat::Png),
            TargetFormat::Webp => Ok(OutputFormat::Webp),
            TargetFormat::Avif => Ok(OutputFormat::Avif),
            TargetFormat::Original => {
                let ext = src_path
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                match ext.as_str() {
                    "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
                    "png" => Ok(OutputFormat::Png),
                    "webp" => Ok(OutputFormat::Webp),
                    "avif" => Ok(OutputFormat::Avif),
                    other => Err(OptimizeError::UnsupportedFormat(format!(
                        "Cannot keep original format for extension '{other}'"
                    ))),
                }
            }
        }
    }

    /// Destination path: source file name in the output directory, with the
    /// extension substituted when a format is forced
    fn resolve_output_path(&self, src_path: &Path) -> PathBuf {
        let mut dst = self
            .config
            .output_dir
            .join(src_path.file_name().unwrap_or_default());
        if let Some(ext) = self.config.target_format.extension() {
            dst.set_extension(ext);
        }
        dst
    }
}

/// Read the EXIF orientation tag, defaulting to 1 (upright) when the file
/// carries no usable metadata
fn read_orientation(path: &Path) -> u32 {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return 1,
    };
    let mut reader = BufReader::new(file);
    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(meta) => meta
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1),
        Err(_) => 1,
    }
}

/// Transpose the image into its visually-correct orientation
fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Shrink the image so that neither dimension exceeds its bound, preserving
/// aspect ratio. An unset bound passes the image's own dimension; an image
/// already within bounds is returned untouched (no upscaling).
fn resize_bounded(img: DynamicImage, max_w: Option<u32>, max_h: Option<u32>) -> DynamicImage {
    let bound_w = max_w.unwrap_or_else(|| img.width());
    let bound_h = max_h.unwrap_or_else(|| img.height());

    if img.width() <= bound_w && img.height() <= bound_h {
        return img;
    }
    img.resize(bound_w, bound_h, FilterType::Lanczos3)
}

/// Opaque lossy targets need a truecolor or grayscale buffer; compatible
/// modes pass through unchanged to avoid needless work
fn normalize_color(img: DynamicImage, format: OutputFormat) -> DynamicImage {
    match format {
        OutputFormat::Png => img,
        _ => match img {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => img,
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        },
    }
}

fn encode(img: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>, OptimizeError> {
    match format {
        OutputFormat::Jpeg => encode_jpeg(img, quality),
        OutputFormat::Png => encode_png(img),
        OutputFormat::Webp => encode_webp(img, quality),
        OutputFormat::Avif => encode_avif(img, quality),
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, OptimizeError> {
    let mut buf = Vec::new();
    match img {
        DynamicImage::ImageLuma8(gray) => {
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            encoder.encode(
                gray.as_raw(),
                gray.width(),
                gray.height(),
                ExtendedColorType::L8,
            )?;
        }
        other => {
            let rgb = other.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            encoder.encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
    }
    Ok(buf)
}

/// PNG is lossless: quality does not apply, but the "optimize encoding" flag
/// maps to the strongest compression with adaptive filtering
fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, OptimizeError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilterType::Adaptive);
    match img {
        DynamicImage::ImageLuma8(gray) => {
            encoder.write_image(
                gray.as_raw(),
                gray.width(),
                gray.height(),
                ExtendedColorType::L8,
            )?;
        }
        DynamicImage::ImageRgb8(rgb) => {
            encoder.write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
        other => {
            let rgba = other.to_rgba8();
            encoder.write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                ExtendedColorType::Rgba8,
            )?;
        }
    }
    Ok(buf)
}

fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, OptimizeError> {
    let rgb = img.to_rgb8();
    let encoder = webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height());
    Ok(encoder.encode(quality as f32).to_vec())
}

#[cfg(feature = "avif")]
fn encode_avif(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, OptimizeError> {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels: Vec<rgb::RGBA<u8>> = rgba
        .as_raw()
        .chunks_exact(4)
        .map(|c| rgb::RGBA::new(c[0], c[1], c[2], c[3]))
        .collect();

    let encoded = ravif::Encoder::new()
        .with_quality(quality as f32)
        .with_speed(6)
        .encode_rgba(ravif::Img::new(
            pixels.as_slice(),
            width as usize,
            height as usize,
        ))
        .map_err(|e| OptimizeError::Encode(format!("AVIF encoding failed: {e}")))?;

    Ok(encoded.avif_file)
}

#[cfg(not(feature = "avif"))]
fn encode_avif(_img: &DynamicImage, _quality: u8) -> Result<Vec<u8>, OptimizeError> {
    Err(OptimizeError::Encode(
        "AVIF encoding is not available in this build".to_string(),
    ))
}

/// Best-effort EXIF copy from source container into the freshly encoded
/// bytes. Returns `None` when the source has no EXIF or the container does
/// not carry one; failures are silently ignored.
///
/// When a rotation was baked into the pixels the Orientation tag must be
/// reset to upright, otherwise viewers rotate the output a second time.
fn copy_exif(
    src_path: &Path,
    encoded: &[u8],
    format: OutputFormat,
    orientation_applied: bool,
) -> Option<Vec<u8>> {
    let mut payload = read_exif_payload(src_path)?;
    if orientation_applied {
        payload = reset_orientation_tag(payload);
    }
    embed_exif_payload(encoded, format, payload)
}

/// Rewrite the Orientation entry of IFD0 to 1 (upright) in a raw TIFF EXIF
/// payload. A payload that does not parse is passed through unchanged.
fn reset_orientation_tag(payload: img_parts::Bytes) -> img_parts::Bytes {
    let mut data = payload.to_vec();
    if data.len() < 8 {
        return data.into();
    }
    let little = match &data[0..4] {
        b"II\x2a\x00" => true,
        b"MM\x00\x2a" => false,
        _ => return data.into(),
    };
    let read_u16 = |b: &[u8]| {
        if little {
            u16::from_le_bytes([b[0], b[1]])
        } else {
            u16::from_be_bytes([b[0], b[1]])
        }
    };
    let read_u32 = |b: &[u8]| {
        if little {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        }
    };

    let ifd = read_u32(&data[4..8]) as usize;
    if data.len() < ifd + 2 {
        return data.into();
    }
    let entries = read_u16(&data[ifd..ifd + 2]) as usize;
    for i in 0..entries {
        let entry = ifd + 2 + i * 12;
        if data.len() < entry + 12 {
            break;
        }
        // Orientation is tag 0x0112, a SHORT stored inline in the value field
        if read_u16(&data[entry..entry + 2]) == 0x0112 {
            let upright: [u8; 2] = if little { [1, 0] } else { [0, 1] };
            data[entry + 8] = upright[0];
            data[entry + 9] = upright[1];
            break;
        }
    }
    data.into()
}

fn read_exif_payload(path: &Path) -> Option<img_parts::Bytes> {
    let data = fs::read(path).ok()?;
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => img_parts::jpeg::Jpeg::from_bytes(data.into()).ok()?.exif(),
        "png" => img_parts::png::Png::from_bytes(data.into()).ok()?.exif(),
        "webp" => img_parts::webp::WebP::from_bytes(data.into()).ok()?.exif(),
        _ => None,
    }
}

fn embed_exif_payload(
    encoded: &[u8],
    format: OutputFormat,
    payload: img_parts::Bytes,
) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            let mut jpeg = img_parts::jpeg::Jpeg::from_bytes(encoded.to_vec().into()).ok()?;
            jpeg.set_exif(Some(payload));
            jpeg.encoder().write_to(&mut out).ok()?;
        }
        OutputFormat::Png => {
            let mut png = img_parts::png::Png::from_bytes(encoded.to_vec().into()).ok()?;
            png.set_exif(Some(payload));
            png.encoder().write_to(&mut out).ok()?;
        }
        OutputFormat::Webp => {
            let mut webp = img_parts::webp::WebP::from_bytes(encoded.to_vec().into()).ok()?;
            webp.set_exif(Some(payload));
            webp.encoder().write_to(&mut out).ok()?;
        }
        // img-parts has no AVIF container support
        OutputFormat::Avif => return None,
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::FileStatus;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn test_config(input: &Path, output: &Path) -> Config {
        Config {
            input_dir: input.to_path_buf(),
            output_dir: output.to_path_buf(),
            ..Default::default()
        }
    }

    fn write_gradient_png(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        img.save(path).unwrap();
    }

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input");
        let output = temp_dir.path().join("output");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&output).unwrap();
        (temp_dir, input, output)
    }

    #[test]
    fn test_process_keeps_original_format() {
        let (_guard, input, output) = setup();
        let src = input.join("photo.png");
        write_gradient_png(&src, 32, 32);

        let processor = ImageProcessor::new(test_config(&input, &output));
        let result = processor.process(&src);

        assert!(result.status.is_ok());
        assert_eq!(result.filename, "photo.png");
        let out = output.join("photo.png");
        assert!(out.exists());
        assert_eq!(result.optimized_bytes, fs::metadata(&out).unwrap().len());
    }

    #[test]
    fn test_forced_format_substitutes_extension() {
        let (_guard, input, output) = setup();
        let src = input.join("photo.png");
        // Alpha channel forces the color-mode normalization path for JPEG
        let img = RgbaImage::from_pixel(16, 16, Rgba([200, 10, 10, 255]));
        img.save(&src).unwrap();

        let mut config = test_config(&input, &output);
        config.target_format = TargetFormat::Jpg;
        let result = ImageProcessor::new(config).process(&src);

        assert!(result.status.is_ok());
        let out = output.join("photo.jpg");
        assert!(out.exists());
        assert_eq!(
            image::ImageFormat::from_path(&out).unwrap(),
            image::ImageFormat::Jpeg
        );
        image::open(&out).unwrap();
    }

    #[test]
    fn test_resize_preserves_aspect_with_single_bound() {
        let (_guard, input, output) = setup();
        let src = input.join("tall.png");
        write_gradient_png(&src, 200, 400);

        let mut config = test_config(&input, &output);
        config.max_width = Some(100);
        let result = ImageProcessor::new(config).process(&src);

        assert!(result.status.is_ok());
        let (w, h) = image::image_dimensions(output.join("tall.png")).unwrap();
        assert_eq!(w, 100);
        assert_eq!(h, 200);
    }

    #[test]
    fn test_resize_never_upscales() {
        let (_guard, input, output) = setup();
        let src = input.join("small.png");
        write_gradient_png(&src, 50, 40);

        let mut config = test_config(&input, &output);
        config.max_width = Some(500);
        config.max_height = Some(500);
        let result = ImageProcessor::new(config).process(&src);

        assert!(result.status.is_ok());
        let (w, h) = image::image_dimensions(output.join("small.png")).unwrap();
        assert_eq!((w, h), (50, 40));
    }

    #[test]
    fn test_corrupt_file_becomes_error_result() {
        let (_guard, input, output) = setup();
        let src = input.join("broken.jpg");
        fs::write(&src, b"definitely not a jpeg").unwrap();
        let original = fs::metadata(&src).unwrap().len();

        let result = ImageProcessor::new(test_config(&input, &output)).process(&src);

        assert!(matches!(result.status, FileStatus::Error(_)));
        assert_eq!(result.original_bytes, original);
        assert_eq!(result.optimized_bytes, original);
        assert_eq!(result.reduction_pct, 0.0);
        assert!(result.output_path.is_empty());
    }

    #[test]
    fn test_webp_output_decodes() {
        let (_guard, input, output) = setup();
        let src = input.join("photo.png");
        write_gradient_png(&src, 24, 24);

        let mut config = test_config(&input, &output);
        config.target_format = TargetFormat::Webp;
        let result = ImageProcessor::new(config).process(&src);

        assert!(result.status.is_ok());
        let out = output.join("photo.webp");
        let decoded = image::open(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (24, 24));
    }

    #[test]
    fn test_preserve_metadata_without_exif_is_harmless() {
        let (_guard, input, output) = setup();
        let src = input.join("plain.png");
        write_gradient_png(&src, 16, 16);

        let mut config = test_config(&input, &output);
        config.preserve_metadata = true;
        let result = ImageProcessor::new(config).process(&src);

        assert!(result.status.is_ok());
        assert!(output.join("plain.png").exists());
    }

    /// Minimal little-endian TIFF payload whose IFD0 carries only the
    /// Orientation tag
    fn exif_with_orientation(orientation: u16) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(b"II\x2a\x00");
        payload.extend_from_slice(&8u32.to_le_bytes());
        payload.extend_from_slice(&1u16.to_le_bytes());
        payload.extend_from_slice(&0x0112u16.to_le_bytes());
        payload.extend_from_slice(&3u16.to_le_bytes());
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(&orientation.to_le_bytes());
        payload.extend_from_slice(&[0, 0]);
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload
    }

    fn write_jpeg_with_orientation(path: &Path, width: u32, height: u32, orientation: u16) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 77])
        });
        let mut jpeg_bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut jpeg_bytes), image::ImageFormat::Jpeg)
            .unwrap();

        let mut jpeg = img_parts::jpeg::Jpeg::from_bytes(jpeg_bytes.into()).unwrap();
        jpeg.set_exif(Some(exif_with_orientation(orientation).into()));
        let mut tagged = Vec::new();
        jpeg.encoder().write_to(&mut tagged).unwrap();
        fs::write(path, tagged).unwrap();
    }

    #[test]
    fn test_reset_orientation_tag_rewrites_value() {
        let patched = reset_orientation_tag(exif_with_orientation(6).into());
        assert_eq!(patched[18..20], [1, 0]);

        // Garbage passes through unchanged
        let garbage = img_parts::Bytes::from_static(b"not tiff");
        assert_eq!(reset_orientation_tag(garbage.clone()), garbage);
    }

    #[test]
    fn test_rotated_output_does_not_keep_stale_orientation() {
        let (_guard, input, output) = setup();
        let src = input.join("rotated.jpg");
        write_jpeg_with_orientation(&src, 20, 40, 6);
        assert_eq!(read_orientation(&src), 6);

        let mut config = test_config(&input, &output);
        config.max_width = Some(100);
        config.preserve_metadata = true;
        let result = ImageProcessor::new(config).process(&src);

        assert!(result.status.is_ok());
        let dst = output.join("rotated.jpg");
        // Rotation is baked into the pixels and the tag is back to upright
        assert_eq!(image::image_dimensions(&dst).unwrap(), (40, 20));
        assert_eq!(read_orientation(&dst), 1);
    }

    #[test]
    fn test_apply_orientation_rotates_dimensions() {
        let dims = |img: &DynamicImage| (img.width(), img.height());
        let img = DynamicImage::ImageRgb8(RgbImage::new(10, 20));

        assert_eq!(dims(&apply_orientation(img.clone(), 6)), (20, 10));
        assert_eq!(dims(&apply_orientation(img.clone(), 3)), (10, 20));
        assert_eq!(dims(&apply_orientation(img, 1)), (10, 20));
    }
}
