//! Page rasterization using lopdf.
//!
//! Scanned receipts are PDFs wrapping a single image per page, so the page
//! raster is recovered from the page's image XObjects rather than by running
//! a full renderer.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, Rgba};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{Rasterizer, Result};
use crate::error::PdfError;
use crate::models::config::PdfConfig;

/// PDF rasterizer backed by lopdf.
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    dpi: u32,
    min_size: u32,
    max_size: u32,
}

impl PdfRasterizer {
    pub fn new(dpi: u32, min_size: u32) -> Self {
        Self {
            dpi,
            min_size,
            max_size: PdfConfig::default().max_raster_size,
        }
    }

    pub fn from_config(config: &PdfConfig) -> Self {
        Self::new(config.render_dpi, config.min_raster_size)
            .with_max_size(config.max_raster_size)
    }

    /// Cap the length of the raster's longer side.
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size.max(1);
        self
    }

    /// Rasterize a page of an in-memory PDF.
    pub fn render_page(&self, data: &[u8], page: u32) -> Result<DynamicImage> {
        let doc = load_document(data)?;

        let pages = doc.get_pages();
        let page_id = *pages.get(&page).ok_or(PdfError::InvalidPage(page))?;

        let images = page_images(&doc, page_id);
        debug!("Found {} images on page {}", images.len(), page);

        // The scan is the largest image on the page; logos and stamps are smaller
        let image = images
            .into_iter()
            .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
            .ok_or_else(|| {
                PdfError::ImageExtraction(format!("No images found on page {}", page))
            })?;

        let media_box = media_box_size(&doc, page_id);
        self.scale(image, media_box)
    }

    /// Upscale so the raster matches the page at the configured DPI and its
    /// longer side reaches the minimum size, without passing the maximum.
    /// Never downscales; a source larger than the maximum is rejected.
    fn scale(&self, image: DynamicImage, media_box: Option<(f64, f64)>) -> Result<DynamicImage> {
        let (width, height) = (image.width().max(1), image.height().max(1));
        let longer = width.max(height);

        if longer > self.max_size {
            return Err(PdfError::Render(format!(
                "page image {}x{} exceeds the {} px raster limit",
                width, height, self.max_size
            )));
        }

        let mut factor = self.min_size as f64 / longer as f64;
        if let Some((points_w, _)) = media_box {
            let target_w = points_w * self.dpi as f64 / 72.0;
            factor = factor.max(target_w / width as f64);
        }
        factor = factor.min(self.max_size as f64 / longer as f64);

        if factor <= 1.0 {
            return Ok(image);
        }

        let new_w = ((width as f64 * factor).round() as u32).min(self.max_size);
        let new_h = ((height as f64 * factor).round() as u32).min(self.max_size);
        trace!("Upscaling page raster {}x{} -> {}x{}", width, height, new_w, new_h);
        Ok(image.resize_exact(new_w, new_h, FilterType::Lanczos3))
    }
}

impl Default for PdfRasterizer {
    fn default() -> Self {
        Self::from_config(&PdfConfig::default())
    }
}

#[async_trait]
impl Rasterizer for PdfRasterizer {
    async fn rasterize(&self, pdf_path: &Path, page: u32, out_dir: &Path) -> Result<PathBuf> {
        let data = tokio::fs::read(pdf_path)
            .await
            .map_err(|e| PdfError::Parse(format!("cannot read {}: {}", pdf_path.display(), e)))?;

        let rasterizer = self.clone();
        let out_path = out_dir.join(format!("page-{}.png", page));
        let target = out_path.clone();

        tokio::task::spawn_blocking(move || {
            let image = rasterizer.render_page(&data, page)?;
            image
                .save_with_format(&target, image::ImageFormat::Png)
                .map_err(|e| PdfError::Render(e.to_string()))
        })
        .await
        .map_err(|e| PdfError::Render(format!("rasterizer panicked: {}", e)))??;

        debug!("Rasterized page {} of {} to {}", page, pdf_path.display(), out_path.display());
        Ok(out_path)
    }
}

fn load_document(data: &[u8]) -> Result<Document> {
    let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

    if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(PdfError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");
    }

    if doc.get_pages().is_empty() {
        return Err(PdfError::NoPages);
    }
    Ok(doc)
}

fn page_images(doc: &Document, page_id: ObjectId) -> Vec<DynamicImage> {
    let mut images = Vec::new();

    let Some(resources) = page_attribute(doc, page_id, b"Resources") else {
        return images;
    };
    let Object::Dictionary(resources) = resources else {
        return images;
    };

    if let Ok(xobjects) = resources.get(b"XObject") {
        if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
            for (_name, obj_ref) in xobj_dict.iter() {
                if let Ok((_, obj)) = doc.dereference(obj_ref) {
                    if let Some(img) = image_from_object(doc, obj) {
                        images.push(img);
                    }
                }
            }
        }
    }
    images
}

/// Look up a page attribute, following `Parent` links for inherited values.
fn page_attribute(doc: &Document, node_id: ObjectId, key: &[u8]) -> Option<Object> {
    let Ok(Object::Dictionary(dict)) = doc.get_object(node_id) else {
        return None;
    };

    if let Ok(value) = dict.get(key) {
        if let Ok((_, resolved)) = doc.dereference(value) {
            return Some(resolved.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => page_attribute(doc, *parent_id, key),
        _ => None,
    }
}

/// Page width and height in points.
fn media_box_size(doc: &Document, page_id: ObjectId) -> Option<(f64, f64)> {
    let Object::Array(values) = page_attribute(doc, page_id, b"MediaBox")? else {
        return None;
    };
    let coords: Vec<f64> = values.iter().filter_map(number).collect();
    if coords.len() != 4 {
        return None;
    }
    Some(((coords[2] - coords[0]).abs(), (coords[3] - coords[1]).abs()))
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn image_from_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
    trace!("Found image object: {}x{}", width, height);

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                return image::load_from_memory_with_format(
                    &stream.content,
                    image::ImageFormat::Jpeg,
                )
                .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Skipping image with unsupported filter");
                return None;
            }
            _ => {}
        }
    }

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8) as u8;

    image_from_raw(&data, width, height, color_space, bits)
}

fn image_from_raw(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: u8,
) -> Option<DynamicImage> {
    if bits_per_component != 8 {
        trace!("Unsupported bits per component: {}", bits_per_component);
        return None;
    }

    let pixels = (width as usize) * (height as usize);
    let channels = match color_space {
        b"DeviceRGB" | b"RGB" => 3,
        b"DeviceGray" | b"G" => 1,
        _ => return None,
    };

    if data.len() < pixels * channels {
        trace!(
            "Could not decode image: data_len={}, expected={}",
            data.len(),
            pixels * channels
        );
        return None;
    }

    let mut rgba = Vec::with_capacity(pixels * 4);
    for chunk in data[..pixels * channels].chunks_exact(channels) {
        match chunk {
            [gray] => rgba.extend_from_slice(&[*gray, *gray, *gray, 255]),
            [r, g, b] => rgba.extend_from_slice(&[*r, *g, *b, 255]),
            _ => unreachable!(),
        }
    }

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
}
