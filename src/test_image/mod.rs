//! Fixture generation for tests: small PNGs and blank PDFs.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::{Document, Object, Stream, dictionary};

/// Encode an image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("PNG encoding of an in-memory image cannot fail");
    bytes
}

/// A `width`×`height` PNG filled with one color.
pub fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    encode_png(&RgbaImage::from_pixel(width, height, Rgba(rgba)))
}

/// A stamp-like PNG: black ink frame on a white background.
pub fn stamp_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        let border = x < 2 || y < 2 || x + 2 >= width || y + 2 >= height;
        if border {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    encode_png(&image)
}

/// Bytes of a PDF with `pages` empty pages of `width`×`height` points.
pub fn blank_pdf(pages: usize, width: f32, height: f32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(pages);
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {},
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width),
                Object::Real(height),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("saving an in-memory PDF cannot fail");
    bytes
}

/// Write a blank PDF into `dir` and return its path.
pub fn blank_pdf_file(dir: &std::path::Path, name: &str, pages: usize) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, blank_pdf(pages, 612.0, 792.0)).expect("write fixture PDF");
    path
}
