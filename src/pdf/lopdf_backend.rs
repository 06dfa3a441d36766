//! [`PdfBackend`] implemented on top of `lopdf`.

use std::collections::HashMap;
use std::path::Path;

use image::{Rgba, RgbaImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use super::{DocumentHandle, PageSize, PdfBackend};
use crate::error::PdfError;
use crate::model::Rect;

/// Fallback page box (A4 portrait) when a page carries no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 595.0, 842.0];

/// Backend keeping parsed `lopdf` documents in memory.
#[derive(Debug, Default)]
pub struct LopdfBackend {
    documents: HashMap<DocumentHandle, Document>,
    next_handle: u64,
}

impl LopdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently open.
    pub fn open_count(&self) -> usize {
        self.documents.len()
    }

    /// Serialize the current state of an open document, including any
    /// composited images.
    pub fn to_bytes(&self, handle: DocumentHandle) -> Result<Vec<u8>, PdfError> {
        let mut bytes = Vec::new();
        self.document(handle)?.clone().save_to(&mut bytes)?;
        Ok(bytes)
    }

    fn register(&mut self, doc: Document) -> DocumentHandle {
        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        self.documents.insert(handle, doc);
        handle
    }

    fn document(&self, handle: DocumentHandle) -> Result<&Document, PdfError> {
        self.documents
            .get(&handle)
            .ok_or(PdfError::InvalidHandle(handle.0))
    }

    fn document_mut(&mut self, handle: DocumentHandle) -> Result<&mut Document, PdfError> {
        self.documents
            .get_mut(&handle)
            .ok_or(PdfError::InvalidHandle(handle.0))
    }
}

impl PdfBackend for LopdfBackend {
    fn open(&mut self, path: &Path) -> Result<DocumentHandle, PdfError> {
        let doc = Document::load(path)?;
        let handle = self.register(doc);
        log::info!("📄 Opened {} as {}", path.display(), handle);
        Ok(handle)
    }

    fn open_bytes(&mut self, bytes: &[u8]) -> Result<DocumentHandle, PdfError> {
        let doc = Document::load_mem(bytes)?;
        let handle = self.register(doc);
        log::debug!("📄 Opened {} byte buffer as {}", bytes.len(), handle);
        Ok(handle)
    }

    fn page_count(&self, doc: DocumentHandle) -> Result<usize, PdfError> {
        Ok(self.document(doc)?.get_pages().len())
    }

    fn page_size(&self, doc: DocumentHandle, page: usize) -> Result<PageSize, PdfError> {
        let document = self.document(doc)?;
        let page_id = page_id(document, page)?;
        Ok(PageBox::resolve(document, page_id)?.displayed_size())
    }

    fn render_page(
        &self,
        doc: DocumentHandle,
        page: usize,
        zoom: f32,
    ) -> Result<RgbaImage, PdfError> {
        let (width, height) = self.page_size(doc, page)?.pixels_at(zoom);
        Ok(RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])))
    }

    fn duplicate(&mut self, doc: DocumentHandle) -> Result<DocumentHandle, PdfError> {
        let copy = self.document(doc)?.clone();
        Ok(self.register(copy))
    }

    fn composite_image(
        &mut self,
        doc: DocumentHandle,
        page: usize,
        rect: Rect,
        image: &RgbaImage,
    ) -> Result<(), PdfError> {
        let document = self.document_mut(doc)?;
        let page_id = page_id(document, page)?;
        let page_box = PageBox::resolve(document, page_id)?;

        let image_id = add_image_xobject(document, image);
        let name = attach_xobject(document, page_id, image_id)?;

        let [a, b, c, d, e, f] = page_box.image_matrix(rect);
        let content =
            format!("q {a:.4} {b:.4} {c:.4} {d:.4} {e:.4} {f:.4} cm /{name} Do Q\n");
        document.add_page_contents(page_id, content.into_bytes())?;
        log::debug!(
            "🖼️ Composited {}x{} image as /{} on page {}",
            image.width(),
            image.height(),
            name,
            page + 1
        );
        Ok(())
    }

    fn save(&mut self, doc: DocumentHandle, path: &Path) -> Result<(), PdfError> {
        self.document_mut(doc)?.save(path)?;
        log::info!("💾 Saved {} to {}", doc, path.display());
        Ok(())
    }

    fn close(&mut self, doc: DocumentHandle) {
        if self.documents.remove(&doc).is_some() {
            log::debug!("📕 Closed {}", doc);
        }
    }
}

/// Object id of the 0-based `page`.
fn page_id(doc: &Document, page: usize) -> Result<ObjectId, PdfError> {
    let pages = doc.get_pages();
    let count = pages.len();
    u32::try_from(page + 1)
        .ok()
        .and_then(|number| pages.get(&number).copied())
        .ok_or(PdfError::PageOutOfRange { index: page, count })
}

/// A page's MediaBox and display rotation.
///
/// Document space is the page as displayed: top-left origin, after `/Rotate`
/// has been applied. PDF user space is the unrotated MediaBox with a
/// bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageBox {
    /// `[llx, lly, urx, ury]`
    media_box: [f32; 4],
    /// Clockwise rotation: 0, 90, 180 or 270
    rotation: u32,
}

impl PageBox {
    fn resolve(doc: &Document, page_id: ObjectId) -> Result<Self, PdfError> {
        let media_box = match resolve_inherited(doc, page_id, b"MediaBox")?
            .and_then(|obj| parse_box(doc, obj))
        {
            Some(media_box) => media_box,
            None => {
                log::warn!("⚠️ Page {:?} has no MediaBox, assuming A4", page_id);
                DEFAULT_MEDIA_BOX
            }
        };
        let rotation = match resolve_inherited(doc, page_id, b"Rotate")? {
            Some(obj) => match number(obj) {
                Some(degrees) if degrees as i64 % 90 == 0 => (degrees as i64).rem_euclid(360) as u32,
                _ => {
                    log::warn!("⚠️ Page {:?} has invalid /Rotate {:?}, ignoring", page_id, obj);
                    0
                }
            },
            None => 0,
        };
        Ok(Self {
            media_box,
            rotation,
        })
    }

    fn width(&self) -> f32 {
        self.media_box[2] - self.media_box[0]
    }

    fn height(&self) -> f32 {
        self.media_box[3] - self.media_box[1]
    }

    fn displayed_size(&self) -> PageSize {
        match self.rotation {
            90 | 270 => PageSize::new(self.height(), self.width()),
            _ => PageSize::new(self.width(), self.height()),
        }
    }

    /// Map a document-space point to PDF user space.
    fn to_user_space(&self, x: f32, y: f32) -> (f32, f32) {
        let [llx, lly, urx, ury] = self.media_box;
        match self.rotation {
            90 => (llx + y, lly + x),
            180 => (urx - x, lly + y),
            270 => (urx - y, ury - x),
            _ => (llx + x, ury - y),
        }
    }

    /// `cm` operands placing an image upright over document-space `rect`.
    ///
    /// The image's unit square maps its bottom-left corner to the rect's
    /// bottom-left and its top edge to the rect's top edge, as displayed.
    fn image_matrix(&self, rect: Rect) -> [f32; 6] {
        let origin = self.to_user_space(rect.left, rect.bottom);
        let right = self.to_user_space(rect.right, rect.bottom);
        let up = self.to_user_space(rect.left, rect.top);
        [
            right.0 - origin.0,
            right.1 - origin.1,
            up.0 - origin.0,
            up.1 - origin.1,
            origin.0,
            origin.1,
        ]
    }
}

/// Look up a page attribute, walking up the page tree for inherited values.
fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, PdfError> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc.get_object(id)?.as_dict()?;
        if let Ok(value) = dict.get(key) {
            let value = match value {
                Object::Reference(target) => doc.get_object(*target)?,
                other => other,
            };
            return Ok(Some(value));
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(None)
}

fn parse_box(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let resolved = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let values = resolved.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = number(value)?;
    }
    Some(out)
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

/// Add `image` as an RGB image XObject with a DeviceGray soft mask.
fn add_image_xobject(doc: &mut Document, image: &RgbaImage) -> ObjectId {
    let (width, height) = image.dimensions();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in image.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
    }

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    ));
    doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => smask_id,
        },
        rgb,
    ))
}

/// Register `image_id` in the page's XObject resources and return its name.
fn attach_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    image_id: ObjectId,
) -> Result<String, PdfError> {
    let (shared_id, mut resources) = page_resources(doc, page_id)?;

    let mut xobjects = match resources.get(b"XObject") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => doc.get_object(*id)?.as_dict()?.clone(),
        Ok(_) => return Err(PdfError::malformed("XObject resource is not a dictionary")),
        Err(_) => Dictionary::new(),
    };

    let mut n = xobjects.len() + 1;
    while xobjects.has(format!("Stamp{n}").as_bytes()) {
        n += 1;
    }
    let name = format!("Stamp{n}");
    xobjects.set(name.clone(), image_id);
    resources.set("XObject", Object::Dictionary(xobjects));

    match shared_id {
        Some(id) => {
            doc.objects.insert(id, Object::Dictionary(resources));
        }
        None => {
            doc.get_object_mut(page_id)?
                .as_dict_mut()?
                .set("Resources", Object::Dictionary(resources));
        }
    }
    Ok(name)
}

/// Resources in effect for a page, and the object id holding them when shared.
fn page_resources(
    doc: &Document,
    page_id: ObjectId,
) -> Result<(Option<ObjectId>, Dictionary), PdfError> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc.get_object(id)?.as_dict()?;
        match dict.get(b"Resources") {
            Ok(Object::Reference(res_id)) => {
                let resources = doc.get_object(*res_id)?.as_dict()?.clone();
                return Ok((Some(*res_id), resources));
            }
            Ok(Object::Dictionary(resources)) => return Ok((None, resources.clone())),
            Ok(_) => return Err(PdfError::malformed("page resources are not a dictionary")),
            Err(_) => {}
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok((None, Dictionary::new()))
}
