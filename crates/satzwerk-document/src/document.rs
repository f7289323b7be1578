// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF buffer — open, inspect, and serialise a PDF document held in memory
// using the `lopdf` crate. All page-level operations elsewhere in the crate
// go through this wrapper.

use std::path::Path;

use chrono::Utc;
use lopdf::{Dictionary, Document, Object, ObjectId};
use satzwerk_core::error::SatzwerkError;
use satzwerk_core::types::{PageMargins, Rect};
use tracing::{debug, info, instrument};

/// An in-memory PDF document.
///
/// Wraps `lopdf::Document` and provides the inspection and metadata
/// operations the assembly layer needs: ordered page lookup, inherited
/// media-box resolution, and document-information updates.
pub struct PdfBuffer {
    /// The underlying lopdf document.
    document: Document,
}

impl PdfBuffer {
    // -- Construction ---------------------------------------------------------

    /// Load a PDF from raw bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, SatzwerkError> {
        let document = Document::load_mem(data)
            .map_err(|err| SatzwerkError::Pdf(format!("failed to load PDF from memory: {err}")))?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self { document })
    }

    /// Load a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SatzwerkError> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            SatzwerkError::Pdf(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self { document })
    }

    /// Wrap an already-parsed document.
    pub fn from_document(document: Document) -> Self {
        Self { document }
    }

    // -- Serialisation --------------------------------------------------------

    /// Serialise the current document state to bytes.
    #[instrument(skip_all)]
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, SatzwerkError> {
        let mut output = Vec::new();
        self.document
            .save_to(&mut output)
            .map_err(|err| SatzwerkError::Pdf(format!("failed to serialise PDF: {err}")))?;
        debug!(output_bytes = output.len(), "PDF serialised");
        Ok(output)
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Page object IDs in page order (index 0 is page 1).
    pub fn page_ids(&self) -> Vec<ObjectId> {
        // lopdf keys pages by 1-indexed page number in a BTreeMap, so the
        // value iteration order is page order.
        self.document.get_pages().values().copied().collect()
    }

    /// Resolve a 1-indexed page number to its object ID.
    pub fn page_id(&self, page: u32) -> Result<ObjectId, SatzwerkError> {
        let pages = self.document.get_pages();
        pages
            .get(&page)
            .copied()
            .ok_or(SatzwerkError::PageOutOfRange {
                page,
                total: pages.len() as u32,
            })
    }

    /// The page's media box, following the /Parent chain for inherited
    /// values. Falls back to US Letter when no ancestor declares one.
    pub fn media_box(&self, page_id: ObjectId) -> Result<Rect, SatzwerkError> {
        let mut current = page_id;
        // Bounded walk up the page tree; well-formed trees are shallow.
        for _ in 0..32 {
            let dict = self
                .document
                .get_object(current)
                .and_then(Object::as_dict)
                .map_err(|err| {
                    SatzwerkError::Pdf(format!("cannot read page object {current:?}: {err}"))
                })?;

            if let Ok(media_box) = dict.get(b"MediaBox") {
                let resolved = self.resolve(media_box);
                return rect_from_array(resolved).ok_or_else(|| {
                    SatzwerkError::Pdf(format!("malformed /MediaBox on object {current:?}"))
                });
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current = *parent_id,
                _ => break,
            }
        }
        Ok(Rect::new(0.0, 0.0, 612.0, 792.0))
    }

    /// Synthetic page margins derived from the media box.
    pub fn page_margins(
        &self,
        page_id: ObjectId,
        margin_width: f64,
    ) -> Result<PageMargins, SatzwerkError> {
        Ok(PageMargins::from_page_box(
            self.media_box(page_id)?,
            margin_width,
        ))
    }

    // -- Metadata -------------------------------------------------------------

    /// Read a string entry from the document information dictionary.
    pub fn info_entry(&self, key: &str) -> Option<String> {
        let info_ref = self.document.trailer.get(b"Info").ok()?;
        let info = self.resolve(info_ref).as_dict().ok()?;
        match info.get(key.as_bytes()).ok()? {
            Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }

    /// Set a string entry in the document information dictionary, creating
    /// the dictionary if the document has none.
    #[instrument(skip(self, value), fields(key))]
    pub fn set_info_entry(&mut self, key: &str, value: &str) -> Result<(), SatzwerkError> {
        let info_id = self.ensure_info_dict()?;
        if let Ok(Object::Dictionary(info)) = self.document.get_object_mut(info_id) {
            info.set(
                key.as_bytes().to_vec(),
                Object::string_literal(value.as_bytes().to_vec()),
            );
        }
        debug!(key, "Info entry updated");
        Ok(())
    }

    /// Stamp /ModDate in the info dictionary with the current time, in the
    /// PDF date format `D:YYYYMMDDHHmmSS`.
    pub fn touch_mod_date(&mut self) -> Result<(), SatzwerkError> {
        let stamp = format!("D:{}", Utc::now().format("%Y%m%d%H%M%S"));
        self.set_info_entry("ModDate", &stamp)
    }

    // -- Access ---------------------------------------------------------------

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Follow a reference to its target object; non-references pass through.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self
                .document
                .get_object(*id)
                .unwrap_or(&Object::Null),
            other => other,
        }
    }

    // -- Helpers --------------------------------------------------------------

    /// Return the object ID of the /Info dictionary, creating an empty one
    /// and wiring it into the trailer when absent.
    fn ensure_info_dict(&mut self) -> Result<ObjectId, SatzwerkError> {
        if let Ok(Object::Reference(id)) = self.document.trailer.get(b"Info") {
            return Ok(*id);
        }
        let info_id = self.document.add_object(Object::Dictionary(Dictionary::new()));
        self.document.trailer.set("Info", Object::Reference(info_id));
        Ok(info_id)
    }
}

/// Interpret a 4-number PDF rectangle array as a normalised [`Rect`].
fn rect_from_array(object: &Object) -> Option<Rect> {
    let array = object.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let mut nums = [0.0f64; 4];
    for (slot, item) in nums.iter_mut().zip(array) {
        *slot = object_to_f64(item)?;
    }
    Some(Rect::new(nums[0], nums[1], nums[2], nums[3]))
}

/// Convert a lopdf numeric object (Integer or Real) to f64.
pub(crate) fn object_to_f64(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        _ => None,
    }
}

/// Build a minimal one-page PDF with the given content-stream text ops.
///
/// A test fixture shared by this crate's and the assembly crate's tests;
/// not part of the supported API.
#[doc(hidden)]
pub fn single_page_pdf(content: &str) -> Vec<u8> {
    use lopdf::dictionary;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content_id = doc.add_object(lopdf::Stream::new(
        dictionary! {},
        content.as_bytes().to_vec(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialise fixture");
    bytes
}
