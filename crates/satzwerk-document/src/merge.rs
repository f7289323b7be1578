// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document concatenation — renumber each source document into a shared ID
// space, carry every non-structural object across, and build a fresh page
// tree and catalog over the combined pages.

use lopdf::{Dictionary, Document, Object, ObjectId};
use satzwerk_core::error::SatzwerkError;
use tracing::{debug, info, instrument};

/// Concatenate documents in order into a single document.
///
/// Returns the merged document together with the 1-indexed page number at
/// which each source document starts, in source order.
#[instrument(skip_all, fields(documents = documents.len()))]
pub fn concat(documents: Vec<Document>) -> Result<(Document, Vec<u32>), SatzwerkError> {
    if documents.is_empty() {
        return Err(SatzwerkError::MissingData(
            "no documents to merge".to_string(),
        ));
    }

    let mut max_id: u32 = 1;
    // Page objects in final page order, and everything else they reference.
    let mut merged_pages: Vec<(ObjectId, Object)> = Vec::new();
    let mut carried_objects: Vec<(ObjectId, Object)> = Vec::new();
    let mut page_starts: Vec<u32> = Vec::with_capacity(documents.len());

    for (index, mut doc) in documents.into_iter().enumerate() {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        page_starts.push(merged_pages.len() as u32 + 1);

        let source_pages = doc.get_pages();
        if source_pages.is_empty() {
            return Err(SatzwerkError::Pdf(format!(
                "document #{} has no pages",
                index + 1
            )));
        }
        for page_id in source_pages.values() {
            let page = doc.get_object(*page_id).map_err(|err| {
                SatzwerkError::Pdf(format!(
                    "cannot read page object {page_id:?} in document #{}: {err}",
                    index + 1
                ))
            })?;
            let mut page = page.clone();
            materialize_inherited(&doc, *page_id, &mut page);
            merged_pages.push((*page_id, page));
        }

        // Structural objects are rebuilt below; everything else carries over.
        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => carried_objects.push((object_id, object)),
            }
        }
    }

    let mut document = Document::with_version("1.5");
    for (object_id, object) in carried_objects {
        document.objects.insert(object_id, object);
    }
    // Every id below the renumbering counter is taken by a source object;
    // fresh ids must start above them.
    document.max_id = max_id - 1;

    let pages_id = document.new_object_id();
    let kids: Vec<Object> = merged_pages
        .iter()
        .map(|(id, _)| Object::Reference(*id))
        .collect();
    let total_pages = merged_pages.len() as u32;

    for (object_id, object) in merged_pages {
        if let Object::Dictionary(dict) = object {
            let mut page_dict = dict;
            page_dict.set("Parent", Object::Reference(pages_id));
            document
                .objects
                .insert(object_id, Object::Dictionary(page_dict));
        }
    }

    let pages_dict = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(i64::from(total_pages))),
    ]);
    document
        .objects
        .insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = document.new_object_id();
    let catalog_dict = Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    document
        .objects
        .insert(catalog_id, Object::Dictionary(catalog_dict));
    document.trailer.set("Root", Object::Reference(catalog_id));

    document.max_id = document.objects.len() as u32;
    document.renumber_objects();
    document.compress();

    info!(total_pages, "Documents concatenated");
    debug!(?page_starts, "Per-source page offsets");
    Ok((document, page_starts))
}

/// Copy attributes a page may inherit from its old page tree onto the page
/// dictionary itself. The rebuilt tree has no ancestors to inherit from.
fn materialize_inherited(doc: &Document, page_id: ObjectId, page: &mut Object) {
    const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];
    let Object::Dictionary(page_dict) = page else {
        return;
    };
    for key in INHERITABLE {
        if page_dict.get(key).is_ok() {
            continue;
        }
        if let Some(value) = crate::text::resolve_inherited(doc, page_id, key) {
            page_dict.set(key.to_vec(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::single_page_pdf;
    use crate::document::PdfBuffer;
    use crate::text::TextInterpreter;

    fn load(content: &str) -> Document {
        Document::load_mem(&single_page_pdf(content)).expect("load fixture")
    }

    #[test]
    fn concat_preserves_source_order_and_offsets() {
        let docs = vec![
            load("BT /F1 12 Tf 72 700 Td (first) Tj ET"),
            load("BT /F1 12 Tf 72 700 Td (second) Tj ET"),
            load("BT /F1 12 Tf 72 700 Td (third) Tj ET"),
        ];
        let (merged, starts) = concat(docs).expect("concat");
        assert_eq!(starts, vec![1, 2, 3]);

        let buffer = PdfBuffer::from_document(merged);
        assert_eq!(buffer.page_count(), 3);

        let expected = ["first", "second", "third"];
        for (page, expected_text) in (1..=3).zip(expected) {
            let page_id = buffer.page_id(page).expect("page id");
            let text = TextInterpreter::interpret(buffer.document(), page_id)
                .expect("interpret")
                .extracted_text();
            assert_eq!(text, expected_text);
        }
    }

    #[test]
    fn low_numbered_content_streams_survive_the_rebuilt_tree() {
        use lopdf::dictionary;

        // Content stream added first so it takes object id 1, the id a
        // zeroed allocator would hand the rebuilt Pages node.
        let mut doc = Document::with_version("1.5");
        let content_id = doc.add_object(lopdf::Stream::new(
            dictionary! {},
            b"BT /F1 12 Tf 72 700 Td (survive) Tj ET".to_vec(),
        ));
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let (merged, _) = concat(vec![doc]).expect("concat");
        let buffer = PdfBuffer::from_document(merged);
        let page_id = buffer.page_id(1).expect("page id");
        let text = TextInterpreter::interpret(buffer.document(), page_id)
            .expect("interpret")
            .extracted_text();
        assert_eq!(text, "survive");
    }

    #[test]
    fn concat_rejects_empty_input() {
        assert!(matches!(
            concat(Vec::new()),
            Err(SatzwerkError::MissingData(_))
        ));
    }

    #[test]
    fn merged_pages_keep_their_media_box() {
        let docs = vec![load("BT ET"), load("BT ET")];
        let (merged, _) = concat(docs).expect("concat");
        let buffer = PdfBuffer::from_document(merged);
        for page in 1..=2 {
            let page_id = buffer.page_id(page).expect("page id");
            let media_box = buffer.media_box(page_id).expect("media box");
            assert_eq!(media_box.width(), 595.0);
            assert_eq!(media_box.height(), 842.0);
        }
    }
}
