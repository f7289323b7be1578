// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! The merge engine.
//!
//! Concatenates a set of pipelines into one document, then resolves
//! global replacements and system tags against the merged page sequence,
//! so a tag appearing in several source documents is treated uniformly
//! and page-number tags see the final numbering.

use std::collections::{HashMap, HashSet};

use tracing::{info, instrument};

use satzwerk_core::config::AssemblyOptions;
use satzwerk_core::content::{ReplaceableContent, SystemTag, TextContent};
use satzwerk_core::error::{Result, SatzwerkError};
use satzwerk_core::result::OpResult;
use satzwerk_core::style::TextStyle;
use satzwerk_core::types::PlacementStrategy;
use satzwerk_document::merge::concat;
use satzwerk_document::PdfBuffer;

use crate::pipeline::{apply_replacement_with, PdfInput};

/// One tag replaced across the whole merged document.
#[derive(Debug, Clone)]
pub struct GlobalReplacement {
    pub tag: String,
    pub content: ReplaceableContent,
    pub strategy: PlacementStrategy,
}

/// What to resolve after concatenation.
#[derive(Debug, Clone, Default)]
pub struct MergeSpec {
    pub global_replacements: Vec<GlobalReplacement>,
    pub system_tags: Vec<SystemTag>,
    /// Named parent styles, resolved the same way the pipeline does.
    pub styles: HashMap<String, TextStyle>,
    pub options: AssemblyOptions,
}

/// The merge output: final bytes, page count, and where each source
/// document's pages start (1-indexed, in merge order).
#[derive(Debug, Clone)]
pub struct MergedDocument {
    pub bytes: Vec<u8>,
    pub page_count: u32,
    pub page_starts: Vec<u32>,
}

impl MergedDocument {
    /// Continue working on the merged output as a fresh pipeline.
    pub fn into_input(self) -> PdfInput {
        PdfInput::from_bytes(self.bytes)
    }
}

pub struct MergeEngine;

impl MergeEngine {
    /// Merges the inputs in ascending `index` order.
    ///
    /// An empty input list or a duplicate index is a `MissingData`
    /// failure. Absent global or system tags are tolerated; any renderer
    /// failure aborts the whole merge with no partial output.
    #[instrument(skip_all, fields(inputs = inputs.len()))]
    pub fn merge(inputs: Vec<(u32, PdfInput)>, spec: &MergeSpec) -> OpResult<MergedDocument> {
        Self::merge_inner(inputs, spec).into()
    }

    fn merge_inner(
        mut inputs: Vec<(u32, PdfInput)>,
        spec: &MergeSpec,
    ) -> Result<MergedDocument> {
        if inputs.is_empty() {
            return Err(SatzwerkError::MissingData("no documents to merge".into()));
        }
        let mut seen = HashSet::new();
        for (index, _) in &inputs {
            if !seen.insert(*index) {
                return Err(SatzwerkError::MissingData(format!(
                    "duplicate merge index {index}"
                )));
            }
        }
        inputs.sort_by_key(|(index, _)| *index);

        let documents = inputs
            .iter()
            .map(|(_, input)| {
                PdfBuffer::from_bytes(input.current_bytes()).map(PdfBuffer::into_document)
            })
            .collect::<Result<Vec<_>>>()?;
        let (merged, page_starts) = concat(documents)?;
        let mut buffer = PdfBuffer::from_document(merged);
        let total = buffer.page_count();

        for replacement in &spec.global_replacements {
            apply_replacement_with(
                &mut buffer,
                &replacement.tag,
                replacement.strategy,
                spec.options.margin_width,
                &spec.styles,
                |_| replacement.content.clone(),
            )?;
        }
        for system_tag in &spec.system_tags {
            apply_replacement_with(
                &mut buffer,
                &system_tag.tag,
                PlacementStrategy::Exact,
                spec.options.margin_width,
                &spec.styles,
                |page| {
                    let mut text = TextContent::new(system_tag.kind.value(page, total));
                    text.style = system_tag.style.clone();
                    ReplaceableContent::Text(text)
                },
            )?;
        }

        let page_count = buffer.page_count();
        let bytes = buffer.to_bytes()?;
        info!(page_count, "merge complete");
        Ok(MergedDocument {
            bytes,
            page_count,
            page_starts,
        })
    }
}

// --- Tests -------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use satzwerk_core::content::SystemTagKind;
    use satzwerk_core::style::FontStyle;
    use satzwerk_core::ErrorKind;
    use satzwerk_document::document::single_page_pdf;
    use satzwerk_document::text::TextInterpreter;

    fn input(content: &str) -> PdfInput {
        PdfInput::from_bytes(single_page_pdf(content))
    }

    fn page_text(bytes: &[u8], page: u32) -> String {
        let buffer = PdfBuffer::from_bytes(bytes).expect("merged output loads");
        let page_id = buffer.page_id(page).expect("page exists");
        TextInterpreter::interpret(buffer.document(), page_id)
            .expect("interprets")
            .extracted_text()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn system_tag(tag: &str, kind: SystemTagKind) -> SystemTag {
        SystemTag {
            tag: tag.into(),
            kind,
            style: Default::default(),
        }
    }

    #[test]
    fn empty_input_list_is_missing_data() {
        let result = MergeEngine::merge(Vec::new(), &MergeSpec::default());
        assert!(!result.is_success());
        assert_eq!(result.errors()[0].kind, ErrorKind::MissingData);
    }

    #[test]
    fn duplicate_indices_are_rejected() {
        let inputs = vec![(1, input("BT ET")), (1, input("BT ET"))];
        let result = MergeEngine::merge(inputs, &MergeSpec::default());
        assert!(!result.is_success());
        assert!(result.errors()[0].message.contains("duplicate"));
    }

    #[test]
    fn pages_follow_the_index_order_not_the_list_order() {
        let inputs = vec![
            (2, input("BT /F1 12 Tf 72 700 Td (second) Tj ET")),
            (1, input("BT /F1 12 Tf 72 700 Td (first) Tj ET")),
        ];
        let merged = MergeEngine::merge(inputs, &MergeSpec::default())
            .into_value()
            .expect("merge succeeds");
        assert_eq!(merged.page_count, 2);
        assert_eq!(merged.page_starts, vec![1, 2]);
        assert!(page_text(&merged.bytes, 1).contains("first"));
        assert!(page_text(&merged.bytes, 2).contains("second"));
    }

    #[test]
    fn system_tags_see_the_final_page_numbering() {
        let inputs = vec![
            (1, input("BT /F1 12 Tf 72 60 Td (Page #N# of #TOTAL#) Tj ET")),
            (2, input("BT /F1 12 Tf 72 60 Td (Page #N# of #TOTAL#) Tj ET")),
            (3, input("BT /F1 12 Tf 72 60 Td (Page #N# of #TOTAL#) Tj ET")),
        ];
        let spec = MergeSpec {
            system_tags: vec![
                system_tag("#N#", SystemTagKind::PageNumber),
                system_tag("#TOTAL#", SystemTagKind::PageCount),
            ],
            ..MergeSpec::default()
        };
        let merged = MergeEngine::merge(inputs, &spec)
            .into_value()
            .expect("merge succeeds");
        assert!(page_text(&merged.bytes, 1).contains("Page 1 of 3"));
        assert!(page_text(&merged.bytes, 2).contains("Page 2 of 3"));
        assert!(page_text(&merged.bytes, 3).contains("Page 3 of 3"));
    }

    #[test]
    fn global_replacement_applies_uniformly_across_sources() {
        let inputs = vec![
            (1, input("BT /F1 12 Tf 72 700 Td (a #CLIENT# x) Tj ET")),
            (2, input("BT /F1 12 Tf 72 700 Td (b #CLIENT# y) Tj ET")),
        ];
        let spec = MergeSpec {
            global_replacements: vec![GlobalReplacement {
                tag: "#CLIENT#".into(),
                content: ReplaceableContent::Text(TextContent::new("Acme")),
                strategy: PlacementStrategy::Exact,
            }],
            ..MergeSpec::default()
        };
        let merged = MergeEngine::merge(inputs, &spec)
            .into_value()
            .expect("merge succeeds");
        for page in 1..=2 {
            let text = page_text(&merged.bytes, page);
            assert!(text.contains("Acme"), "page {page}: {text:?}");
            assert!(!text.contains("#CLIENT#"), "page {page}: {text:?}");
        }
    }

    #[test]
    fn spec_styles_resolve_replacement_parents() {
        let inputs = vec![(1, input("BT /F1 12 Tf 72 700 Td (to #WHO#) Tj ET"))];
        let mut content = TextContent::new("you");
        content.style.parent = Some("mono".into());
        let spec = MergeSpec {
            global_replacements: vec![GlobalReplacement {
                tag: "#WHO#".into(),
                content: ReplaceableContent::Text(content),
                strategy: PlacementStrategy::Exact,
            }],
            styles: HashMap::from([(
                "mono".to_string(),
                TextStyle {
                    font: Some(FontStyle {
                        name: "Courier".into(),
                        size: 10.0,
                        ..FontStyle::default()
                    }),
                    ..TextStyle::default()
                },
            )]),
            ..MergeSpec::default()
        };
        let merged = MergeEngine::merge(inputs, &spec)
            .into_value()
            .expect("merge succeeds");
        assert!(page_text(&merged.bytes, 1).contains("you"));
        assert!(merged.bytes.windows(7).any(|window| window == b"Courier"));
    }

    #[test]
    fn absent_tags_are_tolerated() {
        let inputs = vec![(1, input("BT /F1 12 Tf 72 700 Td (plain) Tj ET"))];
        let spec = MergeSpec {
            global_replacements: vec![GlobalReplacement {
                tag: "#NOWHERE#".into(),
                content: ReplaceableContent::Text(TextContent::new("unused")),
                strategy: PlacementStrategy::Exact,
            }],
            system_tags: vec![system_tag("#ALSO-NOWHERE#", SystemTagKind::PageOfTotal)],
            ..MergeSpec::default()
        };
        let result = MergeEngine::merge(inputs, &spec);
        assert!(result.is_success(), "errors: {:?}", result.errors());
        assert_eq!(result.into_value().map(|m| m.page_count), Some(1));
    }

    #[test]
    fn renderer_failure_aborts_the_merge() {
        let inputs = vec![(1, input("BT /F1 12 Tf 72 700 Td (has #TAG#) Tj ET"))];
        let spec = MergeSpec {
            global_replacements: vec![GlobalReplacement {
                tag: "#TAG#".into(),
                // Blank text fails content validation.
                content: ReplaceableContent::Text(TextContent::new(" ")),
                strategy: PlacementStrategy::Exact,
            }],
            ..MergeSpec::default()
        };
        let result = MergeEngine::merge(inputs, &spec);
        assert!(!result.is_success());
        assert_eq!(result.errors()[0].kind, ErrorKind::MissingData);
    }

    #[test]
    fn merged_output_continues_as_a_pipeline() {
        let inputs = vec![(1, input("BT /F1 12 Tf 72 700 Td (body) Tj ET"))];
        let merged = MergeEngine::merge(inputs, &MergeSpec::default())
            .into_value()
            .expect("merge succeeds");
        let mut next = merged.into_input();
        assert!(next.set_title("Merged").is_success());
        assert_eq!(next.page_count().into_value(), Some(1));
    }
}
