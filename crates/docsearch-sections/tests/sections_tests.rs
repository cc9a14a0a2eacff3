use pretty_assertions::assert_eq;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Bookmark, Document, Object, Stream};
use tempfile::TempDir;

use docsearch_core::config::{SectionerSettings, SectionerStrategy};
use docsearch_core::error::Error;
use docsearch_sections::loader::{load_document, text_from_str};
use docsearch_sections::{
    build_sectioner, BookmarkSectioner, FormatSectioner, OutlineNode, Page, ParsedDocument, Sectioner,
    SimpleSectioner, Word,
};

fn manual_with_outline() -> ParsedDocument {
    ParsedDocument::new(
        "manual",
        vec![
            Page::from_text(1, "Cover page text"),
            Page::from_text(2, "1 Introduction\nThis manual covers pumps.\n2 Safety\nWear gloves."),
            Page::from_text(
                3,
                "Always isolate power.\nPower Isolation\nLock out the breaker.\n3 Maintenance\nService every year.",
            ),
        ],
    )
    .with_outline(vec![
        OutlineNode::new("Introduction", 2),
        OutlineNode::new("Safety", 2).with_children(vec![OutlineNode::new("Power Isolation", 3)]),
        OutlineNode::new("Maintenance", 3),
    ])
}

#[tokio::test]
async fn bookmark_sections_follow_outline() {
    let sections = BookmarkSectioner::default().extract(&manual_with_outline()).await.expect("sections");

    let paths: Vec<&str> = sections.iter().map(|s| s.full_path.as_str()).collect();
    assert_eq!(paths, vec!["Introduction", "Safety", "Safety > Power Isolation", "Maintenance"]);

    let intro = &sections[0];
    assert_eq!(intro.level, 1);
    assert!(intro.full_text().starts_with("This manual covers pumps."));
    assert!(!intro.full_text().contains("Cover page"));

    let safety = &sections[1];
    assert_eq!((safety.start_page, safety.end_page), (2, 3));
    assert!(safety.full_text().contains("Wear gloves."));
    assert!(safety.full_text().contains("Always isolate power."));
    assert!(!safety.full_text().contains("Lock out"));

    let isolation = &sections[2];
    assert_eq!(isolation.level, 2);
    assert_eq!(isolation.heading, "Power Isolation");
    assert!(isolation.full_text().starts_with("Lock out the breaker."));

    assert_eq!(sections[3].full_text(), "Service every year.");
}

#[tokio::test]
async fn bookmark_depth_limit_folds_children_into_parent() {
    let sectioner = BookmarkSectioner { max_depth: 1, ..Default::default() };
    let sections = sectioner.extract(&manual_with_outline()).await.expect("sections");
    assert_eq!(sections.len(), 3);
    assert!(sections[1].full_text().contains("Lock out the breaker."));
}

#[tokio::test]
async fn bookmark_skip_pages_drops_early_entries() {
    let sectioner = BookmarkSectioner { skip_pages: 2, ..Default::default() };
    let sections = sectioner.extract(&manual_with_outline()).await.expect("sections");
    let paths: Vec<&str> = sections.iter().map(|s| s.full_path.as_str()).collect();
    assert_eq!(paths, vec!["Safety > Power Isolation", "Maintenance"]);
}

#[tokio::test]
async fn bookmark_without_outline_is_unsupported() {
    let doc = ParsedDocument::new("plain", vec![Page::from_text(1, "text")]);
    let err = BookmarkSectioner::default().extract(&doc).await.expect_err("no outline");
    assert!(matches!(err, Error::ExtractionUnsupported { strategy: "bookmark", .. }));
}

#[tokio::test]
async fn bookmark_heading_found_across_line_noise() {
    let doc = ParsedDocument::new(
        "manual",
        vec![Page::from_text(1, "4.2 Pump\n17\nMaintenance Schedule\nCheck seals monthly.")],
    )
    .with_outline(vec![OutlineNode::new("Pump Maintenance Schedule", 1)]);
    let sections = BookmarkSectioner::default().extract(&doc).await.expect("sections");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].full_text(), "Check seals monthly.");
}

#[tokio::test]
async fn bookmark_heading_on_following_page() {
    let doc = ParsedDocument::new(
        "manual",
        vec![
            Page::from_text(1, "Preface text."),
            Page::from_text(2, "Blank filler."),
            Page::from_text(3, "Troubleshooting\nCheck the fuse."),
        ],
    )
    .with_outline(vec![OutlineNode::new("Troubleshooting", 1)]);
    let sections = BookmarkSectioner::default().extract(&doc).await.expect("sections");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].start_page, 3);
    assert_eq!(sections[0].full_text(), "Check the fuse.");
}

#[tokio::test]
async fn unlocated_bookmark_starts_at_its_page() {
    let doc = ParsedDocument::new(
        "manual",
        vec![Page::from_text(1, "Overview\nGeneral notes."), Page::from_text(2, "Tables follow here.")],
    )
    .with_outline(vec![OutlineNode::new("Overview", 1), OutlineNode::new("Appendix", 2)]);
    let sections = BookmarkSectioner::default().extract(&doc).await.expect("sections");
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].full_text(), "General notes.");
    assert_eq!(sections[1].heading, "Appendix");
    assert_eq!(sections[1].full_text(), "Tables follow here.");
}

fn line(text: &str, y: f32, size: f32) -> Vec<Word> {
    let mut x = 72.0;
    text.split_whitespace()
        .map(|t| {
            let w = Word::new(t, x, y, size);
            x += w.width + size * 0.3;
            w
        })
        .collect()
}

fn bold(words: Vec<Word>) -> Vec<Word> {
    words.into_iter().map(Word::bold).collect()
}

fn colored(words: Vec<Word>, color: &str) -> Vec<Word> {
    words.into_iter().map(|w| w.with_color(color)).collect()
}

fn styled_manual() -> ParsedDocument {
    let mut words = Vec::new();
    words.extend(line("Preface notes about this edition of the manual.", 20.0, 10.0));
    words.extend(line("Pump", 50.0, 20.0));
    words.extend(bold(line("Manual", 75.0, 20.0)));
    words.extend(line("This manual describes the pump and its many parts in detail.", 105.0, 10.0));
    words.extend(colored(line("Installation", 135.0, 14.0), "1F3864"));
    words.extend(line("Mount the pump on a level base.", 160.0, 10.0));
    words.extend(line("Use four bolts.", 172.0, 10.0));
    words.extend(bold(line("Wiring", 200.0, 10.0)));
    words.extend(line("Connect the red wire to the terminal.", 220.0, 10.0));
    words.extend(line("Operation", 250.0, 14.0));
    words.extend(line("Press start and wait for the light.", 275.0, 10.0));
    ParsedDocument::new("pump-guide", vec![Page::from_words(1, words)])
}

#[tokio::test]
async fn format_sections_follow_font_hierarchy() {
    let sections = FormatSectioner::default().extract(&styled_manual()).await.expect("sections");
    let paths: Vec<(&str, usize)> = sections.iter().map(|s| (s.full_path.as_str(), s.level)).collect();
    assert_eq!(
        paths,
        vec![
            ("pump-guide", 0),
            ("Pump Manual", 1),
            ("Pump Manual > Installation", 2),
            ("Pump Manual > Installation > Wiring", 3),
            ("Pump Manual > Operation", 2),
        ]
    );
    assert_eq!(sections[2].full_text(), "Mount the pump on a level base.\nUse four bolts.");
    assert_eq!(sections[4].full_text(), "Press start and wait for the light.");
}

#[tokio::test]
async fn format_heading_color_filters_headings() {
    let sectioner = FormatSectioner { heading_color: Some("#1f3864".into()), ..Default::default() };
    let sections = sectioner.extract(&styled_manual()).await.expect("sections");
    let headings: Vec<&str> = sections.iter().map(|s| s.heading.as_str()).collect();
    assert_eq!(headings, vec!["pump-guide", "Installation"]);
    assert!(sections[1].full_text().contains("Press start"));
}

#[tokio::test]
async fn format_heading_color_ignores_larger_sizes_in_other_colors() {
    let mut words = Vec::new();
    words.extend(line("Annual", 20.0, 30.0));
    words.extend(line("Service", 60.0, 28.0));
    words.extend(line("Report", 100.0, 26.0));
    words.extend(line("Body text before any heading in this report.", 140.0, 10.0));
    words.extend(colored(line("Scope", 170.0, 14.0), "0000ff"));
    words.extend(line("Covers the pumps and their seals in full.", 195.0, 10.0));
    let doc = ParsedDocument::new("m", vec![Page::from_words(1, words)]);

    let sectioner = FormatSectioner { heading_color: Some("0000FF".into()), ..Default::default() };
    let sections = sectioner.extract(&doc).await.expect("sections");
    let paths: Vec<(&str, usize)> = sections.iter().map(|s| (s.full_path.as_str(), s.level)).collect();
    assert_eq!(paths, vec![("m", 0), ("Scope", 1)]);
    assert_eq!(sections[1].full_text(), "Covers the pumps and their seals in full.");
}

#[tokio::test]
async fn format_size_ceiling_skips_banner_sizes() {
    let sectioner = FormatSectioner { max_heading_size: Some(16.0), ..Default::default() };
    let sections = sectioner.extract(&styled_manual()).await.expect("sections");
    assert!(sections.iter().all(|s| s.heading != "Pump Manual"));
    assert!(sections.iter().any(|s| s.full_path == "Installation"));
}

#[tokio::test]
async fn format_without_words_is_unsupported() {
    let doc = ParsedDocument::new("plain", vec![Page::from_text(1, "text only")]);
    let err = FormatSectioner::default().extract(&doc).await.expect_err("no words");
    assert!(matches!(err, Error::ExtractionUnsupported { strategy: "format", .. }));
}

#[tokio::test]
async fn simple_section_spans_remaining_pages() {
    let doc = ParsedDocument::new(
        "notes",
        vec![Page::from_text(1, "toc"), Page::from_text(2, "first"), Page::from_text(3, "second")],
    );
    let sections = SimpleSectioner { skip_pages: 1 }.extract(&doc).await.expect("sections");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].heading, "notes");
    assert_eq!((sections[0].start_page, sections[0].end_page), (2, 3));
    assert_eq!(sections[0].full_text(), "first\n\nsecond");

    let empty = ParsedDocument::new("empty", vec![Page::from_text(1, "  ")]);
    assert!(SimpleSectioner::default().extract(&empty).await.expect("empty").is_empty());
}

#[tokio::test]
async fn configured_strategy_is_selected() {
    for (strategy, name) in [
        (SectionerStrategy::Bookmark, "bookmark"),
        (SectionerStrategy::Format, "format"),
        (SectionerStrategy::Simple, "simple"),
    ] {
        let settings = SectionerSettings { strategy, ..Default::default() };
        assert_eq!(build_sectioner(&settings).strategy(), name);
    }
}

#[test]
fn text_loader_splits_form_feeds() {
    let doc = text_from_str("notes", "page one\u{c}page two");
    assert_eq!(doc.pages.len(), 2);
    assert_eq!(doc.pages[1].number, 2);
    assert_eq!(doc.pages[1].assembled_text(), "page two");
}

#[test]
fn json_loader_reads_parsed_documents() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("layout.json");
    let original = manual_with_outline();
    std::fs::write(&path, serde_json::to_vec(&original).expect("json")).expect("write");

    let loaded = load_document(&path).expect("load");
    assert_eq!(loaded, original);

    let bad = tmp.path().join("image.png");
    std::fs::write(&bad, b"png").expect("write");
    assert!(matches!(load_document(&bad), Err(Error::ExtractionUnsupported { .. })));
}

/// Two-page PDF with a nested bookmark outline.
fn pdf_with_bookmarks() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let page_lines: [&[&str]; 2] = [
        &["Scope", "This guide covers the pump."],
        &["Maintenance", "Check the seals weekly.", "Filters", "Rinse the mesh monthly."],
    ];
    let mut page_ids = Vec::new();
    for lines in page_lines {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 750.into()]),
        ];
        for (i, text) in lines.iter().enumerate() {
            if i > 0 {
                operations.push(Operation::new("Td", vec![0.into(), (-20).into()]));
            }
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
        }
        operations.push(Operation::new("ET", vec![]));
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().expect("content")));
        page_ids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        }));
    }
    let kids: Vec<Object> = page_ids.iter().map(|&id| id.into()).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => 2,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.add_bookmark(Bookmark::new("Scope".into(), [0.0; 3], 0, page_ids[0]), None);
    let maintenance = doc.add_bookmark(Bookmark::new("Maintenance".into(), [0.0; 3], 0, page_ids[1]), None);
    doc.add_bookmark(Bookmark::new("Filters".into(), [0.0; 3], 0, page_ids[1]), Some(maintenance));
    let outline_id = doc.build_outline().expect("outline");
    if let Ok(Object::Dictionary(catalog)) = doc.get_object_mut(catalog_id) {
        catalog.set("Outlines", outline_id);
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf");
    bytes
}

#[tokio::test]
async fn pdf_bookmarks_section_with_default_settings() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("pump.pdf");
    std::fs::write(&path, pdf_with_bookmarks()).expect("write");

    let doc = load_document(&path).expect("load");
    assert_eq!(doc.name, "pump");
    assert_eq!(doc.pages.len(), 2);
    assert_eq!(
        doc.outline,
        vec![
            OutlineNode::new("Scope", 1),
            OutlineNode::new("Maintenance", 2).with_children(vec![OutlineNode::new("Filters", 2)]),
        ]
    );

    let sections = build_sectioner(&SectionerSettings::default()).extract(&doc).await.expect("sections");
    let paths: Vec<&str> = sections.iter().map(|s| s.full_path.as_str()).collect();
    assert_eq!(paths, vec!["Scope", "Maintenance", "Maintenance > Filters"]);
    assert!(sections[0].full_text().contains("This guide covers the pump."));
    assert!(sections[1].full_text().contains("Check the seals weekly."));
    assert!(!sections[1].full_text().contains("Rinse"));
    assert!(sections[2].full_text().contains("Rinse the mesh monthly."));
}
