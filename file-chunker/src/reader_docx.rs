//! DOCX reader: walks `word/document.xml` and emits one `UnifiedBlock` per paragraph,
//! tagging headings by their `w:pStyle` value (`HeadingN` -> level N) and tables as
//! TSV-wrapped blocks, mirroring the PPTX reader's table convention.

use crate::unified_blocks::{BlockKind, UnifiedBlock};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;

fn local_name(q: &[u8]) -> &[u8] {
    match q.iter().position(|&b| b == b':') {
        Some(i) => &q[i + 1..],
        None => q,
    }
}

fn attr_val(e: &BytesStart<'_>, key_local: &[u8]) -> Option<String> {
    for a in e.attributes().with_checks(false).flatten() {
        if local_name(a.key.as_ref()) == key_local {
            return Some(String::from_utf8_lossy(&a.value).into_owned());
        }
    }
    None
}

fn heading_level_from_style(style: &str) -> Option<u32> {
    let lower = style.to_ascii_lowercase();
    let digits: String = lower.chars().skip_while(|c| !c.is_ascii_digit()).collect();
    if lower.starts_with("heading") && !digits.is_empty() {
        digits.parse().ok()
    } else if lower == "title" {
        Some(1)
    } else {
        None
    }
}

pub fn read_docx_to_blocks(path: &str) -> Vec<UnifiedBlock> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => {
            return vec![UnifiedBlock::new(
                BlockKind::Paragraph,
                "(error) failed to open DOCX",
                0,
                path,
                "docx",
            )]
        }
    };
    let mut zip = match zip::ZipArchive::new(file) {
        Ok(z) => z,
        Err(_) => {
            return vec![UnifiedBlock::new(
                BlockKind::Paragraph,
                "(error) not a valid .docx (zip) file",
                0,
                path,
                "docx",
            )]
        }
    };

    let mut xml = String::new();
    match zip.by_name("word/document.xml") {
        Ok(mut f) => {
            let _ = f.read_to_string(&mut xml);
        }
        Err(_) => {
            return vec![UnifiedBlock::new(
                BlockKind::Paragraph,
                "(error) missing word/document.xml",
                0,
                path,
                "docx",
            )]
        }
    }

    let mut reader = Reader::from_str(&xml);
    reader.trim_text(false);
    let mut buf = Vec::new();

    let mut blocks: Vec<UnifiedBlock> = Vec::new();
    let mut order = 0u32;

    let mut in_p = false;
    let mut in_t = false;
    let mut para_style: Option<String> = None;
    let mut para_text = String::new();
    let mut numbering_present = false;

    let mut in_tbl = false;
    let mut in_tr = false;
    let mut in_tc = false;
    let mut cell_text = String::new();
    let mut row_cells: Vec<String> = Vec::new();
    let mut table_text = String::new();
    let mut hyperlink_targets: Vec<String> = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                match local_name(e.name().as_ref()) {
                    b"p" => {
                        in_p = true;
                        para_text.clear();
                        para_style = None;
                        numbering_present = false;
                    }
                    b"pStyle" => {
                        if in_p {
                            para_style = attr_val(&e, b"val");
                        }
                    }
                    b"numPr" => {
                        if in_p {
                            numbering_present = true;
                        }
                    }
                    b"t" => {
                        in_t = true;
                    }
                    b"tbl" => {
                        in_tbl = true;
                        table_text.clear();
                    }
                    b"tr" => {
                        if in_tbl {
                            in_tr = true;
                            row_cells.clear();
                        }
                    }
                    b"tc" => {
                        if in_tr {
                            in_tc = true;
                            cell_text.clear();
                        }
                    }
                    b"hyperlink" => {
                        if let Some(id) = attr_val(&e, b"id") {
                            hyperlink_targets.push(id);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"t" => in_t = false,
                b"p" => {
                    if in_p {
                        in_p = false;
                        let text = para_text.trim().to_string();
                        if !text.is_empty() {
                            let level = para_style.as_deref().and_then(heading_level_from_style);
                            let mut block = if let Some(level) = level {
                                let mut b =
                                    UnifiedBlock::new(BlockKind::Heading, text, order, path, "docx");
                                b.heading_level = Some(level);
                                b
                            } else if numbering_present {
                                UnifiedBlock::new(BlockKind::ListItem, text, order, path, "docx")
                            } else {
                                UnifiedBlock::new(BlockKind::Paragraph, text, order, path, "docx")
                            };
                            if !hyperlink_targets.is_empty() {
                                block
                                    .attrs
                                    .insert("hyperlinks".to_string(), hyperlink_targets.join(","));
                            }
                            blocks.push(block);
                            order += 1;
                        }
                        hyperlink_targets.clear();
                    }
                }
                b"tc" => {
                    if in_tc {
                        in_tc = false;
                        row_cells.push(cell_text.trim().replace('\n', " "));
                        cell_text.clear();
                    }
                }
                b"tr" => {
                    if in_tr {
                        in_tr = false;
                        table_text.push_str(&row_cells.join("\t"));
                        table_text.push('\n');
                        row_cells.clear();
                    }
                }
                b"tbl" => {
                    if in_tbl {
                        in_tbl = false;
                        let content = table_text.trim_end_matches('\n');
                        if !content.is_empty() {
                            let wrapped =
                                format!("<table delim=\"tsv\" cell-nl=\" \">\n{}\n</table>\n", content);
                            let mut b =
                                UnifiedBlock::new(BlockKind::Paragraph, wrapped, order, path, "docx");
                            b.attrs.insert("is_table".to_string(), "true".to_string());
                            blocks.push(b);
                            order += 1;
                        }
                        table_text.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if in_t {
                    if let Ok(cow) = t.unescape() {
                        if in_tc {
                            cell_text.push_str(&cow);
                        } else {
                            para_text.push_str(&cow);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }

    if blocks.is_empty() {
        blocks.push(UnifiedBlock::new(
            BlockKind::Paragraph,
            String::new(),
            0,
            path,
            "docx",
        ));
    }
    blocks
}
