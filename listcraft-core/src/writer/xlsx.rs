//! Copy-on-write XLSX writer
//!
//! The output file is the input archive, member by member. Every member is
//! copied through untouched except the first worksheet, which is rewritten
//! event-by-event: cells named by the patch journal are replaced (keeping
//! their style index), cells that did not exist yet are emitted at the end
//! of their row, and appended rows go in just before `</sheetData>`.
//! Formula cells are never in the journal, so their XML passes through
//! byte-for-byte.

use anyhow::{Context, Result};
use quick_xml::events::{BytesEnd, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write as IoWrite};
use std::path::Path;
use zip::{ZipArchive, ZipWriter, write::FileOptions};

use crate::cellref::{format_cell_ref, parse_cell_ref};
use crate::record::{CellValue, PriceList};

/// Write the reconciled list as a patched copy of the original workbook
pub fn write_price_list(input: &Path, output: &Path, list: &PriceList) -> Result<()> {
    let file = File::open(input)
        .with_context(|| format!("Failed to open original workbook: {}", input.display()))?;
    let reader = BufReader::new(file);
    let mut archive = ZipArchive::new(reader).context("Failed to open zip archive")?;

    let sheet_part = first_sheet_part(&mut archive)?;

    // Patch journal keyed by absolute sheet coordinates
    let (origin_row, origin_col) = list.origin();
    let mut patches: HashMap<u32, BTreeMap<u32, CellValue>> = HashMap::new();
    for patch in list.patches() {
        patches
            .entry(origin_row + 1 + patch.row as u32)
            .or_default()
            .insert(origin_col + patch.col as u32, patch.value.clone());
    }

    let appended = appended_rows_xml(list);
    // Last absolute data row after appending, for the dimension element
    let new_last_row = if list.appended().is_empty() {
        None
    } else {
        Some(origin_row + list.len() as u32)
    };

    let output_file = File::create(output)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;
    let mut zip_writer = ZipWriter::new(output_file);

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();

        if name == sheet_part {
            let mut content = String::new();
            file.read_to_string(&mut content)?;
            let modified = patch_sheet_xml(&content, &patches, &appended, new_last_row)?;
            zip_writer.start_file(&name, FileOptions::<()>::default())?;
            zip_writer.write_all(modified.as_bytes())?;
        } else {
            // Copy file as is
            zip_writer.start_file(&name, FileOptions::<()>::default())?;
            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer)?;
            zip_writer.write_all(&buffer)?;
        }
    }

    zip_writer.finish()?;
    Ok(())
}

/// Resolve the archive path of the workbook's first worksheet via
/// workbook.xml and its relationships part
fn first_sheet_part<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    let workbook_xml = read_file_from_zip(archive, "xl/workbook.xml")?;
    let rid = first_sheet_rid(&workbook_xml)?;

    let rels_xml = read_file_from_zip(archive, "xl/_rels/workbook.xml.rels")?;
    let targets = parse_relationship_targets(&rels_xml)?;
    let target = targets
        .get(&rid)
        .ok_or_else(|| anyhow::anyhow!("No relationship target for sheet id {}", rid))?;

    Ok(if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else {
        format!("xl/{target}")
    })
}

fn read_file_from_zip<R: Read + Seek>(archive: &mut ZipArchive<R>, filename: &str) -> Result<String> {
    let mut file = archive.by_name(filename)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

fn first_sheet_rid(workbook_xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(workbook_xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"sheet" => {
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.as_ref() == b"r:id" {
                        return Ok(String::from_utf8(attr.value.to_vec())?);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("Error parsing XML: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Err(anyhow::anyhow!("Workbook has no sheets"))
}

fn parse_relationship_targets(rels_xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(rels_xml);
    let mut buf = Vec::new();
    let mut targets = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"Relationship" => {
                let mut id = String::new();
                let mut target = String::new();

                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"Id" => id = String::from_utf8(attr.value.to_vec())?,
                        b"Target" => target = String::from_utf8(attr.value.to_vec())?,
                        _ => {}
                    }
                }

                targets.insert(id, target);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("Error parsing XML: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

fn patch_sheet_xml(
    xml: &str,
    patches: &HashMap<u32, BTreeMap<u32, CellValue>>,
    appended: &[String],
    new_last_row: Option<u32>,
) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    // Patches still to emit for the row currently being streamed
    let mut pending: BTreeMap<u32, CellValue> = BTreeMap::new();
    let mut current_row: Option<u32> = None;
    // The r attribute is optional on row and c elements; rows and cells
    // without one are at the position implied by document order
    let mut implied_row: u32 = 0;
    let mut implied_col: u32 = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"row" => {
                let row = row_index(&e)?.unwrap_or(implied_row);
                implied_row = row + 1;
                implied_col = 0;
                current_row = Some(row);
                pending = patches.get(&row).cloned().unwrap_or_default();
                writer.write_event(Event::Start(e))?;
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"row" => {
                let row = row_index(&e)?.unwrap_or(implied_row);
                implied_row = row + 1;
                let cells = patches.get(&row).cloned().unwrap_or_default();
                if cells.is_empty() {
                    writer.write_event(Event::Empty(e))?;
                } else {
                    // A self-closing row gains content
                    let owned = e.into_owned();
                    writer.write_event(Event::Start(owned))?;
                    for (col, value) in &cells {
                        write_raw(&mut writer, &cell_xml(row, *col, None, value))?;
                    }
                    writer.write_event(Event::End(BytesEnd::new("row")))?;
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"row" => {
                // Patched cells that had no element in the original XML
                if let Some(row) = current_row {
                    for (col, value) in &pending {
                        write_raw(&mut writer, &cell_xml(row, *col, None, value))?;
                    }
                }
                pending.clear();
                current_row = None;
                writer.write_event(Event::End(e))?;
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"c" => {
                let (row, col, style) = cell_position(&e, current_row.unwrap_or(0), implied_col)?;
                implied_col = col + 1;
                match pending.remove(&col) {
                    Some(value) => {
                        let owned = e.into_owned();
                        let mut skip = Vec::new();
                        reader.read_to_end_into(owned.name(), &mut skip)?;
                        write_raw(&mut writer, &cell_xml(row, col, style.as_deref(), &value))?;
                    }
                    None => writer.write_event(Event::Start(e))?,
                }
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"c" => {
                let (row, col, style) = cell_position(&e, current_row.unwrap_or(0), implied_col)?;
                implied_col = col + 1;
                match pending.remove(&col) {
                    Some(value) => {
                        write_raw(&mut writer, &cell_xml(row, col, style.as_deref(), &value))?
                    }
                    None => writer.write_event(Event::Empty(e))?,
                }
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"dimension" => match new_last_row {
                Some(last_row) => write_raw(&mut writer, &extended_dimension(&e, last_row)?)?,
                None => writer.write_event(Event::Empty(e))?,
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"sheetData" => {
                for row_xml in appended {
                    write_raw(&mut writer, row_xml)?;
                }
                writer.write_event(Event::End(e))?;
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"sheetData" && !appended.is_empty() => {
                let owned = e.into_owned();
                writer.write_event(Event::Start(owned))?;
                for row_xml in appended {
                    write_raw(&mut writer, row_xml)?;
                }
                writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
            }
            Ok(Event::Eof) => break,
            Ok(e) => writer.write_event(e)?,
            Err(e) => return Err(anyhow::anyhow!("Error parsing XML: {}", e)),
        }
        buf.clear();
    }

    let result = writer.into_inner().into_inner();
    Ok(String::from_utf8(result)?)
}

/// Coordinates and style index of a cell element, falling back to the
/// document-order position when the r attribute is absent
fn cell_position(
    e: &quick_xml::events::BytesStart<'_>,
    implied_row: u32,
    implied_col: u32,
) -> Result<(u32, u32, Option<String>)> {
    let mut cell_ref = None;
    let mut style = None;

    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"r" => cell_ref = Some(String::from_utf8(attr.value.to_vec())?),
            b"s" => style = Some(String::from_utf8(attr.value.to_vec())?),
            _ => {}
        }
    }

    let (row, col) = cell_ref
        .as_deref()
        .and_then(parse_cell_ref)
        .unwrap_or((implied_row, implied_col));

    Ok((row, col, style))
}

/// Stretch the dimension element's ref so it covers the appended rows
fn extended_dimension(
    e: &quick_xml::events::BytesStart<'_>,
    last_row: u32,
) -> Result<String> {
    let mut dim_ref = None;
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"ref" {
            dim_ref = Some(String::from_utf8(attr.value.to_vec())?);
        }
    }
    let Some(dim_ref) = dim_ref else {
        return Ok(r#"<dimension/>"#.to_string());
    };

    let (start, end) = dim_ref
        .split_once(':')
        .unwrap_or((dim_ref.as_str(), dim_ref.as_str()));
    let Some((end_row, end_col)) = parse_cell_ref(end) else {
        return Ok(format!(r#"<dimension ref="{dim_ref}"/>"#));
    };

    let new_end = format_cell_ref(end_row.max(last_row), end_col);
    Ok(format!(r#"<dimension ref="{start}:{new_end}"/>"#))
}

/// Serialize one cell element. Text goes out as an inline string so no
/// shared-strings bookkeeping is needed.
pub(crate) fn cell_xml(row: u32, col: u32, style: Option<&str>, value: &CellValue) -> String {
    let r = format_cell_ref(row, col);
    let s = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();

    match value {
        CellValue::Empty => format!(r#"<c r="{r}"{s}/>"#),
        CellValue::Number(n) => format!(r#"<c r="{r}"{s}><v>{n}</v></c>"#),
        CellValue::Boolean(b) => {
            format!(r#"<c r="{r}"{s} t="b"><v>{}</v></c>"#, if *b { 1 } else { 0 })
        }
        CellValue::Text(t) => format!(
            r#"<c r="{r}"{s} t="inlineStr"><is><t>{}</t></is></c>"#,
            quick_xml::escape::escape(t.as_str())
        ),
        CellValue::Formula { text, cached } => {
            let v = cached
                .map(|n| format!("<v>{n}</v>"))
                .unwrap_or_default();
            format!(
                r#"<c r="{r}"{s}><f>{}</f>{v}</c>"#,
                quick_xml::escape::escape(text.as_str())
            )
        }
    }
}

fn appended_rows_xml(list: &PriceList) -> Vec<String> {
    let (origin_row, origin_col) = list.origin();
    let first_new_row = origin_row + 1 + list.original_rows() as u32;

    list.appended()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let abs_row = first_new_row + i as u32;
            let mut xml = format!(r#"<row r="{}">"#, abs_row + 1);
            for (col_idx, cell) in row.cells.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                xml.push_str(&cell_xml(abs_row, origin_col + col_idx as u32, None, cell));
            }
            xml.push_str("</row>");
            xml
        })
        .collect()
}

fn row_index(e: &quick_xml::events::BytesStart<'_>) -> Result<Option<u32>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"r" {
            let raw = String::from_utf8(attr.value.to_vec())?;
            let parsed = raw.parse::<u32>()?;
            return Ok(Some(parsed.saturating_sub(1)));
        }
    }
    Ok(None)
}

fn write_raw(writer: &mut Writer<Cursor<Vec<u8>>>, xml: &str) -> Result<()> {
    writer.write_event(Event::Text(BytesText::from_escaped(xml)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_xml_variants() {
        assert_eq!(
            cell_xml(1, 1, Some("3"), &CellValue::Number(12.5)),
            r#"<c r="B2" s="3"><v>12.5</v></c>"#
        );
        assert_eq!(
            cell_xml(0, 0, None, &CellValue::Text("a<b".to_string())),
            r#"<c r="A1" t="inlineStr"><is><t>a&lt;b</t></is></c>"#
        );
        assert_eq!(
            cell_xml(2, 0, None, &CellValue::formula("B2*2")),
            r#"<c r="A3"><f>B2*2</f></c>"#
        );
    }

    #[test]
    fn test_patch_sheet_xml_replaces_and_appends() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>codice</t></is></c></row><row r="2"><c r="A2" t="inlineStr"><is><t>X1</t></is></c><c r="B2" s="5"><v>10</v></c><c r="C2"><f>B2*1.22</f><v>12.2</v></c></row></sheetData></worksheet>"#;

        let mut patches: HashMap<u32, BTreeMap<u32, CellValue>> = HashMap::new();
        patches
            .entry(1)
            .or_default()
            .insert(1, CellValue::Number(11.0));

        let appended = vec![r#"<row r="3"><c r="A3" t="inlineStr"><is><t>X2</t></is></c></row>"#.to_string()];

        let result = patch_sheet_xml(xml, &patches, &appended, Some(2)).unwrap();

        // Patched cell keeps its style and gets the new value
        assert!(result.contains(r#"<c r="B2" s="5"><v>11</v></c>"#));
        // The formula cell is untouched
        assert!(result.contains(r#"<c r="C2"><f>B2*1.22</f><v>12.2</v></c>"#));
        // The appended row lands inside sheetData
        assert!(result.contains(r#"<row r="3">"#));
        assert!(result.find(r#"<row r="3">"#).unwrap() < result.find("</sheetData>").unwrap());
    }

    #[test]
    fn test_patch_adds_missing_cell_at_row_end() {
        let xml = r#"<worksheet><sheetData><row r="2"><c r="A2"><v>1</v></c></row></sheetData></worksheet>"#;

        let mut patches: HashMap<u32, BTreeMap<u32, CellValue>> = HashMap::new();
        patches
            .entry(1)
            .or_default()
            .insert(2, CellValue::Text("nuovo".to_string()));

        let result = patch_sheet_xml(xml, &patches, &[], None).unwrap();
        assert!(result.contains(r#"<c r="A2"><v>1</v></c>"#));
        assert!(result.contains(r#"<c r="C2" t="inlineStr"><is><t>nuovo</t></is></c>"#));
    }

    #[test]
    fn test_untouched_sheet_round_trips() {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1"><v>1</v></c></row></sheetData></worksheet>"#;
        let result = patch_sheet_xml(xml, &HashMap::new(), &[], None).unwrap();
        assert_eq!(result, xml);
    }

    #[test]
    fn test_rows_without_refs_patch_by_position() {
        // r attributes are optional; position in document order decides
        let xml = r#"<worksheet><sheetData><row><c><v>1</v></c><c><v>2</v></c></row><row><c><v>3</v></c></row></sheetData></worksheet>"#;

        let mut patches: HashMap<u32, BTreeMap<u32, CellValue>> = HashMap::new();
        patches.entry(1).or_default().insert(0, CellValue::Number(9.0));

        let result = patch_sheet_xml(xml, &patches, &[], None).unwrap();
        assert!(result.contains(r#"<c r="A2"><v>9</v></c>"#));
        // The first row passes through unchanged
        assert!(result.contains(r#"<c><v>1</v></c><c><v>2</v></c>"#));
    }

    #[test]
    fn test_dimension_covers_appended_rows() {
        let xml = r#"<worksheet><dimension ref="A1:B2"/><sheetData><row r="1"><c r="A1"><v>1</v></c></row><row r="2"><c r="A2"><v>2</v></c></row></sheetData></worksheet>"#;

        let appended = vec![r#"<row r="3"><c r="A3"><v>3</v></c></row>"#.to_string()];
        let result = patch_sheet_xml(xml, &HashMap::new(), &appended, Some(2)).unwrap();

        assert!(result.contains(r#"<dimension ref="A1:B3"/>"#));
        assert!(result.contains(r#"<row r="3">"#));
    }
}
