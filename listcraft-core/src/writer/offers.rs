//! Offer table output
//!
//! Offers go to a fresh file, never back into the price list. The format
//! follows the extension: a minimal single-sheet XLSX or a CSV.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::{ZipWriter, write::SimpleFileOptions};

use super::xlsx::cell_xml;
use crate::config::ReconcileConfig;
use crate::offers::Offer;
use crate::record::CellValue;

pub fn write_offers(path: &Path, offers: &[Offer], config: &ReconcileConfig) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "xlsx" => write_offers_xlsx(path, offers, config),
        "csv" | "txt" => write_offers_csv(path, offers, config),
        other => anyhow::bail!("Unsupported offers format '.{}'", other),
    }
}

fn offer_headers(config: &ReconcileConfig) -> [String; 5] {
    [
        config.columns.code.clone(),
        config.columns.description.clone(),
        config.columns.price.clone(),
        "Sconto Offerta".to_string(),
        "Prezzo Promo".to_string(),
    ]
}

fn write_offers_csv(path: &Path, offers: &[Offer], config: &ReconcileConfig) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create offers file: {}", path.display()))?;

    writer.write_record(offer_headers(config))?;
    for offer in offers {
        writer.write_record([
            offer.code.clone(),
            offer.description.clone(),
            format!("{:.2}", offer.original_price),
            format!("{:.2}", offer.discount),
            format!("{:.2}", offer.promotional_price),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_offers_xlsx(path: &Path, offers: &[Offer], config: &ReconcileConfig) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create offers file: {}", path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#
            .as_bytes(),
    )?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#.as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Offerte" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#.as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#.as_bytes())?;

    zip.start_file("xl/worksheets/sheet1.xml", options)?;
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    sheet.push_str(r#"<row r="1">"#);
    for (col, header) in offer_headers(config).iter().enumerate() {
        sheet.push_str(&cell_xml(0, col as u32, None, &CellValue::Text(header.clone())));
    }
    sheet.push_str("</row>");

    for (i, offer) in offers.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.push_str(&format!(r#"<row r="{}">"#, row + 1));
        sheet.push_str(&cell_xml(row, 0, None, &CellValue::Text(offer.code.clone())));
        sheet.push_str(&cell_xml(
            row,
            1,
            None,
            &CellValue::Text(offer.description.clone()),
        ));
        sheet.push_str(&cell_xml(row, 2, None, &CellValue::Number(offer.original_price)));
        sheet.push_str(&cell_xml(row, 3, None, &CellValue::Number(offer.discount)));
        sheet.push_str(&cell_xml(
            row,
            4,
            None,
            &CellValue::Number(offer.promotional_price),
        ));
        sheet.push_str("</row>");
    }

    sheet.push_str("</sheetData></worksheet>");
    zip.write_all(sheet.as_bytes())?;

    zip.finish()?;
    Ok(())
}
