//! Input loading: the base price list and supplier lists

mod price_list;
mod supplier;

pub use price_list::load_price_list;
pub use supplier::load_supplier;

use crate::record::CellValue;
use calamine::Data;

/// Convert a calamine cell into our cell model
pub(crate) fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => CellValue::Text(format!("{e:?}")),
        Data::Empty => CellValue::Empty,
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Render a calamine cell as the string a supplier column carries
///
/// Floats with no fractional part collapse to integer form so EANs and codes
/// read back as numbers still compare equal to their textual spelling.
pub(crate) fn data_to_string(data: &Data) -> String {
    match data {
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                format!("{f}")
            }
        }
        Data::String(s) => s.trim().to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

pub(crate) fn extension_of(path: &std::path::Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_to_string_collapses_integral_floats() {
        assert_eq!(data_to_string(&Data::Float(8012345678901.0)), "8012345678901");
        assert_eq!(data_to_string(&Data::Float(12.5)), "12.5");
        assert_eq!(data_to_string(&Data::String("  x ".to_string())), "x");
        assert_eq!(data_to_string(&Data::Empty), "");
    }
}
