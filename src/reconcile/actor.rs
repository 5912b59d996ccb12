//! Extraction of pipe cap actors from the actor state map.
//!
//! Actor state values are opaque engine blobs that embed the paths of the
//! actors they describe as NUL terminated text. Every
//! `<area>:PersistentLevel.<name>` occurrence whose name mentions a pipe
//! cap marks that actor as found.

use crate::gvas::{PropertyValue, StructBody};
use crate::util::contains_ignore_ascii_case;
use encoding_rs::WINDOWS_1252;

const LEVEL_MARKER: &str = ":persistentlevel";
const ACTOR_MARKER: &str = "pipecap";

/// Calls `f` with the area and name of every pipe cap mentioned anywhere
/// within the value
pub(crate) fn scan_value<F>(value: &PropertyValue, f: &mut F)
where
    F: FnMut(&str, &str),
{
    match value {
        PropertyValue::Str(x) | PropertyValue::Name(x) | PropertyValue::Object(x) => {
            scan_text(x, f)
        }
        PropertyValue::Enum { value, .. } => scan_text(value, f),
        PropertyValue::SoftObject {
            asset_path,
            sub_path,
        } => {
            scan_text(asset_path, f);
            scan_text(sub_path, f);
        }
        PropertyValue::Struct(s) => {
            if let StructBody::Properties(props) = &s.body {
                for prop in props {
                    scan_value(&prop.value, f);
                }
            }
        }
        PropertyValue::Array(array) | PropertyValue::Set(array) => {
            let bytes: Vec<u8> = array
                .values
                .iter()
                .filter_map(|x| match x {
                    PropertyValue::Byte(b) => Some(*b),
                    _ => None,
                })
                .collect();

            if bytes.is_empty() {
                for x in &array.values {
                    scan_value(x, f);
                }
            } else {
                scan_bytes(&bytes, f);
            }
        }
        PropertyValue::Map(map) => {
            for (key, value) in &map.entries {
                scan_value(key, f);
                scan_value(value, f);
            }
        }
        PropertyValue::Opaque(data) => scan_bytes(data, f),
        _ => {}
    }
}

fn scan_bytes<F>(data: &[u8], f: &mut F)
where
    F: FnMut(&str, &str),
{
    for chunk in data.split(|&b| b == 0).filter(|x| !x.is_empty()) {
        let (text, _) = WINDOWS_1252.decode_without_bom_handling(chunk);
        scan_text(&text, f);
    }
}

/// Scans text for `<area>:PersistentLevel.<name>` (case insensitive) where
/// the name contains the pipe cap marker. The area is the run of
/// identifier characters before the marker and the name runs to the next
/// NUL. Matches without an area are skipped.
pub(crate) fn scan_text<F>(text: &str, f: &mut F)
where
    F: FnMut(&str, &str),
{
    // ascii lowercasing keeps byte offsets intact
    let lower = text.to_ascii_lowercase();
    let mut pos = 0;
    while let Some(idx) = lower[pos..].find(LEVEL_MARKER) {
        let at = pos + idx;
        let area_start = text[pos..at]
            .char_indices()
            .rev()
            .find(|&(_, c)| !is_area_char(c))
            .map_or(pos, |(i, c)| pos + i + c.len_utf8());

        let after = at + LEVEL_MARKER.len();
        let sep = match text[after..].chars().next() {
            Some(c) => c.len_utf8(),
            None => break,
        };

        let name_start = after + sep;
        let rest = &text[name_start..];
        let name = rest.split('\0').next().unwrap_or_default();
        if contains_ignore_ascii_case(name, ACTOR_MARKER) {
            // without a level the key would collide with top level settings
            let area = &text[area_start..at];
            if !area.is_empty() {
                f(area, name);
            }
            pos = name_start + name.len();
        } else {
            pos = at + 1;
        }
    }
}

fn is_area_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gvas::{ArrayValue, MapValue, Property, StructValue};

    fn collect(text: &str) -> Vec<(String, String)> {
        let mut out = Vec::new();
        scan_text(text, &mut |area: &str, name: &str| {
            out.push((area.to_string(), name.to_string()))
        });
        out
    }

    #[test]
    fn test_scan_text() {
        assert_eq!(
            collect("/Game/Maps/DLC2_Complete.DLC2_Complete:PersistentLevel.PipeCap12_2"),
            vec![(String::from("DLC2_Complete"), String::from("PipeCap12_2"))]
        );
    }

    #[test]
    fn test_scan_text_area_stops_at_path() {
        assert_eq!(
            collect("/Game/Maps/Area3:PersistentLevel.PipeCap_4"),
            vec![(String::from("Area3"), String::from("PipeCap_4"))]
        );
    }

    #[test]
    fn test_scan_text_case_insensitive() {
        assert_eq!(
            collect("DLC2_Area:persistentlevel.A1_pipecap_3"),
            vec![(String::from("DLC2_Area"), String::from("A1_pipecap_3"))]
        );
    }

    #[test]
    fn test_scan_text_skips_other_actors() {
        assert!(collect("DLC2_Complete:PersistentLevel.Chest_7").is_empty());
        assert!(collect("PipeCap12_2").is_empty());
        assert!(collect("DLC2_Complete:PersistentLevel").is_empty());
    }

    #[test]
    fn test_scan_text_requires_area() {
        assert!(collect(":PersistentLevel.PipeCap_1").is_empty());
        assert!(collect("/Game/Maps/.:PersistentLevel.PipeCap_1").is_empty());
        assert_eq!(
            collect(":PersistentLevel.PipeCap_1\0Area2:PersistentLevel.PipeCap_9"),
            vec![(String::from("Area2"), String::from("PipeCap_9"))]
        );
    }

    #[test]
    fn test_scan_text_multiple() {
        let found = collect(
            "Area1:PersistentLevel.Chest_7\0Area1:PersistentLevel.Pipecap_1\0Area2:PersistentLevel.PipeCap_9",
        );
        assert_eq!(
            found,
            vec![
                (String::from("Area1"), String::from("Pipecap_1")),
                (String::from("Area2"), String::from("PipeCap_9")),
            ]
        );
    }

    #[test]
    fn test_scan_nested_value() {
        let mut blob = b"junk\x01\x02".to_vec();
        blob.extend_from_slice(b"DLC2_Complete:PersistentLevel.PipeCap12_2\0");
        blob.extend_from_slice(&[0xff, 0x00]);

        let value = PropertyValue::Map(MapValue {
            key_type: String::from("StructProperty"),
            value_type: String::from("StructProperty"),
            entries: vec![(
                PropertyValue::Str(String::from("key")),
                PropertyValue::Struct(StructValue {
                    type_name: String::new(),
                    body: StructBody::Properties(vec![Property {
                        name: String::from("ActorData"),
                        type_tag: String::from("ArrayProperty"),
                        size: 0,
                        array_index: 0,
                        offset: 0,
                        value: PropertyValue::Array(ArrayValue {
                            inner_type: String::from("ByteProperty"),
                            struct_type: None,
                            values: blob.iter().map(|&b| PropertyValue::Byte(b)).collect(),
                        }),
                    }]),
                }),
            )],
        });

        let mut found = Vec::new();
        scan_value(&value, &mut |area: &str, name: &str| {
            found.push(format!("{}:{}", area, name))
        });
        assert_eq!(found, vec![String::from("DLC2_Complete:PipeCap12_2")]);
    }
}
