use super::cursor::Cursor;
use super::decoder::PropertyDecoder;
use super::header::SaveHeader;
use super::property::{Property, PropertyValue, StructBody, Vector};
use crate::{Diagnostic, Error};

/// A decoded save file.
///
/// Owns the bytes it was decoded from alongside the top level properties.
/// It is immutable once built; loading another file means building another
/// `SaveObject`.
///
/// ```
/// use savetrack::gvas::{PropertyValue, SaveObject};
///
/// let mut data = Vec::new();
/// for s in ["Coins", "IntProperty"] {
///     data.extend_from_slice(&(s.len() as i32 + 1).to_le_bytes());
///     data.extend_from_slice(s.as_bytes());
///     data.push(0);
/// }
/// data.extend_from_slice(&4u32.to_le_bytes()); // size
/// data.extend_from_slice(&0u32.to_le_bytes()); // array index
/// data.push(0); // no property guid
/// data.extend_from_slice(&250i32.to_le_bytes());
///
/// let save = SaveObject::from_slice(&data).unwrap();
/// assert_eq!(save.get("Coins").unwrap().value, PropertyValue::Int(250));
/// ```
#[derive(Debug, Clone)]
pub struct SaveObject {
    data: Vec<u8>,
    header: Option<SaveHeader>,
    properties: Vec<Property>,
    diagnostics: Vec<Diagnostic>,
}

impl SaveObject {
    /// Decodes a save, taking ownership of its bytes
    pub fn from_vec(data: Vec<u8>) -> Result<SaveObject, Error> {
        let (header, properties, diagnostics) = decode(&data)?;
        log::debug!(
            "decoded {} top level properties from {} bytes",
            properties.len(),
            data.len()
        );

        Ok(SaveObject {
            data,
            header,
            properties,
            diagnostics,
        })
    }

    pub fn from_slice(data: &[u8]) -> Result<SaveObject, Error> {
        SaveObject::from_vec(data.to_vec())
    }

    /// The bytes the save was decoded from
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The file header, absent when the data was a bare property list
    pub fn header(&self) -> Option<&SaveHeader> {
        self.header.as_ref()
    }

    /// Top level properties in file order
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Recoverable conditions encountered while decoding
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// First top level property with the given name
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// String elements of every top level array property with the given name
    pub fn strings<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.properties
            .iter()
            .filter(move |p| p.name == name)
            .filter_map(|p| p.value.as_array())
            .flat_map(|array| array.strings())
    }

    /// Location of the player, stored either as a vector or as a transform
    pub fn player_position(&self) -> Option<Vector> {
        let property = self.get("Player Position")?;
        match property.value {
            PropertyValue::Struct(ref s) => match s.body {
                StructBody::Vector(v) => Some(v),
                StructBody::Transform(t) => Some(t.translation),
                _ => None,
            },
            _ => None,
        }
    }
}

fn decode(data: &[u8]) -> Result<(Option<SaveHeader>, Vec<Property>, Vec<Diagnostic>), Error> {
    let mut cursor = Cursor::new(data);
    let header = if SaveHeader::is_present(data) {
        Some(SaveHeader::parse(&mut cursor)?)
    } else {
        None
    };

    let mut decoder = PropertyDecoder::new();
    let properties = decoder.decode_document(&mut cursor)?;
    Ok((header, properties, decoder.into_diagnostics()))
}
