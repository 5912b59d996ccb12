use super::cursor::Cursor;
use super::property::*;
use crate::depth::{Depth, DepthType};
use crate::{Diagnostic, DiagnosticKind, Error, ErrorKind};

/// Type specific data found in a property tag between the array index and
/// the optional property guid
#[derive(Debug)]
enum TagData {
    Plain,
    Bool(bool),
    Struct { struct_name: String },
    Enum { enum_name: String },
    Array { inner_type: String },
    Map { key_type: String, value_type: String },
}

/// Recursive descent decoder for engine property lists.
///
/// The declared size of each property is authoritative: its payload is
/// split off into a bounded cursor before it is interpreted, so the parent
/// cursor always ends up at `payload_start + size` whether the payload was
/// understood, partially understood, or skipped.
#[derive(Debug)]
pub struct PropertyDecoder {
    depth: Depth,
    diagnostics: Vec<Diagnostic>,
}

impl Default for PropertyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyDecoder {
    pub fn new() -> Self {
        PropertyDecoder {
            depth: Depth::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Recoverable conditions seen so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Decodes the outermost property list. It ends at the "None" sentinel
    /// or, unlike nested lists, when the cursor is exhausted.
    pub fn decode_document(&mut self, cursor: &mut Cursor) -> Result<Vec<Property>, Error> {
        let mut properties = Vec::new();
        while !cursor.is_empty() {
            match self.decode_property(cursor)? {
                Some(property) => properties.push(property),
                None => break,
            }
        }

        Ok(properties)
    }

    /// Decodes a nested property list that must end with the "None" sentinel
    pub fn decode_list(&mut self, cursor: &mut Cursor) -> Result<Vec<Property>, Error> {
        let mut properties = Vec::new();
        loop {
            if cursor.is_empty() {
                return Err(Error::new(ErrorKind::MissingTerminator {
                    offset: cursor.position(),
                }));
            }

            match self.decode_property(cursor)? {
                Some(property) => properties.push(property),
                None => return Ok(properties),
            }
        }
    }

    /// Decodes a single property. Returns `None` when the sentinel that
    /// terminates the current list is read.
    pub fn decode_property(&mut self, cursor: &mut Cursor) -> Result<Option<Property>, Error> {
        let name = cursor.read_fstring()?;
        if name == NONE {
            return Ok(None);
        }

        let type_tag = cursor.read_fstring()?;
        let size = cursor.read_u32()?;
        let array_index = cursor.read_u32()?;
        let tag = read_tag_data(cursor, &type_tag)?;
        if cursor.read_u8()? != 0 {
            cursor.skip(16)?;
        }

        let mut payload = cursor.take(size as usize)?;
        let offset = payload.position();
        let value = self.decode_payload(&mut payload, &type_tag, tag)?;
        Ok(Some(Property {
            name,
            type_tag,
            size,
            array_index,
            offset,
            value,
        }))
    }

    fn diagnose(&mut self, offset: usize, kind: DiagnosticKind) {
        let diagnostic = Diagnostic { offset, kind };
        match diagnostic.kind {
            DiagnosticKind::UnrecognizedStruct { .. } => log::debug!("{}", diagnostic),
            _ => log::warn!("{}", diagnostic),
        }
        self.diagnostics.push(diagnostic);
    }

    fn enter(&mut self, kind: DepthType, offset: usize) -> Result<(), Error> {
        if self.depth.push(kind, offset) {
            Ok(())
        } else {
            log::debug!(
                "refusing to enter {} at {}, already {} deep: {}",
                kind,
                offset,
                self.depth.len(),
                self.depth.trail()
            );
            Err(Error::new(ErrorKind::ExcessiveNesting { offset }))
        }
    }

    fn leave(&mut self) {
        self.depth.pop();
    }

    fn opaque(&mut self, payload: &mut Cursor, type_tag: &str) -> PropertyValue {
        self.diagnose(
            payload.position(),
            DiagnosticKind::UnsupportedProperty {
                type_tag: type_tag.to_string(),
            },
        );
        PropertyValue::Opaque(payload.read_rest().to_vec())
    }

    fn decode_payload(
        &mut self,
        payload: &mut Cursor,
        type_tag: &str,
        tag: TagData,
    ) -> Result<PropertyValue, Error> {
        match (type_tag, tag) {
            ("BoolProperty", TagData::Bool(x)) => {
                if !payload.is_empty() {
                    self.size_mismatch(payload, type_tag, 0);
                }
                Ok(PropertyValue::Bool(x))
            }
            ("IntProperty", _) => self.primitive(payload, type_tag, 4, |c| {
                c.read_i32().map(PropertyValue::Int)
            }),
            ("Int64Property", _) => self.primitive(payload, type_tag, 8, |c| {
                c.read_i64().map(PropertyValue::Int64)
            }),
            ("UInt32Property", _) => self.primitive(payload, type_tag, 4, |c| {
                c.read_u32().map(PropertyValue::UInt32)
            }),
            ("UInt64Property", _) => self.primitive(payload, type_tag, 8, |c| {
                c.read_u64().map(PropertyValue::UInt64)
            }),
            ("Int16Property", _) => self.primitive(payload, type_tag, 2, |c| {
                c.read_i16().map(PropertyValue::Int16)
            }),
            ("UInt16Property", _) => self.primitive(payload, type_tag, 2, |c| {
                c.read_u16().map(PropertyValue::UInt16)
            }),
            ("Int8Property", _) => self.primitive(payload, type_tag, 1, |c| {
                c.read_i8().map(PropertyValue::Int8)
            }),
            ("FloatProperty", _) => self.primitive(payload, type_tag, 4, |c| {
                c.read_f32().map(PropertyValue::Float)
            }),
            ("DoubleProperty", _) => self.primitive(payload, type_tag, 8, |c| {
                c.read_f64().map(PropertyValue::Double)
            }),
            ("ByteProperty", TagData::Enum { enum_name }) => {
                if enum_name == NONE || payload.remaining() == 1 {
                    self.primitive(payload, type_tag, 1, |c| {
                        c.read_u8().map(PropertyValue::Byte)
                    })
                } else {
                    let value = payload.read_fstring()?;
                    Ok(PropertyValue::Enum { enum_name, value })
                }
            }
            ("EnumProperty", TagData::Enum { enum_name }) => {
                let value = payload.read_fstring()?;
                Ok(PropertyValue::Enum { enum_name, value })
            }
            ("StrProperty", _) => payload.read_fstring().map(PropertyValue::Str),
            ("NameProperty", _) => payload.read_fstring().map(PropertyValue::Name),
            ("ObjectProperty", _) => payload.read_fstring().map(PropertyValue::Object),
            ("SoftObjectProperty", _) => read_soft_object(payload),
            ("StructProperty", TagData::Struct { struct_name }) => {
                let width = Some(payload.remaining());
                self.check_layout(payload, &struct_name);
                self.decode_struct(payload, &struct_name, width)
                    .map(PropertyValue::Struct)
            }
            ("ArrayProperty", TagData::Array { inner_type }) => {
                self.decode_array(payload, &inner_type, false)
            }
            ("SetProperty", TagData::Array { inner_type }) => {
                self.decode_array(payload, &inner_type, true)
            }
            ("MapProperty", TagData::Map {
                key_type,
                value_type,
            }) => self.decode_map(payload, &key_type, &value_type),
            (type_tag, _) => Ok(self.opaque(payload, type_tag)),
        }
    }

    fn size_mismatch(&mut self, payload: &Cursor, type_tag: &str, expected: usize) {
        self.diagnose(
            payload.position(),
            DiagnosticKind::SizeMismatch {
                type_tag: type_tag.to_string(),
                expected,
                declared: payload.remaining() as u32,
            },
        );
    }

    /// Reads a fixed width value. A payload wider than the value is padding;
    /// one narrower than the value cannot hold it and is kept opaque.
    fn primitive<F>(
        &mut self,
        payload: &mut Cursor,
        type_tag: &str,
        width: usize,
        read: F,
    ) -> Result<PropertyValue, Error>
    where
        F: FnOnce(&mut Cursor) -> Result<PropertyValue, Error>,
    {
        if payload.remaining() == width {
            return read(payload);
        }

        self.size_mismatch(payload, type_tag, width);
        if payload.remaining() < width {
            Ok(PropertyValue::Opaque(payload.read_rest().to_vec()))
        } else {
            read(payload)
        }
    }

    /// Notes a struct that will be read as a generic property list
    fn check_layout(&mut self, cursor: &Cursor, struct_name: &str) {
        if !has_fixed_layout(struct_name) {
            self.diagnose(
                cursor.position(),
                DiagnosticKind::UnrecognizedStruct {
                    struct_name: struct_name.to_string(),
                },
            );
        }
    }

    /// Decodes a struct body. `width` is the number of bytes the body
    /// occupies when known, which tells single from double precision
    /// layouts apart.
    fn decode_struct(
        &mut self,
        cursor: &mut Cursor,
        struct_name: &str,
        width: Option<usize>,
    ) -> Result<StructValue, Error> {
        let wide = |double_width: usize| width == Some(double_width);
        let body = match struct_name {
            "Vector" => StructBody::Vector(read_vector(cursor, wide(24))?),
            "Vector2D" => {
                let wide = wide(16);
                StructBody::Vector2D(Vector2D {
                    x: read_real(cursor, wide)?,
                    y: read_real(cursor, wide)?,
                })
            }
            "Rotator" => {
                let wide = wide(24);
                StructBody::Rotator(Rotator {
                    pitch: read_real(cursor, wide)?,
                    yaw: read_real(cursor, wide)?,
                    roll: read_real(cursor, wide)?,
                })
            }
            "Quat" => StructBody::Quat(read_quat(cursor, wide(32))?),
            "LinearColor" => {
                let wide = wide(32);
                StructBody::LinearColor(LinearColor {
                    r: read_real(cursor, wide)?,
                    g: read_real(cursor, wide)?,
                    b: read_real(cursor, wide)?,
                    a: read_real(cursor, wide)?,
                })
            }
            "Color" => {
                let [b, g, r, a] = cursor.read_array::<4>()?;
                StructBody::Color(Color { r, g, b, a })
            }
            "IntPoint" => StructBody::IntPoint(IntPoint {
                x: cursor.read_i32()?,
                y: cursor.read_i32()?,
            }),
            "Guid" => StructBody::Guid(cursor.read_array::<16>()?),
            "DateTime" => StructBody::DateTime(cursor.read_i64()?),
            "Timespan" => StructBody::Timespan(cursor.read_i64()?),
            "Transform" => {
                let props = self.decode_struct_list(cursor)?;
                match Transform::from_properties(&props) {
                    Some(transform) => StructBody::Transform(transform),
                    None => StructBody::Properties(props),
                }
            }
            _ => StructBody::Properties(self.decode_struct_list(cursor)?),
        };

        Ok(StructValue {
            type_name: struct_name.to_string(),
            body,
        })
    }

    fn decode_struct_list(&mut self, cursor: &mut Cursor) -> Result<Vec<Property>, Error> {
        self.enter(DepthType::Struct, cursor.position())?;
        let result = self.decode_list(cursor);
        self.leave();
        result
    }

    fn decode_array(
        &mut self,
        payload: &mut Cursor,
        inner_type: &str,
        is_set: bool,
    ) -> Result<PropertyValue, Error> {
        self.enter(DepthType::Array, payload.position())?;
        let result = self.decode_array_body(payload, inner_type, is_set);
        self.leave();
        result
    }

    fn decode_array_body(
        &mut self,
        payload: &mut Cursor,
        inner_type: &str,
        is_set: bool,
    ) -> Result<PropertyValue, Error> {
        let start = payload.checkpoint();
        if is_set {
            let removed = payload.read_u32()? as usize;
            if self.decode_elements(payload, inner_type, removed)?.is_none() {
                payload.restore(start);
                return Ok(self.opaque(payload, inner_type));
            }
        }

        let count = payload.read_u32()? as usize;
        let (struct_type, values) = if inner_type == "StructProperty" {
            let (struct_name, values) = self.decode_struct_elements(payload, count)?;
            (Some(struct_name), values)
        } else {
            match self.decode_elements(payload, inner_type, count)? {
                Some(values) => (None, values),
                None => {
                    payload.restore(start);
                    return Ok(self.opaque(payload, inner_type));
                }
            }
        };

        let array = ArrayValue {
            inner_type: inner_type.to_string(),
            struct_type,
            values,
        };

        if is_set {
            Ok(PropertyValue::Set(array))
        } else {
            Ok(PropertyValue::Array(array))
        }
    }

    /// Struct arrays repeat a property tag once before their elements. The
    /// tag's size covers every element.
    fn decode_struct_elements(
        &mut self,
        payload: &mut Cursor,
        count: usize,
    ) -> Result<(String, Vec<PropertyValue>), Error> {
        let _name = payload.read_fstring()?;
        let _type_tag = payload.read_fstring()?;
        let size = payload.read_u32()?;
        let _array_index = payload.read_u32()?;
        let struct_name = payload.read_fstring()?;
        payload.skip(16)?;
        if payload.read_u8()? != 0 {
            payload.skip(16)?;
        }

        let mut body = payload.take(size as usize)?;
        if count > 0 {
            self.check_layout(&body, &struct_name);
        }

        let width = body.remaining().checked_div(count);
        let mut values = Vec::with_capacity(count.min(body.remaining()));
        for _ in 0..count {
            let value = self.decode_struct(&mut body, &struct_name, width)?;
            values.push(PropertyValue::Struct(value));
        }

        Ok((struct_name, values))
    }

    /// Decodes `count` elements of a non struct type. Returns `None` without
    /// consuming anything when the type has no known element layout.
    fn decode_elements(
        &mut self,
        cursor: &mut Cursor,
        inner_type: &str,
        count: usize,
    ) -> Result<Option<Vec<PropertyValue>>, Error> {
        let mut values = Vec::with_capacity(count.min(cursor.remaining()));
        if inner_type == "ByteProperty" && cursor.remaining() == count {
            for _ in 0..count {
                values.push(PropertyValue::Byte(cursor.read_u8()?));
            }
            return Ok(Some(values));
        }

        for _ in 0..count {
            match read_element(cursor, inner_type)? {
                Some(value) => values.push(value),
                None => return Ok(None),
            }
        }

        Ok(Some(values))
    }

    fn decode_map(
        &mut self,
        payload: &mut Cursor,
        key_type: &str,
        value_type: &str,
    ) -> Result<PropertyValue, Error> {
        self.enter(DepthType::Map, payload.position())?;
        let result = self.decode_map_body(payload, key_type, value_type);
        self.leave();
        result
    }

    fn decode_map_body(
        &mut self,
        payload: &mut Cursor,
        key_type: &str,
        value_type: &str,
    ) -> Result<PropertyValue, Error> {
        let start = payload.checkpoint();
        let removed = payload.read_u32()?;
        for _ in 0..removed {
            if self.decode_map_key(payload, key_type)?.is_none() {
                payload.restore(start);
                return Ok(self.opaque(payload, key_type));
            }
        }

        let count = payload.read_u32()? as usize;
        let mut entries = Vec::with_capacity(count.min(payload.remaining()));
        for _ in 0..count {
            let key = match self.decode_map_key(payload, key_type)? {
                Some(key) => key,
                None => {
                    payload.restore(start);
                    return Ok(self.opaque(payload, key_type));
                }
            };

            let value = match self.decode_map_value(payload, value_type)? {
                Some(value) => value,
                None => {
                    payload.restore(start);
                    return Ok(self.opaque(payload, value_type));
                }
            };

            entries.push((key, value));
        }

        Ok(PropertyValue::Map(MapValue {
            key_type: key_type.to_string(),
            value_type: value_type.to_string(),
            entries,
        }))
    }

    /// Struct keys carry no type information; they are read as guids
    fn decode_map_key(
        &mut self,
        cursor: &mut Cursor,
        key_type: &str,
    ) -> Result<Option<PropertyValue>, Error> {
        if key_type == "StructProperty" {
            let guid = cursor.read_array::<16>()?;
            return Ok(Some(PropertyValue::Struct(StructValue {
                type_name: String::from("Guid"),
                body: StructBody::Guid(guid),
            })));
        }

        read_element(cursor, key_type)
    }

    /// Struct values carry no type information; they are read as property
    /// lists
    fn decode_map_value(
        &mut self,
        cursor: &mut Cursor,
        value_type: &str,
    ) -> Result<Option<PropertyValue>, Error> {
        if value_type == "StructProperty" {
            let props = self.decode_struct_list(cursor)?;
            return Ok(Some(PropertyValue::Struct(StructValue {
                type_name: String::new(),
                body: StructBody::Properties(props),
            })));
        }

        read_element(cursor, value_type)
    }
}

fn read_tag_data(cursor: &mut Cursor, type_tag: &str) -> Result<TagData, Error> {
    let tag = match type_tag {
        "StructProperty" => {
            let struct_name = cursor.read_fstring()?;
            cursor.skip(16)?;
            TagData::Struct { struct_name }
        }
        "BoolProperty" => TagData::Bool(cursor.read_u8()? != 0),
        "ByteProperty" | "EnumProperty" => TagData::Enum {
            enum_name: cursor.read_fstring()?,
        },
        "ArrayProperty" | "SetProperty" => TagData::Array {
            inner_type: cursor.read_fstring()?,
        },
        "MapProperty" => TagData::Map {
            key_type: cursor.read_fstring()?,
            value_type: cursor.read_fstring()?,
        },
        _ => TagData::Plain,
    };

    Ok(tag)
}

/// Reads one array element or map key/value stored without a tag
fn read_element(cursor: &mut Cursor, type_tag: &str) -> Result<Option<PropertyValue>, Error> {
    let value = match type_tag {
        "IntProperty" => PropertyValue::Int(cursor.read_i32()?),
        "Int64Property" => PropertyValue::Int64(cursor.read_i64()?),
        "UInt32Property" => PropertyValue::UInt32(cursor.read_u32()?),
        "UInt64Property" => PropertyValue::UInt64(cursor.read_u64()?),
        "Int16Property" => PropertyValue::Int16(cursor.read_i16()?),
        "UInt16Property" => PropertyValue::UInt16(cursor.read_u16()?),
        "Int8Property" => PropertyValue::Int8(cursor.read_i8()?),
        "FloatProperty" => PropertyValue::Float(cursor.read_f32()?),
        "DoubleProperty" => PropertyValue::Double(cursor.read_f64()?),
        "BoolProperty" => PropertyValue::Bool(cursor.read_u8()? != 0),
        "ByteProperty" | "EnumProperty" => PropertyValue::Enum {
            enum_name: String::new(),
            value: cursor.read_fstring()?,
        },
        "StrProperty" => PropertyValue::Str(cursor.read_fstring()?),
        "NameProperty" => PropertyValue::Name(cursor.read_fstring()?),
        "ObjectProperty" => PropertyValue::Object(cursor.read_fstring()?),
        "SoftObjectProperty" => read_soft_object(cursor)?,
        _ => return Ok(None),
    };

    Ok(Some(value))
}

fn read_soft_object(cursor: &mut Cursor) -> Result<PropertyValue, Error> {
    let asset_path = cursor.read_fstring()?;
    let sub_path = cursor.read_fstring()?;
    Ok(PropertyValue::SoftObject {
        asset_path,
        sub_path,
    })
}

#[inline]
/// Structs with a layout known ahead of time. `Transform` counts as it is
/// lifted into a typed value.
fn has_fixed_layout(struct_name: &str) -> bool {
    matches!(
        struct_name,
        "Vector"
            | "Vector2D"
            | "Rotator"
            | "Quat"
            | "LinearColor"
            | "Color"
            | "IntPoint"
            | "Guid"
            | "DateTime"
            | "Timespan"
            | "Transform"
    )
}

fn read_real(cursor: &mut Cursor, wide: bool) -> Result<f64, Error> {
    if wide {
        cursor.read_f64()
    } else {
        cursor.read_f32().map(f64::from)
    }
}

fn read_vector(cursor: &mut Cursor, wide: bool) -> Result<Vector, Error> {
    Ok(Vector {
        x: read_real(cursor, wide)?,
        y: read_real(cursor, wide)?,
        z: read_real(cursor, wide)?,
    })
}

fn read_quat(cursor: &mut Cursor, wide: bool) -> Result<Quat, Error> {
    Ok(Quat {
        x: read_real(cursor, wide)?,
        y: read_real(cursor, wide)?,
        z: read_real(cursor, wide)?,
        w: read_real(cursor, wide)?,
    })
}
