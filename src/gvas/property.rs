/// The reserved property name that terminates every property list
pub const NONE: &str = "None";

/// One named, typed value decoded from a property list
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Property {
    /// Identifier within the parent list
    pub name: String,

    /// Wire type name (eg: `IntProperty`)
    pub type_tag: String,

    /// Declared payload length in bytes
    pub size: u32,

    /// Index for statically sized engine arrays (usually zero)
    pub array_index: u32,

    /// Absolute offset of the first payload byte
    pub offset: usize,

    pub value: PropertyValue,
}

impl Property {
    /// Returns the offset one past the end of the payload. The decoder
    /// always leaves the cursor here.
    pub fn end_offset(&self) -> usize {
        self.offset + self.size as usize
    }
}

/// Decoded payload of a property, array element, or map entry
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PropertyValue {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    UInt16(u16),
    Int(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),

    /// Raw byte of a `ByteProperty` without an enum
    Byte(u8),

    /// Enumerated value of a `ByteProperty` or `EnumProperty`
    Enum { enum_name: String, value: String },

    Str(String),
    Name(String),

    /// Path of another engine object
    Object(String),

    SoftObject { asset_path: String, sub_path: String },

    Struct(StructValue),
    Array(ArrayValue),
    Set(ArrayValue),
    Map(MapValue),

    /// Payload of a type the decoder does not model
    Opaque(Vec<u8>),
}

impl PropertyValue {
    /// Returns the textual content if the value is a string-like scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(x) | PropertyValue::Name(x) | PropertyValue::Object(x) => {
                Some(x.as_str())
            }
            PropertyValue::Enum { value, .. } => Some(value.as_str()),
            PropertyValue::SoftObject { asset_path, .. } => Some(asset_path.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            PropertyValue::Array(x) | PropertyValue::Set(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            PropertyValue::Struct(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            PropertyValue::Map(x) => Some(x),
            _ => None,
        }
    }
}

/// A struct payload: its engine type name and decoded body
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StructValue {
    pub type_name: String,
    pub body: StructBody,
}

impl StructValue {
    /// Looks up a member of a struct decoded as a property list
    pub fn get(&self, name: &str) -> Option<&Property> {
        match &self.body {
            StructBody::Properties(props) => props.iter().find(|p| p.name == name),
            _ => None,
        }
    }
}

/// Struct bodies with a well known binary layout, or a generic property list
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum StructBody {
    Vector(Vector),
    Vector2D(Vector2D),
    Rotator(Rotator),
    Quat(Quat),
    LinearColor(LinearColor),
    Color(Color),
    IntPoint(IntPoint),
    Guid([u8; 16]),

    /// Ticks of a `DateTime`
    DateTime(i64),

    /// Ticks of a `Timespan`
    Timespan(i64),

    Transform(Transform),
    Properties(Vec<Property>),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vector2D {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Rotator {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LinearColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IntPoint {
    pub x: i32,
    pub y: i32,
}

/// Translation, rotation, and scale lifted out of a `Transform` struct
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Transform {
    pub translation: Vector,
    pub rotation: Quat,
    pub scale: Vector,
}

impl Transform {
    /// Builds a transform from the members of a decoded `Transform` struct.
    /// Missing rotation and scale fall back to identity; a missing
    /// translation means the list was not a transform.
    pub(crate) fn from_properties(props: &[Property]) -> Option<Transform> {
        let member = |name: &str| {
            props
                .iter()
                .find(|p| p.name == name)
                .and_then(|p| p.value.as_struct())
                .map(|s| &s.body)
        };

        let translation = match member("Translation")? {
            StructBody::Vector(v) => *v,
            _ => return None,
        };

        let rotation = match member("Rotation") {
            Some(StructBody::Quat(q)) => *q,
            _ => Quat {
                w: 1.0,
                ..Quat::default()
            },
        };

        let scale = match member("Scale3D") {
            Some(StructBody::Vector(v)) => *v,
            _ => Vector {
                x: 1.0,
                y: 1.0,
                z: 1.0,
            },
        };

        Some(Transform {
            translation,
            rotation,
            scale,
        })
    }
}

/// Elements of an `ArrayProperty` or `SetProperty`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ArrayValue {
    /// Wire type of every element
    pub inner_type: String,

    /// Engine struct name when the elements are structs
    pub struct_type: Option<String>,

    pub values: Vec<PropertyValue>,
}

impl ArrayValue {
    /// Iterates the elements that are string-like
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.values.iter().filter_map(|x| x.as_str())
    }
}

/// Entries of a `MapProperty`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MapValue {
    pub key_type: String,
    pub value_type: String,
    pub entries: Vec<(PropertyValue, PropertyValue)>,
}
