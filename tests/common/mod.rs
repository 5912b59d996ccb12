#![allow(dead_code)]

/// Appends a length prefixed, NUL terminated string
pub fn fstring(out: &mut Vec<u8>, s: &str) {
    if s.is_empty() {
        out.extend_from_slice(&0i32.to_le_bytes());
        return;
    }

    out.extend_from_slice(&(s.len() as i32 + 1).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

/// Appends a string in its UTF-16 form
pub fn fstring_utf16(out: &mut Vec<u8>, s: &str) {
    let units: Vec<u16> = s.encode_utf16().chain(std::iter::once(0)).collect();
    out.extend_from_slice(&(-(units.len() as i32)).to_le_bytes());
    for unit in units {
        out.extend_from_slice(&unit.to_le_bytes());
    }
}

/// A save header as written by a 4.27 engine
pub fn header(class: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"GVAS");
    out.extend_from_slice(&2i32.to_le_bytes());
    out.extend_from_slice(&522i32.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&27u16.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&18319896u32.to_le_bytes());
    fstring(&mut out, "++UE4+Release-4.27");
    out.extend_from_slice(&3i32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&[7u8; 16]);
    out.extend_from_slice(&12i32.to_le_bytes());
    fstring(&mut out, class);
    out
}

/// Builds a property list byte by byte
#[derive(Debug, Default, Clone)]
pub struct Props {
    data: Vec<u8>,
}

impl Props {
    pub fn new() -> Self {
        Props::default()
    }

    /// Writes a property with arbitrary tag data and payload. The declared
    /// size is the payload length.
    pub fn raw(self, name: &str, type_tag: &str, tag_data: &[u8], payload: &[u8]) -> Self {
        self.sized(name, type_tag, tag_data, payload.len() as u32, payload)
    }

    /// Writes a property whose declared size is given explicitly
    pub fn sized(
        mut self,
        name: &str,
        type_tag: &str,
        tag_data: &[u8],
        size: u32,
        payload: &[u8],
    ) -> Self {
        fstring(&mut self.data, name);
        fstring(&mut self.data, type_tag);
        self.data.extend_from_slice(&size.to_le_bytes());
        self.data.extend_from_slice(&0u32.to_le_bytes());
        self.data.extend_from_slice(tag_data);
        self.data.push(0);
        self.data.extend_from_slice(payload);
        self
    }

    pub fn int(self, name: &str, value: i32) -> Self {
        self.raw(name, "IntProperty", &[], &value.to_le_bytes())
    }

    pub fn float(self, name: &str, value: f32) -> Self {
        self.raw(name, "FloatProperty", &[], &value.to_le_bytes())
    }

    pub fn bool(self, name: &str, value: bool) -> Self {
        self.raw(name, "BoolProperty", &[value as u8], &[])
    }

    pub fn str(self, name: &str, value: &str) -> Self {
        let mut payload = Vec::new();
        fstring(&mut payload, value);
        self.raw(name, "StrProperty", &[], &payload)
    }

    pub fn object(self, name: &str, path: &str) -> Self {
        let mut payload = Vec::new();
        fstring(&mut payload, path);
        self.raw(name, "ObjectProperty", &[], &payload)
    }

    pub fn enumeration(self, name: &str, enum_name: &str, value: &str) -> Self {
        let mut tag = Vec::new();
        fstring(&mut tag, enum_name);
        let mut payload = Vec::new();
        fstring(&mut payload, value);
        self.raw(name, "EnumProperty", &tag, &payload)
    }

    /// An array of string-like elements of the given inner type
    pub fn strings(self, name: &str, inner_type: &str, values: &[&str]) -> Self {
        let mut tag = Vec::new();
        fstring(&mut tag, inner_type);
        let mut payload = Vec::new();
        payload.extend_from_slice(&(values.len() as u32).to_le_bytes());
        for value in values {
            fstring(&mut payload, value);
        }
        self.raw(name, "ArrayProperty", &tag, &payload)
    }

    /// An array of object paths, the way sections are written
    pub fn objects(self, name: &str, paths: &[&str]) -> Self {
        self.strings(name, "ObjectProperty", paths)
    }

    pub fn ints(self, name: &str, values: &[i32]) -> Self {
        let mut tag = Vec::new();
        fstring(&mut tag, "IntProperty");
        let mut payload = Vec::new();
        payload.extend_from_slice(&(values.len() as u32).to_le_bytes());
        for value in values {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        self.raw(name, "ArrayProperty", &tag, &payload)
    }

    /// An array whose element type has no known layout
    pub fn unknown_array(self, name: &str, inner_type: &str, payload: &[u8]) -> Self {
        let mut tag = Vec::new();
        fstring(&mut tag, inner_type);
        self.raw(name, "ArrayProperty", &tag, payload)
    }

    /// A struct with a fixed layout body
    pub fn fixed_struct(self, name: &str, struct_name: &str, body: &[u8]) -> Self {
        self.raw(name, "StructProperty", &struct_tag(struct_name), body)
    }

    /// A single precision vector struct
    pub fn vector(self, name: &str, x: f32, y: f32, z: f32) -> Self {
        let mut body = Vec::new();
        for c in [x, y, z] {
            body.extend_from_slice(&c.to_le_bytes());
        }
        self.fixed_struct(name, "Vector", &body)
    }

    /// A struct whose body is a terminated property list
    pub fn nested(self, name: &str, struct_name: &str, body: Props) -> Self {
        self.fixed_struct(name, struct_name, &body.finish())
    }

    /// A struct whose body lacks the terminating sentinel
    pub fn nested_unterminated(self, name: &str, struct_name: &str, body: Props) -> Self {
        self.fixed_struct(name, struct_name, &body.into_bytes())
    }

    /// A map of strings to strings
    pub fn string_map(self, name: &str, entries: &[(&str, &str)]) -> Self {
        let mut tag = Vec::new();
        fstring(&mut tag, "StrProperty");
        fstring(&mut tag, "StrProperty");
        let mut payload = Vec::new();
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for (key, value) in entries {
            fstring(&mut payload, key);
            fstring(&mut payload, value);
        }
        self.raw(name, "MapProperty", &tag, &payload)
    }

    /// A map whose key or value type has no known layout
    pub fn opaque_map(self, name: &str, key_type: &str, value_type: &str, payload: &[u8]) -> Self {
        let mut tag = Vec::new();
        fstring(&mut tag, key_type);
        fstring(&mut tag, value_type);
        self.raw(name, "MapProperty", &tag, payload)
    }

    /// Terminates the list with the sentinel
    pub fn finish(mut self) -> Vec<u8> {
        fstring(&mut self.data, "None");
        self.data
    }

    /// The list without a terminating sentinel
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

fn struct_tag(struct_name: &str) -> Vec<u8> {
    let mut tag = Vec::new();
    fstring(&mut tag, struct_name);
    tag.extend_from_slice(&[0u8; 16]);
    tag
}
