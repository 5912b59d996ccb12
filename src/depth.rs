use std::fmt;

pub(crate) const MAX_DEPTH: usize = 32;

/// Containers that carry their own property list or element sequence
#[derive(Debug, PartialEq, Clone, Copy)]
#[repr(u8)]
pub(crate) enum DepthType {
    Struct = 1,
    Array,
    Map,
}

impl fmt::Display for DepthType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DepthType::Struct => f.write_str("struct"),
            DepthType::Array => f.write_str("array"),
            DepthType::Map => f.write_str("map"),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
struct Frame {
    kind: DepthType,
    offset: usize,
}

/// Fixed capacity stack of the containers the decoder is currently inside.
/// Save data is untrusted, so a full stack stops the descent before
/// recursion can exhaust the call stack. Each frame remembers the offset of
/// the payload that opened it for error reporting.
#[derive(Debug, PartialEq, Clone)]
pub(crate) struct Depth {
    depth: usize,
    frames: [Frame; MAX_DEPTH],
}

impl Depth {
    pub fn new() -> Self {
        Depth {
            depth: 0,
            frames: [Frame {
                kind: DepthType::Struct,
                offset: 0,
            }; MAX_DEPTH],
        }
    }

    /// Enters a container whose payload starts at `offset`. Returns false
    /// when the stack is full.
    pub fn push(&mut self, kind: DepthType, offset: usize) -> bool {
        if self.depth >= self.frames.len() {
            false
        } else {
            self.frames[self.depth] = Frame { kind, offset };
            self.depth += 1;
            true
        }
    }

    pub fn pop(&mut self) -> Option<DepthType> {
        if self.depth > 0 {
            self.depth -= 1;
            Some(self.frames[self.depth].kind)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.depth
    }

    /// Renders the open containers from outermost to innermost, eg:
    /// `struct@12 > array@40`
    pub fn trail(&self) -> String {
        let mut out = String::new();
        for (i, frame) in self.frames[..self.depth].iter().enumerate() {
            if i > 0 {
                out.push_str(" > ");
            }
            out.push_str(&format!("{}@{}", frame.kind, frame.offset));
        }
        out
    }
}
