use crate::util::get_split;
use crate::{Error, ErrorKind};
use encoding_rs::{UTF_16LE, WINDOWS_1252};

/// A saved cursor position that can be returned to with [`Cursor::restore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    index: usize,
}

/// Sequential little endian reader over a fixed byte buffer.
///
/// Every read either advances the cursor by exactly the bytes it consumed or
/// fails with [`ErrorKind::TruncatedBuffer`] and leaves the cursor untouched.
/// The only way to move backwards is to [`restore`](Cursor::restore) a
/// [`Checkpoint`].
///
/// ```
/// use savetrack::gvas::Cursor;
///
/// let data = [0x2a, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, b'a', b'b', b'c', 0x00];
/// let mut cursor = Cursor::new(&data);
/// assert_eq!(cursor.read_u32().unwrap(), 42);
/// assert_eq!(cursor.read_fstring().unwrap(), "abc");
/// assert!(cursor.is_empty());
/// assert!(cursor.read_u8().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    full: &'a [u8],
    data: &'a [u8],
    base: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor at the start of `data`
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Cursor::with_base(data, 0)
    }

    /// Creates a cursor whose reported positions start at `base`. Used for
    /// payload cursors so errors carry offsets into the whole file.
    #[inline]
    pub(crate) fn with_base(data: &'a [u8], base: usize) -> Self {
        Cursor {
            full: data,
            data,
            base,
        }
    }

    /// Absolute offset of the next byte to be read
    #[inline]
    pub fn position(&self) -> usize {
        self.base + (self.full.len() - self.data.len())
    }

    /// The bytes not yet read
    #[inline]
    pub fn remainder(&self) -> &'a [u8] {
        self.data
    }

    /// Number of bytes not yet read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    fn truncated(&self, needed: usize) -> Error {
        Error::new(ErrorKind::TruncatedBuffer {
            offset: self.position(),
            needed,
        })
    }

    #[inline]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            index: self.full.len() - self.data.len(),
        }
    }

    /// Rewinds (or fast forwards) to a checkpoint taken from this cursor
    #[inline]
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        if let Some(data) = self.full.get(checkpoint.index..) {
            self.data = data;
        }
    }

    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let (head, rest) = get_split::<N>(self.data).ok_or_else(|| self.truncated(N))?;
        self.data = rest;
        Ok(head)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        self.read_array::<1>().map(|x| x[0])
    }

    #[inline]
    pub fn read_i8(&mut self) -> Result<i8, Error> {
        self.read_array::<1>().map(i8::from_le_bytes)
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16, Error> {
        self.read_array::<2>().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn read_i16(&mut self) -> Result<i16, Error> {
        self.read_array::<2>().map(i16::from_le_bytes)
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32, Error> {
        self.read_array::<4>().map(u32::from_le_bytes)
    }

    #[inline]
    pub fn read_i32(&mut self) -> Result<i32, Error> {
        self.read_array::<4>().map(i32::from_le_bytes)
    }

    #[inline]
    pub fn read_u64(&mut self) -> Result<u64, Error> {
        self.read_array::<8>().map(u64::from_le_bytes)
    }

    #[inline]
    pub fn read_i64(&mut self) -> Result<i64, Error> {
        self.read_array::<8>().map(i64::from_le_bytes)
    }

    #[inline]
    pub fn read_f32(&mut self) -> Result<f32, Error> {
        self.read_array::<4>().map(f32::from_le_bytes)
    }

    #[inline]
    pub fn read_f64(&mut self) -> Result<f64, Error> {
        self.read_array::<8>().map(f64::from_le_bytes)
    }

    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if len > self.data.len() {
            return Err(self.truncated(len));
        }

        let (head, rest) = self.data.split_at(len);
        self.data = rest;
        Ok(head)
    }

    #[inline]
    pub fn skip(&mut self, len: usize) -> Result<(), Error> {
        self.read_bytes(len).map(|_| ())
    }

    /// Consumes and returns every byte not yet read
    #[inline]
    pub fn read_rest(&mut self) -> &'a [u8] {
        let (rest, empty) = self.data.split_at(self.data.len());
        self.data = empty;
        rest
    }

    /// Splits the next `len` bytes off into their own cursor and advances
    /// past them. Reads on the returned cursor can never spill into the
    /// bytes that follow.
    #[inline]
    pub fn take(&mut self, len: usize) -> Result<Cursor<'a>, Error> {
        let base = self.position();
        let data = self.read_bytes(len)?;
        Ok(Cursor::with_base(data, base))
    }

    /// Reads a length prefixed engine string.
    ///
    /// A positive length counts single byte (windows-1252) characters, a
    /// negative length counts UTF-16 code units. Both include a trailing nul
    /// which is not part of the returned string.
    pub fn read_fstring(&mut self) -> Result<String, Error> {
        let checkpoint = self.checkpoint();
        let len = self.read_i32()?;
        let result = match len {
            0 => Ok(String::new()),
            l if l > 0 => self.read_bytes(l as usize).map(|data| {
                let (text, _) = WINDOWS_1252.decode_without_bom_handling(strip_nul(data));
                text.into_owned()
            }),
            l => {
                let units = (l as i64).unsigned_abs() as usize;
                match units.checked_mul(2) {
                    Some(byte_len) => self.read_bytes(byte_len).map(|data| {
                        let (text, _) = UTF_16LE.decode_without_bom_handling(data);
                        let text = text.into_owned();
                        match text.strip_suffix('\0') {
                            Some(x) => x.to_string(),
                            None => text,
                        }
                    }),
                    None => Err(self.truncated(usize::MAX)),
                }
            }
        };

        if result.is_err() {
            self.restore(checkpoint);
        }

        result
    }
}

#[inline]
fn strip_nul(data: &[u8]) -> &[u8] {
    match data.split_last() {
        Some((0, rest)) => rest,
        _ => data,
    }
}
