use std::fmt;

/// An error that can occur when decoding a save or reconciling it
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error(Box::new(kind))
    }

    /// Return the specific type of error
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Consume the error and return the specific type of error
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns the byte offset that the error occurs (if available)
    pub fn offset(&self) -> Option<usize> {
        self.0.offset()
    }

    /// Returns true if the error came from decoding the save data. A host
    /// shows these to the user as an incompatible or corrupt file.
    pub fn is_decode(&self) -> bool {
        matches!(
            *self.0,
            ErrorKind::TruncatedBuffer { .. }
                | ErrorKind::MissingTerminator { .. }
                | ErrorKind::ExcessiveNesting { .. }
                | ErrorKind::InvalidHeader { .. }
        )
    }
}

/// Specific type of error
#[derive(Debug)]
pub enum ErrorKind {
    /// A read of `needed` bytes at `offset` exceeded the buffer
    TruncatedBuffer { offset: usize, needed: usize },

    /// A nested property list ran out of data before its "None" terminator
    MissingTerminator { offset: usize },

    /// Structs, arrays, and maps were nested deeper than the decoder allows
    ExcessiveNesting { offset: usize },

    /// The file started with the save magic but the header was malformed
    InvalidHeader { offset: usize, msg: &'static str },

    /// A load was requested while another load was still being processed
    ReentrantLoad,

    /// The settings collaborator failed to persist the value store
    Settings(SettingsError),
}

impl ErrorKind {
    pub fn offset(&self) -> Option<usize> {
        match *self {
            ErrorKind::TruncatedBuffer { offset, .. } => Some(offset),
            ErrorKind::MissingTerminator { offset } => Some(offset),
            ErrorKind::ExcessiveNesting { offset } => Some(offset),
            ErrorKind::InvalidHeader { offset, .. } => Some(offset),
            _ => None,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self.0 {
            ErrorKind::Settings(ref err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            ErrorKind::TruncatedBuffer { offset, needed } => write!(
                f,
                "truncated buffer: needed {} bytes at offset {}",
                needed, offset
            ),
            ErrorKind::MissingTerminator { offset } => write!(
                f,
                "property list ended without a None terminator (offset: {})",
                offset
            ),
            ErrorKind::ExcessiveNesting { offset } => {
                write!(f, "properties nested too deeply (offset: {})", offset)
            }
            ErrorKind::InvalidHeader { offset, msg } => {
                write!(f, "invalid save header: {} (offset: {})", msg, offset)
            }
            ErrorKind::ReentrantLoad => write!(f, "a save is already being loaded"),
            ErrorKind::Settings(ref err) => write!(f, "settings error: {}", err),
        }
    }
}

impl From<SettingsError> for Error {
    fn from(error: SettingsError) -> Self {
        Error::new(ErrorKind::Settings(error))
    }
}

/// Failure reported by a settings store when committing
#[derive(Debug)]
pub struct SettingsError {
    kind: SettingsErrorKind,
}

impl SettingsError {
    /// Return the underlying error kind.
    pub fn kind(&self) -> &SettingsErrorKind {
        &self.kind
    }
}

/// The type of settings failure
#[derive(Debug)]
pub enum SettingsErrorKind {
    /// Writing the settings document failed
    Io(std::io::Error),

    /// The settings document could not be serialized or parsed
    #[cfg(feature = "json")]
    Json(serde_json::Error),
}

impl From<SettingsErrorKind> for SettingsError {
    fn from(kind: SettingsErrorKind) -> Self {
        SettingsError { kind }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(error: std::io::Error) -> Self {
        SettingsError {
            kind: SettingsErrorKind::Io(error),
        }
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for SettingsError {
    fn from(error: serde_json::Error) -> Self {
        SettingsError {
            kind: SettingsErrorKind::Json(error),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            SettingsErrorKind::Io(err) => Some(err),
            #[cfg(feature = "json")]
            SettingsErrorKind::Json(err) => Some(err),
        }
    }
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            SettingsErrorKind::Io(err) => write!(f, "IO error: {}", err),
            #[cfg(feature = "json")]
            SettingsErrorKind::Json(err) => write!(f, "JSON error: {}", err),
        }
    }
}

/// A recoverable oddity found while decoding. Decoding continues past it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostic {
    /// Byte offset of the property payload the diagnostic refers to
    pub offset: usize,

    /// What was encountered
    pub kind: DiagnosticKind,
}

/// Kinds of recoverable decode conditions
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DiagnosticKind {
    /// Struct name without a fixed layout; decoded as a nested property list
    UnrecognizedStruct { struct_name: String },

    /// Property type the decoder does not model; payload kept opaque
    UnsupportedProperty { type_tag: String },

    /// A primitive's declared size differs from its natural width
    SizeMismatch {
        type_tag: String,
        expected: usize,
        declared: u32,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::UnrecognizedStruct { struct_name } => write!(
                f,
                "struct {} decoded as property list (offset: {})",
                struct_name, self.offset
            ),
            DiagnosticKind::UnsupportedProperty { type_tag } => write!(
                f,
                "unsupported property type {} kept opaque (offset: {})",
                type_tag, self.offset
            ),
            DiagnosticKind::SizeMismatch {
                type_tag,
                expected,
                declared,
            } => write!(
                f,
                "{} declared {} bytes but is {} wide (offset: {})",
                type_tag, declared, expected, self.offset
            ),
        }
    }
}
