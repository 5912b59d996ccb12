use super::cursor::Cursor;
use crate::{Error, ErrorKind};

/// Magic bytes that open an engine save file
pub const MAGIC: &[u8; 4] = b"GVAS";

/// Version of the engine that wrote the save
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EngineVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub changelist: u32,
    pub branch: String,
}

/// An entry in the custom version table
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CustomVersion {
    pub guid: [u8; 16],
    pub version: i32,
}

/// The envelope preceding the top level property list
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SaveHeader {
    pub save_game_version: i32,
    pub package_version: i32,

    /// Only written by save game version 3 and later
    pub package_version_ue5: Option<i32>,
    pub engine_version: EngineVersion,
    pub custom_version_format: i32,
    pub custom_versions: Vec<CustomVersion>,

    /// Class of the engine object that was saved
    pub save_game_class: String,
}

impl SaveHeader {
    /// Returns true if the data starts with the save magic
    pub fn is_present(data: &[u8]) -> bool {
        data.starts_with(MAGIC)
    }

    /// Reads the header, leaving the cursor on the first property
    pub fn parse(cursor: &mut Cursor) -> Result<SaveHeader, Error> {
        let magic = cursor.read_array::<4>()?;
        if &magic != MAGIC {
            return Err(Error::new(ErrorKind::InvalidHeader {
                offset: 0,
                msg: "missing save magic",
            }));
        }

        let save_game_version = cursor.read_i32()?;
        let package_version = cursor.read_i32()?;
        let package_version_ue5 = if save_game_version >= 3 {
            Some(cursor.read_i32()?)
        } else {
            None
        };

        let engine_version = EngineVersion {
            major: cursor.read_u16()?,
            minor: cursor.read_u16()?,
            patch: cursor.read_u16()?,
            changelist: cursor.read_u32()?,
            branch: cursor.read_fstring()?,
        };

        let custom_version_format = cursor.read_i32()?;
        let offset = cursor.position();
        let count = cursor.read_u32()? as usize;
        if count > cursor.remaining() / 20 {
            return Err(Error::new(ErrorKind::InvalidHeader {
                offset,
                msg: "custom version table larger than file",
            }));
        }

        let mut custom_versions = Vec::with_capacity(count);
        for _ in 0..count {
            custom_versions.push(CustomVersion {
                guid: cursor.read_array::<16>()?,
                version: cursor.read_i32()?,
            });
        }

        let save_game_class = cursor.read_fstring()?;
        Ok(SaveHeader {
            save_game_version,
            package_version,
            package_version_ue5,
            engine_version,
            custom_version_format,
            custom_versions,
            save_game_class,
        })
    }
}
