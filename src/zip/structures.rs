use byteorder::{LittleEndian, WriteBytesExt};
use std::fmt;
use std::io::{self, Write};

use crate::io::ByteSource;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMethod {
    #[default]
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionMethod::Stored => f.write_str("stored"),
            CompressionMethod::Deflate => f.write_str("deflated"),
            CompressionMethod::Unknown(v) => write!(f, "method {}", v),
        }
    }
}

/// External attribute bit marking a directory entry (MS-DOS attribute)
pub const DIRECTORY_ATTRIBUTE: u32 = 0x10;

/// End of Central Directory (EOCD) - 22 bytes minimum
///
/// Followed by `comment_length` bytes of archive comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub signature: u32,
    pub disk_number: u16,
    pub central_disk: u16,
    pub records_this_disk: u16,
    pub records_total: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_length: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: u32 = 0x06054b50;
    pub const SIZE: usize = 22;

    pub fn read_from<S: ByteSource + ?Sized>(source: &mut S) -> Self {
        Self {
            signature: source.get_u32_le(),
            disk_number: source.get_u16_le(),
            central_disk: source.get_u16_le(),
            records_this_disk: source.get_u16_le(),
            records_total: source.get_u16_le(),
            cd_size: source.get_u32_le(),
            cd_offset: source.get_u32_le(),
            comment_length: source.get_u16_le(),
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_u32::<LittleEndian>(self.signature)?;
        out.write_u16::<LittleEndian>(self.disk_number)?;
        out.write_u16::<LittleEndian>(self.central_disk)?;
        out.write_u16::<LittleEndian>(self.records_this_disk)?;
        out.write_u16::<LittleEndian>(self.records_total)?;
        out.write_u32::<LittleEndian>(self.cd_size)?;
        out.write_u32::<LittleEndian>(self.cd_offset)?;
        out.write_u16::<LittleEndian>(self.comment_length)
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
///
/// Followed by the file name, extra field and file comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CentralDirectoryFileHeader {
    pub signature: u32,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub file_comment_length: u16,
    pub disk_number_start: u16,
    pub internal_attributes: u16,
    pub external_attributes: u32,
    pub lfh_offset: u32,
}

impl CentralDirectoryFileHeader {
    pub const SIGNATURE: u32 = 0x02014b50;
    pub const SIZE: usize = 46;

    pub fn read_from<S: ByteSource + ?Sized>(source: &mut S) -> Self {
        Self {
            signature: source.get_u32_le(),
            version_made_by: source.get_u16_le(),
            version_needed: source.get_u16_le(),
            flags: source.get_u16_le(),
            compression_method: CompressionMethod::from_u16(source.get_u16_le()),
            last_mod_time: source.get_u16_le(),
            last_mod_date: source.get_u16_le(),
            crc32: source.get_u32_le(),
            compressed_size: source.get_u32_le(),
            uncompressed_size: source.get_u32_le(),
            file_name_length: source.get_u16_le(),
            extra_field_length: source.get_u16_le(),
            file_comment_length: source.get_u16_le(),
            disk_number_start: source.get_u16_le(),
            internal_attributes: source.get_u16_le(),
            external_attributes: source.get_u32_le(),
            lfh_offset: source.get_u32_le(),
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_u32::<LittleEndian>(self.signature)?;
        out.write_u16::<LittleEndian>(self.version_made_by)?;
        out.write_u16::<LittleEndian>(self.version_needed)?;
        out.write_u16::<LittleEndian>(self.flags)?;
        out.write_u16::<LittleEndian>(self.compression_method.as_u16())?;
        out.write_u16::<LittleEndian>(self.last_mod_time)?;
        out.write_u16::<LittleEndian>(self.last_mod_date)?;
        out.write_u32::<LittleEndian>(self.crc32)?;
        out.write_u32::<LittleEndian>(self.compressed_size)?;
        out.write_u32::<LittleEndian>(self.uncompressed_size)?;
        out.write_u16::<LittleEndian>(self.file_name_length)?;
        out.write_u16::<LittleEndian>(self.extra_field_length)?;
        out.write_u16::<LittleEndian>(self.file_comment_length)?;
        out.write_u16::<LittleEndian>(self.disk_number_start)?;
        out.write_u16::<LittleEndian>(self.internal_attributes)?;
        out.write_u32::<LittleEndian>(self.external_attributes)?;
        out.write_u32::<LittleEndian>(self.lfh_offset)
    }

    pub fn is_directory(&self) -> bool {
        self.external_attributes & DIRECTORY_ATTRIBUTE != 0
    }

    /// Whether every field the local header repeats matches this header.
    pub fn matches_local(&self, local: &LocalFileHeader) -> bool {
        self.version_needed == local.version_needed
            && self.flags == local.flags
            && self.compression_method == local.compression_method
            && self.last_mod_time == local.last_mod_time
            && self.last_mod_date == local.last_mod_date
            && self.crc32 == local.crc32
            && self.compressed_size == local.compressed_size
            && self.uncompressed_size == local.uncompressed_size
            && self.file_name_length == local.file_name_length
    }
}

/// Local File Header (LFH) - 30 bytes
///
/// Followed by the file name, extra field and the entry data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub signature: u32,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: u32 = 0x04034b50;
    pub const SIZE: usize = 30;

    pub fn read_from<S: ByteSource + ?Sized>(source: &mut S) -> Self {
        Self {
            signature: source.get_u32_le(),
            version_needed: source.get_u16_le(),
            flags: source.get_u16_le(),
            compression_method: CompressionMethod::from_u16(source.get_u16_le()),
            last_mod_time: source.get_u16_le(),
            last_mod_date: source.get_u16_le(),
            crc32: source.get_u32_le(),
            compressed_size: source.get_u32_le(),
            uncompressed_size: source.get_u32_le(),
            file_name_length: source.get_u16_le(),
            extra_field_length: source.get_u16_le(),
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_u32::<LittleEndian>(self.signature)?;
        out.write_u16::<LittleEndian>(self.version_needed)?;
        out.write_u16::<LittleEndian>(self.flags)?;
        out.write_u16::<LittleEndian>(self.compression_method.as_u16())?;
        out.write_u16::<LittleEndian>(self.last_mod_time)?;
        out.write_u16::<LittleEndian>(self.last_mod_date)?;
        out.write_u32::<LittleEndian>(self.crc32)?;
        out.write_u32::<LittleEndian>(self.compressed_size)?;
        out.write_u32::<LittleEndian>(self.uncompressed_size)?;
        out.write_u16::<LittleEndian>(self.file_name_length)?;
        out.write_u16::<LittleEndian>(self.extra_field_length)
    }
}

/// Parsed ZIP file entry information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
}

impl ZipFileEntry {
    pub(crate) fn from_header(file_name: &str, header: &CentralDirectoryFileHeader) -> Self {
        Self {
            file_name: file_name.to_string(),
            compression_method: header.compression_method,
            compressed_size: header.compressed_size as u64,
            uncompressed_size: header.uncompressed_size as u64,
            crc32: header.crc32,
            lfh_offset: header.lfh_offset as u64,
            last_mod_time: header.last_mod_time,
            last_mod_date: header.last_mod_date,
        }
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}
