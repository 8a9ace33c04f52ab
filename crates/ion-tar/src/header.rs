//! Tar header encoding.
//!
//! Produces the 512-byte POSIX-ustar-compatible header this format's
//! readers expect, bit for bit:
//!
//! | Offset | Length | Field                                   |
//! |--------|--------|-----------------------------------------|
//! | 0      | 100    | name, right-truncated to the last 100 B |
//! | 100    | 8      | mode, `000644 \0` / `000755 \0`         |
//! | 108    | 8      | uid, `001750 \0`                        |
//! | 116    | 8      | gid, `001750 \0`                        |
//! | 124    | 12     | size, 11-digit octal + space            |
//! | 136    | 12     | mtime, 11-digit octal + space           |
//! | 148    | 8      | checksum                                |
//! | 156    | 1      | type flag, `0` file / `5` directory     |
//! | 257    | 8      | magic `ustar\0` + version `00`          |
//! | 265    | 4      | user name `user`                        |
//! | 297    | 5      | group name `users`                      |
//! | 329    | 7      | device major, `000000 `                 |
//! | 337    | 7      | device minor, `000000 `                 |
//!
//! The checksum is the unsigned byte sum over the full header with the
//! checksum field held as spaces, written back as 6-digit zero-padded
//! octal, NUL, space.

use chrono::{DateTime, Utc};

/// Tar block length; headers and content padding align to this.
pub const BLOCK_LEN: usize = 512;

/// Length of the all-zero end-of-archive marker (two blocks).
pub const END_MARKER_LEN: usize = 1024;

/// Maximum encoded name length (tar name field).
pub const NAME_LEN: usize = 100;

/// Entry type written into the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    fn type_flag(self) -> u8 {
        match self {
            EntryKind::File => b'0',
            EntryKind::Directory => b'5',
        }
    }

    fn mode(self) -> &'static [u8; 8] {
        match self {
            EntryKind::File => b"000644 \0",
            EntryKind::Directory => b"000755 \0",
        }
    }
}

/// Unsigned sum over all 512 header bytes.
pub fn header_checksum(header: &[u8; BLOCK_LEN]) -> u32 {
    header.iter().map(|&b| u32::from(b)).sum()
}

/// Encode a tar header block.
pub fn write_header(
    archive_path: &str,
    size: u64,
    mtime: DateTime<Utc>,
    kind: EntryKind,
) -> [u8; BLOCK_LEN] {
    let mut header = [0u8; BLOCK_LEN];

    // name: keep the tail when too long
    let name = truncate_name(archive_path);
    header[..name.len()].copy_from_slice(name.as_bytes());

    header[100..108].copy_from_slice(kind.mode());
    header[108..116].copy_from_slice(b"001750 \0");
    header[116..124].copy_from_slice(b"001750 \0");

    write_octal_11(&mut header[124..136], size);
    let timestamp = mtime.timestamp().max(0) as u64;
    write_octal_11(&mut header[136..148], timestamp);

    // checksum field counts as spaces while summing
    header[148..156].copy_from_slice(b"        ");
    header[156] = kind.type_flag();

    header[257..265].copy_from_slice(b"ustar\x0000");
    header[265..269].copy_from_slice(b"user");
    header[297..302].copy_from_slice(b"users");
    header[329..336].copy_from_slice(b"000000 ");
    header[337..344].copy_from_slice(b"000000 ");

    let checksum = header_checksum(&header);
    let digits = format!("{checksum:06o}");
    header[148..154].copy_from_slice(digits.as_bytes());
    header[154] = 0;
    header[155] = b' ';

    header
}

/// 11-digit zero-padded octal plus a trailing space.
fn write_octal_11(field: &mut [u8], value: u64) {
    let digits = format!("{value:011o}");
    field[..11].copy_from_slice(digits.as_bytes());
    field[11] = b' ';
}

/// Keep the last 100 encoded bytes of a path, on a character boundary.
fn truncate_name(path: &str) -> &str {
    let bytes = path.len();
    if bytes <= NAME_LEN {
        return path;
    }
    let mut start = bytes - NAME_LEN;
    while !path.is_char_boundary(start) {
        start += 1;
    }
    &path[start..]
}

/// Bytes of zero padding needed to align `size` to the block length.
pub fn padding_for(size: u64) -> usize {
    let rem = (size % BLOCK_LEN as u64) as usize;
    if rem == 0 { 0 } else { BLOCK_LEN - rem }
}
