//! Collation support for SQL Server VARCHAR decoding.
//!
//! A TDS collation is five bytes: a 32-bit info word carrying the LCID,
//! comparison flags and a version nibble, followed by a SQL sort id. Narrow
//! character columns (`CHAR`, `VARCHAR`, `TEXT`) are stored in the 8-bit code
//! page the collation selects; this module maps collations to a [`Charset`]
//! that converts between those bytes and Rust strings.
//!
//! # Selection order
//!
//! 1. A non-zero sort id selects its code page from the SQL sort-order table.
//! 2. Otherwise the LCID table is consulted.
//! 3. Unlisted LCIDs whose primary language is Japanese, Korean, Chinese or
//!    Thai fall back to the matching double-byte (or Thai) code page.
//! 4. Anything else, including fully-Unicode locales, is passed through
//!    without conversion.
//!
//! # Supported Encodings
//!
//! | Code Page | Encoding | Languages |
//! |-----------|----------|-----------|
//! | 437 | OEM United States (built-in table) | SQL sort orders 30–34 |
//! | 850 | OEM Multilingual Latin 1 (built-in table) | SQL sort orders 40–61 |
//! | 874 | Windows-874 (TIS-620) | Thai |
//! | 932 | Shift_JIS | Japanese |
//! | 936 | GBK | Simplified Chinese |
//! | 949 | EUC-KR (UHC) | Korean |
//! | 950 | Big5 | Traditional Chinese |
//! | 1250–1258 | Windows-125x | European, Cyrillic, Greek, Turkish, Hebrew, Arabic, Baltic, Vietnamese |
//!
//! # References
//!
//! - [MS-LCID: Windows Language Code Identifier Reference](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-lcid/)
//! - [Code Page Identifiers](https://learn.microsoft.com/en-us/windows/win32/intl/code-page-identifiers)

use std::fmt;

use bitflags::bitflags;
use bytes::{Buf, BufMut};
use encoding_rs::{EncoderResult, Encoding};

use crate::error::ProtocolError;

/// Mask to extract the LCID from the collation info word (lower 20 bits).
pub const LCID_MASK: u32 = 0x000F_FFFF;

/// Mask to extract the language id (lower 16 bits of the LCID).
pub const LANGUAGE_ID_MASK: u32 = 0x0000_FFFF;

/// Mask to extract the primary language from a language id.
const PRIMARY_LANGUAGE_MASK: u32 = 0x03FF;

bitflags! {
    /// Comparison flags stored in bits 20..28 of the collation info word.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct CollationFlags: u8 {
        /// Case-insensitive comparison.
        const IGNORE_CASE = 0x01;
        /// Accent-insensitive comparison.
        const IGNORE_ACCENT = 0x02;
        /// Width-insensitive comparison.
        const IGNORE_WIDTH = 0x04;
        /// Kana-insensitive comparison.
        const IGNORE_KANA = 0x08;
        /// Binary collation.
        const BINARY = 0x10;
        /// Code-point binary collation.
        const BINARY2 = 0x20;
        /// UTF-8 collation (SQL Server 2019+).
        const UTF8 = 0x40;
    }
}

/// SQL Server collation as carried in TYPE_INFO.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Collation {
    /// LCID, flags and version packed into a little-endian u32.
    pub info: u32,
    /// SQL sort order id (0 for Windows collations).
    pub sort_id: u8,
}

impl Collation {
    /// Wire size of a collation.
    pub const SIZE: usize = 5;

    /// Create a collation from its raw parts.
    #[must_use]
    pub const fn new(info: u32, sort_id: u8) -> Self {
        Self { info, sort_id }
    }

    /// Decode a collation from the wire.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < Self::SIZE {
            return Err(ProtocolError::UnexpectedEof);
        }
        let info = src.get_u32_le();
        let sort_id = src.get_u8();
        Ok(Self { info, sort_id })
    }

    /// Encode the collation to the wire.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.info);
        dst.put_u8(self.sort_id);
    }

    /// The locale id (lower 20 bits of the info word).
    #[must_use]
    pub const fn lcid(&self) -> u32 {
        self.info & LCID_MASK
    }

    /// The comparison flags.
    #[must_use]
    pub const fn flags(&self) -> CollationFlags {
        CollationFlags::from_bits_retain(((self.info >> 20) & 0xFF) as u8)
    }

    /// The collation version nibble.
    #[must_use]
    pub const fn version(&self) -> u8 {
        ((self.info >> 28) & 0x0F) as u8
    }

    /// Whether this is a UTF-8 collation.
    #[must_use]
    pub const fn is_utf8(&self) -> bool {
        self.flags().contains(CollationFlags::UTF8)
    }

    /// Code page used for narrow character data, if any.
    ///
    /// `None` means the bytes are passed through without conversion.
    #[must_use]
    pub fn code_page(&self) -> Option<u16> {
        if self.is_utf8() {
            return Some(65001);
        }
        if self.sort_id != 0 {
            if let Some(cp) = code_page_for_sort_id(self.sort_id) {
                return Some(cp);
            }
        }
        code_page_for_lcid(self.lcid())
    }

    /// Charset used to convert narrow character data.
    #[must_use]
    pub fn charset(&self) -> Charset {
        match self.code_page() {
            Some(cp) => Charset::for_code_page(cp),
            None => Charset::Passthrough,
        }
    }
}

/// Code page selected by a SQL sort order id.
#[must_use]
pub fn code_page_for_sort_id(sort_id: u8) -> Option<u16> {
    match sort_id {
        30..=34 => Some(437),
        40..=44 | 49 | 55..=61 => Some(850),
        50..=54 | 71..=75 | 183..=186 | 207..=210 => Some(1252),
        80..=96 => Some(1250),
        104..=108 => Some(1251),
        112..=114 | 120..=124 => Some(1253),
        128..=130 => Some(1254),
        136..=138 => Some(1255),
        144..=146 => Some(1256),
        152..=160 => Some(1257),
        192 | 193 | 200 => Some(932),
        194 | 195 | 201 => Some(949),
        196 | 197 | 202 => Some(950),
        198 | 199 | 203 => Some(936),
        204..=206 => Some(874),
        _ => None,
    }
}

/// Code page selected by a locale id.
///
/// Returns `None` for fully-Unicode locales and for unlisted locales outside
/// the East-Asian and Thai families.
#[must_use]
pub fn code_page_for_lcid(lcid: u32) -> Option<u16> {
    let lang = lcid & LANGUAGE_ID_MASK;

    match lang {
        // Unicode-only locales have no ANSI code page
        0x0439 | // Hindi
        0x045A | // Syriac
        0x0465 | // Divehi
        0x0437 | // Georgian
        0x042B | // Armenian
        0x0445..=0x044F | // Bengali .. Sanskrit
        0x0457   // Konkani
        => None,

        0x0411 => Some(932),                   // Japanese - Shift_JIS
        0x0804 | 0x1004 => Some(936),          // Chinese Simplified - GBK
        0x0404 | 0x0C04 | 0x1404 => Some(950), // Chinese Traditional - Big5
        0x0412 => Some(949),                   // Korean
        0x041E => Some(874),                   // Thai
        0x042A => Some(1258),                  // Vietnamese

        // Code Page 1250 - Central European
        0x0405 | 0x0415 | 0x040E | 0x041A | 0x081A | 0x141A | 0x101A | 0x041B | 0x0424 | 0x0418
        | 0x041C => Some(1250),

        // Code Page 1251 - Cyrillic
        0x0419 | 0x0422 | 0x0423 | 0x0402 | 0x042F | 0x0C1A | 0x201A | 0x0440 | 0x0843 | 0x0444
        | 0x0450 | 0x0485 => Some(1251),

        0x0408 => Some(1253),          // Greek
        0x041F | 0x042C => Some(1254), // Turkish, Azerbaijani
        0x040D => Some(1255),          // Hebrew

        // Code Page 1256 - Arabic
        0x0401 | 0x0801 | 0x0C01 | 0x1001 | 0x1401 | 0x1801 | 0x1C01 | 0x2001 | 0x2401 | 0x2801
        | 0x2C01 | 0x3001 | 0x3401 | 0x3801 | 0x3C01 | 0x4001 | 0x0429 | 0x0420 | 0x048C
        | 0x0463 => Some(1256),

        // Code Page 1257 - Baltic (Estonian, Latvian, Lithuanian)
        0x0425..=0x0427 => Some(1257),

        // Code Page 1252 - Western European
        0x0409 | 0x0809 | 0x0C09 | 0x1009 | 0x1409 | 0x1809 | 0x040C | 0x080C | 0x0C0C | 0x100C
        | 0x140C | 0x0407 | 0x0807 | 0x0C07 | 0x1007 | 0x1407 | 0x040A | 0x080A | 0x0C0A
        | 0x100A | 0x140A | 0x180A | 0x1C0A | 0x200A | 0x240A | 0x280A | 0x2C0A | 0x300A
        | 0x340A | 0x380A | 0x3C0A | 0x400A | 0x440A | 0x480A | 0x4C0A | 0x500A | 0x0410
        | 0x0810 | 0x0816 | 0x0416 | 0x0413 | 0x0813 | 0x0406 | 0x0414 | 0x0814 | 0x041D
        | 0x081D | 0x040B | 0x040F | 0x0403 | 0x0456 | 0x042D | 0x0436 | 0x0421 | 0x043E
        | 0x0441 => Some(1252),

        _ => code_page_for_primary_language(lang),
    }
}

/// Fallback for unlisted locales whose script needs a multi-byte table.
fn code_page_for_primary_language(lang: u32) -> Option<u16> {
    match lang & PRIMARY_LANGUAGE_MASK {
        0x11 => Some(932),
        0x12 => Some(949),
        0x04 => match lang >> 10 {
            // PRC and Singapore use simplified script
            0x02 | 0x04 => Some(936),
            _ => Some(950),
        },
        0x1E => Some(874),
        _ => None,
    }
}

/// Converts narrow character bytes to and from Rust strings.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// A code page provided by `encoding_rs`.
    Windows {
        /// Windows code page number.
        code_page: u16,
        /// Encoding implementation.
        encoding: &'static Encoding,
    },
    /// An OEM code page whose upper half is a built-in table.
    Oem {
        /// OEM code page number.
        code_page: u16,
        /// Characters for bytes 0x80..=0xFF.
        table: &'static [char; 128],
    },
    /// UTF-8 collation data.
    Utf8,
    /// No conversion is known; bytes are interpreted as UTF-8 where possible.
    Passthrough,
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset").field(&self.name()).finish()
    }
}

impl Charset {
    /// Charset for a Windows/OEM code page number.
    #[must_use]
    pub fn for_code_page(code_page: u16) -> Self {
        let encoding = match code_page {
            437 => {
                return Self::Oem {
                    code_page,
                    table: &CP437,
                };
            }
            850 => {
                return Self::Oem {
                    code_page,
                    table: &CP850,
                };
            }
            65001 => return Self::Utf8,
            874 => encoding_rs::WINDOWS_874,
            932 => encoding_rs::SHIFT_JIS,
            936 => encoding_rs::GBK,
            949 => encoding_rs::EUC_KR,
            950 => encoding_rs::BIG5,
            1250 => encoding_rs::WINDOWS_1250,
            1251 => encoding_rs::WINDOWS_1251,
            1252 => encoding_rs::WINDOWS_1252,
            1253 => encoding_rs::WINDOWS_1253,
            1254 => encoding_rs::WINDOWS_1254,
            1255 => encoding_rs::WINDOWS_1255,
            1256 => encoding_rs::WINDOWS_1256,
            1257 => encoding_rs::WINDOWS_1257,
            1258 => encoding_rs::WINDOWS_1258,
            _ => return Self::Passthrough,
        };
        Self::Windows {
            code_page,
            encoding,
        }
    }

    /// The code page number, if this charset converts.
    #[must_use]
    pub fn code_page(&self) -> Option<u16> {
        match self {
            Self::Windows { code_page, .. } | Self::Oem { code_page, .. } => Some(*code_page),
            Self::Utf8 => Some(65001),
            Self::Passthrough => None,
        }
    }

    /// Name for display/logging purposes.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Windows { encoding, .. } => encoding.name(),
            Self::Oem { code_page: 437, .. } => "IBM437",
            Self::Oem { .. } => "IBM850",
            Self::Utf8 => "UTF-8",
            Self::Passthrough => "passthrough",
        }
    }

    /// Decode narrow character bytes.
    ///
    /// Malformed sequences, including a truncated trailing multi-byte
    /// character, decode to U+FFFD.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Windows { encoding, .. } => {
                let (decoded, _had_errors) = encoding.decode_without_bom_handling(bytes);
                decoded.into_owned()
            }
            Self::Oem { table, .. } => bytes
                .iter()
                .map(|&b| {
                    if b < 0x80 {
                        b as char
                    } else {
                        table[(b - 0x80) as usize]
                    }
                })
                .collect(),
            Self::Utf8 | Self::Passthrough => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Encode a string into narrow character bytes.
    ///
    /// Characters the code page cannot represent become `?`.
    #[must_use]
    pub fn encode(&self, s: &str) -> Vec<u8> {
        match self {
            Self::Windows { encoding, .. } => encode_with(encoding, s),
            Self::Oem { table, .. } => s
                .chars()
                .map(|c| {
                    if c.is_ascii() {
                        c as u8
                    } else {
                        table
                            .iter()
                            .position(|&t| t == c)
                            .map_or(b'?', |idx| 0x80 + idx as u8)
                    }
                })
                .collect(),
            Self::Utf8 | Self::Passthrough => s.as_bytes().to_vec(),
        }
    }
}

fn encode_with(encoding: &'static Encoding, s: &str) -> Vec<u8> {
    let mut encoder = encoding.new_encoder();
    let mut out = Vec::with_capacity(s.len());
    let mut rest = s;
    loop {
        let room = encoder
            .max_buffer_length_from_utf8_without_replacement(rest.len())
            .unwrap_or(rest.len() * 4 + 16);
        let start = out.len();
        out.resize(start + room, 0);
        let (result, read, written) =
            encoder.encode_from_utf8_without_replacement(rest, &mut out[start..], true);
        out.truncate(start + written);
        rest = &rest[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => {}
            EncoderResult::Unmappable(_) => out.push(b'?'),
        }
    }
    out
}

static CP437: [char; 128] = [
    '\u{00C7}', '\u{00FC}', '\u{00E9}', '\u{00E2}', '\u{00E4}', '\u{00E0}', '\u{00E5}', '\u{00E7}',
    '\u{00EA}', '\u{00EB}', '\u{00E8}', '\u{00EF}', '\u{00EE}', '\u{00EC}', '\u{00C4}', '\u{00C5}',
    '\u{00C9}', '\u{00E6}', '\u{00C6}', '\u{00F4}', '\u{00F6}', '\u{00F2}', '\u{00FB}', '\u{00F9}',
    '\u{00FF}', '\u{00D6}', '\u{00DC}', '\u{00A2}', '\u{00A3}', '\u{00A5}', '\u{20A7}', '\u{0192}',
    '\u{00E1}', '\u{00ED}', '\u{00F3}', '\u{00FA}', '\u{00F1}', '\u{00D1}', '\u{00AA}', '\u{00BA}',
    '\u{00BF}', '\u{2310}', '\u{00AC}', '\u{00BD}', '\u{00BC}', '\u{00A1}', '\u{00AB}', '\u{00BB}',
    '\u{2591}', '\u{2592}', '\u{2593}', '\u{2502}', '\u{2524}', '\u{2561}', '\u{2562}', '\u{2556}',
    '\u{2555}', '\u{2563}', '\u{2551}', '\u{2557}', '\u{255D}', '\u{255C}', '\u{255B}', '\u{2510}',
    '\u{2514}', '\u{2534}', '\u{252C}', '\u{251C}', '\u{2500}', '\u{253C}', '\u{255E}', '\u{255F}',
    '\u{255A}', '\u{2554}', '\u{2569}', '\u{2566}', '\u{2560}', '\u{2550}', '\u{256C}', '\u{2567}',
    '\u{2568}', '\u{2564}', '\u{2565}', '\u{2559}', '\u{2558}', '\u{2552}', '\u{2553}', '\u{256B}',
    '\u{256A}', '\u{2518}', '\u{250C}', '\u{2588}', '\u{2584}', '\u{258C}', '\u{2590}', '\u{2580}',
    '\u{03B1}', '\u{00DF}', '\u{0393}', '\u{03C0}', '\u{03A3}', '\u{03C3}', '\u{00B5}', '\u{03C4}',
    '\u{03A6}', '\u{0398}', '\u{03A9}', '\u{03B4}', '\u{221E}', '\u{03C6}', '\u{03B5}', '\u{2229}',
    '\u{2261}', '\u{00B1}', '\u{2265}', '\u{2264}', '\u{2320}', '\u{2321}', '\u{00F7}', '\u{2248}',
    '\u{00B0}', '\u{2219}', '\u{00B7}', '\u{221A}', '\u{207F}', '\u{00B2}', '\u{25A0}', '\u{00A0}',
];

static CP850: [char; 128] = [
    '\u{00C7}', '\u{00FC}', '\u{00E9}', '\u{00E2}', '\u{00E4}', '\u{00E0}', '\u{00E5}', '\u{00E7}',
    '\u{00EA}', '\u{00EB}', '\u{00E8}', '\u{00EF}', '\u{00EE}', '\u{00EC}', '\u{00C4}', '\u{00C5}',
    '\u{00C9}', '\u{00E6}', '\u{00C6}', '\u{00F4}', '\u{00F6}', '\u{00F2}', '\u{00FB}', '\u{00F9}',
    '\u{00FF}', '\u{00D6}', '\u{00DC}', '\u{00F8}', '\u{00A3}', '\u{00D8}', '\u{00D7}', '\u{0192}',
    '\u{00E1}', '\u{00ED}', '\u{00F3}', '\u{00FA}', '\u{00F1}', '\u{00D1}', '\u{00AA}', '\u{00BA}',
    '\u{00BF}', '\u{00AE}', '\u{00AC}', '\u{00BD}', '\u{00BC}', '\u{00A1}', '\u{00AB}', '\u{00BB}',
    '\u{2591}', '\u{2592}', '\u{2593}', '\u{2502}', '\u{2524}', '\u{00C1}', '\u{00C2}', '\u{00C0}',
    '\u{00A9}', '\u{2563}', '\u{2551}', '\u{2557}', '\u{255D}', '\u{00A2}', '\u{00A5}', '\u{2510}',
    '\u{2514}', '\u{2534}', '\u{252C}', '\u{251C}', '\u{2500}', '\u{253C}', '\u{00E3}', '\u{00C3}',
    '\u{255A}', '\u{2554}', '\u{2569}', '\u{2566}', '\u{2560}', '\u{2550}', '\u{256C}', '\u{00A4}',
    '\u{00F0}', '\u{00D0}', '\u{00CA}', '\u{00CB}', '\u{00C8}', '\u{0131}', '\u{00CD}', '\u{00CE}',
    '\u{00CF}', '\u{2518}', '\u{250C}', '\u{2588}', '\u{2584}', '\u{00A6}', '\u{00CC}', '\u{2580}',
    '\u{00D3}', '\u{00DF}', '\u{00D4}', '\u{00D2}', '\u{00F5}', '\u{00D5}', '\u{00B5}', '\u{00FE}',
    '\u{00DE}', '\u{00DA}', '\u{00DB}', '\u{00D9}', '\u{00FD}', '\u{00DD}', '\u{00AF}', '\u{00B4}',
    '\u{00AD}', '\u{00B1}', '\u{2017}', '\u{00BE}', '\u{00B6}', '\u{00A7}', '\u{00F7}', '\u{00B8}',
    '\u{00B0}', '\u{00A8}', '\u{00B7}', '\u{00B9}', '\u{00B3}', '\u{00B2}', '\u{25A0}', '\u{00A0}',
];
