use crate::error::Result;

/// A parsed sfnt (ttf/otf) font: the flavor tag and the raw table data.
/// This is deliberately shallow; re-containering fonts as woff/woff2 only
/// needs the table directory, never the table internals.
#[derive(Debug)]
pub struct SfntFont {
    pub flavor: u32,
    pub tables: Vec<SfntTable>,
}

#[derive(Debug)]
pub struct SfntTable {
    pub tag: [u8; 4],
    pub checksum: u32,
    pub data: Vec<u8>,
}

pub const FLAVOR_TRUETYPE: u32 = 0x0001_0000;
pub const FLAVOR_APPLE_TRUE: u32 = u32::from_be_bytes(*b"true");
pub const FLAVOR_CFF: u32 = u32::from_be_bytes(*b"OTTO");

impl SfntFont {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let flavor = be_u32(data, 0)?;
        if ![FLAVOR_TRUETYPE, FLAVOR_APPLE_TRUE, FLAVOR_CFF].contains(&flavor) {
            return err! {
                "input is not an sfnt font",
                "flavor tag" => format!("{flavor:#010x}"),
            };
        }

        let num_tables = be_u16(data, 4)? as usize;
        let mut tables = Vec::with_capacity(num_tables);
        for i in 0..num_tables {
            let record = 12 + i * 16;
            let tag = be_u32(data, record)?.to_be_bytes();
            let checksum = be_u32(data, record + 4)?;
            let offset = be_u32(data, record + 8)? as usize;
            let length = be_u32(data, record + 12)? as usize;

            let data = data.get(offset..offset.saturating_add(length))
                .ok_or_else(|| error! {
                    "sfnt table extends past the end of the font",
                    "table" => String::from_utf8_lossy(&tag),
                    "offset" => offset,
                    "length" => length,
                })?;

            tables.push(SfntTable { tag, checksum, data: data.to_vec() });
        }

        if tables.is_empty() {
            return err!("sfnt font contains no tables");
        }

        Ok(SfntFont { flavor, tables })
    }

    /// The size of the font re-assembled as a plain sfnt, each table
    /// padded to a four-byte boundary. Both woff headers carry this.
    pub fn sfnt_size(&self) -> u32 {
        let dir = 12 + 16 * self.tables.len();
        let data: usize = self.tables.iter().map(|t| padded_len(t.data.len())).sum();
        (dir + data) as u32
    }
}

impl SfntTable {
    pub fn tag_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.tag)
    }
}

pub(crate) fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

pub(crate) fn be_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| error!("truncated sfnt data", "needed offset" => offset + 4))
}

pub(crate) fn be_u16(data: &[u8], offset: usize) -> Result<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| error!("truncated sfnt data", "needed offset" => offset + 2))
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// Assembles a minimal, structurally valid ttf from raw tables.
    pub fn fake_ttf(tables: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
        let mut font = Vec::new();
        font.extend_from_slice(&FLAVOR_TRUETYPE.to_be_bytes());
        font.extend_from_slice(&(tables.len() as u16).to_be_bytes());
        font.extend_from_slice(&[0; 6]); // searchRange trio, unused here

        let mut offset = 12 + 16 * tables.len();
        let mut blob = Vec::new();
        for (tag, data) in tables {
            font.extend_from_slice(*tag);
            font.extend_from_slice(&0u32.to_be_bytes()); // checksum, untracked
            font.extend_from_slice(&(offset as u32).to_be_bytes());
            font.extend_from_slice(&(data.len() as u32).to_be_bytes());

            blob.extend_from_slice(data);
            let pad = padded_len(data.len()) - data.len();
            blob.extend_from_slice(&[0, 0, 0][..pad]);
            offset += padded_len(data.len());
        }

        font.extend_from_slice(&blob);
        font
    }
}
