use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;

use crate::error::{Result, Chainable};
use crate::pipe::{Blob, Mapper, Source};
use crate::font::sfnt::{SfntFont, padded_len};

/// Re-containers a ttf/otf font as woff. Table payloads are untouched;
/// each is zlib-compressed independently, stored raw when compression
/// does not shrink it.
#[derive(Debug, Default)]
pub struct Woff;

impl Mapper for Woff {
    fn map<I: Source>(&self, input: I) -> Result<Blob> {
        let described = input.path().map(|p| p.display().to_string());
        let data = input.read()?.into_bytes();
        let font = SfntFont::parse(&data).chain_with(|| error! {
            "woff conversion failed",
            "font" => described.unwrap_or_else(|| "<in-memory>".into()),
        })?;

        Ok(Blob::Bytes(encode(&font)?))
    }
}

const HEADER_LEN: usize = 44;
const DIR_ENTRY_LEN: usize = 20;

fn encode(font: &SfntFont) -> Result<Vec<u8>> {
    // entries sorted by tag, data in the same order
    let mut order: Vec<usize> = (0..font.tables.len()).collect();
    order.sort_by_key(|&i| font.tables[i].tag);

    let mut directory = Vec::with_capacity(font.tables.len() * DIR_ENTRY_LEN);
    let mut data = Vec::new();
    let mut offset = HEADER_LEN + font.tables.len() * DIR_ENTRY_LEN;

    for &i in &order {
        let table = &font.tables[i];
        let compressed = deflate(&table.data)?;
        let stored: &[u8] = if compressed.len() < table.data.len() {
            &compressed
        } else {
            &table.data
        };

        directory.extend_from_slice(&table.tag);
        directory.extend_from_slice(&(offset as u32).to_be_bytes());
        directory.extend_from_slice(&(stored.len() as u32).to_be_bytes());
        directory.extend_from_slice(&(table.data.len() as u32).to_be_bytes());
        directory.extend_from_slice(&table.checksum.to_be_bytes());

        data.extend_from_slice(stored);
        let pad = padded_len(stored.len()) - stored.len();
        data.extend_from_slice(&[0, 0, 0][..pad]);
        offset += padded_len(stored.len());
    }

    let total = HEADER_LEN + directory.len() + data.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"wOFF");
    out.extend_from_slice(&font.flavor.to_be_bytes());
    out.extend_from_slice(&(total as u32).to_be_bytes());
    out.extend_from_slice(&(font.tables.len() as u16).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // reserved
    out.extend_from_slice(&font.sfnt_size().to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes()); // majorVersion
    out.extend_from_slice(&0u16.to_be_bytes()); // minorVersion
    out.extend_from_slice(&[0; 20]); // no metadata or private blocks
    out.extend_from_slice(&directory);
    out.extend_from_slice(&data);
    Ok(out)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::sfnt::testutil::fake_ttf;
    use crate::font::sfnt::{be_u16, be_u32};

    #[test]
    fn header_preserves_flavor_and_table_count() {
        let ttf = fake_ttf(&[(b"head", &[1; 54]), (b"glyf", &[2; 400])]);
        let woff = Woff.map(Blob::Bytes(ttf)).unwrap().into_bytes();

        assert_eq!(&woff[..4], b"wOFF");
        assert_eq!(be_u32(&woff, 4).unwrap(), crate::font::FLAVOR_TRUETYPE);
        assert_eq!(be_u32(&woff, 8).unwrap() as usize, woff.len());
        assert_eq!(be_u16(&woff, 12).unwrap(), 2);
        // totalSfntSize: 12 + 2*16 + 56 + 400
        assert_eq!(be_u32(&woff, 16).unwrap(), 500);
    }

    #[test]
    fn directory_is_sorted_by_tag() {
        let ttf = fake_ttf(&[(b"name", &[3; 20]), (b"cmap", &[4; 20])]);
        let woff = Woff.map(Blob::Bytes(ttf)).unwrap().into_bytes();

        assert_eq!(&woff[HEADER_LEN..HEADER_LEN + 4], b"cmap");
        assert_eq!(&woff[HEADER_LEN + DIR_ENTRY_LEN..HEADER_LEN + DIR_ENTRY_LEN + 4], b"name");
    }

    #[test]
    fn incompressible_tables_are_stored_raw() {
        // tiny high-entropy table; zlib overhead exceeds any gain
        let noise: Vec<u8> = (0u16..16).map(|i| (i * 37 % 251) as u8).collect();
        let ttf = fake_ttf(&[(b"cvt ", &noise)]);
        let woff = Woff.map(Blob::Bytes(ttf)).unwrap().into_bytes();

        let comp_len = be_u32(&woff, HEADER_LEN + 8).unwrap();
        let orig_len = be_u32(&woff, HEADER_LEN + 12).unwrap();
        assert_eq!(comp_len, orig_len);
    }

    #[test]
    fn non_fonts_are_rejected() {
        assert!(Woff.map(Blob::Bytes(vec![0; 64])).is_err());
    }
}
