use std::io::Write;

use crate::error::{Result, Chainable};
use crate::pipe::{Blob, Mapper, Source};
use crate::font::sfnt::SfntFont;

/// Re-containers a ttf/otf font as woff2: a directory of null-transformed
/// tables over a single brotli stream. Font-aware glyf/loca recoding is a
/// concern of full-blown font optimizers, not of this pipeline; null
/// transforms are valid woff2 that every decoder reconstructs byte-for-byte.
#[derive(Debug, Default)]
pub struct Woff2;

impl Mapper for Woff2 {
    fn map<I: Source>(&self, input: I) -> Result<Blob> {
        let described = input.path().map(|p| p.display().to_string());
        let data = input.read()?.into_bytes();
        let font = SfntFont::parse(&data).chain_with(|| error! {
            "woff2 conversion failed",
            "font" => described.unwrap_or_else(|| "<in-memory>".into()),
        })?;

        Ok(Blob::Bytes(encode(&font)?))
    }
}

const HEADER_LEN: usize = 48;

// Transform version bits (6-7 of the flags byte). The null transform is
// version 3 for glyf/loca and version 0 for everything else.
const XFORM_NULL_GLYF_LOCA: u8 = 3 << 6;

// Low six bits all set: the tag is spelled out after the flags byte rather
// than referenced from the known-tags table.
const FLAG_ARBITRARY_TAG: u8 = 0x3F;

fn encode(font: &SfntFont) -> Result<Vec<u8>> {
    let order = layout_order(font);

    let mut directory = Vec::new();
    let mut stream = Vec::new();
    for &i in &order {
        let table = &font.tables[i];
        let mut flags = FLAG_ARBITRARY_TAG;
        if matches!(&table.tag, b"glyf" | b"loca") {
            flags |= XFORM_NULL_GLYF_LOCA;
        }

        directory.push(flags);
        directory.extend_from_slice(&table.tag);
        base128(table.data.len() as u32, &mut directory);
        // null transforms carry no transformLength

        stream.extend_from_slice(&table.data);
    }

    let compressed = compress(&stream)?;
    let total = HEADER_LEN + directory.len() + compressed.len();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"wOF2");
    out.extend_from_slice(&font.flavor.to_be_bytes());
    out.extend_from_slice(&(total as u32).to_be_bytes());
    out.extend_from_slice(&(font.tables.len() as u16).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // reserved
    out.extend_from_slice(&font.sfnt_size().to_be_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes()); // majorVersion
    out.extend_from_slice(&0u16.to_be_bytes()); // minorVersion
    out.extend_from_slice(&[0; 20]); // no metadata or private blocks
    out.extend_from_slice(&directory);
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Original table order, except loca is pulled up to sit immediately after
/// glyf as the container format requires.
fn layout_order(font: &SfntFont) -> Vec<usize> {
    let mut order: Vec<usize> = (0..font.tables.len())
        .filter(|&i| &font.tables[i].tag != b"loca")
        .collect();

    if let Some(loca) = font.tables.iter().position(|t| &t.tag == b"loca") {
        match order.iter().position(|&i| &font.tables[i].tag == b"glyf") {
            Some(glyf) => order.insert(glyf + 1, loca),
            None => order.push(loca),
        }
    }

    order
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 11, 22);
        writer.write_all(data)?;
        writer.flush()?;
    }

    Ok(out)
}

/// UIntBase128: big-endian, seven bits per byte, the high bit flagging a
/// continuation.
fn base128(mut value: u32, out: &mut Vec<u8>) {
    let mut chunks = [0u8; 5];
    let mut n = 0;
    loop {
        chunks[n] = (value & 0x7F) as u8;
        value >>= 7;
        n += 1;
        if value == 0 {
            break;
        }
    }

    for i in (0..n).rev() {
        out.push(chunks[i] | if i > 0 { 0x80 } else { 0 });
    }
}
