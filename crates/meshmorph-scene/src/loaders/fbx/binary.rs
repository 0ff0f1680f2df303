use super::document::{FbxDocument, FbxError, FbxNode, FbxProperty, MAX_RECORD_DEPTH};
use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use std::io::{Cursor, Read};

pub const BINARY_MAGIC: &[u8; 23] = b"Kaydara FBX Binary  \x00\x1a\x00";

/// From this version on record headers use 64 bit fields.
const WIDE_HEADER_VERSION: u32 = 7500;

/// Upper bound of the deflate expansion ratio.
const MAX_INFLATE_RATIO: usize = 1032;

pub fn is_binary(data: &[u8]) -> bool {
    data.starts_with(BINARY_MAGIC)
}

pub fn parse_binary(data: &[u8]) -> Result<FbxDocument, FbxError> {
    if !is_binary(data) {
        return Err(FbxError::InvalidMagic);
    }

    let mut reader = Cursor::new(data);
    reader.set_position(BINARY_MAGIC.len() as u64);
    let version = reader.read_u32::<LittleEndian>()?;
    let wide = version >= WIDE_HEADER_VERSION;

    let mut nodes = Vec::new();
    while let Some(node) = read_node(&mut reader, wide, 0)? {
        nodes.push(node);
    }

    Ok(FbxDocument { version, nodes })
}

fn header_len(wide: bool) -> u64 {
    if wide {
        25
    } else {
        13
    }
}

fn read_offset(reader: &mut Cursor<&[u8]>, wide: bool) -> Result<u64, FbxError> {
    Ok(if wide {
        reader.read_u64::<LittleEndian>()?
    } else {
        reader.read_u32::<LittleEndian>()? as u64
    })
}

fn remaining(reader: &Cursor<&[u8]>) -> u64 {
    (reader.get_ref().len() as u64).saturating_sub(reader.position())
}

fn read_bytes(reader: &mut Cursor<&[u8]>, count: usize) -> Result<Vec<u8>, FbxError> {
    if (count as u64) > remaining(reader) {
        return Err(FbxError::UnexpectedEof);
    }
    let mut buffer = vec![0u8; count];
    reader.read_exact(&mut buffer)?;
    Ok(buffer)
}

/// Reads one record and its nested records. Returns `None` for the null record
/// that terminates a list, or when the data ends before a full header.
fn read_node(
    reader: &mut Cursor<&[u8]>,
    wide: bool,
    depth: usize,
) -> Result<Option<FbxNode>, FbxError> {
    if remaining(reader) < header_len(wide) {
        return Ok(None);
    }

    let end_offset = read_offset(reader, wide)?;
    let property_count = read_offset(reader, wide)?;
    let _property_list_len = read_offset(reader, wide)?;
    let name_len = reader.read_u8()? as usize;

    if end_offset == 0 {
        return Ok(None);
    }

    let name = String::from_utf8_lossy(&read_bytes(reader, name_len)?).into_owned();
    if end_offset > reader.get_ref().len() as u64 || end_offset < reader.position() {
        return Err(FbxError::MalformedRecord {
            name,
            message: format!("end offset {} out of range", end_offset),
        });
    }
    if depth >= MAX_RECORD_DEPTH {
        return Err(FbxError::MalformedRecord {
            name,
            message: format!("nested deeper than {} records", MAX_RECORD_DEPTH),
        });
    }

    let mut node = FbxNode::new(name);
    for _ in 0..property_count {
        node.properties.push(read_property(reader)?);
    }

    while reader.position() < end_offset {
        match read_node(reader, wide, depth + 1)? {
            Some(child) => node.children.push(child),
            None => break,
        }
    }

    reader.set_position(end_offset);
    Ok(Some(node))
}

fn read_property(reader: &mut Cursor<&[u8]>) -> Result<FbxProperty, FbxError> {
    let code = reader.read_u8()?;
    let property = match code {
        b'Y' => FbxProperty::I16(reader.read_i16::<LittleEndian>()?),
        b'C' => FbxProperty::Bool(reader.read_u8()? != 0),
        b'I' => FbxProperty::I32(reader.read_i32::<LittleEndian>()?),
        b'F' => FbxProperty::F32(reader.read_f32::<LittleEndian>()?),
        b'D' => FbxProperty::F64(reader.read_f64::<LittleEndian>()?),
        b'L' => FbxProperty::I64(reader.read_i64::<LittleEndian>()?),
        b'S' => {
            let len = reader.read_u32::<LittleEndian>()? as usize;
            FbxProperty::String(String::from_utf8_lossy(&read_bytes(reader, len)?).into_owned())
        }
        b'R' => {
            let len = reader.read_u32::<LittleEndian>()? as usize;
            FbxProperty::Raw(read_bytes(reader, len)?)
        }
        b'f' => {
            let (len, data) = read_array(reader, 4)?;
            let mut values = vec![0f32; len];
            Cursor::new(data).read_f32_into::<LittleEndian>(&mut values)?;
            FbxProperty::F32Array(values)
        }
        b'd' => {
            let (len, data) = read_array(reader, 8)?;
            let mut values = vec![0f64; len];
            Cursor::new(data).read_f64_into::<LittleEndian>(&mut values)?;
            FbxProperty::F64Array(values)
        }
        b'l' => {
            let (len, data) = read_array(reader, 8)?;
            let mut values = vec![0i64; len];
            Cursor::new(data).read_i64_into::<LittleEndian>(&mut values)?;
            FbxProperty::I64Array(values)
        }
        b'i' => {
            let (len, data) = read_array(reader, 4)?;
            let mut values = vec![0i32; len];
            Cursor::new(data).read_i32_into::<LittleEndian>(&mut values)?;
            FbxProperty::I32Array(values)
        }
        b'b' => {
            let (len, data) = read_array(reader, 1)?;
            FbxProperty::BoolArray(data.iter().take(len).map(|b| *b != 0).collect())
        }
        other => return Err(FbxError::UnknownPropertyType(other)),
    };

    Ok(property)
}

/// Reads an array header and its payload, inflating it when compressed.
/// Returns the element count and the raw little endian bytes.
fn read_array(
    reader: &mut Cursor<&[u8]>,
    element_size: usize,
) -> Result<(usize, Vec<u8>), FbxError> {
    let len = reader.read_u32::<LittleEndian>()? as usize;
    let encoding = reader.read_u32::<LittleEndian>()?;
    let compressed_len = reader.read_u32::<LittleEndian>()? as usize;
    let expected = len
        .checked_mul(element_size)
        .ok_or(FbxError::UnexpectedEof)?;

    let data = match encoding {
        0 => read_bytes(reader, expected)?,
        1 => {
            let compressed = read_bytes(reader, compressed_len)?;
            if expected > compressed_len.saturating_mul(MAX_INFLATE_RATIO) {
                return Err(FbxError::UnexpectedEof);
            }
            let mut inflated = Vec::new();
            ZlibDecoder::new(compressed.as_slice())
                .take(expected as u64)
                .read_to_end(&mut inflated)?;
            inflated
        }
        other => return Err(FbxError::UnknownArrayEncoding(other)),
    };

    if data.len() < expected {
        return Err(FbxError::UnexpectedEof);
    }

    Ok((len, data))
}
