//! RefPack decoder: an opcode-driven expansion of a compressed stream.

use super::header;
use crate::config::RefpackConfig;
use crate::error::Error;

/// Decompresses a RefPack stream, with or without its optional 5-byte header.
///
/// If the stream declares an uncompressed size and the decoded output doesn't
/// match it, this returns [`Error::SizeMismatch`] unless
/// `config.ignore_mismatch` is set, in which case the mismatch is logged and
/// the decoded bytes are returned anyway.
pub fn decompress(data: &[u8], config: RefpackConfig) -> Result<Vec<u8>, Error> {
    let (expected_size, body) = match header::parse(data) {
        Some((size, header_len)) => (Some(size as usize), &data[header_len..]),
        None => (None, data),
    };

    let mut output = Vec::new();
    let mut index = 0usize;

    loop {
        let first = *body.get(index).ok_or(Error::Corrupt("opcode truncated at end of stream"))?;
        index += 1;

        if first & 0x80 == 0 {
            let second = *body
                .get(index)
                .ok_or(Error::Corrupt("short opcode truncated"))?;
            index += 1;
            let run = (first & 0x03) as usize;
            push_literal(&mut output, body, &mut index, run)?;
            let ref_offset = (((first & 0x60) as usize) << 3) + second as usize;
            let length = (((first & 0x1C) >> 2) as usize) + 3;
            copy_back(&mut output, ref_offset, length)?;
        } else if first & 0x40 == 0 {
            let second = *body
                .get(index)
                .ok_or(Error::Corrupt("medium opcode truncated"))?;
            let third = *body
                .get(index + 1)
                .ok_or(Error::Corrupt("medium opcode truncated"))?;
            index += 2;
            let run = (second >> 6) as usize;
            push_literal(&mut output, body, &mut index, run)?;
            let ref_offset = (((second & 0x3F) as usize) << 8) + third as usize;
            let length = ((first & 0x3F) as usize) + 4;
            copy_back(&mut output, ref_offset, length)?;
        } else if first & 0x20 == 0 {
            let second = *body
                .get(index)
                .ok_or(Error::Corrupt("long opcode truncated"))?;
            let third = *body
                .get(index + 1)
                .ok_or(Error::Corrupt("long opcode truncated"))?;
            let fourth = *body
                .get(index + 2)
                .ok_or(Error::Corrupt("long opcode truncated"))?;
            index += 3;
            let run = (first & 0x03) as usize;
            push_literal(&mut output, body, &mut index, run)?;
            let ref_offset = (((first & 0x10) as usize) << 12) + ((second as usize) << 8) + third as usize;
            let length = ((((first & 0x0C) >> 2) as usize) << 8) + fourth as usize + 5;
            copy_back(&mut output, ref_offset, length)?;
        } else if first <= 0xFB {
            let run = (((first & 0x1F) as usize) << 2) + 4;
            push_literal(&mut output, body, &mut index, run)?;
        } else {
            let run = (first & 0x03) as usize;
            push_literal(&mut output, body, &mut index, run)?;
            break;
        }
    }

    if let Some(expected) = expected_size {
        if expected != output.len() {
            if config.ignore_mismatch {
                log::info!(
                    "refpack decode size mismatch: declared {expected}, produced {}",
                    output.len()
                );
            } else {
                return Err(Error::SizeMismatch {
                    expected,
                    actual: output.len(),
                });
            }
        }
    }

    Ok(output)
}

fn push_literal(output: &mut Vec<u8>, body: &[u8], index: &mut usize, run: usize) -> Result<(), Error> {
    let end = index.checked_add(run).ok_or(Error::Corrupt("literal run length overflows"))?;
    let slice = body.get(*index..end).ok_or(Error::Corrupt("literal run exceeds input"))?;
    output.extend_from_slice(slice);
    *index = end;
    Ok(())
}

fn copy_back(output: &mut Vec<u8>, ref_offset: usize, length: usize) -> Result<(), Error> {
    let mut r = output
        .len()
        .checked_sub(1 + ref_offset)
        .ok_or(Error::Corrupt("back-reference points before start of output"))?;
    for _ in 0..length {
        let byte = *output.get(r).ok_or(Error::Corrupt("back-reference runs past output"))?;
        output.push(byte);
        r += 1;
    }
    Ok(())
}
