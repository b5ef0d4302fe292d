//! Wire layout shared by both archive back-ends: header/index parsing and the
//! repack algorithm that turns a working file list into a new contiguous
//! archive.

use std::collections::HashMap;
use std::io::{Read, Write};

use crate::config::ArchiveOptions;
use crate::error::Error;
use crate::wire::{self, Reader};

use super::entry::{Entry, PendingEdit};

const TRAILER: &[u8; 5] = b"L253\0";
/// Fixed bytes of index overhead per archive: the 16-byte header plus the
/// 5-byte trailer minus the 1-byte gap already folded into `total_size`.
const INDEX_BASE: u64 = 20;

pub(crate) fn parse_archive(
    buf: &[u8],
    options: &ArchiveOptions,
) -> Result<([u8; 4], HashMap<String, Entry>), Error> {
    let mut r = Reader::new(buf);
    let tag = r.read_tag().ok_or(Error::TruncatedHeader)?;
    let total_size_declared = r.read_u32_le().ok_or(Error::TruncatedHeader)?;
    let entry_count = r.read_u32_be().ok_or(Error::TruncatedHeader)?;
    let index_size = r.read_u32_be().ok_or(Error::TruncatedHeader)?;

    let mut entries = HashMap::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let position = r.read_u32_be().ok_or(Error::TruncatedIndex)? as u64;
        let size = r.read_u32_be().ok_or(Error::TruncatedIndex)? as u64;
        let name = r.read_cstring_latin1().ok_or(Error::TruncatedName)?;
        if entries.contains_key(&name) {
            log::warn!("duplicate entry name {name:?} in archive index; later occurrence wins");
        }
        entries.insert(name.clone(), Entry { name, position, size });
    }

    match r.peek(TRAILER.len()) {
        Some(bytes) if bytes == TRAILER => r.skip(TRAILER.len()),
        _ => log::warn!("archive is missing the 'L253\\0' trailer pad at the expected offset"),
    }

    let computed_total = entries.values().map(|e| e.size).sum::<u64>() + index_size as u64 + 1;
    if computed_total != total_size_declared as u64 {
        log::warn!(
            "archive declares total_size {total_size_declared} but entry_count/index_size imply {computed_total}; continuing with the latter"
        );
    }

    if options.validate_no_overlap {
        check_overlap(&entries);
    }

    Ok((tag, entries))
}

fn check_overlap(entries: &HashMap<String, Entry>) {
    let mut ranges: Vec<(u64, u64, &str)> = entries
        .values()
        .map(|e| (e.position, e.position + e.size, e.name.as_str()))
        .collect();
    ranges.sort_by_key(|r| r.0);
    for pair in ranges.windows(2) {
        let (_, end0, name0) = pair[0];
        let (start1, _, name1) = pair[1];
        if start1 < end0 {
            log::warn!("payload ranges for '{name0}' and '{name1}' overlap");
        }
    }
}

/// Where a packed item's bytes come from: the backend's existing payload
/// region, or a pending edit already held in memory.
pub(crate) enum PackSource<'a> {
    Existing { position: u64 },
    Pending(&'a [u8]),
}

pub(crate) struct PackItem<'a> {
    pub(crate) name: String,
    pub(crate) size: u64,
    pub(crate) source: PackSource<'a>,
}

/// Builds the sorted working file list a repack will write out: committed
/// entries shadowed by pending edits, plus pending additions, alphabetically
/// ordered by name.
pub(crate) fn build_pack_items<'a>(
    entries: &HashMap<String, Entry>,
    pending: &'a HashMap<String, PendingEdit>,
) -> Vec<PackItem<'a>> {
    let mut items = Vec::with_capacity(entries.len() + pending.len());

    for (name, entry) in entries {
        match pending.get(name) {
            Some(PendingEdit::Remove) => continue,
            Some(PendingEdit::Edit(bytes)) => items.push(PackItem {
                name: name.clone(),
                size: bytes.len() as u64,
                source: PackSource::Pending(bytes),
            }),
            Some(PendingEdit::Add(_)) => unreachable!("add_file refuses names that already exist"),
            None => items.push(PackItem {
                name: name.clone(),
                size: entry.size,
                source: PackSource::Existing { position: entry.position },
            }),
        }
    }

    for (name, edit) in pending {
        if let PendingEdit::Add(bytes) = edit {
            items.push(PackItem {
                name: name.clone(),
                size: bytes.len() as u64,
                source: PackSource::Pending(bytes),
            });
        }
    }

    items.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    items
}

pub(crate) struct PackedLayout {
    pub(crate) header_and_index: Vec<u8>,
    pub(crate) new_entries: HashMap<String, Entry>,
}

/// Computes the new header/index bytes and resulting entry table for a sorted
/// item list, without touching any payload bytes.
pub(crate) fn layout_pack(tag: [u8; 4], items: &[PackItem<'_>]) -> Result<PackedLayout, Error> {
    let index_size = INDEX_BASE
        + 8 * items.len() as u64
        + items.iter().map(|i| i.name.len() as u64 + 1).sum::<u64>();
    let payload_total: u64 = items.iter().map(|i| i.size).sum();
    let total_size = payload_total + index_size + 1;
    if total_size > u32::MAX as u64 {
        return Err(Error::MaxSize);
    }

    let mut out = Vec::with_capacity(index_size as usize);
    out.extend_from_slice(&tag);
    wire::write_u32_le(&mut out, total_size as u32);
    wire::write_u32_be(&mut out, items.len() as u32);
    wire::write_u32_be(&mut out, index_size as u32);

    let mut new_entries = HashMap::with_capacity(items.len());
    let mut offset = index_size + 1;
    for item in items {
        wire::write_u32_be(&mut out, offset as u32);
        wire::write_u32_be(&mut out, item.size as u32);
        wire::write_cstring_latin1(&mut out, &item.name)?;
        new_entries.insert(
            item.name.clone(),
            Entry { name: item.name.clone(), position: offset, size: item.size },
        );
        offset += item.size;
    }
    out.extend_from_slice(TRAILER);
    debug_assert_eq!(out.len() as u64, index_size);

    Ok(PackedLayout { header_and_index: out, new_entries })
}

/// Copies exactly `remaining` bytes from `src` to `out` through a buffer of
/// at most `buf_size` bytes, bounding peak memory for large payloads.
pub(crate) fn copy_n<R: Read, W: Write>(
    mut src: R,
    out: &mut W,
    mut remaining: u64,
    buf_size: usize,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; buf_size.max(1).min(remaining.max(1) as usize)];
    while remaining > 0 {
        let want = (buf.len() as u64).min(remaining) as usize;
        src.read_exact(&mut buf[..want])?;
        out.write_all(&buf[..want])?;
        remaining -= want as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pack_has_the_exact_byte_layout() {
        let layout = layout_pack(*b"BIG4", &[]).unwrap();
        let out = &layout.header_and_index;

        // tag(4) + total_size le(4) + entry_count be(4) + index_size be(4) + trailer(5) = 21
        assert_eq!(out.len(), 21);
        assert_eq!(&out[0..4], b"BIG4");
        assert_eq!(u32::from_le_bytes(out[4..8].try_into().unwrap()), 21);
        assert_eq!(u32::from_be_bytes(out[8..12].try_into().unwrap()), 0);
        assert_eq!(u32::from_be_bytes(out[12..16].try_into().unwrap()), 20);
        assert_eq!(&out[16..21], TRAILER);
        assert!(layout.new_entries.is_empty());
    }

    #[test]
    fn parse_archive_recovers_an_empty_pack() {
        let layout = layout_pack(*b"BIG4", &[]).unwrap();
        let (tag, entries) = parse_archive(&layout.header_and_index, &ArchiveOptions::default()).unwrap();
        assert_eq!(tag, *b"BIG4");
        assert!(entries.is_empty());
    }

    #[test]
    fn one_byte_name_round_trips_through_layout_and_parse() {
        let pending = HashMap::from([("x".to_string(), PendingEdit::Add(b"v".to_vec()))]);
        let items = build_pack_items(&HashMap::new(), &pending);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "x");

        let layout = layout_pack(*b"BIG4", &items).unwrap();
        let entry = &layout.new_entries["x"];
        assert_eq!(entry.name, "x");
        assert_eq!(entry.size, 1);

        let mut packed = layout.header_and_index.clone();
        packed.extend_from_slice(b"v");
        let (_, entries) = parse_archive(&packed, &ArchiveOptions::default()).unwrap();
        assert_eq!(entries["x"].position, entry.position);
    }

    #[test]
    fn zero_size_payload_does_not_perturb_the_next_offset() {
        let pending = HashMap::from([
            ("a".to_string(), PendingEdit::Add(Vec::new())),
            ("b".to_string(), PendingEdit::Add(b"bb".to_vec())),
        ]);
        let items = build_pack_items(&HashMap::new(), &pending);
        let layout = layout_pack(*b"BIG4", &items).unwrap();

        let a = &layout.new_entries["a"];
        let b = &layout.new_entries["b"];
        assert_eq!(a.size, 0);
        assert_eq!(b.position, a.position);
    }

    #[test]
    fn names_differing_only_by_case_are_distinct_and_sorted_byte_wise() {
        let pending = HashMap::from([
            ("A.txt".to_string(), PendingEdit::Add(b"upper".to_vec())),
            ("a.txt".to_string(), PendingEdit::Add(b"lower".to_vec())),
        ]);
        let items = build_pack_items(&HashMap::new(), &pending);
        assert_eq!(items.len(), 2);
        // Uppercase sorts first under a plain byte-wise comparison.
        assert_eq!(items[0].name, "A.txt");
        assert_eq!(items[1].name, "a.txt");

        let layout = layout_pack(*b"BIG4", &items).unwrap();
        assert_eq!(layout.new_entries.len(), 2);
        assert_eq!(layout.new_entries["A.txt"].size, 5);
        assert_eq!(layout.new_entries["a.txt"].size, 5);
    }

    #[test]
    fn duplicate_name_in_index_keeps_the_later_occurrence() {
        let layout = layout_pack(
            *b"BIG4",
            &[
                PackItem { name: "x".to_string(), size: 1, source: PackSource::Pending(b"1") },
                PackItem { name: "x".to_string(), size: 1, source: PackSource::Pending(b"2") },
            ],
        )
        .unwrap();
        let mut packed = layout.header_and_index.clone();
        packed.extend_from_slice(b"12");

        let (_, entries) = parse_archive(&packed, &ArchiveOptions::default()).unwrap();
        assert_eq!(entries.len(), 1);
        // The later occurrence's position wins.
        assert_eq!(entries["x"].position, layout.new_entries["x"].position);
    }
}
