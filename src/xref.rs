use std::io::{Result as IoResult, Write};

use log::debug;

use crate::writer::{Writer, NEWLINE};
use crate::{Error, Object, ObjectId, Result};

/// Head of the free list. Its generation is stored as 65534 and printed
/// incremented, like every other free entry.
const FREE_LIST_HEAD: ObjectId = (0, 65534);

const TYPE_USED: u32 = 1;

/// One cross-reference entry for an object touched by this update.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: ObjectId,
    pub state: EntryState,
}

#[derive(Debug, Clone)]
pub enum EntryState {
    /// Object body written at this absolute byte offset.
    Used { offset: u64 },
    /// Object deleted; links to the next free object number.
    Free { next_free: u32 },
}

impl Entry {
    fn number(&self) -> u32 {
        self.id.0
    }

    pub fn is_free(&self) -> bool {
        matches!(self.state, EntryState::Free { .. })
    }
}

/// Cross-reference entries in ascending object-number order.
///
/// Changes arrive sorted, so pushing is normally O(1); a backwards scan
/// covers out-of-order arrivals. The same object number twice is
/// change-tracker corruption and fails the whole update.
#[derive(Debug, Default)]
pub struct EntryTable {
    entries: Vec<Entry>,
}

impl EntryTable {
    pub fn new() -> EntryTable {
        EntryTable { entries: Vec::new() }
    }

    pub fn push_used(&mut self, id: ObjectId, offset: u64) -> Result<()> {
        self.insert(Entry {
            id,
            state: EntryState::Used { offset },
        })
    }

    pub fn push_free(&mut self, id: ObjectId) -> Result<()> {
        self.insert(Entry {
            id,
            state: EntryState::Free { next_free: 0 },
        })
    }

    fn insert(&mut self, entry: Entry) -> Result<()> {
        let number = entry.number();
        let mut index = self.entries.len();
        while index > 0 {
            let prev = self.entries[index - 1].number();
            if prev == number {
                return Err(Error::DuplicateEntry(number));
            } else if prev < number {
                break;
            }
            index -= 1;
        }
        self.entries.insert(index, entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum object number in the table, or 0 when empty. Entries are
    /// sorted, so this is the last one.
    pub fn greatest_object_number(&self) -> u32 {
        self.entries.last().map_or(0, Entry::number)
    }

    pub fn iter(&self) -> std::slice::Iter<Entry> {
        self.entries.iter()
    }

    /// Thread the free-list chain through the table and prepend the
    /// object-number-zero head entry. Iterating backwards leaves each free
    /// entry pointing at the next free object number in ascending order,
    /// with the last one chaining back to 0.
    pub fn link_free_list(&mut self) {
        let mut next_free = 0u32;
        for entry in self.entries.iter_mut().rev() {
            if let EntryState::Free { next_free: link } = &mut entry.state {
                *link = next_free;
                next_free = entry.id.0;
            }
        }
        self.entries.insert(
            0,
            Entry {
                id: FREE_LIST_HEAD,
                state: EntryState::Free { next_free },
            },
        );
    }

    /// Partition into maximal runs of consecutive object numbers. Returns
    /// `(start index, length)` pairs; shared by the classical sub-section
    /// writer and the `Index` array of the compressed form.
    fn runs(&self) -> Vec<(usize, usize)> {
        let mut runs = Vec::new();
        let mut start = 0;
        while start < self.entries.len() {
            let first = self.entries[start].number();
            let mut length = 1;
            while start + length < self.entries.len()
                && self.entries[start + length].number() == first + length as u32
            {
                length += 1;
            }
            runs.push((start, length));
            start += length;
        }
        runs
    }
}

/// Emit the classical textual table: `xref`, one header line per
/// sub-section, then fixed 20-byte records, then a blank line.
/// `link_free_list` must have run first.
pub(crate) fn write_table(file: &mut dyn Write, table: &EntryTable) -> IoResult<()> {
    debug!("writing xref table with {} entries", table.len());
    file.write_all(b"xref\r\n")?;
    for (start, length) in table.runs() {
        Writer::write_integer(file, table.entries[start].number())?;
        file.write_all(b" ")?;
        Writer::write_integer(file, length)?;
        file.write_all(NEWLINE)?;

        for entry in &table.entries[start..start + length] {
            match entry.state {
                EntryState::Free { next_free } => {
                    Writer::write_zero_padded(file, u64::from(next_free), 10)?;
                    file.write_all(b" ")?;
                    Writer::write_zero_padded(file, u64::from(entry.id.1) + 1, 5)?;
                    file.write_all(b" f\r\n")?;
                }
                EntryState::Used { offset } => {
                    Writer::write_zero_padded(file, offset, 10)?;
                    file.write_all(b" ")?;
                    Writer::write_zero_padded(file, u64::from(entry.id.1), 5)?;
                    file.write_all(b" n\r\n")?;
                }
            }
        }
    }
    file.write_all(NEWLINE)
}

/// Field widths of a compressed cross-reference record, for the `W` key.
pub(crate) fn stream_field_widths() -> Object {
    Object::Array(vec![4.into(), 8.into(), 4.into()])
}

/// Record payload of a compressed cross-reference stream: per entry a
/// big-endian type-1 marker, the 8-byte offset (0 for free entries) and a
/// zero field, matching `W = [4 8 4]`.
pub(crate) fn stream_payload(table: &EntryTable) -> Vec<u8> {
    let mut payload = Vec::with_capacity(table.len() * 16);
    for entry in table.iter() {
        let offset = match entry.state {
            EntryState::Used { offset } => offset,
            EntryState::Free { .. } => 0,
        };
        payload.extend_from_slice(&TYPE_USED.to_be_bytes());
        payload.extend_from_slice(&offset.to_be_bytes());
        payload.extend_from_slice(&0u32.to_be_bytes());
    }
    payload
}

/// `Index` array for a compressed cross-reference stream: a
/// `[first count]` pair per contiguous run.
pub(crate) fn index_array(table: &EntryTable) -> Vec<Object> {
    let mut index = Vec::new();
    for (start, length) in table.runs() {
        index.push(Object::Integer(i64::from(table.entries[start].number())));
        index.push(Object::Integer(length as i64));
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_object_numbers() {
        let mut table = EntryTable::new();
        table.push_used((5, 0), 100).unwrap();
        assert!(matches!(table.push_used((5, 0), 200), Err(Error::DuplicateEntry(5))));
        assert!(matches!(table.push_free((5, 1)), Err(Error::DuplicateEntry(5))));
    }

    #[test]
    fn out_of_order_insert_keeps_table_sorted() {
        let mut table = EntryTable::new();
        table.push_used((8, 0), 300).unwrap();
        table.push_used((2, 0), 100).unwrap();
        table.push_free((5, 0)).unwrap();
        let numbers: Vec<u32> = table.iter().map(|entry| entry.id.0).collect();
        assert_eq!(numbers, vec![2, 5, 8]);
        assert_eq!(table.greatest_object_number(), 8);
    }

    #[test]
    fn free_list_links_in_ascending_order() {
        let mut table = EntryTable::new();
        table.push_free((3, 0)).unwrap();
        table.push_used((5, 0), 100).unwrap();
        table.push_free((7, 0)).unwrap();
        table.link_free_list();

        // Head chains 0 -> 3 -> 7 -> 0.
        let links: Vec<(u32, u32)> = table
            .iter()
            .filter_map(|entry| match entry.state {
                EntryState::Free { next_free } => Some((entry.id.0, next_free)),
                EntryState::Used { .. } => None,
            })
            .collect();
        assert_eq!(links, vec![(0, 3), (3, 7), (7, 0)]);
    }

    #[test]
    fn runs_partition_contiguous_numbers() {
        let mut table = EntryTable::new();
        for number in [1u32, 2, 3, 7, 9, 10] {
            table.push_used((number, 0), u64::from(number) * 10).unwrap();
        }
        assert_eq!(table.runs(), vec![(0, 3), (3, 1), (4, 2)]);
    }

    #[test]
    fn table_record_layout() {
        let mut table = EntryTable::new();
        table.push_free((7, 0)).unwrap();
        table.link_free_list();

        let mut buffer = Vec::new();
        write_table(&mut buffer, &table).unwrap();
        let expected = b"xref\r\n\
            0 1\r\n\
            0000000007 65535 f\r\n\
            7 1\r\n\
            0000000000 00001 f\r\n\
            \r\n";
        assert_eq!(buffer, expected.to_vec());
    }

    #[test]
    fn twenty_byte_records() {
        let mut table = EntryTable::new();
        table.push_used((1, 0), 12345).unwrap();
        let mut buffer = Vec::new();
        write_table(&mut buffer, &table).unwrap();
        // "xref\r\n" + "1 1\r\n" + record + final CRLF
        assert_eq!(buffer.len(), 6 + 5 + 20 + 2);
        assert!(buffer.ends_with(b"0000012345 00000 n\r\n\r\n"));
    }

    #[test]
    fn stream_payload_records() {
        let mut table = EntryTable::new();
        table.push_used((18, 0), 0x0102).unwrap();
        table.push_free((20, 0)).unwrap();

        let payload = stream_payload(&table);
        assert_eq!(payload.len(), 32);
        assert_eq!(&payload[..4], &1u32.to_be_bytes());
        assert_eq!(&payload[4..12], &0x0102u64.to_be_bytes());
        assert_eq!(&payload[12..16], &0u32.to_be_bytes());
        // Free entries collapse to a used-zero record.
        assert_eq!(&payload[16..20], &1u32.to_be_bytes());
        assert_eq!(&payload[20..28], &0u64.to_be_bytes());
    }

    #[test]
    fn index_pairs_follow_runs() {
        let mut table = EntryTable::new();
        table.push_used((18, 0), 10).unwrap();
        table.push_used((20, 0), 20).unwrap();
        table.push_used((21, 0), 30).unwrap();
        let index: Vec<i64> = index_array(&table).iter().filter_map(Object::as_i64).collect();
        assert_eq!(index, vec![18, 1, 20, 2]);
    }
}
