use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::{debug, trace};

use crate::encryption::SecurityManager;
use crate::state::{Change, Document, PrevTrailer};
use crate::writer::{CountingWrite, Writer, NEWLINE};
use crate::xref::{self, EntryTable};
use crate::{Error, Object, ObjectId, Result, Stream};

const TRAILER: &[u8] = b"trailer\r\n";
const STARTXREF: &[u8] = b"\r\n\r\nstartxref\r\n";
const COMMENT_EOF: &[u8] = b"\r\n%%EOF\r\n";

/// Append an incremental update for the document's pending changes.
///
/// `document_length` is the byte length of the existing file; all offsets in
/// the emitted cross-reference are measured from the start of that file.
/// Returns the number of bytes written, which is 0 when nothing changed.
pub fn append_incremental_update<W: Write>(
    document: &Document,
    target: W,
    document_length: u64,
) -> Result<u64> {
    if !document.state.is_changed() {
        debug!("no changes, will not append incremental update");
        return Ok(0);
    }
    debug!("have changes, will append incremental update");
    if document.is_encrypted() {
        debug!("document is encrypted, stream payloads will be enciphered");
    }

    let mut updater = IncrementalUpdater::new(target, document_length, document.security.as_ref());
    updater.begin()?;
    for (id, change) in document.state.changes() {
        updater.write_change(id, change)?;
    }

    let prev = document.state.trailer();
    if prev.is_xref_stream() {
        updater.write_compressed_xref(prev)?;
    } else {
        updater.write_xref_table()?;
        updater.write_trailer(prev)?;
    }
    Ok(updater.bytes_written())
}

/// Serialize each changed object in isolation: no leading newline, no
/// cross-reference, no trailer. Deleted objects contribute an empty blob.
pub fn updated_document_objects(document: &Document) -> Result<Vec<Vec<u8>>> {
    if !document.state.is_changed() {
        return Ok(Vec::new());
    }

    let mut objects = Vec::with_capacity(document.state.changed_count());
    for (id, change) in document.state.changes() {
        let mut buffer = Vec::new();
        let mut updater = IncrementalUpdater::new(&mut buffer, 0, document.security.as_ref());
        updater.write_change(id, change)?;
        objects.push(buffer);
    }
    Ok(objects)
}

/// One in-flight update: the counting sink, the cross-reference entries
/// accumulated while objects stream out, and the position the final
/// `startxref` will point at.
struct IncrementalUpdater<'a, W: Write> {
    output: CountingWrite<W>,
    starting_position: u64,
    xref_position: u64,
    entries: EntryTable,
    security: Option<&'a SecurityManager>,
}

impl<'a, W: Write> IncrementalUpdater<'a, W> {
    fn new(target: W, starting_position: u64, security: Option<&'a SecurityManager>) -> Self {
        IncrementalUpdater {
            output: CountingWrite::new(target),
            starting_position,
            xref_position: 0,
            entries: EntryTable::new(),
            security,
        }
    }

    /// The original may end immediately after `%%EOF`, leaving the comment
    /// still open; a newline terminates it before any token is written.
    fn begin(&mut self) -> Result<()> {
        self.output.write_all(NEWLINE)?;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.output.count()
    }

    fn write_change(&mut self, id: ObjectId, change: &Change) -> Result<()> {
        match change {
            Change::Deleted => {
                trace!("object {} {} R deleted, recording free entry", id.0, id.1);
                self.entries.push_free(id)
            }
            Change::Written(Object::Stream(stream)) => self.write_stream_object(id, stream),
            Change::Written(object) => self.write_plain_object(id, object),
        }
    }

    /// Top-level emission of a dictionary or primitive object.
    fn write_plain_object(&mut self, id: ObjectId, object: &Object) -> Result<()> {
        trace!("writing object {} {} R", id.0, id.1);
        self.entries
            .push_used(id, self.starting_position + self.output.count())?;

        Writer::write_object_header(&mut self.output, id)?;
        Writer::write_object(&mut self.output, object)?;
        Writer::write_object_end(&mut self.output)?;
        Ok(())
    }

    /// Top-level emission of a stream: payload through the filter pipeline,
    /// dictionary restamped with the final length.
    fn write_stream_object(&mut self, id: ObjectId, stream: &Stream) -> Result<()> {
        trace!("writing stream {} {} R", id.0, id.1);
        self.entries
            .push_used(id, self.starting_position + self.output.count())?;

        let payload = self.process_stream_payload(id, stream)?;

        let mut dict = stream.dict.clone();
        dict.set("Length", payload.len() as i64);
        dict.set("FormType", 1);

        Writer::write_object_header(&mut self.output, id)?;
        Writer::write_dictionary(&mut self.output, &dict)?;
        Writer::write_stream_body(&mut self.output, &payload)?;
        Writer::write_object_end(&mut self.output)?;
        Ok(())
    }

    /// Compress, then encrypt. Never the reverse.
    fn process_stream_payload(&self, id: ObjectId, stream: &Stream) -> Result<Vec<u8>> {
        let mut payload = if !stream.content_is_compressed && stream.dict.has(b"Filter") {
            deflate(&stream.content)?
        } else {
            stream.content.clone()
        };

        if let Some(security) = self.security {
            payload = security
                .encrypt_stream(id, stream.decode_parms(), &payload)
                .map_err(|source| Error::Encryption { id, source })?;
        }
        Ok(payload)
    }

    fn write_xref_table(&mut self) -> Result<()> {
        self.entries.link_free_list();

        self.output.write_all(NEWLINE)?;
        self.xref_position = self.starting_position + self.output.count();
        xref::write_table(&mut self.output, &self.entries)?;
        Ok(())
    }

    fn write_trailer(&mut self, prev: &PrevTrailer) -> Result<()> {
        let mut trailer = prev.dictionary.clone();
        let greatest = self.entries.greatest_object_number();
        trailer.set("Size", prev.size().max(i64::from(greatest) + 1));
        trailer.set("Prev", prev.position as i64);
        // Only the previous trailer may carry XRefStm; left in place it
        // would shadow every object this update writes.
        trailer.remove(b"XRefStm");

        // A prior trailer at position zero means the file was only ever
        // recovered by linear traversal. Pointing startxref nowhere keeps
        // readers in that mode instead of resolving against a stale table.
        let xref_position = if prev.position == 0 {
            -1
        } else {
            self.xref_position as i64
        };

        self.output.write_all(TRAILER)?;
        Writer::write_dictionary(&mut self.output, &trailer)?;
        self.output.write_all(STARTXREF)?;
        Writer::write_integer(&mut self.output, xref_position)?;
        self.output.write_all(NEWLINE)?;
        self.output.write_all(COMMENT_EOF)?;
        Ok(())
    }

    /// Compressed path: the trailer is itself an indirect stream object
    /// holding the cross-reference records, written under a freshly
    /// allocated object number.
    fn write_compressed_xref(&mut self, prev: &PrevTrailer) -> Result<()> {
        let trailer_id: ObjectId = (self.entries.greatest_object_number() + 1, 0);

        let mut trailer = prev.dictionary.clone();
        trailer.set("Size", prev.size().max(i64::from(trailer_id.0) + 1));
        trailer.set("Prev", prev.position as i64);
        trailer.remove(b"DecodeParms");
        trailer.set("Filter", "FlateDecode");
        trailer.set("W", xref::stream_field_widths());
        trailer.set("Index", xref::index_array(&self.entries));

        self.xref_position = self.starting_position + self.output.count();
        let stream = Stream::new(trailer, xref::stream_payload(&self.entries));
        self.write_stream_object(trailer_id, &stream)?;

        self.output.write_all(STARTXREF)?;
        Writer::write_integer(&mut self.output, self.xref_position)?;
        self.output.write_all(NEWLINE)?;
        self.output.write_all(COMMENT_EOF)?;
        Ok(())
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
