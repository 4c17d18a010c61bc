use std::io::{Result, Write};

use crate::{Dictionary, Object, ObjectId, StringFormat};

pub(crate) const NEWLINE: &[u8] = b"\r\n";
const SPACE: &[u8] = b" ";
const BEGIN_OBJECT: &[u8] = b"obj\r\n";
const END_OBJECT: &[u8] = b"\r\nendobj\r\n";
const BEGIN_STREAM: &[u8] = b"stream\r\n";
const END_STREAM: &[u8] = b"\r\nendstream\r\n";
const BEGIN_DICTIONARY: &[u8] = b"<<";
const END_DICTIONARY: &[u8] = b">>";

pub struct Writer;

impl Writer {
    /// Emit the textual form of a value in place. Streams never appear in
    /// value position; one that does is reduced to its dictionary.
    pub fn write_object(file: &mut dyn Write, object: &Object) -> Result<()> {
        match object {
            Object::Null => file.write_all(b"null"),
            Object::Boolean(true) => file.write_all(b"true"),
            Object::Boolean(false) => file.write_all(b"false"),
            Object::Integer(value) => Writer::write_integer(file, *value),
            Object::Real(value) => Writer::write_real(file, *value),
            Object::Name(name) => Writer::write_name(file, name),
            Object::String(text, StringFormat::Literal) => Writer::write_literal_string(file, text),
            Object::String(text, StringFormat::Hexadecimal) => Writer::write_hex_string(file, text),
            Object::Array(array) => Writer::write_array(file, array),
            Object::Dictionary(dict) => Writer::write_dictionary(file, dict),
            Object::Stream(stream) => Writer::write_dictionary(file, &stream.dict),
            Object::Reference(id) => Writer::write_reference(file, *id),
            Object::Matrix(coefficients) => Writer::write_matrix(file, coefficients),
        }
    }

    /// `<obj#> <gen#> obj\r\n`
    pub fn write_object_header(file: &mut dyn Write, id: ObjectId) -> Result<()> {
        Writer::write_integer(file, id.0)?;
        file.write_all(SPACE)?;
        Writer::write_integer(file, id.1)?;
        file.write_all(SPACE)?;
        file.write_all(BEGIN_OBJECT)
    }

    /// `\r\nendobj\r\n`
    pub fn write_object_end(file: &mut dyn Write) -> Result<()> {
        file.write_all(END_OBJECT)
    }

    /// `stream\r\n<content>\r\nendstream\r\n`
    pub fn write_stream_body(file: &mut dyn Write, content: &[u8]) -> Result<()> {
        file.write_all(BEGIN_STREAM)?;
        file.write_all(content)?;
        file.write_all(END_STREAM)
    }

    pub fn write_name(file: &mut dyn Write, name: &[u8]) -> Result<()> {
        file.write_all(b"/")?;
        for &byte in name {
            // Bytes outside EXCLAMATION MARK (0x21) to TILDE (0x7E), and the
            // escape character itself, become #-prefixed hex pairs.
            if byte == b'#' || byte < 0x21 || byte > 0x7E {
                write!(file, "#{:02X}", byte)?;
            } else {
                file.write_all(&[byte])?;
            }
        }
        Ok(())
    }

    pub fn write_dictionary(file: &mut dyn Write, dictionary: &Dictionary) -> Result<()> {
        file.write_all(BEGIN_DICTIONARY)?;
        for (key, value) in dictionary {
            Writer::write_name(file, key)?;
            file.write_all(SPACE)?;
            Writer::write_object(file, value)?;
            file.write_all(SPACE)?;
        }
        file.write_all(END_DICTIONARY)
    }

    fn write_array(file: &mut dyn Write, array: &[Object]) -> Result<()> {
        file.write_all(b"[")?;
        for (index, object) in array.iter().enumerate() {
            if index > 0 {
                file.write_all(SPACE)?;
            }
            Writer::write_object(file, object)?;
        }
        file.write_all(b"]")
    }

    fn write_reference(file: &mut dyn Write, id: ObjectId) -> Result<()> {
        Writer::write_integer(file, id.0)?;
        file.write_all(SPACE)?;
        Writer::write_integer(file, id.1)?;
        file.write_all(SPACE)?;
        file.write_all(b"R")
    }

    // Coefficients are truncated to whole numbers on the way out.
    fn write_matrix(file: &mut dyn Write, coefficients: &[f64; 6]) -> Result<()> {
        file.write_all(b"[")?;
        for (index, coefficient) in coefficients.iter().enumerate() {
            if index > 0 {
                file.write_all(SPACE)?;
            }
            Writer::write_integer(file, *coefficient as i64)?;
        }
        file.write_all(b"]")
    }

    fn write_literal_string(file: &mut dyn Write, text: &[u8]) -> Result<()> {
        file.write_all(b"(")?;
        for &byte in text {
            if matches!(byte, b'(' | b')' | b'\\') {
                file.write_all(b"\\")?;
            }
            file.write_all(&[byte])?;
        }
        file.write_all(b")")
    }

    fn write_hex_string(file: &mut dyn Write, text: &[u8]) -> Result<()> {
        file.write_all(b"<")?;
        for &byte in text {
            write!(file, "{:02X}", byte)?;
        }
        file.write_all(b">")
    }

    pub(crate) fn write_integer<I: itoa::Integer>(file: &mut dyn Write, value: I) -> Result<()> {
        let mut buffer = itoa::Buffer::new();
        file.write_all(buffer.format(value).as_bytes())
    }

    fn write_real(file: &mut dyn Write, value: f64) -> Result<()> {
        let mut text = value.to_string();
        if !text.contains('.') {
            text.push_str(".0");
        }
        file.write_all(text.as_bytes())
    }

    /// Decimal digits left-padded with zeros to `width`; an over-wide value
    /// keeps only its trailing `width` digits.
    pub(crate) fn write_zero_padded(file: &mut dyn Write, value: u64, width: usize) -> Result<()> {
        let mut buffer = itoa::Buffer::new();
        let digits = buffer.format(value).as_bytes();
        if digits.len() >= width {
            file.write_all(&digits[digits.len() - width..])
        } else {
            for _ in 0..width - digits.len() {
                file.write_all(b"0")?;
            }
            file.write_all(digits)
        }
    }
}

/// Output wrapper that tracks how many bytes went through it, so object
/// offsets can be recorded as they are written.
pub struct CountingWrite<W: Write> {
    inner: W,
    bytes_written: u64,
}

impl<W: Write> CountingWrite<W> {
    pub fn new(inner: W) -> CountingWrite<W> {
        CountingWrite {
            inner,
            bytes_written: 0,
        }
    }

    /// Bytes written since construction.
    pub fn count(&self) -> u64 {
        self.bytes_written
    }
}

impl<W: Write> Write for CountingWrite<W> {
    #[inline]
    fn write(&mut self, buffer: &[u8]) -> Result<usize> {
        let result = self.inner.write(buffer);
        if let Ok(bytes) = result {
            self.bytes_written += bytes as u64;
        }
        result
    }

    #[inline]
    fn write_all(&mut self, buffer: &[u8]) -> Result<()> {
        self.bytes_written += buffer.len() as u64;
        // On Err the whole update is abandoned, so the count being ahead of
        // the sink does not matter.
        self.inner.write_all(buffer)
    }

    #[inline]
    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}
