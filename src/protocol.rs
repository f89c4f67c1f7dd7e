use bytes::{BufMut, Bytes, BytesMut};

use crate::command::Command;
use crate::error::{Error, Result};

/// Largest bulk string the decoder accepts, the same ceiling Redis applies.
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn is_nil(&self) -> bool {
        matches!(self, RespValue::Bulk(None))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RespValue::Simple(_) => "simple string",
            RespValue::Error(_) => "error",
            RespValue::Integer(_) => "integer",
            RespValue::Bulk(None) => "nil",
            RespValue::Bulk(Some(_)) => "bulk string",
            RespValue::Array(_) => "array",
        }
    }
}

/// Serializes a command into a RESP array of bulk strings.
pub fn encode_command(command: &Command) -> Bytes {
    let name = command.name().as_bytes();
    let args = command.args();
    let payload_len: usize = args.iter().map(|a| a.len() + 16).sum::<usize>() + name.len() + 32;
    let mut out = BytesMut::with_capacity(payload_len);

    out.put_slice(format!("*{}\r\n", args.len() + 1).as_bytes());
    put_bulk(&mut out, name);
    for arg in args {
        put_bulk(&mut out, arg);
    }
    out.freeze()
}

fn put_bulk(out: &mut BytesMut, value: &[u8]) {
    out.put_slice(format!("${}\r\n", value.len()).as_bytes());
    out.put_slice(value);
    out.put_slice(b"\r\n");
}

/// Serializes a reply value.
pub fn encode(value: RespValue) -> Vec<u8> {
    match value {
        RespValue::Simple(v) => format!("+{}\r\n", v).into_bytes(),
        RespValue::Error(v) => format!("-{}\r\n", v).into_bytes(),
        RespValue::Integer(v) => format!(":{}\r\n", v).into_bytes(),
        RespValue::Bulk(None) => b"$-1\r\n".to_vec(),
        RespValue::Bulk(Some(v)) => {
            let mut out = format!("${}\r\n", v.len()).into_bytes();
            out.extend_from_slice(&v);
            out.extend_from_slice(b"\r\n");
            out
        }
        RespValue::Array(values) => {
            let mut out = format!("*{}\r\n", values.len()).into_bytes();
            for value in values {
                out.extend_from_slice(&encode(value));
            }
            out
        }
    }
}

/// Deepest array nesting the decoder accepts.
pub const MAX_NESTING: usize = 512;

/// Decodes one frame from the front of `buf`.
///
/// Returns `Ok(None)` when `buf` does not hold a complete frame yet, otherwise
/// the frame and the number of bytes it occupied. Bytes past the frame are left
/// untouched so the caller can keep parsing the stream.
pub fn decode(buf: &[u8]) -> Result<Option<(RespValue, usize)>> {
    match ReplyDecoder::new().decode(buf)? {
        (Some(frame), used) => Ok(Some((frame, used))),
        (None, _) => Ok(None),
    }
}

struct PartialArray {
    remaining: usize,
    items: Vec<RespValue>,
}

enum Element {
    Value(RespValue),
    ArrayHeader(usize),
}

/// Incremental reply decoder for a byte stream.
///
/// Elements are consumed as soon as they are complete and arrays under
/// construction are kept between calls, so a large reply arriving in many
/// reads is scanned once.
#[derive(Default)]
pub struct ReplyDecoder {
    stack: Vec<PartialArray>,
}

impl ReplyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while part of a frame has been consumed but not yet returned.
    pub fn in_progress(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Consumes complete elements from the front of `buf`.
    ///
    /// Returns the finished frame, if one completed, and the number of bytes
    /// consumed. The caller drops those bytes before the next call.
    pub fn decode(&mut self, buf: &[u8]) -> Result<(Option<RespValue>, usize)> {
        let mut pos = 0;
        'elements: loop {
            let Some((element, next)) = parse_element(buf, pos)? else {
                return Ok((None, pos));
            };
            pos = next;

            let mut value = match element {
                Element::Value(value) => value,
                Element::ArrayHeader(0) => RespValue::Array(Vec::new()),
                Element::ArrayHeader(count) => {
                    if self.stack.len() >= MAX_NESTING {
                        return Err(Error::Protocol(format!(
                            "arrays nested deeper than {} levels",
                            MAX_NESTING
                        )));
                    }
                    self.stack.push(PartialArray {
                        remaining: count,
                        items: Vec::with_capacity(count.min(1024)),
                    });
                    continue;
                }
            };

            while let Some(mut parent) = self.stack.pop() {
                parent.items.push(value);
                parent.remaining -= 1;
                if parent.remaining > 0 {
                    self.stack.push(parent);
                    continue 'elements;
                }
                value = RespValue::Array(parent.items);
            }
            return Ok((Some(value), pos));
        }
    }
}

/// Parses one scalar or array header starting at `pos`; the returned offset is
/// absolute.
fn parse_element(buf: &[u8], pos: usize) -> Result<Option<(Element, usize)>> {
    let Some(&prefix) = buf.get(pos) else {
        return Ok(None);
    };
    let Some((line, next)) = read_line(buf, pos + 1)? else {
        return Ok(None);
    };

    let value = match prefix {
        b'+' => RespValue::Simple(line_to_string(line)),
        b'-' => RespValue::Error(line_to_string(line)),
        b':' => RespValue::Integer(parse_int(line)?),
        b'$' => {
            let len = parse_int(line)?;
            if len == -1 {
                return Ok(Some((Element::Value(RespValue::Bulk(None)), next)));
            }
            if !(0..=MAX_BULK_LEN).contains(&len) {
                return Err(Error::Protocol(format!("invalid bulk length {}", len)));
            }
            let end = next + len as usize;
            if buf.len() < end + 2 {
                return Ok(None);
            }
            if &buf[end..end + 2] != b"\r\n" {
                return Err(Error::Protocol("invalid RESP bulk ending".to_string()));
            }
            let bulk = RespValue::Bulk(Some(buf[next..end].to_vec()));
            return Ok(Some((Element::Value(bulk), end + 2)));
        }
        b'*' => {
            let count = parse_int(line)?;
            if count == -1 {
                return Ok(Some((Element::Value(RespValue::Bulk(None)), next)));
            }
            if count < 0 {
                return Err(Error::Protocol(format!("invalid array length {}", count)));
            }
            return Ok(Some((Element::ArrayHeader(count as usize), next)));
        }
        other => {
            return Err(Error::Protocol(format!(
                "unsupported RESP type byte 0x{:02x}",
                other
            )));
        }
    };

    Ok(Some((Element::Value(value), next)))
}

/// Finds the CRLF-terminated line starting at `pos`. Returns the line without
/// the terminator and the offset just past it.
fn read_line(buf: &[u8], pos: usize) -> Result<Option<(&[u8], usize)>> {
    if pos > buf.len() {
        return Ok(None);
    }
    let Some(lf) = buf[pos..].iter().position(|b| *b == b'\n') else {
        return Ok(None);
    };
    let lf = pos + lf;
    if lf == pos || buf[lf - 1] != b'\r' {
        return Err(Error::Protocol("invalid RESP line ending".to_string()));
    }
    Ok(Some((&buf[pos..lf - 1], lf + 1)))
}

fn line_to_string(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

fn parse_int(line: &[u8]) -> Result<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            Error::Protocol(format!(
                "invalid RESP integer '{}'",
                String::from_utf8_lossy(line)
            ))
        })
}
