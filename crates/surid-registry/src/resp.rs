//! RESP command encoding and reply parsing.
//!
//! Only the slice of the protocol the registry contract needs: commands go
//! out as arrays of bulk strings, replies come back as simple strings,
//! errors, integers, bulk strings, nulls, or arrays.

use std::io::BufRead;

use crate::error::RegistryError;

/// One parsed server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(String),
    Null,
    Array(Vec<Reply>),
}

impl Reply {
    /// The bulk-string payload, if this reply carries one.
    pub fn as_bulk(&self) -> Option<&str> {
        match self {
            Reply::Bulk(s) => Some(s),
            _ => None,
        }
    }
}

/// Encode a command as a RESP array of bulk strings.
pub fn encode_command(args: &[&str]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        buf.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.extend_from_slice(arg.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf
}

/// Read one complete reply from the stream.
pub fn read_reply(reader: &mut impl BufRead) -> Result<Reply, RegistryError> {
    let line = read_line(reader)?;
    let (kind, rest) = line.split_at(1);
    match kind {
        "+" => Ok(Reply::Simple(rest.to_string())),
        "-" => Ok(Reply::Error(rest.to_string())),
        ":" => rest
            .parse()
            .map(Reply::Integer)
            .map_err(|_| RegistryError::Protocol(format!("bad integer reply: {rest:?}"))),
        "$" => {
            let len: i64 = rest
                .parse()
                .map_err(|_| RegistryError::Protocol(format!("bad bulk length: {rest:?}")))?;
            if len < 0 {
                return Ok(Reply::Null);
            }
            let mut buf = vec![0u8; len as usize + 2];
            reader.read_exact(&mut buf)?;
            buf.truncate(len as usize);
            String::from_utf8(buf)
                .map(Reply::Bulk)
                .map_err(|_| RegistryError::Protocol("bulk reply is not utf-8".to_string()))
        }
        "*" => {
            let len: i64 = rest
                .parse()
                .map_err(|_| RegistryError::Protocol(format!("bad array length: {rest:?}")))?;
            if len < 0 {
                return Ok(Reply::Null);
            }
            let mut items = Vec::with_capacity(len as usize);
            for _ in 0..len {
                items.push(read_reply(reader)?);
            }
            Ok(Reply::Array(items))
        }
        other => Err(RegistryError::Protocol(format!(
            "unknown reply marker {other:?}"
        ))),
    }
}

fn read_line(reader: &mut impl BufRead) -> Result<String, RegistryError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line)?;
    if n == 0 {
        return Err(RegistryError::Protocol(
            "connection closed mid-reply".to_string(),
        ));
    }
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        return Err(RegistryError::Protocol("empty reply line".to_string()));
    }
    Ok(trimmed.to_string())
}
