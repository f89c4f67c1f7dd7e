#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use fedis_client::protocol::{decode, encode};
use fedis_client::{
    Client, ClientConfig, Connection, ConnectionOptions, RespValue, StringCodec,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

type Store = Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>;

/// In-process RESP server with an in-memory string keyspace.
pub struct FakeServer {
    pub addr: SocketAddr,
    password: Option<String>,
    store: Store,
    task: JoinHandle<()>,
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl FakeServer {
    pub async fn start() -> Self {
        Self::start_with_password(None).await
    }

    pub async fn start_with_password(password: Option<&str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let store: Store = Arc::new(Mutex::new(HashMap::new()));
        let password = password.map(str::to_string);

        let accept_store = store.clone();
        let accept_password = password.clone();
        let task = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                let store = accept_store.clone();
                let password = accept_password.clone();
                tokio::spawn(async move {
                    let _ = handle_client(socket, store, password).await;
                });
            }
        });

        Self {
            addr,
            password,
            store,
            task,
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            addr: self.addr.to_string(),
            password: self.password.clone(),
            ..ClientConfig::default()
        }
    }

    pub async fn client(&self) -> Client<StringCodec> {
        Client::connect(&self.config(), StringCodec::utf8())
            .await
            .expect("connect to fake server")
    }

    pub async fn raw_value(&self, key: &str) -> Option<Vec<u8>> {
        self.store.lock().await.get(key.as_bytes()).cloned()
    }
}

async fn handle_client(
    mut socket: TcpStream,
    store: Store,
    password: Option<String>,
) -> std::io::Result<()> {
    let mut buf = BytesMut::with_capacity(4096);
    let mut authenticated = password.is_none();

    loop {
        while let Some((frame, used)) = decode(&buf).map_err(std::io::Error::other)? {
            buf.advance(used);
            let response = match frame_to_args(frame) {
                Ok(args) => execute(&store, &password, &mut authenticated, args).await,
                Err(e) => RespValue::Error(e),
            };
            socket.write_all(&encode(response)).await?;
        }
        if socket.read_buf(&mut buf).await? == 0 {
            return Ok(());
        }
    }
}

/// Turns a decoded request frame back into its arguments.
pub fn frame_to_args(frame: RespValue) -> Result<Vec<Vec<u8>>, String> {
    match frame {
        RespValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                RespValue::Bulk(Some(v)) => Ok(v),
                RespValue::Simple(v) => Ok(v.into_bytes()),
                _ => Err("ERR command must be bulk-string array".to_string()),
            })
            .collect(),
        _ => Err("ERR expected array command frame".to_string()),
    }
}

fn err(message: &str) -> RespValue {
    RespValue::Error(message.to_string())
}

fn ok() -> RespValue {
    RespValue::Simple("OK".to_string())
}

fn arity(cmd: &str) -> RespValue {
    RespValue::Error(format!(
        "ERR wrong number of arguments for '{}' command",
        cmd.to_lowercase()
    ))
}

const NOT_INTEGER: &str = "ERR value is not an integer or out of range";

fn parse_i64(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.parse::<i64>().ok()
}

fn parse_f64(bytes: &[u8]) -> Option<f64> {
    std::str::from_utf8(bytes).ok()?.parse::<f64>().ok()
}

async fn execute(
    store: &Store,
    password: &Option<String>,
    authenticated: &mut bool,
    args: Vec<Vec<u8>>,
) -> RespValue {
    if args.is_empty() {
        return err("ERR empty command");
    }
    let cmd = String::from_utf8_lossy(&args[0]).to_uppercase();

    if cmd == "AUTH" {
        let supplied = args.last().map(|p| String::from_utf8_lossy(p).into_owned());
        return match password {
            None => err(
                "ERR AUTH <password> called without any password configured for the default user",
            ),
            Some(expected)
                if args.len() >= 2 && supplied.as_deref() == Some(expected.as_str()) =>
            {
                *authenticated = true;
                ok()
            }
            Some(_) => err("WRONGPASS invalid username-password pair or user is disabled."),
        };
    }
    if !*authenticated {
        return err("NOAUTH Authentication required.");
    }

    let mut data = store.lock().await;
    match cmd.as_str() {
        "PING" => RespValue::Simple("PONG".to_string()),
        "ECHO" if args.len() == 2 => RespValue::Bulk(Some(args[1].clone())),
        "SELECT" => ok(),
        "CLIENT" => ok(),
        "GET" if args.len() == 2 => RespValue::Bulk(data.get(&args[1]).cloned()),
        "GETSET" if args.len() == 3 => {
            RespValue::Bulk(data.insert(args[1].clone(), args[2].clone()))
        }
        "SET" if args.len() >= 3 => {
            let mut nx = false;
            let mut xx = false;
            let mut get = false;
            let mut idx = 3;
            while idx < args.len() {
                match String::from_utf8_lossy(&args[idx]).to_uppercase().as_str() {
                    "NX" => nx = true,
                    "XX" => xx = true,
                    "GET" => get = true,
                    "KEEPTTL" => {}
                    "EX" | "PX" | "EXAT" | "PXAT" => {
                        if args.get(idx + 1).and_then(|v| parse_i64(v)).is_none() {
                            return err(NOT_INTEGER);
                        }
                        idx += 1;
                    }
                    _ => return err("ERR syntax error"),
                }
                idx += 1;
            }
            if nx && xx {
                return err("ERR syntax error");
            }
            let old = data.get(&args[1]).cloned();
            let allowed = !(nx && old.is_some()) && !(xx && old.is_none());
            if allowed {
                data.insert(args[1].clone(), args[2].clone());
            }
            if get {
                RespValue::Bulk(old)
            } else if allowed {
                ok()
            } else {
                RespValue::Bulk(None)
            }
        }
        "SETNX" if args.len() == 3 => {
            if data.contains_key(&args[1]) {
                RespValue::Integer(0)
            } else {
                data.insert(args[1].clone(), args[2].clone());
                RespValue::Integer(1)
            }
        }
        "SETEX" | "PSETEX" if args.len() == 4 => match parse_i64(&args[2]) {
            Some(ttl) if ttl > 0 => {
                data.insert(args[1].clone(), args[3].clone());
                ok()
            }
            Some(_) => RespValue::Error(format!(
                "ERR invalid expire time in '{}' command",
                cmd.to_lowercase()
            )),
            None => err(NOT_INTEGER),
        },
        "MGET" if args.len() >= 2 => RespValue::Array(
            args[1..]
                .iter()
                .map(|k| RespValue::Bulk(data.get(k).cloned()))
                .collect(),
        ),
        "MSET" if args.len() >= 3 && args.len() % 2 == 1 => {
            for pair in args[1..].chunks(2) {
                data.insert(pair[0].clone(), pair[1].clone());
            }
            ok()
        }
        "MSETNX" if args.len() >= 3 && args.len() % 2 == 1 => {
            if args[1..].chunks(2).any(|pair| data.contains_key(&pair[0])) {
                return RespValue::Integer(0);
            }
            for pair in args[1..].chunks(2) {
                data.insert(pair[0].clone(), pair[1].clone());
            }
            RespValue::Integer(1)
        }
        "APPEND" if args.len() == 3 => {
            let entry = data.entry(args[1].clone()).or_default();
            entry.extend_from_slice(&args[2]);
            RespValue::Integer(entry.len() as i64)
        }
        "STRLEN" if args.len() == 2 => {
            RespValue::Integer(data.get(&args[1]).map_or(0, |v| v.len() as i64))
        }
        "GETRANGE" if args.len() == 4 => {
            let (Some(start), Some(end)) = (parse_i64(&args[2]), parse_i64(&args[3])) else {
                return err(NOT_INTEGER);
            };
            let value = data.get(&args[1]).cloned().unwrap_or_default();
            let range = byte_range(value.len(), start, end);
            RespValue::Bulk(Some(range.map(|(s, e)| value[s..=e].to_vec()).unwrap_or_default()))
        }
        "SETRANGE" if args.len() == 4 => {
            let Some(offset) = parse_i64(&args[2]) else {
                return err(NOT_INTEGER);
            };
            if offset < 0 {
                return err("ERR offset is out of range");
            }
            let offset = offset as usize;
            if args[3].is_empty() {
                return RespValue::Integer(data.get(&args[1]).map_or(0, |v| v.len() as i64));
            }
            let current = data.entry(args[1].clone()).or_default();
            if current.len() < offset + args[3].len() {
                current.resize(offset + args[3].len(), 0);
            }
            current[offset..offset + args[3].len()].copy_from_slice(&args[3]);
            RespValue::Integer(current.len() as i64)
        }
        "INCR" | "DECR" if args.len() == 2 => {
            incr_by(&mut data, &args[1], if cmd == "INCR" { 1 } else { -1 })
        }
        "INCRBY" | "DECRBY" if args.len() == 3 => {
            let Some(by) = parse_i64(&args[2]) else {
                return err(NOT_INTEGER);
            };
            let by = if cmd == "DECRBY" {
                match by.checked_neg() {
                    Some(v) => v,
                    None => return err("ERR decrement would overflow"),
                }
            } else {
                by
            };
            incr_by(&mut data, &args[1], by)
        }
        "INCRBYFLOAT" if args.len() == 3 => {
            let Some(by) = parse_f64(&args[2]) else {
                return err("ERR value is not a valid float");
            };
            let current = match data.get(&args[1]) {
                Some(v) => match parse_f64(v) {
                    Some(n) => n,
                    None => return err("ERR value is not a valid float"),
                },
                None => 0.0,
            };
            let next = (current + by).to_string().into_bytes();
            data.insert(args[1].clone(), next.clone());
            RespValue::Bulk(Some(next))
        }
        "GETBIT" if args.len() == 3 => {
            let Some(offset) = parse_i64(&args[2]).filter(|o| *o >= 0) else {
                return err("ERR bit offset is not an integer or out of range");
            };
            let value = data.get(&args[1]).cloned().unwrap_or_default();
            RespValue::Integer(bit_at(&value, offset as usize))
        }
        "SETBIT" if args.len() == 4 => {
            let Some(offset) = parse_i64(&args[2]).filter(|o| *o >= 0) else {
                return err("ERR bit offset is not an integer or out of range");
            };
            let bit = match parse_i64(&args[3]) {
                Some(b @ (0 | 1)) => b,
                _ => return err("ERR bit is not an integer or out of range"),
            };
            let offset = offset as usize;
            let value = data.entry(args[1].clone()).or_default();
            if value.len() <= offset / 8 {
                value.resize(offset / 8 + 1, 0);
            }
            let old = bit_at(value, offset);
            let mask = 0x80_u8 >> (offset % 8);
            if bit == 1 {
                value[offset / 8] |= mask;
            } else {
                value[offset / 8] &= !mask;
            }
            RespValue::Integer(old)
        }
        "BITCOUNT" if args.len() == 2 || args.len() == 4 => {
            let value = data.get(&args[1]).cloned().unwrap_or_default();
            let (start, end) = if args.len() == 4 {
                let (Some(s), Some(e)) = (parse_i64(&args[2]), parse_i64(&args[3])) else {
                    return err(NOT_INTEGER);
                };
                (s, e)
            } else {
                (0, -1)
            };
            let count = byte_range(value.len(), start, end)
                .map(|(s, e)| value[s..=e].iter().map(|b| b.count_ones() as i64).sum())
                .unwrap_or(0);
            RespValue::Integer(count)
        }
        "BITPOS" if (3..=5).contains(&args.len()) => {
            let bit = match parse_i64(&args[2]) {
                Some(b @ (0 | 1)) => b,
                _ => return err("ERR The bit argument must be 1 or 0."),
            };
            let Some(value) = data.get(&args[1]).cloned() else {
                return RespValue::Integer(if bit == 1 { -1 } else { 0 });
            };
            let start = match args.get(3) {
                Some(v) => match parse_i64(v) {
                    Some(n) => n,
                    None => return err(NOT_INTEGER),
                },
                None => 0,
            };
            let end_given = args.len() == 5;
            let end = match args.get(4) {
                Some(v) => match parse_i64(v) {
                    Some(n) => n,
                    None => return err(NOT_INTEGER),
                },
                None => -1,
            };
            RespValue::Integer(bitpos(&value, bit == 1, start, end, end_given))
        }
        "BITOP" if args.len() >= 4 => {
            let op = String::from_utf8_lossy(&args[1]).to_uppercase();
            let sources: Vec<Vec<u8>> = args[3..]
                .iter()
                .map(|k| data.get(k).cloned().unwrap_or_default())
                .collect();
            if op == "NOT" && sources.len() != 1 {
                return err("ERR BITOP NOT must be called with a single source key.");
            }
            let len = sources.iter().map(Vec::len).max().unwrap_or(0);
            let mut result = vec![0_u8; len];
            for (i, byte) in result.iter_mut().enumerate() {
                let mut column = sources.iter().map(|s| s.get(i).copied().unwrap_or(0));
                *byte = match op.as_str() {
                    "AND" => column.fold(0xff, |acc, b| acc & b),
                    "OR" => column.fold(0, |acc, b| acc | b),
                    "XOR" => column.fold(0, |acc, b| acc ^ b),
                    "NOT" => !column.next().unwrap_or(0),
                    _ => return err("ERR syntax error"),
                };
            }
            if result.is_empty() {
                data.remove(&args[2]);
            } else {
                data.insert(args[2].clone(), result);
            }
            RespValue::Integer(len as i64)
        }
        _ => {
            if is_known(&cmd) {
                arity(&cmd)
            } else {
                RespValue::Error(format!("ERR unknown command '{}'", cmd.to_lowercase()))
            }
        }
    }
}

fn is_known(cmd: &str) -> bool {
    matches!(
        cmd,
        "ECHO" | "GET" | "GETSET" | "SET" | "SETNX" | "SETEX" | "PSETEX" | "MGET" | "MSET"
            | "MSETNX" | "APPEND" | "STRLEN" | "GETRANGE" | "SETRANGE" | "INCR" | "DECR"
            | "INCRBY" | "DECRBY" | "INCRBYFLOAT" | "GETBIT" | "SETBIT" | "BITCOUNT"
            | "BITPOS" | "BITOP"
    )
}

fn incr_by(data: &mut HashMap<Vec<u8>, Vec<u8>>, key: &[u8], by: i64) -> RespValue {
    let current = match data.get(key) {
        Some(v) => match parse_i64(v) {
            Some(n) => n,
            None => return err(NOT_INTEGER),
        },
        None => 0,
    };
    let Some(next) = current.checked_add(by) else {
        return err("ERR increment or decrement would overflow");
    };
    data.insert(key.to_vec(), next.to_string().into_bytes());
    RespValue::Integer(next)
}

/// Inclusive byte range after resolving negative indexes, `None` when empty.
fn byte_range(len: usize, start: i64, end: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let len = len as i64;
    let s = if start < 0 { (len + start).max(0) } else { start };
    let mut e = if end < 0 { len + end } else { end };
    if e < 0 || s >= len {
        return None;
    }
    if e >= len {
        e = len - 1;
    }
    if s > e {
        return None;
    }
    Some((s as usize, e as usize))
}

fn bit_at(value: &[u8], offset: usize) -> i64 {
    value
        .get(offset / 8)
        .map_or(0, |byte| i64::from((*byte >> (7 - offset % 8)) & 1))
}

fn bitpos(value: &[u8], bit: bool, start: i64, end: i64, end_given: bool) -> i64 {
    let Some((s, e)) = byte_range(value.len(), start, end) else {
        return -1;
    };
    for (i, byte) in value[s..=e].iter().enumerate() {
        for shift in 0..8 {
            if ((*byte >> (7 - shift)) & 1 == 1) == bit {
                return ((s + i) * 8 + shift) as i64;
            }
        }
    }
    if !bit && !end_given {
        return ((e + 1) * 8) as i64;
    }
    -1
}

/// The server end of an in-memory stream, driven step by step by a test.
pub struct ScriptedPeer {
    stream: DuplexStream,
    buf: BytesMut,
}

pub fn scripted_client(options: ConnectionOptions) -> (Client<StringCodec>, ScriptedPeer) {
    scripted_client_with_buffer(options, 64 * 1024)
}

/// Like `scripted_client`, with `buffer` bytes of room in each direction.
pub fn scripted_client_with_buffer(
    options: ConnectionOptions,
    buffer: usize,
) -> (Client<StringCodec>, ScriptedPeer) {
    let (client_end, server_end) = tokio::io::duplex(buffer);
    let client = Client::new(Connection::new(client_end, options), StringCodec::utf8());
    (client, ScriptedPeer::new(server_end))
}

impl ScriptedPeer {
    pub fn new(stream: DuplexStream) -> Self {
        Self {
            stream,
            buf: BytesMut::new(),
        }
    }

    /// Reads the next request frame and returns its arguments as text.
    pub async fn next_request(&mut self) -> Vec<String> {
        loop {
            if let Some((frame, used)) = decode(&self.buf).expect("client sent valid RESP") {
                self.buf.advance(used);
                return frame_to_args(frame)
                    .expect("bulk array")
                    .into_iter()
                    .map(|a| String::from_utf8_lossy(&a).into_owned())
                    .collect();
            }
            let n = self.stream.read_buf(&mut self.buf).await.expect("read");
            assert!(n > 0, "client closed the stream");
        }
    }

    /// Waits up to `wait` for a request; `None` if nothing arrives.
    pub async fn try_next_request(&mut self, wait: Duration) -> Option<Vec<String>> {
        tokio::time::timeout(wait, self.next_request()).await.ok()
    }

    pub async fn reply(&mut self, raw: &[u8]) {
        self.stream.write_all(raw).await.expect("write reply");
        self.stream.flush().await.expect("flush reply");
    }

    pub async fn reply_value(&mut self, value: RespValue) {
        self.reply(&encode(value)).await;
    }
}

pub fn bulk(s: &str) -> RespValue {
    RespValue::Bulk(Some(s.as_bytes().to_vec()))
}

pub fn key(s: &str) -> String {
    s.to_string()
}
