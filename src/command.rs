mod bitfield;
mod set_args;
mod stralgo;


pub use bitfield::{BitFieldArgs, BitFieldType, Offset, OverflowBehavior};
pub use set_args::SetArgs;
pub use stralgo::{MatchedPosition, Position, StrAlgoArgs, StringMatchResult};

use bytes::Bytes;

use crate::codec::Codec;
use crate::error::Result;

/// A request frame: the command name followed by its arguments in wire order.
///
/// Keys and values go through the connection's codec while the frame is being
/// built, so an encoding failure surfaces before anything is queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<Bytes>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    pub fn arg(&mut self, arg: impl Into<Bytes>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn arg_i64(&mut self, value: i64) -> &mut Self {
        self.arg(value.to_string())
    }

    pub fn arg_u64(&mut self, value: u64) -> &mut Self {
        self.arg(value.to_string())
    }

    pub fn arg_f64(&mut self, value: f64) -> &mut Self {
        self.arg(value.to_string())
    }

    pub fn key<C: Codec>(&mut self, codec: &C, key: &C::Key) -> Result<&mut Self> {
        let encoded = codec.encode_key(key)?;
        Ok(self.arg(encoded))
    }

    pub fn keys<'a, C, I>(&mut self, codec: &C, keys: I) -> Result<&mut Self>
    where
        C: Codec,
        C::Key: 'a,
        I: IntoIterator<Item = &'a C::Key>,
    {
        for key in keys {
            self.key(codec, key)?;
        }
        Ok(self)
    }

    pub fn value<C: Codec>(&mut self, codec: &C, value: &C::Value) -> Result<&mut Self> {
        let encoded = codec.encode_value(value)?;
        Ok(self.arg(encoded))
    }

    /// Appends each pair as key immediately followed by value, in iteration order.
    pub fn pairs<'a, C, I>(&mut self, codec: &C, pairs: I) -> Result<&mut Self>
    where
        C: Codec,
        C::Key: 'a,
        C::Value: 'a,
        I: IntoIterator<Item = (&'a C::Key, &'a C::Value)>,
    {
        for (key, value) in pairs {
            self.key(codec, key)?;
            self.value(codec, value)?;
        }
        Ok(self)
    }
}
