use std::fmt;

use super::Command;
use crate::error::{Error, Result};

/// Integer encoding addressed by a `BITFIELD` subcommand, e.g. `i8` or `u4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitFieldType {
    signed: bool,
    bits: u8,
}

impl BitFieldType {
    /// Signed integer of 1 to 64 bits.
    pub fn signed(bits: u8) -> Self {
        Self { signed: true, bits }
    }

    /// Unsigned integer of 1 to 63 bits.
    pub fn unsigned(bits: u8) -> Self {
        Self {
            signed: false,
            bits,
        }
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    fn validate(&self) -> Result<()> {
        let max = if self.signed { 64 } else { 63 };
        if self.bits == 0 || self.bits > max {
            return Err(Error::InvalidArgument(format!(
                "{} bitfield width must be between 1 and {}, got {}",
                if self.signed { "signed" } else { "unsigned" },
                max,
                self.bits
            )));
        }
        Ok(())
    }
}

impl fmt::Display for BitFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", if self.signed { 'i' } else { 'u' }, self.bits)
    }
}

/// Bit offset of a field: either absolute, or `#n` meaning `n` times the
/// width of the field's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    value: u64,
    multiply_by_type_width: bool,
}

impl Offset {
    pub fn bits(value: u64) -> Self {
        Self {
            value,
            multiply_by_type_width: false,
        }
    }

    pub fn typed(value: u64) -> Self {
        Self {
            value,
            multiply_by_type_width: true,
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multiply_by_type_width {
            write!(f, "#{}", self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowBehavior {
    Wrap,
    Sat,
    Fail,
}

impl OverflowBehavior {
    fn token(&self) -> &'static str {
        match self {
            OverflowBehavior::Wrap => "WRAP",
            OverflowBehavior::Sat => "SAT",
            OverflowBehavior::Fail => "FAIL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubCommand {
    Get(BitFieldType, Offset),
    Set(BitFieldType, Offset, i64),
    IncrBy(BitFieldType, Offset, i64),
    Overflow(OverflowBehavior),
}

/// Subcommands for `BITFIELD`, emitted in the order they were added.
///
/// ```
/// use fedis_client::{BitFieldArgs, BitFieldType, Offset, OverflowBehavior};
///
/// let args = BitFieldArgs::new()
///     .incrby(BitFieldType::unsigned(2), Offset::bits(100), 1)
///     .overflow(OverflowBehavior::Sat)
///     .incrby(BitFieldType::unsigned(2), Offset::bits(102), 1);
/// assert_eq!(args.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitFieldArgs {
    commands: Vec<SubCommand>,
}

impl BitFieldArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(mut self, ty: BitFieldType, offset: Offset) -> Self {
        self.commands.push(SubCommand::Get(ty, offset));
        self
    }

    pub fn set(mut self, ty: BitFieldType, offset: Offset, value: i64) -> Self {
        self.commands.push(SubCommand::Set(ty, offset, value));
        self
    }

    pub fn incrby(mut self, ty: BitFieldType, offset: Offset, increment: i64) -> Self {
        self.commands.push(SubCommand::IncrBy(ty, offset, increment));
        self
    }

    /// Changes overflow handling for the `SET`/`INCRBY` subcommands that follow.
    pub fn overflow(mut self, behavior: OverflowBehavior) -> Self {
        self.commands.push(SubCommand::Overflow(behavior));
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub(crate) fn build(&self, command: &mut Command) -> Result<()> {
        for sub in &self.commands {
            match sub {
                SubCommand::Get(ty, offset) => {
                    ty.validate()?;
                    command
                        .arg("GET")
                        .arg(ty.to_string())
                        .arg(offset.to_string());
                }
                SubCommand::Set(ty, offset, value) => {
                    ty.validate()?;
                    command
                        .arg("SET")
                        .arg(ty.to_string())
                        .arg(offset.to_string())
                        .arg_i64(*value);
                }
                SubCommand::IncrBy(ty, offset, increment) => {
                    ty.validate()?;
                    command
                        .arg("INCRBY")
                        .arg(ty.to_string())
                        .arg(offset.to_string())
                        .arg_i64(*increment);
                }
                SubCommand::Overflow(behavior) => {
                    command.arg("OVERFLOW").arg(behavior.token());
                }
            }
        }
        Ok(())
    }
}
