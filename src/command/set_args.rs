use super::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expiration {
    Ex(u64),
    ExAt(u64),
    Px(u64),
    PxAt(u64),
    KeepTtl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    Nx,
    Xx,
}

/// Options for `SET`.
///
/// Only one expiration and one condition can be present; a later call replaces
/// an earlier one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetArgs {
    expiration: Option<Expiration>,
    condition: Option<Condition>,
}

impl SetArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire after `seconds`.
    pub fn ex(mut self, seconds: u64) -> Self {
        self.expiration = Some(Expiration::Ex(seconds));
        self
    }

    /// Expire at the given unix time in seconds.
    pub fn ex_at(mut self, timestamp: u64) -> Self {
        self.expiration = Some(Expiration::ExAt(timestamp));
        self
    }

    /// Expire after `milliseconds`.
    pub fn px(mut self, milliseconds: u64) -> Self {
        self.expiration = Some(Expiration::Px(milliseconds));
        self
    }

    /// Expire at the given unix time in milliseconds.
    pub fn px_at(mut self, timestamp: u64) -> Self {
        self.expiration = Some(Expiration::PxAt(timestamp));
        self
    }

    /// Retain the time to live already associated with the key.
    pub fn keep_ttl(mut self) -> Self {
        self.expiration = Some(Expiration::KeepTtl);
        self
    }

    /// Only set the key if it does not already exist.
    pub fn nx(mut self) -> Self {
        self.condition = Some(Condition::Nx);
        self
    }

    /// Only set the key if it already exists.
    pub fn xx(mut self) -> Self {
        self.condition = Some(Condition::Xx);
        self
    }

    pub(crate) fn build(&self, command: &mut Command) {
        match self.expiration {
            Some(Expiration::Ex(v)) => {
                command.arg("EX").arg_u64(v);
            }
            Some(Expiration::ExAt(v)) => {
                command.arg("EXAT").arg_u64(v);
            }
            Some(Expiration::Px(v)) => {
                command.arg("PX").arg_u64(v);
            }
            Some(Expiration::PxAt(v)) => {
                command.arg("PXAT").arg_u64(v);
            }
            Some(Expiration::KeepTtl) => {
                command.arg("KEEPTTL");
            }
            None => {}
        }

        match self.condition {
            Some(Condition::Nx) => {
                command.arg("NX");
            }
            Some(Condition::Xx) => {
                command.arg("XX");
            }
            None => {}
        }
    }
}
