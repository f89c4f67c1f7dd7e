use super::*;
use crate::command::{BitFieldArgs, SetArgs, StrAlgoArgs, StringMatchResult};
use crate::output::KeyValue;

impl<C: Codec> Client<C> {
    /// Appends `value` and returns the length of the string afterwards.
    pub async fn append(&self, key: &C::Key, value: &C::Value) -> Result<i64> {
        let mut command = Command::new("APPEND");
        command.key(self.codec(), key)?.value(self.codec(), value)?;
        output::integer(self.execute(command).await?)
    }

    pub async fn bitcount(&self, key: &C::Key) -> Result<i64> {
        let mut command = Command::new("BITCOUNT");
        command.key(self.codec(), key)?;
        output::integer(self.execute(command).await?)
    }

    pub async fn bitcount_range(&self, key: &C::Key, start: i64, end: i64) -> Result<i64> {
        let mut command = Command::new("BITCOUNT");
        command.key(self.codec(), key)?.arg_i64(start).arg_i64(end);
        output::integer(self.execute(command).await?)
    }

    /// Runs the `BITFIELD` subcommands in `args`. Results follow subcommand
    /// order; `None` marks a write refused by `OVERFLOW FAIL`.
    pub async fn bitfield(&self, key: &C::Key, args: &BitFieldArgs) -> Result<Vec<Option<i64>>> {
        let mut command = Command::new("BITFIELD");
        command.key(self.codec(), key)?;
        args.build(&mut command)?;
        output::integer_list(self.execute(command).await?)
    }

    /// Position of the first bit set to `state`, or -1.
    pub async fn bitpos(&self, key: &C::Key, state: bool) -> Result<i64> {
        let mut command = Command::new("BITPOS");
        command.key(self.codec(), key)?.arg_i64(i64::from(state));
        output::integer(self.execute(command).await?)
    }

    pub async fn bitpos_from(&self, key: &C::Key, state: bool, start: i64) -> Result<i64> {
        let mut command = Command::new("BITPOS");
        command
            .key(self.codec(), key)?
            .arg_i64(i64::from(state))
            .arg_i64(start);
        output::integer(self.execute(command).await?)
    }

    pub async fn bitpos_range(
        &self,
        key: &C::Key,
        state: bool,
        start: i64,
        end: i64,
    ) -> Result<i64> {
        let mut command = Command::new("BITPOS");
        command
            .key(self.codec(), key)?
            .arg_i64(i64::from(state))
            .arg_i64(start)
            .arg_i64(end);
        output::integer(self.execute(command).await?)
    }

    pub async fn bitop_and(&self, destination: &C::Key, keys: &[C::Key]) -> Result<i64> {
        self.bitop("AND", destination, keys).await
    }

    pub async fn bitop_not(&self, destination: &C::Key, source: &C::Key) -> Result<i64> {
        self.bitop("NOT", destination, std::slice::from_ref(source)).await
    }

    pub async fn bitop_or(&self, destination: &C::Key, keys: &[C::Key]) -> Result<i64> {
        self.bitop("OR", destination, keys).await
    }

    pub async fn bitop_xor(&self, destination: &C::Key, keys: &[C::Key]) -> Result<i64> {
        self.bitop("XOR", destination, keys).await
    }

    async fn bitop(
        &self,
        operation: &'static str,
        destination: &C::Key,
        keys: &[C::Key],
    ) -> Result<i64> {
        let mut command = Command::new("BITOP");
        command
            .arg(operation)
            .key(self.codec(), destination)?
            .keys(self.codec(), keys)?;
        output::integer(self.execute(command).await?)
    }

    pub async fn decr(&self, key: &C::Key) -> Result<i64> {
        let mut command = Command::new("DECR");
        command.key(self.codec(), key)?;
        output::integer(self.execute(command).await?)
    }

    pub async fn decrby(&self, key: &C::Key, amount: i64) -> Result<i64> {
        let mut command = Command::new("DECRBY");
        command.key(self.codec(), key)?.arg_i64(amount);
        output::integer(self.execute(command).await?)
    }

    /// The value at `key`, `None` when the key does not exist.
    pub async fn get(&self, key: &C::Key) -> Result<Option<C::Value>> {
        let mut command = Command::new("GET");
        command.key(self.codec(), key)?;
        output::value(self.codec(), self.execute(command).await?)
    }

    pub async fn getbit(&self, key: &C::Key, offset: i64) -> Result<i64> {
        let mut command = Command::new("GETBIT");
        command.key(self.codec(), key)?.arg_i64(offset);
        output::integer(self.execute(command).await?)
    }

    pub async fn getrange(&self, key: &C::Key, start: i64, end: i64) -> Result<Option<C::Value>> {
        let mut command = Command::new("GETRANGE");
        command.key(self.codec(), key)?.arg_i64(start).arg_i64(end);
        output::value(self.codec(), self.execute(command).await?)
    }

    pub async fn getset(&self, key: &C::Key, value: &C::Value) -> Result<Option<C::Value>> {
        let mut command = Command::new("GETSET");
        command.key(self.codec(), key)?.value(self.codec(), value)?;
        output::value(self.codec(), self.execute(command).await?)
    }

    pub async fn incr(&self, key: &C::Key) -> Result<i64> {
        let mut command = Command::new("INCR");
        command.key(self.codec(), key)?;
        output::integer(self.execute(command).await?)
    }

    pub async fn incrby(&self, key: &C::Key, amount: i64) -> Result<i64> {
        let mut command = Command::new("INCRBY");
        command.key(self.codec(), key)?.arg_i64(amount);
        output::integer(self.execute(command).await?)
    }

    pub async fn incrbyfloat(&self, key: &C::Key, amount: f64) -> Result<f64> {
        let mut command = Command::new("INCRBYFLOAT");
        command.key(self.codec(), key)?.arg_f64(amount);
        output::double(self.execute(command).await?)
    }

    /// One entry per requested key, in request order, including keys that hold
    /// no value.
    pub async fn mget(&self, keys: &[C::Key]) -> Result<Vec<KeyValue<C::Key, C::Value>>> {
        let mut command = Command::new("MGET");
        command.keys(self.codec(), keys)?;
        output::key_values(self.codec(), keys, self.execute(command).await?)
    }

    /// Sets every pair in iteration order.
    pub async fn mset<'a, I>(&self, map: I) -> Result<String>
    where
        I: IntoIterator<Item = (&'a C::Key, &'a C::Value)>,
        C::Key: 'a,
        C::Value: 'a,
    {
        let mut command = Command::new("MSET");
        command.pairs(self.codec(), map)?;
        output::status(self.execute(command).await?)
    }

    /// Sets every pair only if none of the keys exist. Returns whether the
    /// write happened.
    pub async fn msetnx<'a, I>(&self, map: I) -> Result<bool>
    where
        I: IntoIterator<Item = (&'a C::Key, &'a C::Value)>,
        C::Key: 'a,
        C::Value: 'a,
    {
        let mut command = Command::new("MSETNX");
        command.pairs(self.codec(), map)?;
        output::boolean(self.execute(command).await?)
    }

    /// `Some("OK")` once written.
    pub async fn set(&self, key: &C::Key, value: &C::Value) -> Result<Option<String>> {
        self.set_with(key, value, &SetArgs::default()).await
    }

    /// `None` when an `NX`/`XX` condition prevented the write.
    pub async fn set_with(
        &self,
        key: &C::Key,
        value: &C::Value,
        args: &SetArgs,
    ) -> Result<Option<String>> {
        let mut command = Command::new("SET");
        command.key(self.codec(), key)?.value(self.codec(), value)?;
        args.build(&mut command);
        output::optional_status(self.execute(command).await?)
    }

    /// Sets the value and returns the previous one.
    pub async fn set_get(&self, key: &C::Key, value: &C::Value) -> Result<Option<C::Value>> {
        self.set_get_with(key, value, &SetArgs::default()).await
    }

    pub async fn set_get_with(
        &self,
        key: &C::Key,
        value: &C::Value,
        args: &SetArgs,
    ) -> Result<Option<C::Value>> {
        let mut command = Command::new("SET");
        command.key(self.codec(), key)?.value(self.codec(), value)?;
        args.build(&mut command);
        command.arg("GET");
        output::value(self.codec(), self.execute(command).await?)
    }

    /// Returns the bit previously stored at `offset`.
    pub async fn setbit(&self, key: &C::Key, offset: i64, value: i32) -> Result<i64> {
        let mut command = Command::new("SETBIT");
        command
            .key(self.codec(), key)?
            .arg_i64(offset)
            .arg_i64(i64::from(value));
        output::integer(self.execute(command).await?)
    }

    pub async fn setex(&self, key: &C::Key, seconds: i64, value: &C::Value) -> Result<String> {
        let mut command = Command::new("SETEX");
        command
            .key(self.codec(), key)?
            .arg_i64(seconds)
            .value(self.codec(), value)?;
        output::status(self.execute(command).await?)
    }

    pub async fn psetex(
        &self,
        key: &C::Key,
        milliseconds: i64,
        value: &C::Value,
    ) -> Result<String> {
        let mut command = Command::new("PSETEX");
        command
            .key(self.codec(), key)?
            .arg_i64(milliseconds)
            .value(self.codec(), value)?;
        output::status(self.execute(command).await?)
    }

    pub async fn setnx(&self, key: &C::Key, value: &C::Value) -> Result<bool> {
        let mut command = Command::new("SETNX");
        command.key(self.codec(), key)?.value(self.codec(), value)?;
        output::boolean(self.execute(command).await?)
    }

    /// Overwrites part of the string starting at `offset` and returns the new
    /// length.
    pub async fn setrange(&self, key: &C::Key, offset: i64, value: &C::Value) -> Result<i64> {
        let mut command = Command::new("SETRANGE");
        command
            .key(self.codec(), key)?
            .arg_i64(offset)
            .value(self.codec(), value)?;
        output::integer(self.execute(command).await?)
    }

    /// Longest common subsequence of two strings or two keys.
    pub async fn stralgo_lcs(&self, args: &StrAlgoArgs) -> Result<StringMatchResult> {
        let mut command = Command::new("STRALGO");
        args.build(&mut command);
        output::string_match_result(self.execute(command).await?)
    }

    pub async fn strlen(&self, key: &C::Key) -> Result<i64> {
        let mut command = Command::new("STRLEN");
        command.key(self.codec(), key)?;
        output::integer(self.execute(command).await?)
    }
}
