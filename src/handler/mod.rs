//! Request handlers for both wire generations.
//!
//! A deployment speaks exactly one generation on both of its lanes; there
//! is no per-frame sniffing. [`EntryHandler`] serves the current schema,
//! [`ObjectHandler`] the legacy typed-object schema.

mod entry;
mod object;

pub use self::entry::EntryHandler;
pub use self::object::ObjectHandler;

/// Which wire generation a server speaks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WireFormat {
    /// The current entry schema.
    #[default]
    Entry,
    /// The legacy typed-object schema with ASCII reply tokens.
    Object,
}

/// How a store operation treats an id that is already live.
///
/// Tombstoned ids are re-occupiable under either policy; only a live row
/// triggers the rejection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CreatePolicy {
    /// Replace the existing row. The historical behavior.
    #[default]
    Overwrite,
    /// Refuse the write and report that the id is taken.
    Reject,
}

/// Microseconds since the Unix epoch, saturating instead of failing.
pub(crate) fn now_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
        })
}
