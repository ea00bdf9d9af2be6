//! Wire schema for both protocol generations.
//!
//! The message types are maintained by hand with `prost` derives rather than
//! generated from `.proto` files; the schema is part of this crate's public
//! contract and the field tags documented here are load-bearing. Changing a
//! tag breaks wire compatibility.
//!
//! [`entry`] is the current generation: a single [`entry::Entry`] envelope
//! whose payload is a closed value union, driven by
//! [`entry::Request`]/[`entry::Response`] on the query lane.
//!
//! [`object`] is the legacy generation: a typed [`object::RegistaObject`]
//! whose payload field must match its declared type tag, with short ASCII
//! tokens in place of a response message.

pub mod entry;
pub mod object;
