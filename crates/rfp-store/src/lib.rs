// SPDX-License-Identifier: MIT OR Apache-2.0
//! Storage adapter traits for the RFP operator platform: a single wide
//! key-value table with one secondary index, and a content-addressed
//! object store with a key-prefix allowlist (`spec.md` §3, §9).
//!
//! Both traits ship an in-memory reference implementation suitable for
//! tests and local development; a production deployment swaps in a
//! DynamoDB- and S3-backed implementation behind the same trait.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod kv;
pub mod object;

pub use kv::{
    Condition, InMemoryKeyValueStore, Item, ItemKey, KeyValueStore, QueryIndex, QueryPage,
    QueryRequest, ScanDirection, TransactItem,
};
pub use object::{
    InMemoryObjectStore, KeyPrefixAllowlist, ObjectHead, ObjectStore, DEFAULT_PREFIXES,
    MAX_PRESIGN_GET, MAX_PRESIGN_PUT,
};
