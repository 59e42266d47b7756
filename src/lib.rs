//! coursevault: chat message archival and hybrid search
//!
//! Two engines over shared stores: the archival engine moves aged
//! course messages out of the live store into checksummed batch files
//! in object storage, and the search engine answers queries across
//! live and archived messages as one ranked result set.

pub mod archiver;
pub mod batch;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod meta;
pub mod model;
pub mod rank;
pub mod search;
pub mod source;
pub mod storage;
