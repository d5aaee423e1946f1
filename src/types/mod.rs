// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Strong types shared across the cache layers.
//!
//! - [`BlockKey`](key::BlockKey): validated block identifier
//! - [`CacheEntry`](entry::CacheEntry): opaque serialized payload

pub mod entry;
pub mod key;

// Note: Public types are re-exported from lib.rs, not here
