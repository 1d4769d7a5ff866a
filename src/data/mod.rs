//! Data layer: core types, table loading, lookup, and archive access.
//!
//! Architecture:
//! ```text
//!  published CSV / GeoJSON (zip)          remote archive (nested zips)
//!        │                                       │
//!        ▼                                       ▼
//!   ┌──────────┐                           ┌──────────┐
//!   │  loader   │  parse → GlacierTable    │ archive   │  directory + fetch
//!   └──────────┘                           └──────────┘
//!        │                                       │
//!        ▼                                       ▼
//!   ┌──────────────┐                      ┌────────────────┐
//!   │ GlacierTable  │ ── lookup ──▶       │ TimeSeriesBundle│
//!   └──────────────┘   (text / coord)     └────────────────┘
//!                                                │
//!                                          TTL caches (cache)
//! ```
pub mod archive;
pub mod cache;
pub mod loader;
pub mod lookup;
pub mod model;
