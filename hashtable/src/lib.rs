//! A low-overhead hash map for bounded-length byte strings.
//!
//! Every entry lives in one fixed-length slot of a single contiguous byte
//! buffer, so a map holding millions of short keys costs little more than
//! the key and value bytes themselves.
//!
//! ```
//! let mut map = lightmap::LightMap::new(8, 13)?;
//! map.put("7", "value7")?;
//! assert_eq!(map.get("7"), Some(&b"value7"[..]));
//! # Ok::<(), lightmap::Error>(())
//! ```

mod config;
mod error;
mod hash;
mod probe;
mod slot;
mod table;
pub mod traits;

pub use config::{Config, DEFAULT_INITIAL_SLOTS, DEFAULT_LOAD_FACTOR, DEFAULT_PROBE_STEP};
pub use error::{Error, Result};
pub use hash::DefaultHasher;
pub use probe::HomePolicy;
pub use table::{Bytes, Diagnostics, LightMap, MAX_FIELD_LEN};
pub use traits::KeyHasher;
