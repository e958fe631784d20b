//! Free-function forms of per-domain-point optimization.
//!
//! ```
//! use isle::{utility, Context, Map};
//!
//! let ctx = Context::new();
//! let m = Map::parse(&ctx, "{ A[a] -> B[b] : 0 <= a <= 4 and 0 <= b <= 9 }")?;
//! let first = utility::lex_minimum(&m)?;
//! assert!(first.is_equal(&Map::parse(&ctx, "{ A[a] -> B[b] : 0 <= a <= 4 and b = 0 }")?)?);
//! # Ok::<(), isle::Error>(())
//! ```

use crate::error::Result;
use crate::map::Map;

/// For every domain point of `map`, its lexicographically smallest image.
pub fn lex_minimum(map: &Map) -> Result<Map> {
    map.lex_minimum()
}

/// For every domain point of `map`, its lexicographically largest image.
pub fn lex_maximum(map: &Map) -> Result<Map> {
    map.lex_maximum()
}
