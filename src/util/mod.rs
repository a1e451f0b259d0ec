//! Terminal text helpers used when printing stored feed state.
//!
//! ```
//! use feedstate::util::{strip_control_chars, truncate_to_width};
//!
//! let key = strip_control_chars("%2Ffeed|=popular|-");
//! let cell = truncate_to_width(&key, 40);
//! assert_eq!(cell, "%2Ffeed|=popular|-");
//! ```

mod text;

pub use text::{display_width, strip_control_chars, truncate_to_width};
