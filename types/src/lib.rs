//! Types used by the [`ruswim-core`](https://crates.io/crates/ruswim-core) crate.
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::type_complexity)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, allow(unused_attributes))]

mod incarnation;
pub use incarnation::*;

mod node;
pub use node::*;

mod status;
pub use status::*;

mod member;
pub use member::*;

mod payload;
pub use payload::*;
