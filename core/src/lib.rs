#![doc = include_str!("../../README.md")]
#![forbid(unsafe_code)]
#![allow(clippy::type_complexity)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, allow(unused_attributes))]

/// The types shared between the engine and its shells.
pub use ruswim_types as types;

mod awareness;
pub use awareness::*;

mod clock;
pub use clock::*;

mod directive;
pub use directive::*;

mod error;
pub use error::*;

mod options;
pub use options::*;

mod swim;
pub use swim::*;

mod gossip;
mod members;
mod probe;
mod suspicion;
