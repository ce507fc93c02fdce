//! Custom Value Mapper - canonical ids for constants

mod domain;
mod mapper;

pub use domain::{CustomValue, FncUid};
pub use mapper::CustomValueMapper;
