#[macro_use]
extern crate enum_primitive_derive;
extern crate num_traits;

pub mod config;
pub mod packet;
