//! A packrat parser for line-oriented assembly source.
#[macro_use]
extern crate log;

pub mod syntax;
