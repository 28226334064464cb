#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

pub type AResult<T> = Result<T, failure::Error>;

pub mod burst;
pub mod engine;
