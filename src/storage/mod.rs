mod roster;
mod trace_file;

pub use roster::*;
pub use trace_file::*;

#[cfg(test)]
mod roster_test;
