//! CSV batch front end: command rows in, outcome rows out.

pub mod batch;
pub mod command_reader;
pub mod result_writer;
