//! Parsing - slot values from customer text.

mod info_parser;

pub use info_parser::InfoParser;
