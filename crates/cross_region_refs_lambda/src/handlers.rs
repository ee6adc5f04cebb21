pub mod fanout;
pub mod reader;
pub mod writer;
