pub mod batcher;
pub mod download;
pub mod parser;
pub mod reader;

pub use batcher::{BatchRange, Batcher};
pub use download::SourceDownloader;
pub use parser::{parse_source, row_to_division, write_parsed_file, ParseOptions, ParsedFile};
pub use reader::{KatottgReader, KatottgRow};
