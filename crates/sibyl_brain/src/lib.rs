pub mod graph;
pub mod loader;
pub mod parser;

pub use graph::PatternGraph;
pub use loader::{expand, read_categories, LoadReport};
pub use parser::{parse, parse_file, ParseError};
