pub mod line_info;
pub mod line_reader;
pub mod matcher;
pub mod path;
pub mod split;

pub use line_info::LineInfo;
pub use line_reader::{LineSink, read_file, read_lines, read_str};
pub use matcher::Matcher;
