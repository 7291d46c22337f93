mod framer;
mod stream;

pub use framer::{FramedLine, LineFramer};
pub use stream::FramedLines;
