#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FramingLimits {
    /// Largest line (excluding the delimiter) buffered before the line is
    /// reported as [`FramedLine::LineTooLong`](crate::FramedLine::LineTooLong).
    pub max_line_bytes: usize,
}

impl FramingLimits {
    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self { max_line_bytes }
    }
}

impl Default for FramingLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: 1024 * 1024,
        }
    }
}
