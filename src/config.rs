//! Reader and writer configuration

/// Configuration for the document reader
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Maximum element nesting depth (0 means unlimited)
    pub max_depth: u16,
    /// Maximum input size in bytes (0 means unlimited)
    pub max_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_depth: 128,
            max_size: 10 * 1024 * 1024, // 10 MB default
        }
    }
}

impl ReaderConfig {
    /// Create a config with unlimited depth and size
    pub const fn unlimited() -> Self {
        Self {
            max_depth: 0,
            max_size: 0,
        }
    }

    /// Create a config with specific limits
    pub const fn new(max_depth: u16, max_size: usize) -> Self {
        Self {
            max_depth,
            max_size,
        }
    }
}

/// Configuration for the document writer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriterConfig {
    /// Spaces per nesting level (0 writes everything on one line)
    pub indent: usize,
    /// Emit the `<?xml ...?>` declaration
    pub xml_declaration: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            xml_declaration: true,
        }
    }
}

impl WriterConfig {
    /// Single-line output without declaration
    pub const fn compact() -> Self {
        Self {
            indent: 0,
            xml_declaration: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.max_depth, 128);
        assert_eq!(config.max_size, 10 * 1024 * 1024);
        assert_eq!(ReaderConfig::unlimited(), ReaderConfig::new(0, 0));
    }

    #[test]
    fn test_writer_compact() {
        let config = WriterConfig::compact();
        assert_eq!(config.indent, 0);
        assert!(!config.xml_declaration);
    }
}
