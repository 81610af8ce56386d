use std::borrow::Cow;
use std::fmt;

/// Result type used across the tile decoder.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type surfaced by every decode and accessor path.
///
/// There is no local recovery anywhere in the crate: the first failure
/// aborts the current decode or accessor call and propagates unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A feature index outside `[0, num_features)`.
    #[error("feature index {index} out of range for {len} features")]
    OutOfRange { index: usize, len: usize },

    /// The encoded stream is inconsistent or truncated.
    #[error("malformed stream while decoding {section}: {details}")]
    MalformedStream {
        section: Section,
        details: Cow<'static, str>,
    },

    /// A geometry type discriminant outside the enumerated set.
    #[error("unsupported geometry type {value}")]
    UnsupportedGeometry { value: u32 },

    /// A feature table with neither a geometry vector nor a deferred column.
    #[error("feature table has no geometry source")]
    MissingGeometry,

    /// A required decoding parameter is absent from the stream metadata.
    #[error("missing parameter: {name}")]
    MissingParameter { name: Cow<'static, str> },
}

impl Error {
    /// Helper constructor for stream-level failures.
    #[must_use]
    pub fn malformed(section: Section, details: impl Into<Cow<'static, str>>) -> Self {
        Self::MalformedStream {
            section,
            details: details.into(),
        }
    }
}

/// Logical section of the decoder used for diagnostic reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Varint,
    StreamMetadata,
    IntStream,
    LengthStream,
    PresentStream,
    FastPfor,
    VertexBuffer,
    Topology,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Varint => write!(f, "varint"),
            Self::StreamMetadata => write!(f, "stream metadata"),
            Self::IntStream => write!(f, "integer stream"),
            Self::LengthStream => write!(f, "length stream"),
            Self::PresentStream => write!(f, "present stream"),
            Self::FastPfor => write!(f, "FastPFOR block"),
            Self::VertexBuffer => write!(f, "vertex buffer"),
            Self::Topology => write!(f, "topology offsets"),
        }
    }
}
