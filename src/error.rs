use thiserror::Error;

/// Errors raised while reading or splicing a project descriptor
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("unterminated comment starting at byte {0}")]
    UnterminatedComment(usize),

    #[error("unterminated string starting at byte {0}")]
    UnterminatedString(usize),

    #[error("unexpected {found} at byte {offset}, expected {expected}")]
    Unexpected {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    #[error("unexpected end of input, expected {0}")]
    UnexpectedEof(&'static str),

    #[error("descriptor has no `objects` dictionary")]
    MissingObjects,

    #[error("edits overlap at byte {0}")]
    OverlappingEdits(usize),
}
