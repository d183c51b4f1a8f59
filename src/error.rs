use thiserror::Error;

/// A diagnostic raised while building, parsing, or composing a
/// [`crate::Changeset`].
///
/// These are never returned as `Result`s: per the wire contract, `parse`
/// never throws, and the builders/`apply` are best-effort. Instead, each
/// failure's [`std::string::ToString`] output (via `Display`, below) is
/// pushed onto the changeset's own `errors()` buffer, which callers drain
/// and clear explicitly. The message text is part of the observable
/// contract, not an implementation detail: callers may match on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangesetError {
    #[error("not a changeset")]
    NotAChangeset,

    #[error("changeset syntax error")]
    SyntaxError,

    #[error("changeset attribute out of range")]
    AttributeOutOfRange,

    #[error("charset charbank is too short")]
    CharbankTooShort,

    #[error("multiline insert does not end with newline")]
    MultilineInsertMissingNewline,

    #[error("changeset inserts empty attribute")]
    InsertHasEmptyAttribute,

    #[error("changeset has delete with attributes")]
    DeleteHasAttributes,

    #[error("changeset not in canonical form")]
    NotCanonical,

    #[error("applying changeset with wrong orig length")]
    WrongOrigLength,
}
