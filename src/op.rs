#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{attribute::AttributePool, base36, error::ChangesetError, Attribute};

/// The three things a changeset op can do to the text it spans.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Keep,
    Insert,
    Delete,
}

impl OpKind {
    fn symbol(self) -> char {
        match self {
            OpKind::Keep => '=',
            OpKind::Insert => '+',
            OpKind::Delete => '-',
        }
    }
}

/// One edit operation within a [`crate::Changeset`]: Keep a run of the
/// original text forward (optionally re-attributing it), Insert new text, or
/// Delete a run of the original text.
///
/// `lines` counts the newlines fully contained in the op's span; if it's
/// greater than zero the spanned text must end on a newline (directly
/// verified for Insert, since it carries `text`; a contract on the caller
/// for Keep/Delete, which don't). `attrs` is kept sorted; it's always empty
/// for Delete, and an empty-valued attribute on Keep means "clear this
/// attribute" rather than "set it to empty".
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
    pub kind: OpKind,
    pub lines: usize,
    pub chars: usize,
    /// Populated only for `Insert`; its character count must equal `chars`.
    pub text: Option<String>,
    pub attrs: Vec<Attribute>,
}

impl Op {
    #[must_use]
    pub fn keep(lines: usize, chars: usize, mut attrs: Vec<Attribute>) -> Self {
        attrs.sort();
        Self {
            kind: OpKind::Keep,
            lines,
            chars,
            text: None,
            attrs,
        }
    }

    #[must_use]
    pub fn insert(lines: usize, text: String, mut attrs: Vec<Attribute>) -> Self {
        attrs.sort();
        Self {
            kind: OpKind::Insert,
            lines,
            chars: text.chars().count(),
            text: Some(text),
            attrs,
        }
    }

    #[must_use]
    pub fn delete(lines: usize, chars: usize) -> Self {
        Self {
            kind: OpKind::Delete,
            lines,
            chars,
            text: None,
            attrs: Vec::new(),
        }
    }

    /// Emits this op's wire representation: zero or more `*<poolIndex>`
    /// attribute refs, an optional `|<lines>`, the `=`/`+`/`-` tag, then
    /// `<chars>`, all integers in base-36.
    ///
    /// # Panics
    ///
    /// Panics if one of `self.attrs` isn't present in `pool`. Callers are
    /// expected to pass a pool that was built from (or includes) this op's
    /// own attributes, e.g. via [`crate::Changeset::attributes`].
    #[must_use]
    pub fn serialize(&self, pool: &AttributePool) -> String {
        let mut out = String::new();

        for attr in &self.attrs {
            let index = pool
                .index_of(attr)
                .expect("attribute must be present in the pool passed to serialize");
            out.push('*');
            out.push_str(&base36::encode(index));
        }

        if self.lines > 0 {
            out.push('|');
            out.push_str(&base36::encode(self.lines));
        }

        out.push(self.kind.symbol());
        out.push_str(&base36::encode(self.chars));
        out
    }

    /// Splits off the leading `(lines, chars)` of `self`, shrinking `self`
    /// by the same amounts and returning the split-off prefix as a new op of
    /// the same kind and attributes.
    ///
    /// The boundary must fall on a char (not byte) index for `Insert`'s
    /// text, and, per the caller's contract, on a newline whenever
    /// `lines < self.lines`.
    #[must_use]
    pub fn split_prefix(&mut self, lines: usize, chars: usize) -> Op {
        let text = self.text.as_mut().map(|text| {
            let split_at = text
                .char_indices()
                .nth(chars)
                .map_or(text.len(), |(byte_index, _)| byte_index);

            let prefix = text[..split_at].to_owned();
            *text = text[split_at..].to_owned();
            prefix
        });

        self.lines -= lines;
        self.chars -= chars;

        Op {
            kind: self.kind,
            lines,
            chars,
            text,
            attrs: self.attrs.clone(),
        }
    }

    /// Folds `incoming` attributes into this op per the Keep-over-existing
    /// merge rule: an incoming attribute with the same key replaces the
    /// existing one, unless it's an empty-valued removal applied to an
    /// Insert, in which case the existing attribute is dropped entirely.
    /// Attributes with no existing match are appended. Used only by
    /// [`crate::Changeset::apply`] when a Keep from the other changeset
    /// lands on one of this changeset's ops.
    pub fn merge_attributes(&mut self, incoming: &[Attribute]) {
        let mut appended = false;

        for attr in incoming {
            if let Some(position) = self.attrs.iter().position(|existing| existing.key == attr.key) {
                if attr.is_removal() && self.kind == OpKind::Insert {
                    self.attrs.remove(position);
                } else {
                    self.attrs[position] = attr.clone();
                }
            } else {
                self.attrs.push(attr.clone());
                appended = true;
            }
        }

        if appended {
            self.attrs.sort();
        }
    }

    /// Whether `self` immediately followed by `next` can be merged into one
    /// op during `tidy`: same kind, same attributes, and not a multiline op
    /// swallowing a following single-line-only op (which would leave
    /// non-newline-terminated text inside a multiline op).
    #[must_use]
    pub fn mergeable_with(&self, next: &Op) -> bool {
        self.kind == next.kind && self.attrs == next.attrs && (self.lines == 0 || next.lines > 0)
    }

    /// Absorbs `next` into `self`: sums `lines` and `chars`, and for Insert
    /// ops, appends `next`'s text. Used by `tidy` after `mergeable_with`
    /// returns true.
    pub fn absorb(&mut self, next: Op) {
        self.lines += next.lines;
        self.chars += next.chars;
        if let (Some(text), Some(next_text)) = (self.text.as_mut(), next.text) {
            text.push_str(&next_text);
        }
    }

    /// A trailing Keep with no attributes is left implicit in the wire
    /// format — its `chars` are still implied by the orig/new length header.
    #[must_use]
    pub fn is_implicit_trailing_keep(&self) -> bool { self.kind == OpKind::Keep && self.attrs.is_empty() }

    /// Validates an op freshly produced by [`crate::Changeset::parse`],
    /// pushing one [`ChangesetError`] per violated rule rather than
    /// stopping at the first one (per-op errors are non-fatal to parsing).
    pub(crate) fn validate_parsed(&self, errors: &mut Vec<ChangesetError>) {
        if self.kind == OpKind::Insert {
            let text = self.text.as_deref().unwrap_or_default();
            if text.chars().count() != self.chars {
                errors.push(ChangesetError::CharbankTooShort);
            }
            if self.lines > 0 && !text.ends_with('\n') {
                errors.push(ChangesetError::MultilineInsertMissingNewline);
            }
            if self.attrs.iter().any(Attribute::is_removal) {
                errors.push(ChangesetError::InsertHasEmptyAttribute);
            }
        }

        if self.kind == OpKind::Delete && !self.attrs.is_empty() {
            errors.push(ChangesetError::DeleteHasAttributes);
        }
    }
}
