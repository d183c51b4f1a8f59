use std::{
    cell::{Cell, RefCell},
    fmt,
};

use crate::{
    attribute::AttributePool,
    base36,
    error::ChangesetError,
    op::{Op, OpKind},
    Attribute,
};

/// A compact encoding of an edit from a document of `orig_len` characters to
/// one of `new_len` characters, built either by the `add_*` builders or by
/// [`Changeset::parse`], and observed through [`ToString::to_string`]
/// (which implements the wire format from spec §6), [`Changeset::attributes`],
/// or [`Changeset::apply`].
///
/// Canonicalization ("tidying") and the attribute-pool cache are computed
/// lazily, on first observation after a mutation, mirroring the original
/// implementation's `mutable` fields that let its `const` accessor methods
/// still normalize and cache under the hood. `ops`, `tidy`, and the
/// attribute cache therefore live behind [`RefCell`]/[`Cell`] so that
/// `to_string`, `attributes`, and `tidy` itself can take `&self`; the
/// builders and `apply` take `&mut self` because they're genuinely mutating
/// operations, not just caching.
#[derive(Clone)]
pub struct Changeset {
    orig_len: usize,
    new_len: usize,
    ops: RefCell<Vec<Op>>,
    tidy: Cell<bool>,
    attributes_cache: RefCell<Option<AttributePool>>,
    errors: RefCell<Vec<String>>,
}

impl Default for Changeset {
    fn default() -> Self { Self::new() }
}

impl Changeset {
    #[must_use]
    pub fn new() -> Self {
        Self {
            orig_len: 0,
            new_len: 0,
            ops: RefCell::new(Vec::new()),
            tidy: Cell::new(true),
            attributes_cache: RefCell::new(None),
            errors: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn orig_len(&self) -> usize { self.orig_len }

    #[must_use]
    pub fn new_len(&self) -> usize { self.new_len }

    /// The diagnostics accumulated so far by `parse`, the builders, or
    /// `apply`. Never cleared automatically; call [`Changeset::clear_errors`]
    /// once the caller has dealt with them.
    #[must_use]
    pub fn errors(&self) -> Vec<String> { self.errors.borrow().clone() }

    pub fn clear_errors(&self) { self.errors.borrow_mut().clear(); }

    fn mark_dirty(&mut self) {
        *self.tidy.get_mut() = false;
        *self.attributes_cache.get_mut() = None;
    }

    // ---- builders (spec §4.C) -------------------------------------------

    /// Appends an Insert op for `text`. If `text` contains a newline and
    /// doesn't end with one, it's split at the last newline into a
    /// multiline op for the prefix and a single-line op for the suffix, so
    /// that every multiline op still ends on a newline.
    pub fn add_insert(&mut self, text: &str, attrs: Vec<Attribute>) {
        let lines = text.matches('\n').count();

        if lines > 0 && !text.ends_with('\n') {
            let split_at = text.rfind('\n').map_or(0, |index| index + 1);
            self.add_insert(&text[..split_at], attrs.clone());
            self.add_insert(&text[split_at..], attrs);
            return;
        }

        let op = Op::insert(lines, text.to_owned(), attrs);
        self.new_len = self.new_len.saturating_add(op.chars);
        self.ops.get_mut().push(op);
        self.mark_dirty();
    }

    /// Appends a Keep op spanning `text` (the caller's own original text,
    /// used only to derive `lines`/`chars`, not stored). Same newline
    /// splitting as [`Changeset::add_insert`].
    pub fn add_keep(&mut self, text: &str, attrs: Vec<Attribute>) {
        let lines = text.matches('\n').count();

        if lines > 0 && !text.ends_with('\n') {
            let split_at = text.rfind('\n').map_or(0, |index| index + 1);
            let prefix_chars = text[..split_at].chars().count();
            let suffix_chars = text[split_at..].chars().count();
            self.add_keep_counts(lines, prefix_chars, attrs.clone());
            self.add_keep_counts(0, suffix_chars, attrs);
            return;
        }

        self.add_keep_counts(lines, text.chars().count(), attrs);
    }

    /// Direct numeric form of [`Changeset::add_keep`]: the caller warrants
    /// that if `lines > 0`, the spanned original text actually ends on a
    /// newline.
    pub fn add_keep_counts(&mut self, lines: usize, chars: usize, attrs: Vec<Attribute>) {
        let op = Op::keep(lines, chars, attrs);
        self.orig_len = self.orig_len.saturating_add(op.chars);
        self.new_len = self.new_len.saturating_add(op.chars);
        self.ops.get_mut().push(op);
        self.mark_dirty();
    }

    /// Appends a Delete op spanning `text`. Same newline splitting as
    /// [`Changeset::add_insert`].
    pub fn add_delete(&mut self, text: &str) {
        let lines = text.matches('\n').count();

        if lines > 0 && !text.ends_with('\n') {
            let split_at = text.rfind('\n').map_or(0, |index| index + 1);
            let prefix_chars = text[..split_at].chars().count();
            let suffix_chars = text[split_at..].chars().count();
            self.add_delete_counts(lines, prefix_chars);
            self.add_delete_counts(0, suffix_chars);
            return;
        }

        self.add_delete_counts(lines, text.chars().count());
    }

    /// Direct numeric form of [`Changeset::add_delete`].
    pub fn add_delete_counts(&mut self, lines: usize, chars: usize) {
        let op = Op::delete(lines, chars);
        self.orig_len = self.orig_len.saturating_add(op.chars);
        self.ops.get_mut().push(op);
        self.mark_dirty();
    }

    // ---- canonicalization (spec §4.C "tidy") -----------------------------

    /// Canonicalizes `ops` in place: drops zero-length ops and the implicit
    /// trailing Keep, moves Deletes ahead of immediately-following Inserts,
    /// and merges adjacent mergeable ops. A no-op if already tidy.
    pub fn tidy(&self) {
        if self.tidy.get() {
            return;
        }

        let mut ops = self.ops.borrow_mut();
        let mut i = 0;
        while i < ops.len() {
            if ops[i].chars == 0 {
                ops.remove(i);
                continue;
            }

            if i == ops.len() - 1 {
                if ops[i].is_implicit_trailing_keep() {
                    ops.remove(i);
                }
            } else {
                if ops[i].kind == OpKind::Insert && ops[i + 1].kind == OpKind::Delete {
                    ops.swap(i, i + 1);
                    // Recheck the previous op now that it has a new neighbor.
                    // Terminates because swaps only ever move Deletes left.
                    i = i.saturating_sub(1);
                    continue;
                }

                if ops[i].mergeable_with(&ops[i + 1]) {
                    let next = ops.remove(i + 1);
                    ops[i].absorb(next);
                    continue;
                }
            }

            i += 1;
        }
        drop(ops);

        *self.attributes_cache.borrow_mut() = None;
        self.tidy.set(true);
    }

    /// The sorted, deduplicated set of attributes across all ops, after
    /// tidying. Cached until the next mutation or `tidy` call invalidates it.
    #[must_use]
    pub fn attributes(&self) -> AttributePool {
        self.tidy();

        if let Some(cached) = self.attributes_cache.borrow().as_ref() {
            return cached.clone();
        }

        let attrs: Vec<Attribute> = self
            .ops
            .borrow()
            .iter()
            .flat_map(|op| op.attrs.iter().cloned())
            .collect();
        let pool = AttributePool::new(attrs);
        *self.attributes_cache.borrow_mut() = Some(pool.clone());
        pool
    }

    fn serialized(&self) -> String {
        if self.ops.borrow().is_empty() {
            return String::new();
        }

        self.tidy();
        let pool = self.attributes();
        let ops = self.ops.borrow();

        let mut out = String::from("Z:");
        out.push_str(&base36::encode(self.orig_len));
        if self.new_len >= self.orig_len {
            out.push('>');
            out.push_str(&base36::encode(self.new_len - self.orig_len));
        } else {
            out.push('<');
            out.push_str(&base36::encode(self.orig_len - self.new_len));
        }

        let mut charbank = String::new();
        for op in ops.iter() {
            out.push_str(&op.serialize(&pool));
            if let Some(text) = &op.text {
                charbank.push_str(text);
            }
        }

        out.push('$');
        out.push_str(&charbank);
        out
    }

    // ---- parsing (spec §4.C "Parsing") -----------------------------------

    /// Parses `text` against `pool`. Never fails outright: framing errors
    /// (not starting with `Z:`, or a grammar mismatch) stop parsing early
    /// and return an empty changeset with one error; per-op errors (an
    /// out-of-range attribute, a too-short charbank, a non-canonical
    /// round-trip, ...) are collected without aborting, per spec §7's
    /// fatal/non-fatal split. Check [`Changeset::errors`] either way.
    #[must_use]
    pub fn parse(text: &str, pool: &AttributePool) -> Self {
        let mut errors = Vec::new();

        if !text.starts_with("Z:") {
            errors.push(ChangesetError::NotAChangeset.to_string());
            return Self::from_errors(errors);
        }

        let mut cursor = Cursor::new(text, 2);

        let Some(orig_len) = cursor.read_base36() else {
            errors.push(ChangesetError::SyntaxError.to_string());
            return Self::from_errors(errors);
        };

        let sign = match cursor.peek() {
            Some(b'>') => {
                cursor.advance();
                1
            }
            Some(b'<') => {
                cursor.advance();
                -1
            }
            _ => {
                errors.push(ChangesetError::SyntaxError.to_string());
                return Self::from_errors(errors);
            }
        };

        let Some(difference) = cursor.read_base36() else {
            errors.push(ChangesetError::SyntaxError.to_string());
            return Self::from_errors(errors);
        };

        let new_len = if sign > 0 {
            orig_len.saturating_add(difference)
        } else {
            orig_len.saturating_sub(difference)
        };

        let mut ops = Vec::new();
        let mut pool_errors = Vec::new();

        loop {
            match cursor.peek() {
                Some(b'$') | None => break,
                _ => {}
            }

            let Some(op) = parse_op(&mut cursor, pool, &mut pool_errors) else {
                errors.push(ChangesetError::SyntaxError.to_string());
                return Self::from_errors(errors);
            };
            ops.push(op);
        }

        if ops.is_empty() || cursor.peek() != Some(b'$') {
            errors.push(ChangesetError::SyntaxError.to_string());
            return Self::from_errors(errors);
        }
        cursor.advance();

        errors.extend(pool_errors);

        let mut charbank = cursor.rest();
        for op in &mut ops {
            if op.kind != OpKind::Insert {
                continue;
            }

            let taken: String = charbank.chars().take(op.chars).collect();
            let taken_bytes = taken.len();
            charbank = &charbank[taken_bytes..];
            op.text = Some(taken);
        }

        for op in &ops {
            let mut op_errors = Vec::new();
            op.validate_parsed(&mut op_errors);
            errors.extend(op_errors.into_iter().map(|error| error.to_string()));
        }

        let changeset = Self {
            orig_len,
            new_len,
            ops: RefCell::new(ops),
            tidy: Cell::new(false),
            attributes_cache: RefCell::new(None),
            errors: RefCell::new(errors),
        };

        if changeset.errors.borrow().is_empty() && changeset.to_string() != text {
            changeset
                .errors
                .borrow_mut()
                .push(ChangesetError::NotCanonical.to_string());
        }

        changeset
    }

    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            errors: RefCell::new(errors),
            ..Self::new()
        }
    }

    // ---- composition (spec §4.C "apply") ---------------------------------

    /// Rewrites `self` so that applying it reproduces the effect of first
    /// applying `self`, then `other`. `other.orig_len()` is expected to
    /// equal `self.new_len()`; a mismatch is recorded as an error but
    /// composition still proceeds best-effort.
    pub fn apply(&mut self, other: &Changeset) {
        if other.orig_len() != self.new_len {
            self.errors
                .get_mut()
                .push(ChangesetError::WrongOrigLength.to_string());
        }

        self.tidy();
        other.tidy();

        let mut self_ops = std::mem::take(self.ops.get_mut());
        // Work on a private copy of `other`'s ops: the equalizing splits below
        // must not write through `other`'s own RefCell, or `other` would come
        // out of `apply` silently split into more (but equivalent) ops than
        // the caller handed in.
        let mut other_ops = other.ops.borrow().clone();

        let mut a = 0;
        let mut b = 0;

        while a < self_ops.len() && b < other_ops.len() {
            if self_ops[a].kind == OpKind::Delete {
                // Already gone in `other`'s worldview; no interaction.
                a += 1;
                continue;
            }

            if other_ops[b].kind == OpKind::Insert {
                let inserted = other_ops[b].clone();
                self.new_len = self.new_len.saturating_add(inserted.chars);
                self_ops.insert(a, inserted);
                a += 1;
                b += 1;
                continue;
            }

            // Equalize op lengths before comparing kinds further; only one
            // list grows per iteration, but both cursors still get closer
            // to the end of their respective lists.
            if self_ops[a].chars < other_ops[b].chars {
                let (lines, chars) = (self_ops[a].lines, self_ops[a].chars);
                let split = other_ops[b].split_prefix(lines, chars);
                other_ops.insert(b, split);
            } else if self_ops[a].chars > other_ops[b].chars {
                let (lines, chars) = (other_ops[b].lines, other_ops[b].chars);
                let split = self_ops[a].split_prefix(lines, chars);
                self_ops.insert(a, split);
            }

            if other_ops[b].kind == OpKind::Keep {
                let incoming = other_ops[b].attrs.clone();
                self_ops[a].merge_attributes(&incoming);
                a += 1;
                b += 1;
                continue;
            }

            // other_ops[b] must be Delete.
            self.new_len = self.new_len.saturating_sub(other_ops[b].chars);

            if self_ops[a].kind == OpKind::Insert {
                // The insertion and the deletion cancel out.
                self_ops.remove(a);
                b += 1;
            } else {
                self_ops[a] = other_ops[b].clone();
                a += 1;
                b += 1;
            }
        }

        // Leftover ops from `other` replace `self`'s implicit trailing Keep.
        while b < other_ops.len() {
            let op = other_ops[b].clone();
            match op.kind {
                OpKind::Delete => self.new_len = self.new_len.saturating_sub(op.chars),
                OpKind::Insert => self.new_len = self.new_len.saturating_add(op.chars),
                OpKind::Keep => {}
            }
            self_ops.push(op);
            b += 1;
        }
        *self.ops.get_mut() = self_ops;
        self.mark_dirty();
    }
}

impl fmt::Display for Changeset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.serialized()) }
}

impl fmt::Debug for Changeset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tidy();
        f.debug_struct("Changeset")
            .field("orig_len", &self.orig_len)
            .field("new_len", &self.new_len)
            .field("ops", &*self.ops.borrow())
            .field("errors", &*self.errors.borrow())
            .finish()
    }
}

/// Reads `[*N]* [|N]? (=|+|-) N` for one op, resolving attribute refs
/// against `pool` and pushing [`ChangesetError::AttributeOutOfRange`] for
/// any index beyond it (the attribute itself is simply skipped, per §9:
/// "out-of-range is reported but in-range entries are used verbatim").
/// Returns `None` on a grammar mismatch, which the caller treats as fatal.
fn parse_op(cursor: &mut Cursor<'_>, pool: &AttributePool, errors: &mut Vec<ChangesetError>) -> Option<Op> {
    let mut attrs = Vec::new();

    while cursor.peek() == Some(b'*') {
        cursor.advance();
        let index = cursor.read_base36()?;
        match pool.get(index) {
            Some(attr) => attrs.push(attr.clone()),
            None => errors.push(ChangesetError::AttributeOutOfRange),
        }
    }

    let lines = if cursor.peek() == Some(b'|') {
        cursor.advance();
        cursor.read_base36()?
    } else {
        0
    };

    let kind = match cursor.peek() {
        Some(b'=') => OpKind::Keep,
        Some(b'+') => OpKind::Insert,
        Some(b'-') => OpKind::Delete,
        _ => return None,
    };
    cursor.advance();

    let chars = cursor.read_base36()?;
    attrs.sort();

    Some(match kind {
        OpKind::Keep => Op::keep(lines, chars, attrs),
        OpKind::Delete => Op {
            kind: OpKind::Delete,
            lines,
            chars,
            text: None,
            attrs,
        },
        OpKind::Insert => Op {
            kind: OpKind::Insert,
            lines,
            chars,
            text: None, // filled in from the charbank once the whole op* is parsed
            attrs,
        },
    })
}

/// A byte-index cursor over the ASCII header-and-ops prefix of a changeset
/// string. Safe to index by byte because every character up to (and
/// including) the `$` delimiter is ASCII; only the charbank past it may
/// hold multi-byte UTF-8, and that's handled separately via `rest()`.
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str, pos: usize) -> Self { Self { input, pos } }

    fn peek(&self) -> Option<u8> { self.input.as_bytes().get(self.pos).copied() }

    fn advance(&mut self) { self.pos += 1; }

    /// Reads one or more `[0-9a-z]` and decodes them as base-36.
    fn read_base36(&mut self) -> Option<usize> {
        let start = self.pos;
        while matches!(self.peek(), Some(byte) if byte.is_ascii_digit() || byte.is_ascii_lowercase()) {
            self.advance();
        }
        if self.pos == start {
            return None;
        }
        base36::decode(&self.input[start..self.pos])
    }

    fn rest(&self) -> &'a str { &self.input[self.pos..] }
}
