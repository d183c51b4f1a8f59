//! Encoder, parser, and compositor for Etherpad-style attributed-text
//! changesets: a terse, positional wire format describing an edit from a
//! document of some length to one of another length, as a sequence of
//! Keep/Insert/Delete ops plus a flat character bank for inserted text.
//!
//! ```
//! use etherpad_changeset::{Attribute, Changeset};
//!
//! let mut changeset = Changeset::new();
//! changeset.add_keep("hello ", vec![]);
//! changeset.add_insert("brave ", vec![Attribute::new("author", "a1")]);
//! changeset.add_keep("world", vec![]);
//!
//! let wire = changeset.to_string();
//! let pool = changeset.attributes();
//! let parsed = Changeset::parse(&wire, &pool);
//! assert_eq!(parsed.to_string(), wire);
//! ```

mod attribute;
mod base36;
mod changeset;
mod error;
mod op;

pub use attribute::{Attribute, AttributePool};
pub use changeset::Changeset;
pub use error::ChangesetError;
pub use op::{Op, OpKind};
