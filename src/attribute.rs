use std::ops::Index;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A `(key, value)` pair marking a run of text with a property, e.g.
/// `("author", "u123")` or `("bold", "true")`.
///
/// An empty `value` is meaningful when paired with a Keep op: it means
/// "clear this attribute on the spanned text" rather than "set it to the
/// empty string".
///
/// Attributes are totally ordered lexicographically on `key`, then `value`;
/// this order is what makes a pool's index assignment deterministic given
/// the same set of attributes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// An attribute is a removal marker when used on a Keep op: an empty
    /// value means "clear this attribute".
    #[must_use]
    pub fn is_removal(&self) -> bool { self.value.is_empty() }
}

impl<K, V> From<(K, V)> for Attribute
where
    K: Into<String>,
    V: Into<String>,
{
    fn from((key, value): (K, V)) -> Self { Self::new(key, value) }
}

/// An ordered sequence of distinct [`Attribute`]s. The position of an
/// attribute in the pool is its *pool id*, used to reference it compactly
/// from an op's `*N` prefix.
///
/// A pool is supplied externally to [`crate::Changeset::parse`] (bound to
/// whatever revision the caller is decoding against); the pool implicitly
/// produced by [`crate::Changeset::to_string`] is derived fresh, each call,
/// from the attributes actually present in the op sequence — the two may
/// assign different indices to the same attribute, so round-tripping only
/// works when the serializer's own pool is handed back to `parse`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributePool(Vec<Attribute>);

impl AttributePool {
    #[must_use]
    pub fn new(mut attributes: Vec<Attribute>) -> Self {
        attributes.sort();
        attributes.dedup();
        Self(attributes)
    }

    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Attribute> { self.0.get(index) }

    /// The position of `attribute` in the pool, or `None` if it isn't
    /// present (the "not present" sentinel from spec §4.A).
    #[must_use]
    pub fn index_of(&self, attribute: &Attribute) -> Option<usize> {
        self.0.iter().position(|candidate| candidate == attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> { self.0.iter() }
}

impl From<Vec<Attribute>> for AttributePool {
    fn from(attributes: Vec<Attribute>) -> Self { Self::new(attributes) }
}

impl Index<usize> for AttributePool {
    type Output = Attribute;

    fn index(&self, index: usize) -> &Self::Output { &self.0[index] }
}

impl IntoIterator for AttributePool {
    type IntoIter = std::vec::IntoIter<Attribute>;
    type Item = Attribute;

    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl<'a> IntoIterator for &'a AttributePool {
    type IntoIter = std::slice::Iter<'a, Attribute>;
    type Item = &'a Attribute;

    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_ordering_is_key_then_value() {
        let mut attrs = vec![
            Attribute::new("author", "bob"),
            Attribute::new("author", "alice"),
            Attribute::new("bold", "true"),
        ];
        attrs.sort();

        assert_eq!(
            attrs,
            vec![
                Attribute::new("author", "alice"),
                Attribute::new("author", "bob"),
                Attribute::new("bold", "true"),
            ]
        );
    }

    #[test]
    fn test_is_removal() {
        assert!(Attribute::new("bold", "").is_removal());
        assert!(!Attribute::new("bold", "true").is_removal());
    }

    #[test]
    fn test_pool_dedups_and_sorts() {
        let pool = AttributePool::new(vec![
            Attribute::new("bold", "true"),
            Attribute::new("author", "bob"),
            Attribute::new("bold", "true"),
        ]);

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(0), Some(&Attribute::new("author", "bob")));
        assert_eq!(pool.get(1), Some(&Attribute::new("bold", "true")));
    }

    #[test]
    fn snapshot_attribute_debug() {
        let attr = Attribute::new("author", "a1");
        insta::assert_debug_snapshot!(attr, @r###"
        Attribute {
            key: "author",
            value: "a1",
        }
        "###);
    }

    #[test]
    fn test_index_of() {
        let pool = AttributePool::new(vec![Attribute::new("author", "bob"), Attribute::new("bold", "true")]);

        assert_eq!(pool.index_of(&Attribute::new("bold", "true")), Some(1));
        assert_eq!(pool.index_of(&Attribute::new("italic", "true")), None);
    }
}
