use etherpad_changeset::{Attribute, AttributePool, Changeset};
use pretty_assertions::assert_eq;
use test_case::test_case;

// Scenario numbers below refer to the concrete scenarios list this crate's
// behavior was checked against; they aren't meaningful to callers.

#[test]
fn scenario_1_empty_changeset_serializes_to_empty_string() {
    assert_eq!(Changeset::new().to_string(), "");
}

#[test]
fn scenario_2_builders_then_serialize() {
    let mut changeset = Changeset::new();
    changeset.add_keep("abc\n", vec![]);
    changeset.add_insert("X", vec![]);
    changeset.add_keep("def", vec![]);

    // The trailing "def" Keep carries no attributes, so tidy drops it as the
    // implicit trailing Keep (rule 2 of the canonicalization pass); only its
    // contribution to origLen/newLen survives.
    assert_eq!(changeset.to_string(), "Z:7>1|1=4+1$X");
    assert_eq!(changeset.orig_len(), 7);
    assert_eq!(changeset.new_len(), 8);
}

#[test]
fn scenario_3_parse_single_insert() {
    let pool = AttributePool::default();
    let changeset = Changeset::parse("Z:5>4+4$BAM!", &pool);

    assert_eq!(changeset.errors(), Vec::<String>::new());
    assert_eq!(changeset.orig_len(), 5);
    assert_eq!(changeset.new_len(), 9);
    assert_eq!(changeset.to_string(), "Z:5>4+4$BAM!");
}

#[test]
fn scenario_4_parse_insert_into_empty_document() {
    let pool = AttributePool::default();
    let changeset = Changeset::parse("Z:0>5+5$hello", &pool);

    assert_eq!(changeset.errors(), Vec::<String>::new());
    assert_eq!(changeset.orig_len(), 0);
    assert_eq!(changeset.new_len(), 5);

    // Applying this changeset to an empty document should yield "hello"; we
    // don't model documents directly, but the sole Insert op's text is the
    // whole of the resulting document, i.e. the charbank after the '$'.
    assert_eq!(changeset.to_string().split('$').nth(1), Some("hello"));
}

#[test]
fn scenario_5_tidy_moves_delete_before_insert() {
    let mut changeset = Changeset::new();
    changeset.add_insert("a", vec![]);
    changeset.add_delete_counts(0, 1);
    changeset.add_keep_counts(0, 2, vec![]);

    assert_eq!(changeset.to_string(), "Z:3>0-1+1$a");
}

#[test]
fn scenario_6_compose_keep_insert_with_keep_delete_keep() {
    let pool = AttributePool::default();
    let mut base = Changeset::parse("Z:3>2=3+2$XY", &pool);
    let edit = Changeset::parse("Z:5<1=1-1=3$", &pool);

    base.apply(&edit);

    assert_eq!(base.new_len(), 4);
    assert_eq!(base.orig_len(), 3);
    assert_eq!(base.errors(), Vec::<String>::new());
}

#[test]
fn length_accounting_matches_sum_of_builder_calls() {
    let mut changeset = Changeset::new();
    changeset.add_keep_counts(0, 3, vec![]);
    changeset.add_delete_counts(0, 2);
    changeset.add_insert("xyz", vec![]);
    changeset.add_keep_counts(0, 1, vec![Attribute::new("bold", "true")]);

    assert_eq!(changeset.orig_len(), 3 + 2 + 1);
    assert_eq!(changeset.new_len(), 3 + 3 + 1);
}

#[test]
fn round_trip_through_wire_format_is_lossless() {
    let mut changeset = Changeset::new();
    changeset.add_keep("once upon a time\n", vec![]);
    changeset.add_insert("there was ", vec![Attribute::new("author", "a1")]);
    changeset.add_keep("a kingdom", vec![Attribute::new("bold", "true")]);

    let wire = changeset.to_string();
    let pool = changeset.attributes();
    let parsed = Changeset::parse(&wire, &pool);

    assert_eq!(parsed.errors(), Vec::<String>::new());
    assert_eq!(parsed.orig_len(), changeset.orig_len());
    assert_eq!(parsed.new_len(), changeset.new_len());
    assert_eq!(parsed.to_string(), wire);
}

#[test]
fn tidy_is_idempotent() {
    let mut changeset = Changeset::new();
    changeset.add_insert("a", vec![]);
    changeset.add_delete_counts(0, 1);

    changeset.tidy();
    let once = changeset.to_string();
    changeset.tidy();
    let twice = changeset.to_string();

    assert_eq!(once, twice);
}

#[test]
fn tidy_leaves_no_insert_immediately_before_delete() {
    let mut changeset = Changeset::new();
    changeset.add_insert("a", vec![]);
    changeset.add_delete_counts(0, 1);
    changeset.add_insert("b", vec![]);
    changeset.add_delete_counts(0, 1);

    // Swapping each Insert/Delete pair into Delete-before-Insert order also
    // brings the two Deletes and the two Inserts adjacent to each other,
    // so they merge too: the final form is one Delete then one Insert.
    assert_eq!(changeset.to_string(), "Z:2>0-2+2$ab");
}

// Mirrors Pad.cpp's construction of the changeset that records a pad's
// initial content: a single Insert spanning the whole text, applied to an
// empty document (origLen 0).
#[test_case("hello world\n")]
#[test_case("line one\nline two\n")]
#[test_case("")]
fn initial_pad_changeset_round_trips(text: &str) {
    let mut changeset = Changeset::new();
    if !text.is_empty() {
        changeset.add_insert(text, vec![]);
    }

    let wire = changeset.to_string();
    let pool = AttributePool::default();
    let parsed = Changeset::parse(&wire, &pool);

    assert_eq!(parsed.errors(), Vec::<String>::new());
    assert_eq!(parsed.to_string(), wire);
    assert_eq!(parsed.orig_len(), 0);
    assert_eq!(parsed.new_len(), text.chars().count());
}

#[test]
fn parse_rejects_garbage_input() {
    let pool = AttributePool::default();
    let changeset = Changeset::parse("this is not a changeset at all", &pool);

    assert_eq!(changeset.errors(), vec!["not a changeset".to_owned()]);
    assert_eq!(changeset.orig_len(), 0);
    assert_eq!(changeset.new_len(), 0);
}

#[cfg(feature = "serde")]
#[test]
fn attribute_round_trips_through_json() {
    let attr = Attribute::new("author", "a1");
    let json = serde_json::to_string(&attr).expect("attribute serializes");
    let back: Attribute = serde_json::from_str(&json).expect("attribute deserializes");
    assert_eq!(back, attr);
}

#[cfg(feature = "serde")]
#[test]
fn op_round_trips_through_json() {
    use etherpad_changeset::Op;

    let op = Op::insert(1, "hi\n".to_owned(), vec![Attribute::new("bold", "true")]);
    let json = serde_json::to_string(&op).expect("op serializes");
    let back: Op = serde_json::from_str(&json).expect("op deserializes");
    assert_eq!(back, op);
}

#[test]
fn parse_flags_non_canonical_but_still_usable_input() {
    // "=0" is a zero-length Keep: valid grammar, but tidy drops zero-length
    // ops, so re-serializing no longer matches the input.
    let pool = AttributePool::default();
    let changeset = Changeset::parse("Z:0>1=0+1$x", &pool);

    assert!(changeset.errors().contains(&"changeset not in canonical form".to_owned()));
    assert_eq!(changeset.new_len(), 1);
}
