use std::{env, fs, process};

use etherpad_changeset::{AttributePool, Changeset};

/// Builds the changeset a pad would use to record a file as its initial
/// content, the way `Pad::setInitialText` does: a single Insert spanning the
/// whole text, applied to an empty (`origLen == 0`) document. Serializes it,
/// then re-parses its own output to catch any local encoding bug before it
/// would be handed to a transport, just like `Pad::setInitialText` does.
///
/// Run it with:
/// `cargo run --example roundtrip <file>`
fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: roundtrip <file>");
        process::exit(1);
    }

    let path = &args[1];
    let text = fs::read_to_string(path).unwrap_or_else(|error| {
        eprintln!("Error reading {path}: {error}");
        process::exit(1);
    });

    let mut changeset = Changeset::new();
    if !text.is_empty() {
        changeset.add_insert(&text, vec![]);
    }

    let wire = changeset.to_string();
    println!("{wire}");

    let pool = AttributePool::default();
    let parsed = Changeset::parse(&wire, &pool);

    let errors = parsed.errors();
    if errors.is_empty() {
        println!("round-trips cleanly ({} chars)", parsed.new_len());
    } else {
        eprintln!("round-trip produced diagnostics:");
        for error in &errors {
            eprintln!("  - {error}");
        }
        process::exit(1);
    }
}
