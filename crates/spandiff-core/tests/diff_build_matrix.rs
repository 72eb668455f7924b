use std::time::{Duration, Instant};

use spanbuf::SpanBuf;
use spandiff_core::{Diff, Operation};

fn buf(text: &str) -> SpanBuf {
    SpanBuf::from(text)
}

fn reconstructs(old: &str, new: &str) {
    let diff = Diff::builder().build(&buf(old), &buf(new));
    assert_eq!(
        diff.extract(Operation::Insert).as_bytes(),
        old.as_bytes(),
        "left reconstruction of {old:?} / {new:?}"
    );
    assert_eq!(
        diff.extract(Operation::Delete).as_bytes(),
        new.as_bytes(),
        "right reconstruction of {old:?} / {new:?}"
    );
}

#[test]
fn diff_reconstructs_both_sides() {
    let cases = [
        ("", ""),
        ("", "abc"),
        ("abc", ""),
        ("abc", "abc"),
        ("a", "b"),
        ("abc", "ab123c"),
        ("a123b456c", "abc"),
        ("Apples are a fruit.", "Bananas are also fruit."),
        ("The quick brown fox jumps over the lazy dog.", "Woof"),
        ("kitten", "sitting"),
        ("1ayb2", "abxab"),
        ("abcy", "xaxcxabc"),
        ("aaabbb", "ab"),
        ("x-=-=-=-=-=-=-=-=-=-=-=-=", "xx-=-=-=-=-=-=-="),
    ];
    for (old, new) in cases {
        reconstructs(old, new);
    }
}

#[test]
fn diff_is_canonical() {
    let cases = [
        ("Apples are a fruit.", "Bananas are also fruit."),
        ("The quick brown fox jumps over the lazy dog.", "Woof"),
        ("kitten", "sitting"),
        ("abcy", "xaxcxabc"),
    ];
    for (old, new) in cases {
        let diff = Diff::builder().build(&buf(old), &buf(new));
        let frags = diff.fragments();
        for (i, fragment) in frags.iter().enumerate() {
            assert!(!fragment.is_empty(), "empty fragment in {old:?} / {new:?}");
            if i > 0 && fragment.op() == Operation::Equal {
                assert_ne!(
                    frags[i - 1].op(),
                    Operation::Equal,
                    "adjacent equalities in {old:?} / {new:?}"
                );
            }
            if i > 0 && fragment.op() == Operation::Delete {
                assert_ne!(
                    frags[i - 1].op(),
                    Operation::Insert,
                    "insert before delete in an edit run of {old:?} / {new:?}"
                );
            }
        }
    }
}

#[test]
fn diff_levenshtein_minimal_cases() {
    let diff = Diff::builder().build(&buf("kitten"), &buf("sitting"));
    assert_eq!(diff.levenshtein(), 3);
    let diff = Diff::builder().build(&buf("cat"), &buf("map"));
    assert_eq!(diff.levenshtein(), 2);
    let diff = Diff::builder().build(&buf("abc"), &buf("abc"));
    assert_eq!(diff.levenshtein(), 0);
}

#[test]
fn diff_skip_detail_is_degenerate_but_valid() {
    let diff = Diff::builder()
        .skip_detail()
        .build(&buf("cat"), &buf("map"));
    assert_eq!(diff.extract(Operation::Insert).as_bytes(), b"cat");
    assert_eq!(diff.extract(Operation::Delete).as_bytes(), b"map");
}

#[test]
fn diff_deadline_caps_processing_time() {
    let mut old = buf(
        "`Twas brillig, and the slithy toves\nDid gyre and gimble in the wabe:\nAll mimsy were the borogoves,\nAnd the mome raths outgrabe.\n",
    );
    let mut new = buf(
        "I am the very model of a modern major general,\nI've information vegetable, animal, and mineral,\nI know the kings of England, and I quote the fights historical,\nFrom Marathon to Waterloo, in order categorical.\n",
    );
    // Blow the inputs up 1024x so the bisect cannot finish in time.
    for _ in 0..10 {
        old = old.concat(&old);
        new = new.concat(&new);
    }

    let start = Instant::now();
    let diff = Diff::builder()
        .process_time(Duration::from_millis(100))
        .build(&old, &new);
    let elapsed = start.elapsed();

    assert!(
        elapsed >= Duration::from_millis(100),
        "diff returned before the deadline: {elapsed:?}"
    );
    // Degenerate delete/insert pair plus the common ".\n" suffix.
    assert_eq!(diff.fragments().len(), 3);
    assert_eq!(diff.extract(Operation::Insert), old);
    assert_eq!(diff.extract(Operation::Delete), new);
}
