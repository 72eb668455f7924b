use spanbuf::bitap::BitapConfig;
use spanbuf::SpanBuf;
use spandiff_core::{Diff, DiffFragment, Operation, Patch, PatchError, PatchFragment, Span};

fn buf(text: &str) -> SpanBuf {
    SpanBuf::from(text)
}

fn make_patch(old: &str, new: &str) -> Patch {
    let diff = Diff::builder().build(&buf(old), &buf(new));
    Patch::from_buffer_diff(&buf(old), &diff)
}

fn text(result: &spandiff_core::ApplyResult) -> String {
    String::from_utf8_lossy(result.result().as_bytes()).into_owned()
}

#[test]
fn apply_null_case() {
    let patch = make_patch("", "");
    let result = patch.apply(&buf("Hello world")).unwrap();
    assert!(result.used().is_empty());
    assert_eq!(text(&result), "Hello world");
}

#[test]
fn apply_exact_match() {
    let patch = make_patch(
        "The quick brown fox jumps over the lazy dog.",
        "That quick brown fox jumped over a lazy dog.",
    );
    let result = patch
        .apply(&buf("The quick brown fox jumps over the lazy dog."))
        .unwrap();
    assert_eq!(result.used(), &[true, true]);
    assert_eq!(text(&result), "That quick brown fox jumped over a lazy dog.");
}

#[test]
fn apply_partial_match() {
    let patch = make_patch(
        "The quick brown fox jumps over the lazy dog.",
        "That quick brown fox jumped over a lazy dog.",
    );
    let result = patch
        .apply(&buf("The quick red rabbit jumps over the tired tiger."))
        .unwrap();
    assert_eq!(result.used(), &[true, true]);
    assert_eq!(
        text(&result),
        "That quick red rabbit jumped over a tired tiger."
    );
}

#[test]
fn apply_failed_match() {
    let patch = make_patch(
        "The quick brown fox jumps over the lazy dog.",
        "That quick brown fox jumped over a lazy dog.",
    );
    let result = patch
        .apply(&buf("I am the very model of a modern major general."))
        .unwrap();
    assert_eq!(result.used(), &[false, false]);
    assert_eq!(text(&result), "I am the very model of a modern major general.");
}

#[test]
fn apply_big_delete_small_change() {
    let patch = make_patch(
        "x1234567890123456789012345678901234567890123456789012345678901234567890y",
        "xabcy",
    );
    let result = patch
        .apply(&buf(
            "x123456789012345678901234567890-----++++++++++-----123456789012345678901234567890y",
        ))
        .unwrap();
    assert_eq!(result.used(), &[true, true]);
    assert_eq!(text(&result), "xabcy");
}

#[test]
fn apply_big_delete_big_change_rejected_by_threshold() {
    let patch = make_patch(
        "x1234567890123456789012345678901234567890123456789012345678901234567890y",
        "xabcy",
    );
    let result = patch
        .apply(&buf(
            "x12345678901234567890---------------++++++++++---------------12345678901234567890y",
        ))
        .unwrap();
    assert_eq!(result.used(), &[false, true]);
    assert_eq!(
        text(&result),
        "xabc12345678901234567890---------------++++++++++---------------12345678901234567890y"
    );
}

#[test]
fn apply_big_delete_big_change_loose_threshold() {
    let mut patch = make_patch(
        "x1234567890123456789012345678901234567890123456789012345678901234567890y",
        "xabcy",
    );
    patch.set_delete_threshold(0.6);
    let result = patch
        .apply(&buf(
            "x12345678901234567890---------------++++++++++---------------12345678901234567890y",
        ))
        .unwrap();
    assert_eq!(result.used(), &[true, true]);
    assert_eq!(text(&result), "xabcy");
}

#[test]
fn apply_compensates_for_failed_fragment() {
    let mut patch = make_patch(
        "abcdefghijklmnopqrstuvwxyz--------------------1234567890",
        "abcXXXXXXXXXXdefghijklmnopqrstuvwxyz--------------------1234567YYYYYYYYYY890",
    );
    patch.set_match_config(BitapConfig::new(0, 0.0));
    let result = patch
        .apply(&buf("ABCDEFGHIJKLMNOPQRSTUVWXYZ--------------------1234567890"))
        .unwrap();
    assert_eq!(result.used(), &[false, true]);
    assert_eq!(
        text(&result),
        "ABCDEFGHIJKLMNOPQRSTUVWXYZ--------------------1234567YYYYYYYYYY890"
    );
}

#[test]
fn apply_has_no_side_effects() {
    let patch = make_patch("", "test");
    let before = patch.to_string();
    patch.apply(&SpanBuf::empty()).unwrap();
    assert_eq!(patch.to_string(), before);

    let patch = make_patch("The quick brown fox jumps over the lazy dog.", "Woof");
    let before = patch.to_string();
    patch
        .apply(&buf("The quick brown fox jumps over the lazy dog."))
        .unwrap();
    assert_eq!(patch.to_string(), before);
}

#[test]
fn apply_edge_exact_match() {
    let patch = make_patch("", "test");
    let result = patch.apply(&SpanBuf::empty()).unwrap();
    assert_eq!(result.used(), &[true]);
    assert_eq!(text(&result), "test");
}

#[test]
fn apply_near_edge_exact_match() {
    let patch = make_patch("XY", "XtestY");
    let result = patch.apply(&buf("XY")).unwrap();
    assert_eq!(result.used(), &[true]);
    assert_eq!(text(&result), "XtestY");
}

#[test]
fn apply_edge_partial_match() {
    let patch = make_patch("y", "y123");
    let result = patch.apply(&buf("x")).unwrap();
    assert_eq!(result.used(), &[true]);
    assert_eq!(text(&result), "x123");
}

#[test]
fn apply_to_unrelated_buffer_is_identity() {
    let patch = make_patch("XY", "XtestY");
    let unrelated = "I am the very model of a modern major general.";
    let result = patch.apply(&buf(unrelated)).unwrap();
    assert_eq!(result.used(), &[false]);
    assert_eq!(text(&result), unrelated);
    assert!(!result.all_used());
}

#[test]
fn apply_rejects_oversized_padding() {
    let patch = make_patch("XY", "XtestY");
    assert!(matches!(
        patch.apply_with_padding(&buf("XY"), 32),
        Err(PatchError::PaddingTooLong(32))
    ));
}

// The split_max exercises below drive fragments much larger than the bitap
// window through apply.

const LEFT: &str = concat!(
    "This eBook is for the use of anyone anywhere in the United States and most",
    " other parts of the world at no cost and with almost no restrictions ",
    "whatsoever.  You may copy it, give it away or re-use it under the terms of",
    " the Project Gutenberg License included with this eBook or online at ",
    "www.gutenberg.org.  If you are not located in the United States, you'll have ",
    "to check the laws of the country where you are located before using this ebook.",
);

const MIDDLE: &str = concat!(
    "Knowing that the time had come for her to leave this world, where she ",
    "had been within such a short space of time a wife, a mother, and a ",
    "widow, she went to her room, where slept her son George, guarded by ",
    "waiting women.  He was three years old; his long eyelashes threw a ",
    "pretty shade on his cheeks, and his mouth was like a flower.  Seeing how ",
    "small he was and how young, she began to cry.",
);

const RIGHT: &str = concat!(
    "'Legal Entity' shall mean the union of the acting entity and all ",
    "other entities that control, are controlled by, or are under common ",
    "control with that entity. For the purposes of this definition, ",
    "'control' means (i) the power, direct or indirect, to cause the ",
    "direction or management of such entity, whether by contract or ",
    "otherwise, or (ii) ownership of fifty percent (50%) or more of the ",
    "outstanding shares, or (iii) beneficial ownership of such entity.",
);

fn span_fragment(ops: &[(Operation, &str)]) -> PatchFragment {
    let left_len: usize = ops
        .iter()
        .filter(|(op, _)| *op != Operation::Insert)
        .map(|(_, s)| s.len())
        .sum();
    let right_len: usize = ops
        .iter()
        .filter(|(op, _)| *op != Operation::Delete)
        .map(|(_, s)| s.len())
        .sum();
    let mut fragment =
        PatchFragment::from_spans(Span::new(0, left_len), Span::new(0, right_len));
    for (op, s) in ops {
        fragment.push(DiffFragment::new(*op, buf(s)));
    }
    fragment
}

#[test]
fn apply_big_delete_before_big_insert() {
    let mut patch = Patch::new();
    patch.push(span_fragment(&[
        (Operation::Delete, LEFT),
        (Operation::Insert, RIGHT),
    ]));
    let result = patch.apply(&buf(LEFT)).unwrap();
    assert!(result.all_used());
    assert_eq!(text(&result), RIGHT);
}

#[test]
fn apply_big_insert_before_big_delete() {
    let mut patch = Patch::new();
    patch.push(span_fragment(&[
        (Operation::Insert, RIGHT),
        (Operation::Delete, LEFT),
    ]));
    let result = patch.apply(&buf(LEFT)).unwrap();
    assert!(result.all_used());
    assert_eq!(text(&result), RIGHT);
}

#[test]
fn apply_big_equality_then_insert() {
    let mut patch = Patch::new();
    patch.push(span_fragment(&[
        (Operation::Equal, LEFT),
        (Operation::Insert, RIGHT),
    ]));
    let result = patch.apply(&buf(LEFT)).unwrap();
    assert!(result.all_used());
    assert_eq!(text(&result), format!("{LEFT}{RIGHT}"));
}

#[test]
fn apply_big_insert_then_equality() {
    let mut patch = Patch::new();
    patch.push(span_fragment(&[
        (Operation::Insert, RIGHT),
        (Operation::Equal, LEFT),
    ]));
    let result = patch.apply(&buf(LEFT)).unwrap();
    assert!(result.all_used());
    assert_eq!(text(&result), format!("{RIGHT}{LEFT}"));
}

#[test]
fn apply_big_delete_middle_insert() {
    let mut patch = Patch::new();
    patch.push(span_fragment(&[
        (Operation::Delete, LEFT),
        (Operation::Equal, MIDDLE),
        (Operation::Insert, RIGHT),
    ]));
    let result = patch.apply(&buf(LEFT).concat(&buf(MIDDLE))).unwrap();
    assert!(result.all_used());
    assert_eq!(text(&result), format!("{MIDDLE}{RIGHT}"));
}

#[test]
fn apply_big_insert_middle_delete() {
    let mut patch = Patch::new();
    patch.push(span_fragment(&[
        (Operation::Insert, RIGHT),
        (Operation::Equal, MIDDLE),
        (Operation::Delete, LEFT),
    ]));
    let result = patch.apply(&buf(MIDDLE).concat(&buf(LEFT))).unwrap();
    assert!(result.all_used());
    assert_eq!(text(&result), format!("{RIGHT}{MIDDLE}"));
}
