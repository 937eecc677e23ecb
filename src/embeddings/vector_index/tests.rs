use super::*;

#[test]
fn builds_uniform_vectors_in_order() {
    let index = build_index(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]])
        .expect("uniform vectors should index");

    assert_eq!(index.len(), 3);
    assert_eq!(index.dimension(), 2);
    assert_eq!(index.vectors()[1], vec![0.0, 1.0]);
    assert_eq!(index.flat_values(), vec![1.0, 0.0, 0.0, 1.0, 0.5, 0.5]);
}

#[test]
fn empty_input_builds_empty_index() {
    let index = build_index(Vec::new()).expect("empty index is valid");
    assert!(index.is_empty());
    assert_eq!(index.dimension(), 0);
    assert!(index.flat_values().is_empty());
}

#[test]
fn mismatched_dimension_is_rejected() {
    let err = build_index(vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![1.0, 1.0]])
        .expect_err("ragged vectors should fail");

    match err {
        CinemateError::DimensionMismatch {
            row,
            expected,
            found,
        } => {
            assert_eq!(row, 2);
            assert_eq!(expected, 3);
            assert_eq!(found, 2);
        }
        other => panic!("expected DimensionMismatch, got {other:?}"),
    }
}

#[test]
fn zero_length_vectors_are_rejected() {
    assert!(matches!(
        build_index(vec![Vec::new(), Vec::new()]),
        Err(CinemateError::InvalidInput(_))
    ));
}
