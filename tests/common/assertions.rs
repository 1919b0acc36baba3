#![allow(dead_code)]

use glimpse::error::GlimpseError;
use glimpse::types::{Neighbor, SearchResult};

/// Assert that neighbors come back in non-decreasing distance order.
pub fn assert_ascending(neighbors: &[Neighbor]) {
    for pair in neighbors.windows(2) {
        assert!(
            pair[0].distance <= pair[1].distance,
            "neighbors out of order: {:?} before {:?}",
            pair[0],
            pair[1]
        );
    }
}

/// Assert that search results come back in non-decreasing distance order.
pub fn assert_results_ascending(results: &[SearchResult]) {
    for pair in results.windows(2) {
        assert!(
            pair[0].distance <= pair[1].distance,
            "results out of order: {} ({}) before {} ({})",
            pair[0].filename,
            pair[0].distance,
            pair[1].filename,
            pair[1].distance
        );
    }
}

/// Assert the filenames of results, in order.
pub fn assert_filenames(results: &[SearchResult], expected: &[&str]) {
    let got: Vec<&str> = results.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(got, expected, "unexpected result order");
}

pub fn assert_length_mismatch<T: std::fmt::Debug>(result: &Result<T, GlimpseError>) {
    match result {
        Err(GlimpseError::LengthMismatch { .. }) => {}
        other => panic!("expected LengthMismatch error, got: {other:?}"),
    }
}

pub fn assert_malformed_artifact<T: std::fmt::Debug>(result: &Result<T, GlimpseError>) {
    match result {
        Err(GlimpseError::MalformedArtifact { .. }) => {}
        other => panic!("expected MalformedArtifact error, got: {other:?}"),
    }
}
