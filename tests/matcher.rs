mod common;

use common::synthetic_image::{crop, speckle_f32};
use maggrid::matcher::{resample_area, MatchError, MatchParams, TemplateMatcher};
use std::time::Duration;

#[test]
fn recovers_an_exact_subregion_at_the_declared_scale() {
    let parent = speckle_f32(160, 120, 7);
    // The high-magnification image shows the 40×30 region at (60, 40),
    // upscaled 4× to its own full resolution.
    let child = resample_area(&crop(&parent, 60, 40, 40, 30), 160, 120);

    let matcher = TemplateMatcher::new(MatchParams::default().with_multi_scale(false));
    let found = matcher.locate(&parent, &child, 0.25).expect("region exists");

    assert_eq!((found.rect.x, found.rect.y), (60, 40));
    assert_eq!((found.rect.w, found.rect.h), (40, 30));
    assert!(found.score > 0.99, "score = {}", found.score);
}

#[test]
fn multi_scale_search_absorbs_calibration_drift() {
    let parent = speckle_f32(160, 120, 11);
    // True footprint 50×40 at (55, 35); the child's resolution implies a
    // true scale of 50/192 ≈ 0.260, while the declared estimate is 0.25.
    let child = resample_area(&crop(&parent, 55, 35, 50, 40), 192, 154);

    let matcher = TemplateMatcher::new(MatchParams::default());
    let found = matcher.locate(&parent, &child, 0.25).expect("drift is inside the window");

    assert!(found.scale > 0.255, "expected a scale above the estimate, got {}", found.scale);
    assert!((found.rect.x as i64 - 55).abs() <= 2, "x = {}", found.rect.x);
    assert!((found.rect.y as i64 - 35).abs() <= 2, "y = {}", found.rect.y);
    assert!(found.score >= 0.5, "score = {}", found.score);
}

#[test]
fn unrelated_texture_yields_no_match() {
    let parent = speckle_f32(160, 120, 1);
    let child = speckle_f32(160, 120, 99);

    let matcher = TemplateMatcher::new(MatchParams::default());
    let err = matcher.locate(&parent, &child, 0.25).unwrap_err();
    match err {
        MatchError::NoMatchFound {
            best_score,
            threshold,
        } => {
            assert!(best_score < threshold);
        }
        other => panic!("expected NoMatchFound, got {other:?}"),
    }
}

#[test]
fn repeated_searches_are_reproducible() {
    let parent = speckle_f32(160, 120, 5);
    let child = resample_area(&crop(&parent, 20, 10, 48, 40), 160, 133);

    let matcher = TemplateMatcher::new(MatchParams::default());
    let a = matcher.locate(&parent, &child, 0.3).expect("match");
    let b = matcher.locate(&parent, &child, 0.3).expect("match");
    assert_eq!(a.rect, b.rect);
    assert_eq!(a.score, b.score);
    assert_eq!(a.scale, b.scale);
}

#[test]
fn expired_deadline_is_reported() {
    let parent = speckle_f32(160, 120, 3);
    let child = resample_area(&crop(&parent, 60, 40, 40, 30), 160, 120);

    let matcher = TemplateMatcher::new(
        MatchParams::default().with_timeout(Some(Duration::ZERO)),
    );
    let err = matcher.locate(&parent, &child, 0.25).unwrap_err();
    assert!(matches!(err, MatchError::DeadlineExpired { .. }), "got {err:?}");
}
