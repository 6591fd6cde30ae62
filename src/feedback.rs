use crate::models::{Approval, CODE_REVIEW, VERIFIED};

const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

/// Days since the oldest negative feedback that is still unaddressed.
///
/// Feedback is a negative `Code-Review` vote or a failed `Verified` check.
/// It is addressed once a later approval of the same label is non-negative,
/// and a new patch set discards it altogether, so callers pass only the
/// approvals of the current patch set, sorted by `granted_on`.
///
/// Returns 0 when nothing is outstanding.
pub fn days_since_negative_feedback(approvals: &[Approval], now_ts: i64) -> i64 {
    let mut negative_review: Option<&Approval> = None;
    let mut failed_ci: Option<&Approval> = None;

    for approval in approvals {
        let marker = match approval.kind.as_str() {
            CODE_REVIEW => &mut negative_review,
            VERIFIED => &mut failed_ci,
            _ => continue,
        };
        *marker = approval.is_negative().then_some(approval);
    }

    let oldest_negative = match (negative_review, failed_ci) {
        (None, None) => return 0,
        (Some(a), Some(b)) => a.granted_on.min(b.granted_on),
        (Some(a), None) | (None, Some(a)) => a.granted_on,
    };

    // Feedback stamped after now_ts (clock skew) is not stale yet
    (now_ts - oldest_negative).max(0) / SECONDS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_TS: i64 = 100;
    const ONE_DAY: i64 = SECONDS_PER_DAY;

    fn approval(kind: &str, value: i32, granted_on: i64) -> Approval {
        Approval {
            kind: kind.to_string(),
            value,
            granted_on,
        }
    }

    fn minus_one() -> Approval {
        approval(CODE_REVIEW, -1, BASE_TS)
    }

    fn comment() -> Approval {
        approval(CODE_REVIEW, 0, BASE_TS + 10)
    }

    #[test]
    fn test_empty_approvals() {
        assert_eq!(days_since_negative_feedback(&[], BASE_TS + ONE_DAY * 90), 0);
    }

    #[test]
    fn test_untracked_labels_are_ignored() {
        let approvals = vec![
            approval("Workflow", -1, BASE_TS),
            approval("Backport-Candidate", -2, BASE_TS),
        ];
        assert_eq!(days_since_negative_feedback(&approvals, BASE_TS + ONE_DAY * 90), 0);
    }

    #[test]
    fn test_no_negative_feedback() {
        let approvals = vec![comment()];
        assert_eq!(days_since_negative_feedback(&approvals, BASE_TS + ONE_DAY), 0);
    }

    #[test]
    fn test_positive_feedback() {
        let approvals = vec![approval(CODE_REVIEW, 1, BASE_TS)];
        assert_eq!(days_since_negative_feedback(&approvals, BASE_TS + ONE_DAY), 0);
    }

    #[test]
    fn test_negative_feedback() {
        let approvals = vec![minus_one()];
        assert_eq!(days_since_negative_feedback(&approvals, BASE_TS + ONE_DAY), 1);
    }

    #[test]
    fn test_days_are_truncated() {
        let approvals = vec![minus_one()];
        assert_eq!(days_since_negative_feedback(&approvals, BASE_TS + ONE_DAY - 1), 0);
        assert_eq!(
            days_since_negative_feedback(&approvals, BASE_TS + ONE_DAY * 2 - 1),
            1
        );
    }

    #[test]
    fn test_negative_feedback_response() {
        let approvals = vec![minus_one(), comment()];
        assert_eq!(days_since_negative_feedback(&approvals, BASE_TS + ONE_DAY * 10), 0);
    }

    #[test]
    fn test_negative_feedback_response_two() {
        let approvals = vec![approval(CODE_REVIEW, -2, BASE_TS), comment()];
        assert_eq!(days_since_negative_feedback(&approvals, BASE_TS + ONE_DAY * 10), 0);
    }

    #[test]
    fn test_positive_then_negative() {
        let negative = approval(CODE_REVIEW, -1, BASE_TS + 10);
        let approvals = vec![approval(CODE_REVIEW, 1, BASE_TS), negative.clone()];
        assert_eq!(
            days_since_negative_feedback(&approvals, negative.granted_on + ONE_DAY),
            1
        );
    }

    #[test]
    fn test_negative_returns_after_response() {
        let approvals = vec![
            approval(CODE_REVIEW, -1, BASE_TS),
            approval(CODE_REVIEW, 1, BASE_TS + ONE_DAY),
            approval(CODE_REVIEW, -2, BASE_TS + ONE_DAY * 5),
        ];
        // Measured from the latest -2, not the first -1
        assert_eq!(days_since_negative_feedback(&approvals, BASE_TS + ONE_DAY * 40), 35);
    }

    #[test]
    fn test_failed_ci() {
        let failed = approval(VERIFIED, -1, BASE_TS - 10);
        let approvals = vec![
            approval(CODE_REVIEW, 1, BASE_TS),
            approval(CODE_REVIEW, 2, BASE_TS),
            failed.clone(),
        ];
        assert_eq!(
            days_since_negative_feedback(&approvals, failed.granted_on + ONE_DAY),
            1
        );
    }

    #[test]
    fn test_recheck() {
        let passed = approval(VERIFIED, 1, BASE_TS + 10);
        let approvals = vec![approval(VERIFIED, -1, BASE_TS), passed.clone()];
        assert_eq!(
            days_since_negative_feedback(&approvals, passed.granted_on + ONE_DAY),
            0
        );
    }

    #[test]
    fn test_positive_review_does_not_address_failed_ci() {
        let approvals = vec![
            approval(VERIFIED, -1, BASE_TS),
            approval(CODE_REVIEW, 2, BASE_TS + 10),
        ];
        assert_eq!(days_since_negative_feedback(&approvals, BASE_TS + ONE_DAY * 3), 3);
    }

    #[test]
    fn test_negative_and_failed_ci_uses_oldest() {
        let approvals = vec![
            approval(VERIFIED, -1, BASE_TS),
            approval(CODE_REVIEW, -1, BASE_TS + ONE_DAY * 4),
        ];
        assert_eq!(days_since_negative_feedback(&approvals, BASE_TS + ONE_DAY * 10), 10);
    }

    #[test]
    fn test_negative_and_failed_ci_same_day() {
        let approvals = vec![
            approval(VERIFIED, -1, BASE_TS),
            approval(CODE_REVIEW, -1, BASE_TS + 10),
        ];
        assert_eq!(days_since_negative_feedback(&approvals, BASE_TS + ONE_DAY), 1);
    }

    #[test]
    fn test_feedback_from_the_future() {
        let approvals = vec![approval(CODE_REVIEW, -1, BASE_TS + ONE_DAY)];
        assert_eq!(days_since_negative_feedback(&approvals, BASE_TS), 0);
    }
}
