//! Tests for the error system.

use std::sync::Arc;

use bidlink::auth::AuthError;
use bidlink::error::*;

#[test]
fn error_api_creation() {
    let err = BidlinkError::api(404, "Project not found");
    assert!(matches!(&err, BidlinkError::Api { status: 404, .. }));
    assert_eq!(err.to_string(), "API error (status 404): Project not found");
}

#[test]
fn error_helper_mappings_are_stable_for_major_variants() {
    struct Case {
        error: BidlinkError,
        expected_category: ErrorCategory,
        expected_retryable: bool,
        expected_recovery: RecoverySuggestion,
    }

    let network_error = reqwest::Client::new()
        .get("http://[::1")
        .build()
        .unwrap_err();
    let serde_error = serde_json::from_str::<serde_json::Value>("{not-json}").unwrap_err();

    let cases = vec![
        Case {
            error: BidlinkError::UnauthorizedAfterRetry {
                message: "jwt expired".to_string(),
            },
            expected_category: ErrorCategory::Authentication,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::Reauthenticate,
        },
        Case {
            error: BidlinkError::RefreshFailed(Arc::new(BidlinkError::api(401, "revoked"))),
            expected_category: ErrorCategory::SessionExpired,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::Reauthenticate,
        },
        Case {
            error: BidlinkError::Auth(AuthError::NotLoggedIn),
            expected_category: ErrorCategory::Authentication,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::Reauthenticate,
        },
        Case {
            error: BidlinkError::Cancelled,
            expected_category: ErrorCategory::Cancelled,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::RetryRequest,
        },
        Case {
            error: BidlinkError::Timeout(5000),
            expected_category: ErrorCategory::Timeout,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::IncreaseTimeout,
        },
        Case {
            error: BidlinkError::Configuration("bad-config".to_string()),
            expected_category: ErrorCategory::Configuration,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckConfiguration,
        },
        Case {
            error: BidlinkError::Network(network_error),
            expected_category: ErrorCategory::Network,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: BidlinkError::Serialization(serde_error),
            expected_category: ErrorCategory::Serialization,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ContactSupport,
        },
        Case {
            error: BidlinkError::api(429, "slow down"),
            expected_category: ErrorCategory::RateLimit,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: BidlinkError::api(503, "maintenance"),
            expected_category: ErrorCategory::Server,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: BidlinkError::api(422, "bid below minimum"),
            expected_category: ErrorCategory::Api,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ContactSupport,
        },
    ];

    for case in cases {
        assert_eq!(case.error.category(), case.expected_category, "{}", case.error);
        assert_eq!(case.error.is_retryable(), case.expected_retryable, "{}", case.error);
        assert_eq!(
            case.error.recovery_suggestion(),
            case.expected_recovery,
            "{}",
            case.error
        );
    }
}

#[test]
fn refresh_failure_keeps_source_chain() {
    use std::error::Error;

    let err = BidlinkError::RefreshFailed(Arc::new(BidlinkError::Timeout(15000)));
    let source = err.source().expect("refresh failure has a source");
    assert_eq!(source.to_string(), "Timeout after 15000ms");
    assert_eq!(
        err.to_string(),
        "Session refresh failed: Timeout after 15000ms"
    );
}

#[test]
fn categories_render_as_snake_case() {
    assert_eq!(ErrorCategory::SessionExpired.to_string(), "session_expired");
    assert_eq!(RecoverySuggestion::Reauthenticate.to_string(), "reauthenticate");
}
