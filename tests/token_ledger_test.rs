//! Security-token ledger: issuance, single-use consumption, supersession.

mod common;

use auth_core::models::TokenPurpose;
use auth_core::AuthError;
use chrono::Duration;
use common::harness;
use uuid::Uuid;

#[tokio::test]
async fn issue_validate_consume_then_nothing() {
    let h = harness();
    let account_id = Uuid::new_v4();

    let issued = h
        .tokens
        .issue(account_id, TokenPurpose::PasswordReset, Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(issued.secret.len(), 43);
    assert_ne!(issued.secret, issued.record.token_hash);

    let record = h
        .tokens
        .validate(&issued.secret, TokenPurpose::PasswordReset)
        .await
        .unwrap();
    assert_eq!(record.account_id, account_id);

    h.tokens.consume(&issued.secret).await.unwrap();

    let err = h
        .tokens
        .validate(&issued.secret, TokenPurpose::PasswordReset)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Invalid));
    let err = h.tokens.consume(&issued.secret).await.unwrap_err();
    assert!(matches!(err, AuthError::Invalid));
}

#[tokio::test]
async fn purpose_is_checked_on_validation() {
    let h = harness();
    let issued = h
        .tokens
        .issue(
            Uuid::new_v4(),
            TokenPurpose::EmailVerification,
            Duration::hours(1),
        )
        .await
        .unwrap();

    let err = h
        .tokens
        .validate(&issued.secret, TokenPurpose::PasswordReset)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Invalid));
}

#[tokio::test]
async fn expired_is_distinct_from_invalid() {
    let h = harness();
    let issued = h
        .tokens
        .issue(
            Uuid::new_v4(),
            TokenPurpose::PasswordReset,
            Duration::seconds(-1),
        )
        .await
        .unwrap();

    let err = h
        .tokens
        .validate(&issued.secret, TokenPurpose::PasswordReset)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Expired));

    let err = h
        .tokens
        .validate("completely-unknown", TokenPurpose::PasswordReset)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Invalid));
}

#[tokio::test]
async fn concurrent_consumption_succeeds_exactly_once() {
    let h = harness();
    let issued = h
        .tokens
        .issue(Uuid::new_v4(), TokenPurpose::PasswordReset, Duration::hours(1))
        .await
        .unwrap();

    let ledger = h.tokens.clone();
    let (a, b) = tokio::join!(
        h.tokens.consume(&issued.secret),
        ledger.consume(&issued.secret),
    );

    let wins = [a, b].into_iter().filter(Result::is_ok).count();
    assert_eq!(wins, 1);
}

#[tokio::test]
async fn issuing_supersedes_per_account_and_purpose() {
    let h = harness();
    let account_id = Uuid::new_v4();

    let first = h
        .tokens
        .issue(account_id, TokenPurpose::PasswordReset, Duration::hours(1))
        .await
        .unwrap();
    let verification = h
        .tokens
        .issue(
            account_id,
            TokenPurpose::EmailVerification,
            Duration::hours(1),
        )
        .await
        .unwrap();
    let second = h
        .tokens
        .issue(account_id, TokenPurpose::PasswordReset, Duration::hours(1))
        .await
        .unwrap();

    let err = h
        .tokens
        .validate(&first.secret, TokenPurpose::PasswordReset)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Invalid));

    h.tokens
        .validate(&second.secret, TokenPurpose::PasswordReset)
        .await
        .unwrap();
    // A different purpose is a separate lane.
    h.tokens
        .validate(&verification.secret, TokenPurpose::EmailVerification)
        .await
        .unwrap();

    // Another account's tokens are never superseded.
    let other = h
        .tokens
        .issue(Uuid::new_v4(), TokenPurpose::PasswordReset, Duration::hours(1))
        .await
        .unwrap();
    h.tokens
        .validate(&other.secret, TokenPurpose::PasswordReset)
        .await
        .unwrap();
}

#[tokio::test]
async fn purge_drops_expired_tokens_only() {
    let h = harness();
    let live = h
        .tokens
        .issue(Uuid::new_v4(), TokenPurpose::PasswordReset, Duration::hours(1))
        .await
        .unwrap();
    h.tokens
        .issue(
            Uuid::new_v4(),
            TokenPurpose::PasswordReset,
            Duration::seconds(-1),
        )
        .await
        .unwrap();

    let purged = h.tokens.purge_expired().await.unwrap();
    assert_eq!(purged, 1);
    h.tokens
        .validate(&live.secret, TokenPurpose::PasswordReset)
        .await
        .unwrap();
}
