use super::types::{RequestOutcome, StatusClass};

/// Maps an outcome to its histogram bucket.
///
/// Returns `None` for the zero-status placeholder (no status and no failure
/// reason), which is never counted.
#[must_use]
pub fn classify(outcome: &RequestOutcome) -> Option<StatusClass> {
    if outcome.is_placeholder() {
        return None;
    }
    let class = match outcome.status_code {
        100..=199 => StatusClass::Informational,
        200..=299 => StatusClass::Success,
        300..=399 => StatusClass::Redirection,
        400..=499 => StatusClass::ClientError,
        500..=599 => StatusClass::ServerError,
        _ => StatusClass::Unclassified,
    };
    Some(class)
}
