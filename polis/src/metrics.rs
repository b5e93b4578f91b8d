//! Metrics declaration and recording.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of policy applications.
    pub static ref POLICIES_APPLIED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "polis_policies_applied_total",
            "Total number of policies applied to responses."
        );
        "polis_policies_applied_total"
    };
    /// Track number of requests skipped because of an ignored domain.
    pub static ref REQUESTS_IGNORED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "polis_requests_ignored_total",
            "Total number of requests whose host is ignored."
        );
        "polis_requests_ignored_total"
    };
    /// Track number of failed policy applications.
    pub static ref POLICY_ERRORS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "polis_policy_errors_total",
            "Total number of policies that failed while mutating a response."
        );
        "polis_policy_errors_total"
    };
    /// Track number of `304 Not Modified` responses produced by policies.
    pub static ref NOT_MODIFIED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "polis_not_modified_total",
            "Total number of responses turned into 304 Not Modified."
        );
        "polis_not_modified_total"
    };
}

/// Record the number of policies applied to one response.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_applied(count: usize) {
    metrics::counter!(*POLICIES_APPLIED_COUNTER).increment(count as u64);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_applied(_count: usize) {}

/// Record a request skipped because of its host.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_ignored() {
    metrics::counter!(*REQUESTS_IGNORED_COUNTER).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_ignored() {}

/// Record a failed policy, labelled with its name.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_failure(policy: &str) {
    metrics::counter!(*POLICY_ERRORS_COUNTER, "policy" => policy.to_string()).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_failure(_policy: &str) {}

/// Record a response turned into `304 Not Modified`.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_not_modified() {
    metrics::counter!(*NOT_MODIFIED_COUNTER).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_not_modified() {}
