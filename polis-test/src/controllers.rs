//! Controllers with known policies, shared by the integration tests.

use chrono::{DateTime, TimeZone, Utc};
use http::HeaderValue;
use http::header::HeaderName;
use polis::{Controller, PolicyApplicator, PolicyEntry, PolicySet};
use polis_core::{
    CacheAgeProvider, ModificationProvider, Originator, Policy, PolicyError, PolicyRequest,
    PolicyResponse, PolicyResponseExt, VaryProvider,
};
use polis_http::{CachingPolicy, PageMaxAge};

/// Header [`TracePolicy`] appends to.
pub const TRACE_HEADER: HeaderName = HeaderName::from_static("x-policy-trace");

/// Header the ordering fixtures compete for.
pub const OWNER_HEADER: HeaderName = HeaderName::from_static("x-policy-owner");

/// `max-age=999`, varying on `X-EyeColour`.
pub fn caching_policy() -> PolicyEntry {
    PolicyEntry::new(CachingPolicy::new().cache_age(999).vary("X-EyeColour"))
}

/// Appends its name to [`TRACE_HEADER`] and claims [`OWNER_HEADER`].
#[derive(Debug)]
pub struct TracePolicy(pub &'static str);

impl Policy for TracePolicy {
    fn apply_to_response(
        &self,
        _originator: &dyn Originator,
        _request: &PolicyRequest,
        response: &mut dyn PolicyResponse,
    ) -> Result<(), PolicyError> {
        let trace = match response.header(TRACE_HEADER) {
            Some(previous) => format!("{previous}, {}", self.0),
            None => self.0.to_owned(),
        };
        response.set_header(TRACE_HEADER, value(&TRACE_HEADER, &trace)?);
        response.set_header(OWNER_HEADER, value(&OWNER_HEADER, self.0)?);
        Ok(())
    }

    fn name(&self) -> &str {
        self.0
    }
}

fn value(name: &HeaderName, value: &str) -> Result<HeaderValue, PolicyError> {
    HeaderValue::from_str(value)
        .map_err(|err| PolicyError::InvalidHeaderValue(name.to_string(), err))
}

fn trace(name: &'static str) -> PolicyEntry {
    PolicyEntry::new(TracePolicy(name))
}

/// Declares [`caching_policy`] and nothing else.
#[derive(Debug)]
pub struct CachingPolicyController {
    applicators: Vec<PolicyApplicator>,
}

impl Default for CachingPolicyController {
    fn default() -> Self {
        Self {
            applicators: vec![PolicySet::new().with("caching", caching_policy()).into()],
        }
    }
}

impl Originator for CachingPolicyController {
    fn label(&self) -> &str {
        "CachingPolicyController"
    }
}

impl Controller for CachingPolicyController {
    fn applicators(&self) -> &[PolicyApplicator] {
        &self.applicators
    }
}

/// Declares [`caching_policy`] but overrides every input of it: max-age
/// 1001, `Vary: X-HeightWeight` and a modification time of 5000 seconds.
#[derive(Debug)]
pub struct CallbackCachingPolicyController {
    applicators: Vec<PolicyApplicator>,
}

impl CallbackCachingPolicyController {
    /// The modification time the controller reports.
    pub fn modified() -> DateTime<Utc> {
        Utc.timestamp_opt(5000, 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

impl Default for CallbackCachingPolicyController {
    fn default() -> Self {
        Self {
            applicators: vec![PolicySet::new().with("caching", caching_policy()).into()],
        }
    }
}

impl CacheAgeProvider for CallbackCachingPolicyController {
    fn cache_age(&self, _current: u64) -> Option<u64> {
        Some(1001)
    }
}

impl VaryProvider for CallbackCachingPolicyController {
    fn vary(&self, _current: &str) -> Option<String> {
        Some("X-HeightWeight".to_owned())
    }
}

impl ModificationProvider for CallbackCachingPolicyController {
    fn modification_timestamp(&self) -> Option<DateTime<Utc>> {
        Some(Self::modified())
    }
}

impl Originator for CallbackCachingPolicyController {
    fn label(&self) -> &str {
        "CallbackCachingPolicyController"
    }

    fn as_cache_age_provider(&self) -> Option<&dyn CacheAgeProvider> {
        Some(self)
    }

    fn as_vary_provider(&self) -> Option<&dyn VaryProvider> {
        Some(self)
    }

    fn as_modification_provider(&self) -> Option<&dyn ModificationProvider> {
        Some(self)
    }
}

impl Controller for CallbackCachingPolicyController {
    fn applicators(&self) -> &[PolicyApplicator] {
        &self.applicators
    }
}

/// Declares no policies.
#[derive(Debug, Default)]
pub struct UnrelatedController;

impl Originator for UnrelatedController {
    fn label(&self) -> &str {
        "UnrelatedController"
    }
}

impl Controller for UnrelatedController {
    fn applicators(&self) -> &[PolicyApplicator] {
        &[]
    }
}

/// Inherits `[c]` from its ancestor and declares `[a, b]` itself.
#[derive(Debug)]
pub struct DescendantController {
    applicators: Vec<PolicyApplicator>,
}

impl Default for DescendantController {
    fn default() -> Self {
        let ancestor = PolicySet::new().with("c", trace("c"));
        let own = PolicySet::new().with("a", trace("a")).with("b", trace("b"));
        Self {
            applicators: vec![ancestor.into(), own.into()],
        }
    }
}

impl Originator for DescendantController {
    fn label(&self) -> &str {
        "DescendantController"
    }
}

impl Controller for DescendantController {
    fn applicators(&self) -> &[PolicyApplicator] {
        &self.applicators
    }
}

/// A CMS page whose editors set the max-age in minutes.
#[derive(Debug)]
pub struct PageController {
    max_age: PageMaxAge,
    applicators: Vec<PolicyApplicator>,
}

impl PageController {
    /// A page with the given max-age field.
    pub fn new(max_age: PageMaxAge) -> Self {
        Self {
            max_age,
            applicators: vec![PolicySet::new().with("caching", caching_policy()).into()],
        }
    }
}

impl Originator for PageController {
    fn label(&self) -> &str {
        "PageController"
    }

    fn as_cache_age_provider(&self) -> Option<&dyn CacheAgeProvider> {
        Some(&self.max_age)
    }
}

impl Controller for PageController {
    fn applicators(&self) -> &[PolicyApplicator] {
        &self.applicators
    }
}

/// Always fails, like a policy whose backing store is unavailable.
#[derive(Debug)]
pub struct FailingPolicy;

impl Policy for FailingPolicy {
    fn apply_to_response(
        &self,
        _originator: &dyn Originator,
        _request: &PolicyRequest,
        _response: &mut dyn PolicyResponse,
    ) -> Result<(), PolicyError> {
        Err(PolicyError::failed("FailingPolicy", "storage unavailable"))
    }

    fn name(&self) -> &str {
        "FailingPolicy"
    }
}

/// Declares [`FailingPolicy`] after [`caching_policy`], so caching is
/// applied first and the failure aborts the rest.
#[derive(Debug)]
pub struct FailingController {
    applicators: Vec<PolicyApplicator>,
}

impl Default for FailingController {
    fn default() -> Self {
        let policies = PolicySet::new()
            .with("failing", PolicyEntry::new(FailingPolicy))
            .with("caching", caching_policy());
        Self {
            applicators: vec![policies.into()],
        }
    }
}

impl Originator for FailingController {
    fn label(&self) -> &str {
        "FailingController"
    }
}

impl Controller for FailingController {
    fn applicators(&self) -> &[PolicyApplicator] {
        &self.applicators
    }
}
