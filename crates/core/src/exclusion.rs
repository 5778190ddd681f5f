//! Policy-driven exemption from automatic expiry.

use crate::policy::Policy;
use crate::visit::Visit;

/// Whether a visit is exempt from expiry under `policy`.
///
/// Excluded iff the experiment type or the PI's organisation is listed in
/// the policy. Every caller that needs "excluded" goes through here.
pub fn is_excluded(visit: &Visit, policy: &Policy) -> bool {
    policy.exclude_type.contains(&visit.visit_type.id)
        || policy.exclude_org.contains(&visit.pi.org.id)
}
