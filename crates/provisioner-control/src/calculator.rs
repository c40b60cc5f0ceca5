//! Capacity target calculation.

use provisioner_core::{CapacityValue, Policy, Sample};

/// New provisioned value for the observed demand.
///
/// `ceil(average * surplus_factor)`, where a missing sample counts as
/// `policy.fallback_average`. With the default policy an idle resource
/// still gets one unit.
pub fn target(sample: Option<&Sample>, policy: &Policy) -> CapacityValue {
    let average = sample.map_or(policy.fallback_average, |s| s.value).max(0.0);
    CapacityValue((average * policy.surplus_factor).ceil() as u64)
}
