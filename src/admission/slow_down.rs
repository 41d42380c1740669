//! Progressive slow-down: requests beyond a threshold get delayed, not
//! rejected, so bursty-but-legitimate clients degrade instead of failing.

use std::time::Duration;

use crate::revocation::RevocationStore;

use super::AdmissionConfig;

const SLOW_DOWN_PREFIX: &str = "slowdown:ip:";

/// Delay to apply before routing this request, `None` below the threshold.
///
/// Each request past `slow_down_after` within the general window adds one
/// `slow_down_step`, capped at `slow_down_cap`.
pub async fn delay_for(
    store: &dyn RevocationStore,
    config: &AdmissionConfig,
    ip: &str,
) -> Option<Duration> {
    let count = store
        .increment(&format!("{SLOW_DOWN_PREFIX}{ip}"), config.general_window)
        .await;

    let over = count - config.slow_down_after;
    if over <= 0 {
        return None;
    }

    let steps = u32::try_from(over).unwrap_or(u32::MAX);
    Some(
        config
            .slow_down_step
            .saturating_mul(steps)
            .min(config.slow_down_cap),
    )
}
