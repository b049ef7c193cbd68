//! Service metrics
//!
//! - `toolgate_api_usage_recorded_total` - Accepted tool uses by plan
//! - `toolgate_api_limit_rejections_total` - Usage rejected at the limit
//! - `toolgate_api_upgrades_total` - Plan upgrades

use metrics::counter;
use toolgate_types::Plan;

pub const USAGE_RECORDED_TOTAL: &str = "toolgate_api_usage_recorded_total";
pub const LIMIT_REJECTIONS_TOTAL: &str = "toolgate_api_limit_rejections_total";
pub const UPGRADES_TOTAL: &str = "toolgate_api_upgrades_total";

pub fn record_usage(plan: Plan) {
    counter!(USAGE_RECORDED_TOTAL, "plan" => plan.as_str()).increment(1);
}

pub fn record_limit_rejection() {
    counter!(LIMIT_REJECTIONS_TOTAL).increment(1);
}

pub fn record_upgrade() {
    counter!(UPGRADES_TOTAL).increment(1);
}

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    metrics::describe_counter!(USAGE_RECORDED_TOTAL, "Accepted tool uses by plan");
    metrics::describe_counter!(
        LIMIT_REJECTIONS_TOTAL,
        "Tool uses rejected because the free limit was reached"
    );
    metrics::describe_counter!(UPGRADES_TOTAL, "Accounts moved to the pro plan");
}
