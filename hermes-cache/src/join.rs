//! Combined report view.

use hermes_core::{CombinedReport, PostverifiedReport, PreverifiedReport};

/// Left outer join of preverified reports onto their verifications.
///
/// Output order follows `preverified`. Each entry takes the first
/// postverified row whose `report_id` matches; later duplicates are ignored.
pub fn combine(
    preverified: &[PreverifiedReport],
    postverified: &[PostverifiedReport],
) -> Vec<CombinedReport> {
    preverified
        .iter()
        .map(|pre| {
            let partner = postverified
                .iter()
                .find(|post| post.report_id == pre.report_id)
                .cloned();
            CombinedReport::new(pre.clone(), partner)
        })
        .collect()
}
