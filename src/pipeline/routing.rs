//! Verdict → destination routing.

use crate::config::BucketConfig;

use super::types::{ClassificationTag, ClassificationVerdict, RoutingDecision};

/// Routes verdicts to one of the two configured destination buckets.
#[derive(Debug, Clone)]
pub struct BucketRouter {
    buckets: BucketConfig,
}

impl BucketRouter {
    pub fn new(buckets: BucketConfig) -> Self {
        Self { buckets }
    }

    /// Total over verdicts. Sensitive data always wins; the legal flag only
    /// drives the legal hold on the source, never the bucket.
    pub fn route(&self, verdict: &ClassificationVerdict) -> RoutingDecision {
        if verdict.has_sensitive_data {
            RoutingDecision {
                destination_bucket: self.buckets.sensitive.clone(),
                classification: ClassificationTag::Sensitive,
            }
        } else {
            RoutingDecision {
                destination_bucket: self.buckets.anonymized.clone(),
                classification: ClassificationTag::Anonymized,
            }
        }
    }
}
