//! Resource sizing heuristic
//!
//! Sizes a task from the total size of its inputs, but only when every input
//! can be sized. One unsupported URL or failed probe means the defaults.

use relay_core::domain::task::ResourceAllocation;
use tracing::debug;

use crate::config::SizingConfig;
use crate::repository::SizeProbe;

pub async fn size_resources(
    probe: &dyn SizeProbe,
    urls: &[String],
    sizing: &SizingConfig,
) -> ResourceAllocation {
    let mut total_mb: u64 = 0;

    for url in urls {
        match probe.size_mb(url).await {
            Ok(mb) => total_mb = total_mb.saturating_add(mb),
            Err(e) => {
                debug!(url = %url, "Cannot size input, using default resources: {}", e);
                return sizing.defaults();
            }
        }
    }

    if total_mb == 0 {
        return sizing.defaults();
    }

    sizing.for_total_mb(total_mb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_client::{ClientError, Result as ClientResult};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProbe {
        sizes: HashMap<String, u64>,
        calls: AtomicUsize,
    }

    impl FakeProbe {
        fn new(sizes: &[(&str, u64)]) -> Self {
            Self {
                sizes: sizes.iter().map(|(u, s)| (u.to_string(), *s)).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SizeProbe for FakeProbe {
        async fn size_mb(&self, url: &str) -> ClientResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sizes
                .get(url)
                .copied()
                .ok_or_else(|| ClientError::InvalidRequest(format!("unsupported {}", url)))
        }
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_two_inputs_of_128_mb() {
        let probe = FakeProbe::new(&[("s3://a", 128), ("s3://b", 128)]);
        let sizing = SizingConfig::default();

        let allocation = size_resources(&probe, &urls(&["s3://a", "s3://b"]), &sizing).await;

        assert_eq!(allocation.disk_mb, sizing.disk_base_mb + 2 * 256);
        assert_eq!(allocation.memory_mb, sizing.memory_base_mb + 5 * 256);
        assert_eq!(allocation.disk_mb, 2560);
        assert_eq!(allocation.memory_mb, 4352);
    }

    #[tokio::test]
    async fn test_no_inputs_uses_defaults() {
        let probe = FakeProbe::new(&[]);
        let sizing = SizingConfig::default();

        assert_eq!(size_resources(&probe, &[], &sizing).await, sizing.defaults());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_one_unsupported_url_abandons_sizing() {
        let probe = FakeProbe::new(&[("s3://a", 500)]);
        let sizing = SizingConfig::default();

        let allocation =
            size_resources(&probe, &urls(&["https://other/x", "s3://a"]), &sizing).await;

        assert_eq!(allocation, sizing.defaults());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_total_uses_defaults() {
        let probe = FakeProbe::new(&[("s3://empty", 0)]);
        let sizing = SizingConfig::default();

        let allocation = size_resources(&probe, &urls(&["s3://empty"]), &sizing).await;
        assert_eq!(allocation, sizing.defaults());
    }
}
