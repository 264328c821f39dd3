// Property: map_bounded returns results in input order whatever the task
// latencies, and never has more than `limit` tasks running at once.

use catalog_client::map_bounded;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_order_and_concurrency(
        delays in prop::collection::vec(0u64..10, 0..24),
        limit in 0usize..10,
    ) {
        let rt = Runtime::new().unwrap();

        let result: Result<(), TestCaseError> = rt.block_on(async {
            let active = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));

            let items: Vec<(usize, u64)> = delays.iter().copied().enumerate().collect();
            let output = {
                let active = active.clone();
                let peak = peak.clone();
                map_bounded(items, limit, move |(i, ms)| {
                    let active = active.clone();
                    let peak = peak.clone();
                    async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, String>(i * 10)
                    }
                })
                .await
            };

            let expected: Vec<usize> = (0..delays.len()).map(|i| i * 10).collect();
            prop_assert_eq!(output, Ok(expected));
            // a limit of 0 behaves like 1
            prop_assert!(peak.load(Ordering::SeqCst) <= limit.max(1));

            Ok(())
        });

        result?;
    }

    #[test]
    fn prop_error_is_reported(
        len in 1usize..20,
        failing in any::<prop::sample::Index>(),
        limit in 1usize..6,
    ) {
        let rt = Runtime::new().unwrap();
        let bad = failing.index(len);

        let output = rt.block_on(map_bounded((0..len).collect::<Vec<usize>>(), limit, move |i| async move {
            if i == bad {
                Err(format!("item {} failed", i))
            } else {
                Ok(i)
            }
        }));

        prop_assert_eq!(output, Err(format!("item {} failed", bad)));
    }
}
