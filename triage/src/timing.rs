//! Operation timing.
//!
//! Both macros log `operation` and `elapsed_ms` through `tracing::info!` and
//! evaluate to the wrapped expression's value, so `?` still works on the
//! result.
//!
//! ```rust,no_run
//! use quake_triage::measure_time;
//!
//! let entries = measure_time!("gazetteer_load", {
//!     std::fs::read_to_string("gazetteer.json")
//! });
//! ```

/// Measure execution time of a synchronous block
#[macro_export]
macro_rules! measure_time {
    ($label:expr, $block:block) => {{
        let __start = std::time::Instant::now();
        let __result = $block;
        ::tracing::info!(
            operation = $label,
            elapsed_ms = __start.elapsed().as_millis() as u64,
            "Operation completed"
        );
        __result
    }};
}

/// Measure execution time of a future, awaiting it in place
#[macro_export]
macro_rules! measure_time_async {
    ($label:expr, $future:expr) => {{
        let __start = std::time::Instant::now();
        let __result = $future.await;
        ::tracing::info!(
            operation = $label,
            elapsed_ms = __start.elapsed().as_millis() as u64,
            "Operation completed"
        );
        __result
    }};
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    #[test]
    fn measure_time_returns_block_value() {
        let result = measure_time!("sum", { (1..=4).sum::<i32>() });
        assert_eq!(result, 10);
    }

    #[test]
    fn measure_time_propagates_errors() {
        let result: Result<i32, &str> = measure_time!("failing", { Err("boom") });
        assert_eq!(result, Err("boom"));
    }

    #[tokio::test]
    async fn measure_time_async_awaits_future() {
        async fn slow_answer() -> i32 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            42
        }

        let result = measure_time_async!("slow_answer", slow_answer());
        assert_eq!(result, 42);
    }
}
