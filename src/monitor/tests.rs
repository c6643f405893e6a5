//! Tests for monitor module

#[cfg(test)]
mod tests {
    use super::super::{
        PairQuoteTask, PairSnapshot, PollState, Poller, PollerConfig, PoolMetricsTask,
    };
    use crate::client::mock::{pair_attributes, MockReply, ScriptedPoolSource};
    use crate::error::WidgetError;
    use crate::monitor::Observation;
    use crate::normalize::normalize;
    use crate::types::{CrossRatePrice, NormalizedPoolMetrics, Trend};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;
    use tokio::time::{sleep, timeout, Instant};

    const POOL: &str = "0xda021b3d91f82bf2bcfc1a8709545c3a643d47de";

    fn coin(usd: f64) -> crate::types::RawPoolAttributes {
        pair_attributes("COIN / WRON", usd, 1.0)
    }

    fn pair_poller(source: &Arc<ScriptedPoolSource>, config: PollerConfig) -> Poller<PairSnapshot> {
        let task = PairQuoteTask::new(source.clone(), POOL, "COIN");
        Poller::spawn("COIN / WRON", task, config)
    }

    async fn wait_cycles<T: Observation>(
        rx: &mut watch::Receiver<PollState<T>>,
        n: u64,
    ) -> PollState<T> {
        timeout(Duration::from_secs(3600), rx.wait_for(|s| s.cycles() >= n))
            .await
            .expect("poller stalled")
            .expect("poller stopped")
            .clone()
    }

    fn subject(state: &PollState<PairSnapshot>) -> f64 {
        state.value.expect("no value yet").price.subject_usd
    }

    fn snapshot(subject_usd: f64, cross_rate: f64) -> PairSnapshot {
        PairSnapshot::new(CrossRatePrice {
            base_usd: subject_usd,
            quote_usd: 1.0,
            subject_usd,
            counter_usd: 1.0,
            cross_rate,
        })
    }

    #[test]
    fn test_poll_state_default() {
        let state: PollState<PairSnapshot> = PollState::default();
        assert!(state.value.is_none());
        assert!(!state.loading);
        assert!(state.last_error.is_none());
        assert_eq!(state.cycles(), 0);
    }

    #[test]
    fn test_poll_state_drops_stale() {
        let mut state = PollState::default();
        assert!(state.apply(2, Ok(snapshot(20.0, 20.0))));
        assert!(!state.apply(1, Ok(snapshot(10.0, 10.0))));
        assert_eq!(subject(&state), 20.0);
        assert_eq!(state.cycles(), 2);
    }

    #[test]
    fn test_poll_state_error_keeps_value() {
        let mut state = PollState::default();
        state.apply(1, Ok(snapshot(10.0, 10.0)));
        state.apply(2, Err(WidgetError::UpstreamUnavailable("Upstream 503".into())));

        assert_eq!(subject(&state), 10.0);
        assert!(state.last_error.as_deref().unwrap().contains("503"));
    }

    #[test]
    fn test_pair_snapshot_trends() {
        let mut state = PollState::default();

        state.apply(1, Ok(snapshot(10.0, 10.0)));
        assert_eq!(state.value.unwrap().usd_trend, Trend::Flat);

        state.apply(2, Ok(snapshot(10.0, 10.0)));
        assert_eq!(state.value.unwrap().usd_trend, Trend::Flat);

        state.apply(3, Ok(snapshot(12.0, 9.0)));
        assert_eq!(state.value.unwrap().usd_trend, Trend::Up);
        assert_eq!(state.value.unwrap().rate_trend, Trend::Down);

        state.apply(4, Ok(snapshot(9.0, 9.0)));
        assert_eq!(state.value.unwrap().usd_trend, Trend::Down);
        assert_eq!(state.value.unwrap().rate_trend, Trend::Flat);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_fetch_then_interval() {
        let source = Arc::new(ScriptedPoolSource::new().always(coin(2.0)));
        let start = Instant::now();
        let poller = pair_poller(&source, PollerConfig::every(Duration::from_secs(60)));
        let mut rx = poller.subscribe();

        let first = wait_cycles(&mut rx, 1).await;
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(subject(&first), 2.0);
        assert!(!first.loading);
        assert!(first.updated_at.is_some());
        assert_eq!(source.calls(), 1);

        wait_cycles(&mut rx, 2).await;
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(source.calls(), 2);
        assert_eq!(source.requested(), vec![POOL.to_string(), POOL.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trend_across_cycles() {
        let source = Arc::new(
            ScriptedPoolSource::new()
                .then(coin(10.0))
                .then(coin(12.0))
                .then(coin(9.0))
                .always(coin(9.0)),
        );
        let poller = pair_poller(&source, PollerConfig::every(Duration::from_secs(60)));
        let mut rx = poller.subscribe();

        let state = wait_cycles(&mut rx, 1).await;
        assert_eq!(state.value.unwrap().usd_trend, Trend::Flat);

        let state = wait_cycles(&mut rx, 2).await;
        assert_eq!(state.value.unwrap().usd_trend, Trend::Up);
        assert_eq!(state.value.unwrap().rate_trend, Trend::Up);

        let state = wait_cycles(&mut rx, 3).await;
        assert_eq!(state.value.unwrap().usd_trend, Trend::Down);

        let state = wait_cycles(&mut rx, 4).await;
        assert_eq!(state.value.unwrap().usd_trend, Trend::Flat);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_retains_previous_value() {
        let source = Arc::new(
            ScriptedPoolSource::new()
                .then(coin(10.0))
                .then_status(503)
                .always(coin(11.0)),
        );
        let poller = pair_poller(&source, PollerConfig::every(Duration::from_secs(30)));
        let mut rx = poller.subscribe();

        let state = wait_cycles(&mut rx, 1).await;
        assert!(state.last_error.is_none());

        let state = wait_cycles(&mut rx, 2).await;
        assert_eq!(subject(&state), 10.0);
        assert!(state.last_error.as_deref().unwrap().contains("Upstream 503"));
        assert!(!state.loading);

        let state = wait_cycles(&mut rx, 3).await;
        assert_eq!(subject(&state), 11.0);
        assert!(state.last_error.is_none());
        assert_eq!(state.value.unwrap().usd_trend, Trend::Up);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_prices_reported_not_fatal() {
        let source = Arc::new(
            ScriptedPoolSource::new()
                .then(pair_attributes("", f64::NAN, f64::NAN))
                .always(coin(3.0)),
        );
        let poller = pair_poller(&source, PollerConfig::every(Duration::from_secs(60)));
        let mut rx = poller.subscribe();

        let state = wait_cycles(&mut rx, 1).await;
        assert!(state.value.is_none());
        assert!(state.last_error.is_some());

        let state = wait_cycles(&mut rx, 2).await;
        assert_eq!(subject(&state), 3.0);
        assert!(poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_band_refresh() {
        let source = Arc::new(ScriptedPoolSource::new().always(coin(2.0)));
        let poller = pair_poller(&source, PollerConfig::every(Duration::from_secs(60)));
        let mut rx = poller.subscribe();

        wait_cycles(&mut rx, 1).await;
        let start = Instant::now();
        poller.refresh();
        wait_cycles(&mut rx, 2).await;

        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_does_not_overwrite_newer() {
        let source = Arc::new(
            ScriptedPoolSource::new()
                .then_after(Duration::from_secs(5), MockReply::Attributes(coin(10.0)))
                .then(coin(20.0))
                .always(coin(30.0)),
        );
        let poller = pair_poller(&source, PollerConfig::every(Duration::from_secs(60)));
        let mut rx = poller.subscribe();

        rx.wait_for(|s| s.loading).await.unwrap();
        poller.refresh();

        let state = wait_cycles(&mut rx, 2).await;
        assert_eq!(subject(&state), 20.0);

        // Slow first response lands at t=5s
        sleep(Duration::from_secs(10)).await;

        let state = poller.snapshot();
        assert_eq!(subject(&state), 20.0);
        assert_eq!(state.cycles(), 2);
        assert!(!state.loading);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_skipped_while_fetch_in_flight() {
        let source = Arc::new(
            ScriptedPoolSource::new()
                .then_after(Duration::from_secs(90), MockReply::Attributes(coin(10.0)))
                .always(coin(11.0)),
        );
        let poller = pair_poller(&source, PollerConfig::every(Duration::from_secs(60)));
        let mut rx = poller.subscribe();

        sleep(Duration::from_secs(100)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(poller.snapshot().cycles(), 1);

        let state = wait_cycles(&mut rx, 2).await;
        assert_eq!(subject(&state), 11.0);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_kick_fetch_after_start() {
        let source = Arc::new(ScriptedPoolSource::new().always(coin(2.0)));
        let config = PollerConfig::every(Duration::from_secs(60)).with_kick(Duration::from_secs(5));
        let _poller = pair_poller(&source, config);

        sleep(Duration::from_secs(6)).await;
        assert_eq!(source.calls(), 2);

        sleep(Duration::from_secs(50)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_polling() {
        let source = Arc::new(ScriptedPoolSource::new().always(coin(2.0)));
        let poller = pair_poller(&source, PollerConfig::every(Duration::from_secs(60)));
        let mut rx = poller.subscribe();

        wait_cycles(&mut rx, 1).await;
        assert!(poller.is_running());
        assert_eq!(poller.name(), "COIN / WRON");
        drop(poller);

        sleep(Duration::from_secs(600)).await;
        assert_eq!(source.calls(), 1);
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_metrics_poller() {
        let attrs = pair_attributes("RONKE / WRON", 0.0004, 0.5);
        let source = Arc::new(ScriptedPoolSource::new().always(attrs.clone()));
        let task = PoolMetricsTask::new(source.clone(), "0x75ae");
        let poller: Poller<NormalizedPoolMetrics> =
            Poller::spawn("RONKE / WRON", task, PollerConfig::every(Duration::from_secs(30)));
        let mut rx = poller.subscribe();

        let state = wait_cycles(&mut rx, 1).await;
        let metrics = state.value.unwrap();
        assert_eq!(metrics, normalize(&attrs));
        assert_eq!(metrics.price_usd, 0.0004);
        assert_eq!(metrics.change_percent_24h, -1.5);

        wait_cycles(&mut rx, 2).await;
        assert_eq!(source.requested()[1], "0x75ae");
    }
}
