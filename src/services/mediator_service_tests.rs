// src/services/mediator_service_tests.rs
//
// UNIT TESTS: Query Mediator
//
// PROPERTIES TESTED:
// - Identical searches within TTL hit the cache: one adapter call
// - refresh_cache() always forces a fresh fan-out
// - A down source degrades the result, it never fails the request
// - Limit truncation is per source
// - Concurrent identical cold-cache searches fan out exactly once

#[cfg(test)]
mod mediator_tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::adapters::stub::{ConnectBehavior, StubAdapter};
    use crate::adapters::{MockSourceAdapter, SourceAdapter, SourceKind};
    use crate::application::MediatorConfig;
    use crate::connection::ConnectionManager;
    use crate::domain::{
        CanonicalRecord, ConnectAck, HealthState, SearchField, SearchRequest, StatsFragment,
    };
    use crate::error::{AppError, QueryError};
    use crate::events::{EventBus, SearchExecuted};
    use crate::services::MediatorService;

    fn movie(title: &str, year: i32, genre: &str, rating: f32) -> CanonicalRecord {
        CanonicalRecord::Movie {
            title: title.to_string(),
            year,
            genre: genre.to_string(),
            rating,
            director: "unknown".to_string(),
        }
    }

    fn series(title: &str, genre: &str, rating: f32, network: &str) -> CanonicalRecord {
        CanonicalRecord::Series {
            title: title.to_string(),
            seasons: 2,
            genre: genre.to_string(),
            rating,
            network: network.to_string(),
        }
    }

    fn movie_stub() -> Arc<StubAdapter> {
        Arc::new(
            StubAdapter::new("movies-db", SourceKind::Movies).with_records(vec![
                movie("The Dark Knight", 2008, "Action", 9.0),
                movie("Dark City", 1998, "Sci-Fi", 7.6),
                movie("Dark Waters", 2019, "Drama", 7.5),
                movie("Darkest Hour", 2017, "Drama", 7.4),
                movie("Dark Phoenix", 2019, "Action", 5.7),
                movie("Heat", 1995, "Crime", 8.3),
            ]),
        )
    }

    fn series_stub() -> Arc<StubAdapter> {
        Arc::new(
            StubAdapter::new("series-db", SourceKind::Series).with_records(vec![
                series("Dark", "Mystery", 8.7, "Netflix"),
                series("Dark Matter", "Sci-Fi", 7.5, "Apple TV+"),
            ]),
        )
    }

    fn build_mediator(
        adapters: Vec<Arc<StubAdapter>>,
        config: MediatorConfig,
    ) -> (Arc<MediatorService>, EventBus) {
        let bus = EventBus::new();
        let dyn_adapters: Vec<Arc<dyn SourceAdapter>> = adapters
            .into_iter()
            .map(|a| a as Arc<dyn SourceAdapter>)
            .collect();
        let connections = Arc::new(ConnectionManager::new(
            dyn_adapters,
            config.clone(),
            bus.clone(),
        ));
        (
            Arc::new(MediatorService::new(connections, config, bus.clone())),
            bus,
        )
    }

    fn request(term: &str) -> SearchRequest {
        SearchRequest::new(term, SearchField::Title)
    }

    #[tokio::test]
    async fn test_repeated_search_hits_cache() {
        let movies = movie_stub();
        let (mediator, _) = build_mediator(vec![Arc::clone(&movies)], MediatorConfig::default());
        mediator.initialize().await;

        let first = mediator.search(&request("dark")).await.unwrap();
        let second = mediator.search(&request("dark")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(movies.search_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_cache_forces_fresh_fanout() {
        let movies = movie_stub();
        let (mediator, _) = build_mediator(vec![Arc::clone(&movies)], MediatorConfig::default());
        mediator.initialize().await;

        mediator.search(&request("dark")).await.unwrap();
        mediator.refresh_cache();
        mediator.search(&request("dark")).await.unwrap();

        assert_eq!(movies.search_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_down_source_is_skipped_not_fatal() {
        // movies-db connects; series-db times out at bootstrap.
        let movies = movie_stub();
        let series =
            Arc::new(series_stub_down());
        let (mediator, _) = build_mediator(
            vec![Arc::clone(&movies), Arc::clone(&series)],
            MediatorConfig {
                connect_timeout_ms: 100,
                ..MediatorConfig::default()
            },
        );

        assert_eq!(mediator.initialize().await, 1);

        let result = mediator.search(&request("dark")).await.unwrap();
        assert_eq!(result.sources_queried, 1);
        assert_eq!(result.sources_succeeded, 1);
        assert!(result.by_source.contains_key("movies-db"));
        assert!(!result.by_source.contains_key("series-db"));
        assert_eq!(series.search_calls.load(Ordering::SeqCst), 0);
    }

    fn series_stub_down() -> StubAdapter {
        StubAdapter::new("series-db", SourceKind::Series)
            .with_connect_behavior(ConnectBehavior::Hang)
    }

    #[tokio::test]
    async fn test_mid_query_failure_degrades_that_source_only() {
        let movies = movie_stub();
        let series = series_stub();
        let (mediator, _) = build_mediator(
            vec![Arc::clone(&movies), Arc::clone(&series)],
            MediatorConfig::default(),
        );
        assert_eq!(mediator.initialize().await, 2);

        series.set_search_failure(Some(QueryError::Malformed("corrupt page".to_string())));

        let result = mediator.search(&request("dark")).await.unwrap();
        assert_eq!(result.sources_queried, 2);
        assert_eq!(result.sources_succeeded, 1);
        assert!(result.by_source.contains_key("movies-db"));
        assert!(!result.by_source.contains_key("series-db"));
        assert!(result.errors["series-db"].contains("unmappable"));
    }

    #[tokio::test]
    async fn test_limit_is_applied_per_source() {
        let movies = movie_stub();
        let series = series_stub();
        let (mediator, _) = build_mediator(
            vec![Arc::clone(&movies), Arc::clone(&series)],
            MediatorConfig::default(),
        );
        mediator.initialize().await;

        let mut req = request("dark");
        req.limit = 2;
        let result = mediator.search(&req).await.unwrap();

        // movies-db matches 5 "dark" titles, series-db matches 2; each
        // source is cut to 2 independently.
        assert_eq!(result.by_source["movies-db"].len(), 2);
        assert_eq!(result.by_source["series-db"].len(), 2);
        assert_eq!(result.total_count, 4);
    }

    #[tokio::test]
    async fn test_limit_variants_share_one_fanout() {
        let movies = movie_stub();
        let (mediator, _) = build_mediator(vec![Arc::clone(&movies)], MediatorConfig::default());
        mediator.initialize().await;

        let mut small = request("dark");
        small.limit = 2;
        let mut large = request("dark");
        large.limit = 50;

        let first = mediator.search(&small).await.unwrap();
        let second = mediator.search(&large).await.unwrap();

        assert_eq!(first.by_source["movies-db"].len(), 2);
        assert_eq!(second.by_source["movies-db"].len(), 5);
        assert_eq!(movies.search_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_include_flags_restrict_fanout() {
        let movies = movie_stub();
        let series = series_stub();
        let (mediator, _) = build_mediator(
            vec![Arc::clone(&movies), Arc::clone(&series)],
            MediatorConfig::default(),
        );
        mediator.initialize().await;

        let mut req = request("dark");
        req.include_series = false;
        let result = mediator.search(&req).await.unwrap();

        assert_eq!(result.sources_queried, 1);
        assert!(!result.by_source.contains_key("series-db"));
        assert_eq!(series.search_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_post_merge_filters() {
        let movies = movie_stub();
        let series = series_stub();
        let (mediator, _) = build_mediator(
            vec![Arc::clone(&movies), Arc::clone(&series)],
            MediatorConfig::default(),
        );
        mediator.initialize().await;

        let mut req = request("dark");
        req.min_rating = 7.5;
        req.year_range = (1998, 2019);
        let result = mediator.search(&req).await.unwrap();

        // The Dark Knight (2008, 9.0) excluded? No: within range and rating.
        // Excluded: Darkest Hour (7.4), Dark Phoenix (5.7).
        let movie_titles: Vec<_> = result.by_source["movies-db"]
            .iter()
            .map(|r| r.title().to_string())
            .collect();
        assert!(movie_titles.contains(&"The Dark Knight".to_string()));
        assert!(movie_titles.contains(&"Dark Waters".to_string()));
        assert!(!movie_titles.contains(&"Darkest Hour".to_string()));
        assert!(!movie_titles.contains(&"Dark Phoenix".to_string()));

        // Series carry no year; both pass the year range, both rate >= 7.5.
        assert_eq!(result.by_source["series-db"].len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_request_is_the_only_hard_failure() {
        let (mediator, _) = build_mediator(vec![movie_stub()], MediatorConfig::default());
        mediator.initialize().await;

        let err = mediator.search(&request("   ")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let mut inverted = request("dark");
        inverted.year_range = (2024, 2000);
        assert!(mediator.search(&inverted).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_cold_cache_searches_fan_out_once() {
        let movies = Arc::new(
            StubAdapter::new("movies-db", SourceKind::Movies)
                .with_records(vec![movie("Dark City", 1998, "Sci-Fi", 7.6)])
                .with_search_delay(Duration::from_millis(30)),
        );
        let (mediator, _) = build_mediator(vec![Arc::clone(&movies)], MediatorConfig::default());
        mediator.initialize().await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let mediator = Arc::clone(&mediator);
            handles.push(tokio::spawn(async move {
                mediator.search(&request("dark")).await.unwrap()
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(movies.search_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_straggler_is_cut_off_with_partial_result() {
        let movies = movie_stub();
        let series = Arc::new(
            StubAdapter::new("series-db", SourceKind::Series)
                .with_records(vec![series("Dark", "Mystery", 8.7, "Netflix")])
                .with_search_delay(Duration::from_secs(30)),
        );
        let (mediator, _) = build_mediator(
            vec![Arc::clone(&movies), Arc::clone(&series)],
            MediatorConfig::default(),
        );
        mediator.initialize().await;

        let result = mediator.search(&request("dark")).await.unwrap();
        assert_eq!(result.sources_queried, 2);
        assert_eq!(result.sources_succeeded, 1);
        assert!(result.by_source.contains_key("movies-db"));
        assert_eq!(
            result.errors["series-db"],
            QueryError::Timeout.to_string()
        );
    }

    #[tokio::test]
    async fn test_stats_aggregates_per_kind_and_caches() {
        let movies = Arc::new(
            StubAdapter::new("movies-db", SourceKind::Movies).with_stats(StatsFragment::Movies {
                total_titles: 1200,
                average_rating: 6.4,
                distinct_directors: 451,
            }),
        );
        let series = Arc::new(
            StubAdapter::new("series-db", SourceKind::Series).with_stats(StatsFragment::Series {
                total_titles: 300,
                average_rating: 7.1,
                total_seasons: 900,
            }),
        );
        let (mediator, _) = build_mediator(
            vec![Arc::clone(&movies), Arc::clone(&series)],
            MediatorConfig::default(),
        );
        mediator.initialize().await;

        let report = mediator.stats().await.unwrap();
        assert_eq!(report.sources_queried, 2);
        assert_eq!(report.sources_succeeded, 2);
        assert_eq!(report.movies.as_ref().unwrap().total_titles(), 1200);
        assert_eq!(report.series.as_ref().unwrap().total_titles(), 300);

        mediator.stats().await.unwrap();
        assert_eq!(movies.stats_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_health_check_is_cached_within_ttl() {
        let movies = movie_stub();
        let (mediator, _) = build_mediator(vec![Arc::clone(&movies)], MediatorConfig::default());
        mediator.initialize().await;

        let report = mediator.health_check().await.unwrap();
        assert_eq!(report["movies-db"].status, HealthState::Connected);

        mediator.health_check().await.unwrap();
        assert_eq!(movies.ping_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_search_executed_event_only_on_real_fanout() {
        let movies = movie_stub();
        let (mediator, bus) = build_mediator(vec![movies], MediatorConfig::default());
        mediator.initialize().await;

        let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        bus.subscribe::<SearchExecuted, _>(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        mediator.search(&request("dark")).await.unwrap();
        mediator.search(&request("dark")).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    // Mediator fan-out against a mocked adapter: merge of two same-kind
    // sources must be record-count-weighted.
    #[tokio::test]
    async fn test_stats_merges_two_sources_of_one_kind() {
        let mut mock_a = MockSourceAdapter::new();
        mock_a.expect_name().return_const("movies-a".to_string());
        mock_a.expect_kind().return_const(SourceKind::Movies);
        mock_a.expect_host().return_const("a.internal".to_string());
        mock_a.expect_connect().returning(|| {
            Ok(ConnectAck {
                protocol_version: "movies/1".to_string(),
            })
        });
        mock_a.expect_stats().returning(|| {
            Ok(StatsFragment::Movies {
                total_titles: 900,
                average_rating: 6.0,
                distinct_directors: 300,
            })
        });

        let mut mock_b = MockSourceAdapter::new();
        mock_b.expect_name().return_const("movies-b".to_string());
        mock_b.expect_kind().return_const(SourceKind::Movies);
        mock_b.expect_host().return_const("b.internal".to_string());
        mock_b.expect_connect().returning(|| {
            Ok(ConnectAck {
                protocol_version: "movies/1".to_string(),
            })
        });
        mock_b.expect_stats().returning(|| {
            Ok(StatsFragment::Movies {
                total_titles: 100,
                average_rating: 9.0,
                distinct_directors: 40,
            })
        });

        let bus = EventBus::new();
        let connections = Arc::new(ConnectionManager::new(
            vec![
                Arc::new(mock_a) as Arc<dyn SourceAdapter>,
                Arc::new(mock_b) as Arc<dyn SourceAdapter>,
            ],
            MediatorConfig::default(),
            bus.clone(),
        ));
        let mediator = MediatorService::new(connections, MediatorConfig::default(), bus);
        assert_eq!(mediator.initialize().await, 2);

        let report = mediator.stats().await.unwrap();
        match report.movies.unwrap() {
            StatsFragment::Movies {
                total_titles,
                average_rating,
                distinct_directors,
            } => {
                assert_eq!(total_titles, 1000);
                assert_eq!(distinct_directors, 340);
                assert!((average_rating - 6.3).abs() < 1e-4);
            }
            _ => panic!("movie stats merged into a series fragment"),
        }
        assert!(report.series.is_none());
    }
}
