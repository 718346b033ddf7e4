//! # Integration Tests
//!
//! End-to-end tests across the workspace crates.
//!
//! Covers:
//! - contract shape of warehouse rows
//! - mock e2e runs of the control loop (scripted queue, canned geo answers)
//! - a full HTTP run against a local fake of the queue, Maps and warehouse APIs

#[cfg(test)]
mod contract_tests {
    use contracts::{EnrichedRow, TimezoneInfo};

    #[test]
    fn test_row_uses_warehouse_column_names() {
        let row = EnrichedRow {
            vehicle_id: "V123".into(),
            utc_time: None,
            offset: 0.0,
            address: String::new(),
            zipcode: String::new(),
            speed: "55".into(),
            bearing: "270".into(),
            elevation: None,
            latitude: 32.8,
            longitude: -117.2,
        };

        let json = serde_json::to_value(&row).unwrap();
        let mut columns: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        columns.sort();
        assert_eq!(
            columns,
            vec![
                "Address", "Bearing", "Elevation", "Latitude", "Longitude", "Offset", "Speed",
                "UTCTime", "VehicleID", "Zipcode"
            ]
        );
        assert!(json["UTCTime"].is_null());
        assert!(json["Elevation"].is_null());
    }

    #[test]
    fn test_offset_without_raw_offset_is_absent() {
        let info = TimezoneInfo {
            raw_offset: None,
            dst_offset: Some(3600.0),
            time_zone_id: None,
        };
        assert_eq!(info.effective_offset(), None);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use consumer::{ControlLoop, LoopState, LoopStats};
    use contracts::{
        ConsumerSettings, ContractError, ElevationSample, EnrichedRow, GeoProvider,
        GeocodeCandidate, ReceivedMessage, TimezoneInfo,
    };
    use enrichment::{Enricher, MockGeoConfig, MockGeoProvider};
    use ingestion::{MockMessageSource, MockSourceHandle};
    use tokio_util::sync::CancellationToken;
    use warehouse::MemorySink;

    fn message(ack_id: &str, payload: &str) -> ReceivedMessage {
        ReceivedMessage::new(ack_id, payload.to_string(), "2010-01-01 08:15:00")
    }

    fn batch(prefix: &str, n: usize) -> Vec<ReceivedMessage> {
        (0..n)
            .map(|i| {
                message(
                    &format!("{prefix}{i}"),
                    &format!("V{i},32.8,-117.2,55,270"),
                )
            })
            .collect()
    }

    fn settings(quota_limit: u32, ack_skipped: bool) -> ConsumerSettings {
        ConsumerSettings {
            batch_size: 100,
            quota_limit,
            cooldown_secs: 0,
            ack_skipped,
        }
    }

    /// Run the loop over a scripted source until every batch was handled
    async fn run_to_drain<P: GeoProvider>(
        source: MockMessageSource,
        provider: P,
        sink: MemorySink,
        settings: &ConsumerSettings,
    ) -> (LoopStats, MockSourceHandle) {
        let mut handle = source.handle();
        let inspect = source.handle();
        let mut control = ControlLoop::new(source, Enricher::new(provider), sink, settings);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            handle.drained().await;
            trigger.cancel();
        });

        let stats = tokio::time::timeout(Duration::from_secs(10), control.run(cancel))
            .await
            .expect("control loop did not stop")
            .unwrap();
        assert_eq!(control.state(), LoopState::Stopped);
        (stats, inspect)
    }

    fn is_default_row(row: &EnrichedRow) -> bool {
        row.address.is_empty()
            && row.zipcode.is_empty()
            && row.elevation.is_none()
            && row.offset == 0.0
            && row.utc_time.is_none()
    }

    #[tokio::test]
    async fn test_quota_enriches_exactly_k_of_n() {
        let source = MockMessageSource::new(vec![batch("a", 7)]);
        let sink = MemorySink::new("memory");

        let (stats, handle) =
            run_to_drain(source, MockGeoProvider::san_diego(), sink.clone(), &settings(3, true))
                .await;

        let rows = sink.rows();
        assert_eq!(rows.len(), 7);
        assert!(rows[..3].iter().all(|r| !r.address.is_empty() && r.zipcode == "92101"));
        assert!(rows[3..].iter().all(is_default_row));

        let acked = handle.acknowledged();
        assert_eq!(acked.len(), 7);
        assert_eq!(acked, (0..7).map(|i| format!("a{i}")).collect::<Vec<_>>());

        assert_eq!(stats.enriched, 3);
        assert_eq!(stats.skipped, 4);
        assert_eq!(stats.cooldowns, 1);
    }

    #[tokio::test]
    async fn test_one_ack_per_cycle_with_full_handle_set() {
        let mut second = batch("b", 2);
        second.push(message("b-bad", "V9,not-a-number,-117.2,55,270"));
        let source = MockMessageSource::new(vec![batch("a", 3), second]);

        let (stats, handle) = run_to_drain(
            source,
            MockGeoProvider::san_diego(),
            MemorySink::new("memory"),
            &settings(2, true),
        )
        .await;

        assert_eq!(
            handle.ack_calls(),
            vec![
                vec!["a0".to_string(), "a1".to_string(), "a2".to_string()],
                vec!["b0".to_string(), "b1".to_string(), "b-bad".to_string()],
            ]
        );
        assert_eq!(stats.ack_calls, 2);
        assert_eq!(stats.malformed, 1);
    }

    #[tokio::test]
    async fn test_quota_resets_between_batches() {
        let source = MockMessageSource::new(vec![batch("a", 3), batch("b", 3)]);
        let sink = MemorySink::new("memory");

        let (stats, _) =
            run_to_drain(source, MockGeoProvider::san_diego(), sink.clone(), &settings(2, true))
                .await;

        let enriched: Vec<bool> = sink.rows().iter().map(|r| !r.address.is_empty()).collect();
        assert_eq!(enriched, vec![true, true, false, true, true, false]);
        assert_eq!(stats.cooldowns, 2);
    }

    #[tokio::test]
    async fn test_enriched_row_for_v123() {
        let source = MockMessageSource::new(vec![vec![message("h1", "V123,32.8,-117.2,55,270")]]);
        let sink = MemorySink::new("memory");

        run_to_drain(source, MockGeoProvider::san_diego(), sink.clone(), &settings(10, true)).await;

        let rows = sink.rows();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.vehicle_id, "V123");
        assert_eq!(row.latitude, 32.8);
        assert_eq!(row.longitude, -117.2);
        assert_eq!(row.speed, "55");
        assert_eq!(row.bearing, "270");
        assert!(!row.address.is_empty());
        assert_eq!(row.elevation, Some(19.5));
        assert_eq!(row.offset, -28800.0);
        assert_eq!(row.utc_time.as_deref(), Some("2010-01-01 08:15:00"));
    }

    #[tokio::test]
    async fn test_skipped_row_for_v123_is_still_acknowledged() {
        let source = MockMessageSource::new(vec![vec![message("h1", "V123,32.8,-117.2,55,270")]]);
        let sink = MemorySink::new("memory");
        let provider = MockGeoProvider::san_diego();

        let (_, handle) =
            run_to_drain(source, provider.clone(), sink.clone(), &settings(0, true)).await;

        let rows = sink.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vehicle_id, "V123");
        assert!(is_default_row(&rows[0]));
        assert_eq!(handle.acknowledged(), vec!["h1".to_string()]);
        assert_eq!(provider.calls().geocode, 0);
    }

    #[tokio::test]
    async fn test_unacked_skips_are_left_for_redelivery() {
        let source = MockMessageSource::new(vec![batch("a", 4)]);
        let sink = MemorySink::new("memory");

        let (stats, handle) =
            run_to_drain(source, MockGeoProvider::san_diego(), sink.clone(), &settings(1, false))
                .await;

        assert_eq!(sink.rows().len(), 1);
        assert_eq!(handle.ack_calls(), vec![vec!["a0".to_string()]]);
        assert_eq!(stats.left_unacked, 3);
    }

    #[tokio::test]
    async fn test_malformed_message_is_acked_without_row_or_quota() {
        let source = MockMessageSource::new(vec![vec![
            message("bad", "V1,north,-117.2,55,270"),
            message("short", "V2,32.8"),
            message("good", "V3,32.8,-117.2,55,270"),
        ]]);
        let sink = MemorySink::new("memory");

        let (stats, handle) =
            run_to_drain(source, MockGeoProvider::san_diego(), sink.clone(), &settings(1, true))
                .await;

        let rows = sink.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vehicle_id, "V3");
        assert!(!rows[0].address.is_empty());
        assert_eq!(handle.acknowledged().len(), 3);
        assert_eq!(stats.malformed, 2);
    }

    #[tokio::test]
    async fn test_unusual_but_numeric_payloads_are_written() {
        let source = MockMessageSource::new(vec![vec![
            message("lat", "V1,91.0,-117.2,55,270"),
            message("anon", ",32.8,-117.2,55,270"),
        ]]);
        let sink = MemorySink::new("memory");

        let (stats, handle) =
            run_to_drain(source, MockGeoProvider::san_diego(), sink.clone(), &settings(10, true))
                .await;

        let rows = sink.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].vehicle_id, "V1");
        assert_eq!(rows[0].latitude, 91.0);
        assert_eq!(rows[1].vehicle_id, "");
        assert_eq!(stats.rows_written, 2);
        assert_eq!(stats.malformed, 0);
        assert_eq!(handle.acknowledged().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_lookup_defaults_only_that_field() {
        let provider = MockGeoProvider::with_config(MockGeoConfig {
            fail_elevation: true,
            ..MockGeoConfig::san_diego()
        });
        let source = MockMessageSource::new(vec![vec![message("h1", "V1,32.8,-117.2,55,270")]]);
        let sink = MemorySink::new("memory");

        let (stats, handle) = run_to_drain(source, provider, sink.clone(), &settings(5, true)).await;

        let row = &sink.rows()[0];
        assert_eq!(row.zipcode, "92101");
        assert_eq!(row.elevation, None);
        assert_eq!(row.offset, -28800.0);
        assert_eq!(stats.partially_enriched, 1);
        assert_eq!(handle.acknowledged(), vec!["h1".to_string()]);
    }

    #[tokio::test]
    async fn test_offset_adds_dst_and_defaults_without_raw() {
        let summer = MockGeoProvider::with_config(MockGeoConfig {
            timezone: TimezoneInfo {
                raw_offset: Some(-28800.0),
                dst_offset: Some(3600.0),
                time_zone_id: Some("America/Los_Angeles".into()),
            },
            ..MockGeoConfig::san_diego()
        });
        let sink = MemorySink::new("memory");
        run_to_drain(
            MockMessageSource::new(vec![batch("a", 1)]),
            summer,
            sink.clone(),
            &settings(5, true),
        )
        .await;
        assert_eq!(sink.rows()[0].offset, -25200.0);

        let no_raw = MockGeoProvider::with_config(MockGeoConfig {
            timezone: TimezoneInfo {
                raw_offset: None,
                dst_offset: Some(3600.0),
                time_zone_id: None,
            },
            ..MockGeoConfig::san_diego()
        });
        let sink = MemorySink::new("memory");
        run_to_drain(
            MockMessageSource::new(vec![batch("a", 1)]),
            no_raw,
            sink.clone(),
            &settings(5, true),
        )
        .await;
        assert_eq!(sink.rows()[0].offset, 0.0);
    }

    #[tokio::test]
    async fn test_postal_code_from_later_candidate() {
        let provider = MockGeoProvider::with_config(MockGeoConfig {
            candidates: vec![
                GeocodeCandidate {
                    formatted_address: "Balboa Park, San Diego, CA, USA".into(),
                    address_components: vec![],
                },
                serde_json::from_value(serde_json::json!({
                    "formatted_address": "San Diego, CA 92101, USA",
                    "address_components": [
                        {"long_name": "92101-1234", "short_name": "92101", "types": ["postal_code"]},
                        {"long_name": "92102", "short_name": "92102", "types": ["postal_code"]}
                    ]
                }))
                .unwrap(),
            ],
            ..MockGeoConfig::san_diego()
        });
        let sink = MemorySink::new("memory");

        run_to_drain(
            MockMessageSource::new(vec![batch("a", 1)]),
            provider,
            sink.clone(),
            &settings(5, true),
        )
        .await;

        let row = &sink.rows()[0];
        assert_eq!(row.address, "Balboa Park, San Diego, CA, USA");
        assert_eq!(row.zipcode, "92101-1234");
    }

    /// Cancels the token from inside the first geocode lookup
    #[derive(Clone)]
    struct CancelOnFirstLookup {
        inner: MockGeoProvider,
        cancel: CancellationToken,
    }

    impl GeoProvider for CancelOnFirstLookup {
        async fn reverse_geocode(
            &self,
            latitude: f64,
            longitude: f64,
        ) -> Result<Vec<GeocodeCandidate>, ContractError> {
            self.cancel.cancel();
            self.inner.reverse_geocode(latitude, longitude).await
        }

        async fn elevation(
            &self,
            latitude: f64,
            longitude: f64,
        ) -> Result<Vec<ElevationSample>, ContractError> {
            self.inner.elevation(latitude, longitude).await
        }

        async fn timezone(
            &self,
            latitude: f64,
            longitude: f64,
            at: chrono::DateTime<chrono::Utc>,
        ) -> Result<TimezoneInfo, ContractError> {
            self.inner.timezone(latitude, longitude, at).await
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_finishes_and_acks_it() {
        let source = MockMessageSource::new(vec![batch("a", 3), batch("b", 3)]);
        let handle = source.handle();
        let sink = MemorySink::new("memory");
        let cancel = CancellationToken::new();
        let provider = CancelOnFirstLookup {
            inner: MockGeoProvider::san_diego(),
            cancel: cancel.clone(),
        };
        let mut control =
            ControlLoop::new(source, Enricher::new(provider), sink.clone(), &settings(10, true));

        let stats = control.run(cancel).await.unwrap();

        assert_eq!(control.state(), LoopState::Stopped);
        assert_eq!(handle.pull_calls(), 1);
        assert_eq!(handle.remaining_batches(), 1);
        assert_eq!(
            handle.ack_calls(),
            vec![vec!["a0".to_string(), "a1".to_string(), "a2".to_string()]]
        );
        assert_eq!(sink.rows().len(), 3);
        assert_eq!(stats.enriched, 3);
    }

    #[tokio::test]
    async fn test_cancel_during_cooldown_stops_promptly() {
        let source = MockMessageSource::new(vec![batch("a", 2), batch("b", 2)]);
        let handle = source.handle();
        let cancel = CancellationToken::new();
        let mut control = ControlLoop::new(
            source,
            Enricher::new(MockGeoProvider::san_diego()),
            MemorySink::new("memory"),
            &ConsumerSettings {
                cooldown_secs: 3600,
                ..settings(1, true)
            },
        );

        let trigger = cancel.clone();
        let inspect = handle.clone();
        tokio::spawn(async move {
            while inspect.ack_calls().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            trigger.cancel();
        });

        let stats = tokio::time::timeout(Duration::from_secs(10), control.run(cancel))
            .await
            .expect("cooldown was not interrupted")
            .unwrap();

        assert_eq!(handle.pull_calls(), 1);
        assert_eq!(stats.cooldowns, 0);
        assert_eq!(control.quota().used(), 1);
    }
}

#[cfg(test)]
mod http_e2e_tests {
    //! Full run over HTTP against the fake queue, Maps and warehouse endpoints.

    use std::time::Duration;

    use base64::Engine;
    use consumer::ControlLoop;
    use contracts::{ConsumerSettings, GeoConfig, QueueConfig, RetryPolicy, WarehouseConfig};
    use enrichment::{Enricher, MapsClient};
    use fake_cloud::{FakeCloud, Route};
    use ingestion::PubSubSource;
    use tokio_util::sync::CancellationToken;
    use warehouse::BigQuerySink;

    fn pull_body() -> String {
        let encode = |s: &str| base64::engine::general_purpose::STANDARD.encode(s);
        serde_json::json!({
            "receivedMessages": [
                {
                    "ackId": "ack-1",
                    "message": {
                        "data": encode("V123,32.8,-117.2,55,270"),
                        "attributes": {"timestamp": "2010-01-01 08:15:00"},
                        "messageId": "1"
                    }
                },
                {
                    "ackId": "ack-2",
                    "message": {
                        "data": encode("V124,32.7,-117.1,40,90"),
                        "attributes": {"timestamp": "2010-01-01 08:16:00"},
                        "messageId": "2"
                    }
                }
            ]
        })
        .to_string()
    }

    async fn san_diego_cloud() -> FakeCloud {
        let cloud = FakeCloud::start().await.unwrap();
        cloud.script(Route::Pull, 200, pull_body());
        cloud.script(
            Route::Geocode,
            200,
            r#"{"status":"OK","results":[{"formatted_address":"600 W Broadway, San Diego, CA 92101, USA","address_components":[{"long_name":"92101","short_name":"92101","types":["postal_code"]}]}]}"#,
        );
        cloud.script(
            Route::Elevation,
            200,
            r#"{"status":"OK","results":[{"elevation":19.5,"resolution":4.8}]}"#,
        );
        cloud.script(
            Route::Timezone,
            200,
            r#"{"status":"OK","rawOffset":-28800,"dstOffset":0,"timeZoneId":"America/Los_Angeles"}"#,
        );
        cloud
    }

    #[tokio::test]
    async fn test_pull_enrich_insert_ack_over_http() {
        let cloud = san_diego_cloud().await;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        cloud.on_request(Route::Acknowledge, move || trigger.cancel());

        let queue = QueueConfig {
            project_id: "traffic-demo".into(),
            topic: None,
            subscription: "enricher".into(),
            endpoint: cloud.endpoint().to_string(),
            request_timeout_secs: 5,
        };
        let warehouse = WarehouseConfig {
            project_id: "traffic-demo".into(),
            dataset_id: "telemetry".into(),
            table_id: "geocoded".into(),
            endpoint: cloud.endpoint().to_string(),
            request_timeout_secs: 5,
        };
        let geo = GeoConfig {
            api_key: "test-key".into(),
            endpoint: cloud.endpoint().to_string(),
            request_timeout_secs: 5,
        };
        let retry = RetryPolicy::none();

        let source = PubSubSource::new(&queue, retry, None).unwrap();
        let sink = BigQuerySink::new("bigquery", &warehouse, retry, None).unwrap();
        let maps = MapsClient::new(&geo).unwrap();
        let mut control = ControlLoop::new(
            source,
            Enricher::new(maps),
            sink,
            &ConsumerSettings {
                batch_size: 10,
                quota_limit: 1,
                cooldown_secs: 0,
                ack_skipped: true,
            },
        );

        let stats = tokio::time::timeout(Duration::from_secs(20), control.run(cancel))
            .await
            .expect("consumer did not stop")
            .unwrap();

        assert_eq!(stats.received, 2);
        assert_eq!(stats.enriched, 1);
        assert_eq!(stats.skipped, 1);

        assert_eq!(cloud.requests(Route::Pull).len(), 1);
        let acks = cloud.requests(Route::Acknowledge);
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].body, serde_json::json!({"ackIds": ["ack-1", "ack-2"]}));

        for route in [Route::Geocode, Route::Elevation, Route::Timezone] {
            let lookups = cloud.requests(route);
            assert_eq!(lookups.len(), 1, "{route:?}");
            assert_eq!(lookups[0].query["key"], "test-key");
        }

        let inserts = cloud.requests(Route::InsertAll);
        assert_eq!(inserts.len(), 2);
        let enriched = &inserts[0].body["rows"][0];
        assert!(enriched["insertId"].as_str().is_some_and(|id| !id.is_empty()));
        assert_eq!(enriched["json"]["VehicleID"], "V123");
        assert_eq!(enriched["json"]["Zipcode"], "92101");
        assert_eq!(enriched["json"]["Offset"], -28800.0);
        assert_eq!(enriched["json"]["UTCTime"], "2010-01-01 08:15:00");

        let skipped = &inserts[1].body["rows"][0];
        assert_eq!(skipped["json"]["VehicleID"], "V124");
        assert_eq!(skipped["json"]["Address"], "");
        assert!(skipped["json"]["Elevation"].is_null());
        assert!(skipped["json"]["UTCTime"].is_null());
        assert_ne!(enriched["insertId"], skipped["insertId"]);
    }
}
