mod tests {
    use proptest::prelude::*;
    use rail_map_composer::Rgb;
    use rail_map_composer::color::BLACK;
    use rail_map_composer::schedule::{
        Accepted, DEFAULT_UPDATE_INTERVAL, EventSchedule, PayloadUpdate, ScheduleError,
        ScheduleEvent, SchedulePayload,
    };

    const VERSION: &str = "v3";

    const PAYLOAD: &str = r#"{
        "version": "v3",
        "timestamp": 1000,
        "update": 30,
        "colors": { "a": [10, 20, 30], "b": [1, 2, 3] },
        "updates": [
            { "b": [150, 151], "c": 1, "t": 5 },
            { "b": [10, 11], "c": 0, "t": 0 },
            { "b": [12, 13], "c": 0, "t": -3 }
        ]
    }"#;

    fn payload(timestamp: i64, update: Option<u32>, updates: &[(u16, u16, u16, i64)]) -> SchedulePayload {
        let mut payload = SchedulePayload {
            timestamp,
            update,
            ..SchedulePayload::default()
        };
        payload.colors.push(Rgb { r: 9, g: 9, b: 9 }).unwrap();
        for &(pre, post, color_id, offset) in updates {
            payload
                .updates
                .push(PayloadUpdate {
                    blocks: [pre, post],
                    color_id,
                    offset,
                })
                .unwrap();
        }
        payload
    }

    #[test]
    fn test_decode_and_accept() {
        let decoded: SchedulePayload = serde_json::from_str(PAYLOAD).unwrap();
        let mut schedule = EventSchedule::new();

        let accepted = schedule.accept(decoded, VERSION).unwrap();

        assert_eq!(
            accepted,
            Accepted {
                base_timestamp: 1000,
                next_fetch_time: 1030
            }
        );
        assert_eq!(schedule.update_interval(), 30);
        assert_eq!(
            schedule.events(),
            &[
                ScheduleEvent {
                    pre_block: 150,
                    post_block: 151,
                    color_id: 1,
                    timestamp: 1005
                },
                ScheduleEvent {
                    pre_block: 10,
                    post_block: 11,
                    color_id: 0,
                    timestamp: 0
                },
                ScheduleEvent {
                    pre_block: 12,
                    post_block: 13,
                    color_id: 0,
                    timestamp: 0
                },
            ]
        );
    }

    #[test]
    fn test_color_table_keeps_insertion_order() {
        let decoded: SchedulePayload = serde_json::from_str(PAYLOAD).unwrap();

        assert_eq!(decoded.colors.len(), 2);
        assert_eq!(decoded.colors.resolve(0), Rgb { r: 10, g: 20, b: 30 });
        assert_eq!(decoded.colors.resolve(1), Rgb { r: 1, g: 2, b: 3 });
        assert_eq!(decoded.colors.resolve(2), BLACK);
    }

    #[test]
    fn test_color_keys_are_not_sorted() {
        let decoded: SchedulePayload =
            serde_json::from_str(r#"{"colors": {"z": [1, 1, 1], "a": [2, 2, 2]}}"#).unwrap();

        assert_eq!(decoded.colors.resolve(0), Rgb { r: 1, g: 1, b: 1 });
        assert_eq!(decoded.colors.resolve(1), Rgb { r: 2, g: 2, b: 2 });
    }

    #[test]
    fn test_decode_rejects_bad_payloads() {
        assert!(serde_json::from_str::<SchedulePayload>(r#"{"timestamp": "soon"}"#).is_err());
        assert!(serde_json::from_str::<SchedulePayload>(r#"{"colors": {"a": [1, 2]}}"#).is_err());
        assert!(
            serde_json::from_str::<SchedulePayload>(r#"{"updates": [{"b": [1, 2], "c": -1, "t": 0}]}"#)
                .is_err()
        );

        let colors: Vec<String> = (0..33).map(|i| format!(r#""c{i}": [0, 0, 0]"#)).collect();
        let oversized = format!(r#"{{"colors": {{{}}}}}"#, colors.join(","));
        assert!(serde_json::from_str::<SchedulePayload>(&oversized).is_err());
    }

    #[test]
    fn test_stale_payload_changes_nothing() {
        let mut schedule = EventSchedule::new();
        schedule
            .accept(payload(1000, Some(30), &[(1, 2, 0, 5)]), VERSION)
            .unwrap();
        let events = schedule.events().to_vec();
        let colors = schedule.colors().clone();

        let older = schedule.accept(payload(990, Some(45), &[(7, 8, 0, 1)]), VERSION);
        let duplicate = schedule.accept(payload(1000, Some(30), &[(7, 8, 0, 1)]), VERSION);

        assert_eq!(older, Err(ScheduleError::Stale { timestamp: 990 }));
        assert_eq!(duplicate, Err(ScheduleError::Stale { timestamp: 1000 }));
        assert_eq!(schedule.events(), events.as_slice());
        assert_eq!(schedule.colors(), &colors);
        assert_eq!(schedule.next_fetch_time(), 1030);
        assert_eq!(schedule.update_interval(), 30);
        assert_eq!(schedule.base_timestamp(), 1000);
    }

    #[test]
    fn test_missing_update_keeps_interval() {
        let mut schedule = EventSchedule::new();
        assert_eq!(schedule.update_interval(), DEFAULT_UPDATE_INTERVAL);

        schedule.accept(payload(1000, Some(45), &[]), VERSION).unwrap();
        let accepted = schedule.accept(payload(1010, None, &[]), VERSION).unwrap();

        assert_eq!(accepted.next_fetch_time, 1055);
        assert_eq!(schedule.update_interval(), 45);
    }

    #[test]
    fn test_version_mismatch_is_accepted() {
        let mut schedule = EventSchedule::new();
        let result = schedule.accept(payload(1000, Some(30), &[(1, 2, 0, 0)]), "other");

        assert!(result.is_ok());
        assert_eq!(schedule.events().len(), 1);
    }

    #[test]
    fn test_long_version_is_accepted() {
        let decoded: SchedulePayload = serde_json::from_str(
            r#"{
                "version": "2025-10-19-backend-build-0123456789abcdef",
                "timestamp": 1000,
                "update": 30,
                "colors": { "a": [10, 20, 30] },
                "updates": [{ "b": [150, 151], "c": 0, "t": 0 }]
            }"#,
        )
        .unwrap();

        assert!(decoded.version.is_truncated());
        assert_eq!(decoded.version.as_str(), "2025-10-19-backend-build-0123456");
        assert!(!decoded.version.matches("2025-10-19-backend-build-0123456"));

        let mut schedule = EventSchedule::new();
        let accepted = schedule.accept(decoded, VERSION).unwrap();
        assert_eq!(accepted.next_fetch_time, 1030);
        assert_eq!(schedule.events().len(), 1);
    }

    #[test]
    fn test_version_matches_exactly() {
        let decoded: SchedulePayload = serde_json::from_str(PAYLOAD).unwrap();

        assert!(!decoded.version.is_truncated());
        assert!(decoded.version.matches(VERSION));
        assert!(!decoded.version.matches("v3.1"));
        assert!(SchedulePayload::default().version.matches(""));
    }

    #[test]
    fn test_wide_block_numbers_decode() {
        let decoded: SchedulePayload = serde_json::from_str(
            r#"{"timestamp": 1000, "updates": [{ "b": [70000, 151], "c": 0, "t": 5 }]}"#,
        )
        .unwrap();

        assert_eq!(decoded.updates[0].blocks, [u16::MAX, 151]);
        assert!(
            serde_json::from_str::<SchedulePayload>(r#"{"updates": [{"b": [-1, 2], "c": 0, "t": 0}]}"#)
                .is_err()
        );
    }

    #[test]
    fn test_target_block() {
        let event = ScheduleEvent {
            pre_block: 150,
            post_block: 151,
            color_id: 2,
            timestamp: 1010,
        };

        assert_eq!(event.target_block(1009), 150);
        assert_eq!(event.target_block(1010), 151);
        assert_eq!(event.target_block(2000), 151);
    }

    proptest! {
        #[test]
        fn next_fetch_time_never_decreases(
            submissions in proptest::collection::vec(
                (0i64..100_000, proptest::option::of(0u32..3_600), 1u16..400),
                1..32,
            )
        ) {
            let mut schedule = EventSchedule::new();
            for (timestamp, update, block) in submissions {
                let before = schedule.next_fetch_time();
                let events = schedule.events().to_vec();
                let colors = schedule.colors().clone();

                let result = schedule.accept(payload(timestamp, update, &[(block, block + 1, 0, 3)]), VERSION);

                prop_assert!(schedule.next_fetch_time() >= before);
                match result {
                    Ok(accepted) => prop_assert!(accepted.next_fetch_time > before),
                    Err(error) => {
                        prop_assert_eq!(error, ScheduleError::Stale { timestamp });
                        prop_assert_eq!(schedule.next_fetch_time(), before);
                        prop_assert_eq!(schedule.events(), events.as_slice());
                        prop_assert_eq!(schedule.colors(), &colors);
                    }
                }
            }
        }
    }
}
