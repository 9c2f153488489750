mod tests {
    use rail_map_composer::color::{BLACK, gamma_correct};
    use rail_map_composer::layout::StrandRange;
    use rail_map_composer::realtime::BlockPriority;
    use rail_map_composer::schedule::PayloadUpdate;
    use rail_map_composer::{EventSchedule, FrameBuffer, RealtimeRenderer, Rgb, SchedulePayload};

    const STRANDS: [StrandRange; 1] = [StrandRange::new(100, 60)];
    const BASE: i64 = 1_000;

    fn palette(count: u8) -> impl Iterator<Item = Rgb> {
        (0..count).map(|i| Rgb {
            r: i * 30,
            g: 255 - i * 30,
            b: 17,
        })
    }

    fn schedule(colors: u8, updates: &[(u16, u16, u16, i64)]) -> EventSchedule {
        let mut payload = SchedulePayload {
            timestamp: BASE,
            update: Some(30),
            ..SchedulePayload::default()
        };
        for color in palette(colors) {
            payload.colors.push(color).unwrap();
        }
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
        let mut schedule = EventSchedule::new();
        schedule.accept(payload, "v3").unwrap();
        schedule
    }

    #[test]
    fn test_wide_block_number_is_skipped() {
        let decoded: SchedulePayload = serde_json::from_str(
            r#"{
                "timestamp": 1000,
                "update": 30,
                "colors": { "a": [10, 20, 30] },
                "updates": [
                    { "b": [70000, 70001], "c": 0, "t": 0 },
                    { "b": [150, 151], "c": 0, "t": 0 }
                ]
            }"#,
        )
        .unwrap();
        let mut schedule = EventSchedule::new();
        schedule.accept(decoded, "v3").unwrap();
        let mut frame = FrameBuffer::<60>::new(&STRANDS).unwrap();

        let stats = RealtimeRenderer.render(&schedule, BASE, &mut frame);

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.drawn, 1);
        assert_eq!(frame.block(151), Some(gamma_correct(Rgb { r: 10, g: 20, b: 30 })));
    }

    #[test]
    fn test_event_moves_at_its_timestamp() {
        let schedule = schedule(3, &[(150, 151, 2, 10)]);
        let expected = gamma_correct(schedule.colors().resolve(2));
        let mut frame = FrameBuffer::<60>::new(&STRANDS).unwrap();

        let stats = RealtimeRenderer.render(&schedule, BASE + 9, &mut frame);
        assert_eq!(stats.drawn, 1);
        assert_eq!(frame.block(150), Some(expected));
        assert_eq!(frame.block(151), Some(BLACK));

        RealtimeRenderer.render(&schedule, BASE + 10, &mut frame);
        assert_eq!(frame.block(150), Some(BLACK));
        assert_eq!(frame.block(151), Some(expected));
    }

    #[test]
    fn test_elapsed_events_use_post_block() {
        let schedule = schedule(3, &[(120, 121, 1, 0), (130, 131, 1, -5)]);
        let mut frame = FrameBuffer::<60>::new(&STRANDS).unwrap();

        RealtimeRenderer.render(&schedule, 5, &mut frame);

        assert_eq!(frame.block(120), Some(BLACK));
        assert_eq!(frame.block(121), Some(gamma_correct(schedule.colors().resolve(1))));
        assert_eq!(frame.block(131), Some(gamma_correct(schedule.colors().resolve(1))));
    }

    #[test]
    fn test_highest_color_id_wins() {
        let forward = schedule(8, &[(140, 140, 3, 0), (140, 140, 7, 0)]);
        let reverse = schedule(8, &[(140, 140, 7, 0), (140, 140, 3, 0)]);
        let expected = gamma_correct(forward.colors().resolve(7));

        for schedule in [forward, reverse] {
            let mut frame = FrameBuffer::<60>::new(&STRANDS).unwrap();
            let stats = RealtimeRenderer.render(&schedule, BASE, &mut frame);

            assert_eq!(frame.block(140), Some(expected));
            assert_eq!(stats.drawn, 1);
        }
    }

    #[test]
    fn test_block_priority_ties_commit() {
        let mut priority = BlockPriority::new();

        assert!(priority.commit(5, 3));
        assert!(priority.commit(5, 3));
        assert!(!priority.commit(5, 2));
        assert!(priority.commit(5, 4));
        assert_eq!(priority.get(5), Some(4));
        assert_eq!(priority.get(6), None);
        assert!(!priority.commit(600, 1));
        assert_eq!(priority.committed().collect::<Vec<_>>(), vec![(5, 4)]);
    }

    #[test]
    fn test_out_of_range_blocks_are_skipped() {
        let schedule = schedule(2, &[(0, 700, 1, 0), (0, 300, 1, 0), (0, 0, 1, 0), (0, 110, 1, 0)]);
        let mut frame = FrameBuffer::<60>::new(&STRANDS).unwrap();

        let stats = RealtimeRenderer.render(&schedule, BASE, &mut frame);

        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.drawn, 1);
        assert_eq!(frame.block(110), Some(gamma_correct(schedule.colors().resolve(1))));
    }

    #[test]
    fn test_unknown_color_id_draws_black() {
        let schedule = schedule(2, &[(0, 125, 9, 0)]);
        let mut frame = FrameBuffer::<60>::new(&STRANDS).unwrap();
        frame.set_block(125, Rgb { r: 255, g: 255, b: 255 });

        RealtimeRenderer.render(&schedule, BASE, &mut frame);

        assert_eq!(frame.block(125), Some(BLACK));
    }

    #[test]
    fn test_render_clears_previous_frame() {
        let empty = schedule(1, &[]);
        let mut frame = FrameBuffer::<60>::new(&STRANDS).unwrap();
        frame.set_block(101, Rgb { r: 255, g: 0, b: 0 });

        let stats = RealtimeRenderer.render(&empty, BASE, &mut frame);

        assert_eq!(stats.drawn, 0);
        assert!(frame.pixels().iter().all(|pixel| *pixel == BLACK));
    }
}
