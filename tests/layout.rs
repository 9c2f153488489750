mod tests {
    use rail_map_composer::layout::{BlockLookup, LayoutError, StrandLayout, StrandRange};

    fn two_strands() -> StrandLayout {
        StrandLayout::new(&[StrandRange::new(100, 10), StrandRange::new(300, 5)], 15).unwrap()
    }

    #[test]
    fn test_lookup() {
        let layout = two_strands();

        assert_eq!(layout.lookup(0), BlockLookup::Sentinel);
        assert_eq!(layout.lookup(100), BlockLookup::Pixel(0));
        assert_eq!(layout.lookup(109), BlockLookup::Pixel(9));
        assert_eq!(layout.lookup(110), BlockLookup::OutOfRange);
        assert_eq!(layout.lookup(300), BlockLookup::Pixel(10));
        assert_eq!(layout.lookup(304), BlockLookup::Pixel(14));
        assert_eq!(layout.lookup(305), BlockLookup::OutOfRange);
        assert_eq!(layout.lookup(99), BlockLookup::OutOfRange);
    }

    #[test]
    fn test_strand_pixels() {
        let layout = two_strands();

        assert_eq!(layout.strand_count(), 2);
        assert_eq!(layout.pixel_count(), 15);
        assert_eq!(layout.strand_pixels(0), Some(0..10));
        assert_eq!(layout.strand_pixels(1), Some(10..15));
        assert_eq!(layout.strand_pixels(2), None);
    }

    #[test]
    fn test_range_contains() {
        let range = StrandRange::new(300, 5);
        assert!(range.contains(300));
        assert!(range.contains(304));
        assert!(!range.contains(305));
        assert_eq!(range.end(), 305);
    }

    #[test]
    fn test_invalid_layouts() {
        assert_eq!(
            StrandLayout::new(&[StrandRange::new(100, 10), StrandRange::new(105, 10)], 20),
            Err(LayoutError::Overlap(0, 1))
        );
        assert_eq!(
            StrandLayout::new(&[StrandRange::new(0, 5)], 5),
            Err(LayoutError::ReservedBlock(0))
        );
        assert_eq!(
            StrandLayout::new(&[StrandRange::new(510, 5)], 5),
            Err(LayoutError::OutsideAddressSpace(0))
        );
        assert_eq!(
            StrandLayout::new(&[StrandRange::new(100, 10)], 5),
            Err(LayoutError::PixelOverflow {
                needed: 10,
                capacity: 5
            })
        );
    }

    #[test]
    fn test_too_many_strands() {
        let ranges = [
            StrandRange::new(10, 1),
            StrandRange::new(20, 1),
            StrandRange::new(30, 1),
            StrandRange::new(40, 1),
            StrandRange::new(50, 1),
        ];
        assert_eq!(
            StrandLayout::new(&ranges, 5),
            Err(LayoutError::TooManyStrands)
        );
    }

    #[test]
    fn test_last_block_of_address_space() {
        let layout = StrandLayout::new(&[StrandRange::new(502, 10)], 10).unwrap();
        assert_eq!(layout.lookup(511), BlockLookup::Pixel(9));
    }
}
