//! Leveling policy.
//!
//! Eight contiguous point ranges starting at zero; the last one is open
//! ended. Each level carries the title, description and cosmetic assets
//! announced on a level-up.

/// Static metadata of one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelInfo {
    pub level: u8,
    /// Lowest cumulative point total that reaches this level.
    pub min_points: i64,
    pub title: &'static str,
    pub description: &'static str,
    pub frame_path: &'static str,
    pub avatar_path: &'static str,
}

/// All levels, sorted by `min_points`.
pub static LEVELS: &[LevelInfo] = &[
    LevelInfo {
        level: 1,
        min_points: 0,
        title: "Rookie Llama",
        description: "Just getting started, but already full of enthusiasm!",
        frame_path: "assets/images/frames/frame_level_1.png",
        avatar_path: "assets/images/avatars/avatar_level_1.gif",
    },
    LevelInfo {
        level: 2,
        min_points: 10,
        title: "Diligent Llama",
        description: "Shows up to every event and is always ready to help.",
        frame_path: "assets/images/frames/frame_level_2.png",
        avatar_path: "assets/images/avatars/avatar_level_2.gif",
    },
    LevelInfo {
        level: 3,
        min_points: 30,
        title: "Organizer Llama",
        description: "Plans better than any calendar app.",
        frame_path: "assets/images/frames/frame_level_3.png",
        avatar_path: "assets/images/avatars/avatar_level_3.gif",
    },
    LevelInfo {
        level: 4,
        min_points: 60,
        title: "Engine Llama",
        description: "Has enough energy for the whole country.",
        frame_path: "assets/images/frames/frame_level_4.gif",
        avatar_path: "assets/images/avatars/avatar_level_4.gif",
    },
    LevelInfo {
        level: 5,
        min_points: 100,
        title: "Inspiring Llama",
        description: "Can gather people for a Monday clean-up at 6 in the morning.",
        frame_path: "assets/images/frames/frame_level_5.gif",
        avatar_path: "assets/images/avatars/avatar_level_5.gif",
    },
    LevelInfo {
        level: 6,
        min_points: 160,
        title: "Role-Model Llama",
        description: "Other organizers quote her.",
        frame_path: "assets/images/frames/frame_level_6.gif",
        avatar_path: "assets/images/avatars/avatar_level_6.gif",
    },
    LevelInfo {
        level: 7,
        min_points: 240,
        title: "Beacon Llama",
        description: "Can run a concert even during a blackout.",
        frame_path: "assets/images/frames/frame_level_7.gif",
        avatar_path: "assets/images/avatars/avatar_level_7.gif",
    },
    LevelInfo {
        level: 8,
        min_points: 320,
        title: "Legendary Llama",
        description: "Her portrait belongs in every volunteer center.",
        frame_path: "assets/images/frames/frame_level_8.gif",
        avatar_path: "assets/images/avatars/avatar_level_8.gif",
    },
];

/// Highest level whose minimum is at or below `points`.
///
/// Negative totals map to level 1.
pub fn level_for(points: i64) -> u8 {
    LEVELS
        .iter()
        .rev()
        .find(|info| points >= info.min_points)
        .map(|info| info.level)
        .unwrap_or(1)
}

/// Metadata for `level`, falling back to level 1 for out-of-range values.
pub fn level_info(level: u8) -> &'static LevelInfo {
    LEVELS
        .iter()
        .find(|info| info.level == level)
        .unwrap_or(&LEVELS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries() {
        let cases = [
            (0, 1),
            (9, 1),
            (10, 2),
            (29, 2),
            (30, 3),
            (59, 3),
            (60, 4),
            (95, 4),
            (99, 4),
            (100, 5),
            (105, 5),
            (159, 5),
            (160, 6),
            (239, 6),
            (240, 7),
            (319, 7),
            (320, 8),
            (999_999, 8),
            (5_000_000, 8),
        ];
        for (points, level) in cases {
            assert_eq!(level_for(points), level, "points = {points}");
        }
    }

    #[test]
    fn negative_total_is_level_one() {
        assert_eq!(level_for(-5), 1);
    }

    #[test]
    fn monotone_over_range() {
        let mut previous = level_for(0);
        for points in 0..400 {
            let level = level_for(points);
            assert!(level >= previous);
            previous = level;
        }
    }

    #[test]
    fn table_is_contiguous_and_sorted() {
        assert_eq!(LEVELS.len(), 8);
        assert_eq!(LEVELS[0].min_points, 0);
        for pair in LEVELS.windows(2) {
            assert_eq!(pair[1].level, pair[0].level + 1);
            assert!(pair[1].min_points > pair[0].min_points);
        }
    }

    #[test]
    fn info_falls_back_to_first_level() {
        assert_eq!(level_info(5).title, "Inspiring Llama");
        assert_eq!(level_info(42).level, 1);
    }
}
