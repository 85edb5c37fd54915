//! Directional input: key names and swipe gestures mapped to [`Move`]s.

use crate::engine::Move;

/// Minimum swipe length (in pixels) used when no configuration is given.
pub const DEFAULT_SWIPE_THRESHOLD: f64 = 20.0;

/// Map a key name to a direction.
///
/// Accepts browser key names (`ArrowUp`, ...), the terminal aliases
/// `w`/`a`/`s`/`d` and the words `up`/`down`/`left`/`right`.
///
/// ```
/// use mini_2048::engine::Move;
/// use mini_2048::input::key_to_move;
/// assert_eq!(key_to_move("ArrowLeft"), Some(Move::Left));
/// assert_eq!(key_to_move("d"), Some(Move::Right));
/// assert_eq!(key_to_move("Enter"), None);
/// ```
pub fn key_to_move(key: &str) -> Option<Move> {
    match key {
        "ArrowUp" => Some(Move::Up),
        "ArrowDown" => Some(Move::Down),
        "ArrowLeft" => Some(Move::Left),
        "ArrowRight" => Some(Move::Right),
        other => match other.to_ascii_lowercase().as_str() {
            "w" | "up" => Some(Move::Up),
            "s" | "down" => Some(Move::Down),
            "a" | "left" => Some(Move::Left),
            "d" | "right" => Some(Move::Right),
            _ => None,
        },
    }
}

/// Classify a displacement vector in screen coordinates (y grows downward).
///
/// The dominant axis decides; equal magnitudes count as vertical. Returns
/// `None` unless the dominant component exceeds `min_distance`.
///
/// ```
/// use mini_2048::engine::Move;
/// use mini_2048::input::classify_swipe;
/// assert_eq!(classify_swipe(-80.0, 12.0, 20.0), Some(Move::Left));
/// assert_eq!(classify_swipe(3.0, 5.0, 20.0), None);
/// ```
pub fn classify_swipe(dx: f64, dy: f64, min_distance: f64) -> Option<Move> {
    if !dx.is_finite() || !dy.is_finite() {
        return None;
    }
    let (ax, ay) = (dx.abs(), dy.abs());
    if ax.max(ay) <= min_distance {
        return None;
    }
    if ax > ay {
        Some(if dx > 0.0 { Move::Right } else { Move::Left })
    } else {
        Some(if dy > 0.0 { Move::Down } else { Move::Up })
    }
}

/// Tracks one touch from start to end.
#[derive(Debug, Clone, Copy)]
pub struct SwipeTracker {
    start: Option<(f64, f64)>,
    min_distance: f64,
}

impl Default for SwipeTracker {
    fn default() -> Self {
        SwipeTracker::new(DEFAULT_SWIPE_THRESHOLD)
    }
}

impl SwipeTracker {
    pub fn new(min_distance: f64) -> Self {
        SwipeTracker { start: None, min_distance }
    }

    pub fn touch_start(&mut self, x: f64, y: f64) {
        self.start = Some((x, y));
    }

    /// Finish the gesture. Without a recorded start there is nothing to classify.
    pub fn touch_end(&mut self, x: f64, y: f64) -> Option<Move> {
        let (sx, sy) = self.start.take()?;
        classify_swipe(x - sx, y - sy, self.min_distance)
    }

    pub fn cancel(&mut self) {
        self.start = None;
    }
}
