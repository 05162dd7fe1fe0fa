use serde::{Deserialize, Serialize};

use super::game_state::GameState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerSet {
    Emoji,
    Ascii,
}

/// Cell markers used when flattening a board into text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderAssets {
    pub empty: &'static str,
    pub apple: &'static str,
    pub snake_head: &'static str,
    pub snake_body: &'static str,
}

impl RenderAssets {
    pub fn emoji() -> Self {
        Self {
            empty: "🟪",
            apple: "🟥",
            snake_head: "🟢",
            snake_body: "🟩",
        }
    }

    pub fn ascii() -> Self {
        Self {
            empty: ".",
            apple: "*",
            snake_head: "@",
            snake_body: "o",
        }
    }

    pub fn render(&self, state: &GameState) -> String {
        let field = state.field_size();
        let mut cells = vec![self.empty; field.cell_count()];
        let index = |x: usize, y: usize| y * field.width + x;

        for segment in state.snake().segments().skip(1) {
            cells[index(segment.x, segment.y)] = self.snake_body;
        }
        let head = state.snake().head();
        cells[index(head.x, head.y)] = self.snake_head;
        if let Some(apple) = state.apple() {
            cells[index(apple.x, apple.y)] = self.apple;
        }

        cells
            .chunks(field.width)
            .map(|row| row.concat())
            .collect::<Vec<String>>()
            .join("\n")
    }
}

impl From<MarkerSet> for RenderAssets {
    fn from(set: MarkerSet) -> Self {
        match set {
            MarkerSet::Emoji => RenderAssets::emoji(),
            MarkerSet::Ascii => RenderAssets::ascii(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::SessionRng;
    use crate::games::snake::{FieldSize, Point};
    use crate::games::snake::Direction;

    #[test]
    fn test_render_initial_ascii_board() {
        let mut rng = SessionRng::new(1);
        let state = GameState::new(FieldSize::new(8, 3), &mut rng).unwrap();
        let rendered = state.render(&RenderAssets::ascii());
        assert_eq!(rendered, "........\n.*..@oo.\n........");
    }

    #[test]
    fn test_render_uses_four_distinct_markers() {
        let state = GameState::with_layout(
            FieldSize::new(4, 2),
            &[Point::new(1, 0), Point::new(2, 0)],
            Some(Point::new(3, 1)),
            Direction::Left,
        );
        let rendered = state.render(&RenderAssets::emoji());
        assert_eq!(rendered, "🟪🟢🟩🟪\n🟪🟪🟪🟥");
    }

    #[test]
    fn test_marker_set_conversion() {
        assert_eq!(RenderAssets::from(MarkerSet::Ascii), RenderAssets::ascii());
        assert_eq!(RenderAssets::from(MarkerSet::Emoji).apple, "🟥");
    }
}
