//! 库所内令牌的排布: 每行最多 4 个, 以库所中心对称.

pub const TOKENS_PER_ROW: usize = 4;

/// Radius used when nothing else is configured.
pub const DEFAULT_TOKEN_RADIUS: f64 = 8.0;

/// Offset of token `index` (0-based) from the centre of a place holding
/// `total` tokens. Rows are filled left to right, top to bottom; the grid is
/// centred both ways with a pitch of `2.5 * radius`.
pub fn token_offset(index: usize, total: usize, radius: f64) -> (f64, f64) {
    let total = total.max(index + 1);
    let pitch = radius * 2.5;

    let row = index / TOKENS_PER_ROW;
    let col = index % TOKENS_PER_ROW;
    let rows = total.div_ceil(TOKENS_PER_ROW);
    let in_row = TOKENS_PER_ROW.min(total - row * TOKENS_PER_ROW);

    let x = (col as f64 - (in_row as f64 - 1.0) / 2.0) * pitch;
    let y = (row as f64 - (rows as f64 - 1.0) / 2.0) * pitch;
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_token_sits_in_the_centre() {
        assert_eq!(token_offset(0, 1, DEFAULT_TOKEN_RADIUS), (0.0, 0.0));
    }

    #[test]
    fn full_row_is_symmetric() {
        assert_eq!(token_offset(0, 4, DEFAULT_TOKEN_RADIUS), (-30.0, 0.0));
        assert_eq!(token_offset(3, 4, DEFAULT_TOKEN_RADIUS), (30.0, 0.0));
        let (a, _) = token_offset(1, 4, DEFAULT_TOKEN_RADIUS);
        let (b, _) = token_offset(2, 4, DEFAULT_TOKEN_RADIUS);
        assert_eq!(a, -b);
    }

    #[test]
    fn second_row_wraps_and_recentres_vertically() {
        // Five tokens: four on top, one centred below.
        assert_eq!(token_offset(0, 5, 8.0), (-30.0, -10.0));
        assert_eq!(token_offset(4, 5, 8.0), (0.0, 10.0));
    }

    #[test]
    fn pitch_scales_with_radius() {
        assert_eq!(token_offset(1, 2, 4.0), (5.0, 0.0));
    }
}
