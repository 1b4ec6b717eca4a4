use std::fmt;

/// A plain 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase `#rrggbb` representation.
    pub fn to_hex(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Color of a perfectly neutral memory.
pub const WHITE: Rgb = Rgb::new(255, 255, 255);
/// Color reached at polarity `-1.0`.
pub const NEGATIVE_ANCHOR: Rgb = Rgb::new(74, 144, 226);
/// Color reached at polarity `1.0`.
pub const POSITIVE_ANCHOR: Rgb = Rgb::new(245, 166, 35);

fn channel(anchor: u8, p: f64) -> u8 {
    let value = 255.0 - (255.0 - f64::from(anchor)) * p;
    // exact halves go to the even neighbour, so 210.5 becomes 210
    value.round_ties_even().clamp(0.0, 255.0) as u8
}

/// Map a polarity to an RGB color by interpolating from white toward the
/// negative or positive anchor.
///
/// Values outside `[-1, 1]` are clamped and `NaN` is treated as neutral.
pub fn polarity_to_rgb(polarity: f64) -> Rgb {
    let polarity = if polarity.is_nan() {
        0.0
    } else {
        polarity.clamp(-1.0, 1.0)
    };
    let (anchor, p) = if polarity < 0.0 {
        (NEGATIVE_ANCHOR, polarity.abs())
    } else {
        (POSITIVE_ANCHOR, polarity)
    };
    Rgb::new(
        channel(anchor.r, p),
        channel(anchor.g, p),
        channel(anchor.b, p),
    )
}

/// Map a polarity to its `#rrggbb` aura color.
///
/// ```
/// assert_eq!(aura::polarity_to_color(0.0), "#ffffff");
/// assert_eq!(aura::polarity_to_color(1.0), "#f5a623");
/// assert_eq!(aura::polarity_to_color(-1.0), "#4a90e2");
/// ```
pub fn polarity_to_color(polarity: f64) -> String {
    polarity_to_rgb(polarity).to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps() -> impl Iterator<Item = f64> {
        (0..=100).map(|i| i as f64 / 100.0)
    }

    #[test]
    fn neutral_is_white() {
        assert_eq!(polarity_to_color(0.0), "#ffffff");
        assert_eq!(polarity_to_color(-0.0), "#ffffff");
    }

    #[test]
    fn extremes_hit_the_anchors() {
        assert_eq!(polarity_to_rgb(1.0), POSITIVE_ANCHOR);
        assert_eq!(polarity_to_rgb(-1.0), NEGATIVE_ANCHOR);
        assert_eq!(polarity_to_color(-1.0), "#4a90e2");
        assert_eq!(polarity_to_color(1.0), "#f5a623");
    }

    #[test]
    fn half_positive_rounds_each_channel() {
        // 255 - 10 * 0.5 = 250, 255 - 89 * 0.5 = 210.5, 255 - 220 * 0.5 = 145
        assert_eq!(polarity_to_rgb(0.5), Rgb::new(250, 210, 145));
        assert_eq!(polarity_to_color(0.5), "#fad291");
    }

    #[test]
    fn half_negative_rounds_each_channel() {
        // 255 - 181 * 0.5 = 164.5, 255 - 111 * 0.5 = 199.5, 255 - 29 * 0.5 = 240.5
        assert_eq!(polarity_to_rgb(-0.5), Rgb::new(164, 200, 240));
        assert_eq!(polarity_to_color(-0.5), "#a4c8f0");
    }

    #[test]
    fn non_ties_round_to_nearest() {
        // 255 - 10 * 0.25 = 252.5, 255 - 89 * 0.25 = 232.75, 255 - 220 * 0.25 = 200
        assert_eq!(polarity_to_rgb(0.25), Rgb::new(252, 233, 200));
        // 255 - 181 * 0.1 = 236.9
        assert_eq!(polarity_to_rgb(-0.1).r, 237);
    }

    #[test]
    fn positive_branch_moves_monotonically_toward_anchor() {
        let mut prev = WHITE;
        for p in steps() {
            let c = polarity_to_rgb(p);
            assert!(c.r <= prev.r && c.g <= prev.g && c.b <= prev.b, "p={p}");
            prev = c;
        }
        assert_eq!(prev, POSITIVE_ANCHOR);
    }

    #[test]
    fn negative_branch_moves_monotonically_toward_anchor() {
        let mut prev = WHITE;
        for p in steps() {
            let c = polarity_to_rgb(-p);
            assert!(c.r <= prev.r && c.g <= prev.g && c.b <= prev.b, "p=-{p}");
            prev = c;
        }
        assert_eq!(prev, NEGATIVE_ANCHOR);
    }

    #[test]
    fn colors_are_lowercase_hex() {
        for p in steps().chain(steps().map(|p| -p)) {
            let hex = polarity_to_color(p);
            assert_eq!(hex.len(), 7);
            assert!(hex.starts_with('#'));
            assert!(
                hex[1..]
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
            );
        }
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(polarity_to_color(3.0), "#f5a623");
        assert_eq!(polarity_to_color(-7.5), "#4a90e2");
        assert_eq!(polarity_to_color(f64::NAN), "#ffffff");
    }
}
