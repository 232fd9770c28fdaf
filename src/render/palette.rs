/// Glyph ramps ordered dark to bright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Palette {
    #[default]
    Default,
    Box,
    Lines,
    Spark,
}

const DEFAULT_RAMP: &str =
    "  .,:-;+=*%#@▓▒░█▚▞▛▜▙▟▘▝▗▖▞▚╱╲╳╋╬═║╔╗╚╝▤▥▧▨▩▦";
const BOX_RAMP: &str = " ░▒▓█▚▞▛▜▙▟";
const LINES_RAMP: &str = " `.-=+*/\\|╱╲╳╔╗╚╝═║╬";
const SPARK_RAMP: &str = "  ´`^\"~:;*+×•¤°oO@#█";

impl Palette {
    pub const ALL: [Palette; 4] = [Palette::Default, Palette::Box, Palette::Lines, Palette::Spark];

    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Box => "box",
            Self::Lines => "lines",
            Self::Spark => "spark",
        }
    }

    /// Unknown or empty names resolve to the default ramp.
    pub fn resolve(name: &str) -> Self {
        let key = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == key)
            .unwrap_or_default()
    }

    pub fn ramp(self) -> &'static str {
        match self {
            Self::Default => DEFAULT_RAMP,
            Self::Box => BOX_RAMP,
            Self::Lines => LINES_RAMP,
            Self::Spark => SPARK_RAMP,
        }
    }

    pub fn glyphs(self) -> Vec<char> {
        self.ramp().chars().collect()
    }
}
