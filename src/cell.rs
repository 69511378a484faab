use strum::{Display, EnumString, VariantArray};

/// The color of a single cell. [`Empty`](Color::Empty) is the undetermined background.
#[derive(Clone, Copy, Debug, Default, Display, EnumString, Eq, Hash, Ord, PartialEq, PartialOrd, VariantArray)]
#[strum(serialize_all = "lowercase")]
pub enum Color {
    /// Painted dark.
    Dark,
    /// Painted light.
    Light,
    /// Not determined yet.
    #[default]
    #[strum(to_string = "empty", serialize = "gray")]
    Empty,
}

impl Color {
    /// The other determined color. [`Empty`](Color::Empty) has no opposite and maps to itself.
    pub fn opposite(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
            Self::Empty => Self::Empty,
        }
    }

    /// Whether this is [`Dark`](Color::Dark) or [`Light`](Color::Light).
    pub fn is_determined(self) -> bool {
        self != Self::Empty
    }
}

/// One grid position.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Cell {
    /// The current color; [`Empty`](Color::Empty) for holes.
    pub color: Color,
    /// Holes never take a color and are skipped by every constraint.
    pub exists: bool,
    /// Fixed cells are givens; solvers never change them.
    pub fixed: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            color: Color::Empty,
            exists: true,
            fixed: false,
        }
    }
}

impl Cell {
    pub(crate) const HOLE: Cell = Cell {
        color: Color::Empty,
        exists: false,
        fixed: false,
    };

    /// A copy with `color` instead.
    pub fn with_color(self, color: Color) -> Self {
        Self { color, ..self }
    }

    /// A copy with `fixed` instead.
    pub fn with_fixed(self, fixed: bool) -> Self {
        Self { fixed, ..self }
    }

    /// A copy with `exists` instead.
    pub fn with_exists(self, exists: bool) -> Self {
        Self { exists, ..self }
    }

    /// Parse the fixture notation: `w` light, `b` dark, `n` undetermined, `.` hole; uppercase marks a fixed cell.
    pub(crate) fn from_char(c: char) -> Option<Self> {
        let color = match c.to_ascii_lowercase() {
            'w' => Color::Light,
            'b' => Color::Dark,
            'n' => Color::Empty,
            '.' => return Some(Self::HOLE),
            _ => return None,
        };
        Some(Self {
            color,
            exists: true,
            fixed: c.is_ascii_uppercase(),
        })
    }

    pub(crate) fn to_char(self) -> char {
        if !self.exists {
            return '.';
        }
        let c = match self.color {
            Color::Dark => 'b',
            Color::Light => 'w',
            Color::Empty => 'n',
        };
        if self.fixed {
            c.to_ascii_uppercase()
        } else {
            c
        }
    }
}
