//! Piece catalog: the fixed tile shapes and their rotations.
//!
//! Shapes are stored row-major. A shape of height `M` and width `N` rotated
//! a quarter turn clockwise becomes an `N x M` shape whose cell `(i, j)` is
//! the source cell `(M - 1 - j, i)`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use tracing::instrument;

/// Number of piece types in the catalog, cathedral included.
pub const PIECE_COUNT: usize = 14;

/// Identifier of a piece type in the catalog.
///
/// Id 0 is the cathedral, ids 1 through 13 are the regular pieces every
/// player starts with.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(try_from = "u8", into = "u8")]
#[display("{}", _0)]
pub struct PieceTypeId(u8);

impl PieceTypeId {
    /// The unique cathedral piece.
    pub const CATHEDRAL: Self = Self(0);

    /// Returns the id if it names a catalog entry.
    pub fn new(id: u8) -> Option<Self> {
        ((id as usize) < PIECE_COUNT).then_some(Self(id))
    }

    /// Returns the raw id.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Returns true for the cathedral.
    pub fn is_cathedral(self) -> bool {
        self == Self::CATHEDRAL
    }

    /// Iterates the regular (non-cathedral) piece types in id order.
    pub fn regular() -> impl Iterator<Item = Self> {
        (1..PIECE_COUNT as u8).map(Self)
    }

    /// Shape of this piece type in its base orientation.
    pub fn shape(self) -> &'static PieceShape {
        &catalog()[self.0 as usize]
    }
}

impl TryFrom<u8> for PieceTypeId {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id).ok_or_else(|| format!("unknown piece type {id}"))
    }
}

impl From<PieceTypeId> for u8 {
    fn from(id: PieceTypeId) -> Self {
        id.0
    }
}

/// Rotation of a piece in quarter turns clockwise.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::EnumIter,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Orientation {
    /// As stored in the catalog.
    #[default]
    Up,
    /// One quarter turn clockwise.
    Right,
    /// Half turn.
    Down,
    /// Three quarter turns clockwise.
    Left,
}

impl Orientation {
    /// Number of clockwise quarter turns.
    pub fn quarter_turns(self) -> u8 {
        match self {
            Orientation::Up => 0,
            Orientation::Right => 1,
            Orientation::Down => 2,
            Orientation::Left => 3,
        }
    }

    /// Builds an orientation from a quarter-turn count in `0..=3`.
    pub fn from_quarter_turns(turns: u8) -> Option<Self> {
        match turns {
            0 => Some(Orientation::Up),
            1 => Some(Orientation::Right),
            2 => Some(Orientation::Down),
            3 => Some(Orientation::Left),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Orientation {
    type Error = String;

    fn try_from(turns: u8) -> Result<Self, Self::Error> {
        Self::from_quarter_turns(turns).ok_or_else(|| format!("invalid orientation {turns}"))
    }
}

impl From<Orientation> for u8 {
    fn from(orientation: Orientation) -> Self {
        orientation.quarter_turns()
    }
}

/// Immutable boolean matrix describing which cells a piece covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PieceShape {
    rows: Vec<Vec<bool>>,
}

impl PieceShape {
    /// Builds a shape from row-major cells.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is empty or ragged. Catalog data is compiled in,
    /// so a malformed shape is a programming error.
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Self {
        assert!(!rows.is_empty(), "piece shape has no rows");
        let width = rows[0].len();
        assert!(width > 0, "piece shape has no columns");
        assert!(
            rows.iter().all(|row| row.len() == width),
            "piece shape rows differ in length"
        );
        Self { rows }
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.rows[0].len()
    }

    /// Iterates covered cells as `(cx, cy)`, column first.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().enumerate().flat_map(|(cy, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, covered)| **covered)
                .map(move |(cx, _)| (cx, cy))
        })
    }

    /// Number of covered cells.
    pub fn footprint(&self) -> usize {
        self.rows.iter().flatten().filter(|c| **c).count()
    }

    /// Returns this shape rotated a quarter turn clockwise.
    pub fn rotate_clockwise(&self) -> Self {
        let m = self.height();
        let n = self.width();
        let rows = (0..n)
            .map(|i| (0..m).map(|j| self.rows[m - 1 - j][i]).collect())
            .collect();
        Self { rows }
    }
}

impl fmt::Display for PieceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for covered in row {
                f.write_str(if *covered { "#" } else { "." })?;
            }
        }
        Ok(())
    }
}

/// Rotates `shape` a quarter turn clockwise.
pub fn rotate_clockwise(shape: &PieceShape) -> PieceShape {
    shape.rotate_clockwise()
}

/// Returns the shape of `piece` turned to `orientation`.
#[instrument(level = "trace")]
pub fn shape_of(piece: PieceTypeId, orientation: Orientation) -> PieceShape {
    (0..orientation.quarter_turns()).fold(piece.shape().clone(), |shape, _| shape.rotate_clockwise())
}

const RAW_SHAPES: [&[&str]; PIECE_COUNT] = [
    // Cathedral
    &[".#.", "###", ".#.", ".#."],
    &["...", ".#.", "..."],
    &["##.", ".#.", "..."],
    &[".#.", "###", "..."],
    &[".#.", ".#.", "..."],
    &["#..", "##.", ".#."],
    &["#.#", "###", "..."],
    &["##.", ".##", ".#."],
    &["##.", "##.", "..."],
    &[".#.", "###", ".#."],
    &["...", ".#.", "..."],
    &[".##", ".#.", "##."],
    &["..#", ".##", "##."],
    &[".##", ".#.", "..."],
];

static CATALOG: LazyLock<Vec<PieceShape>> = LazyLock::new(|| {
    RAW_SHAPES
        .iter()
        .map(|rows| {
            PieceShape::from_rows(
                rows.iter()
                    .map(|row| row.chars().map(|c| c == '#').collect())
                    .collect(),
            )
        })
        .collect()
});

/// The full catalog, indexed by piece type id.
pub fn catalog() -> &'static [PieceShape] {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_catalog_has_fourteen_shapes() {
        assert_eq!(catalog().len(), PIECE_COUNT);
        assert!(catalog().iter().all(|s| s.height() <= 4 && s.width() <= 3));
    }

    #[test]
    fn test_cathedral_is_four_by_three() {
        let cathedral = PieceTypeId::CATHEDRAL.shape();
        assert_eq!((cathedral.height(), cathedral.width()), (4, 3));
        assert_eq!(cathedral.footprint(), 6);
    }

    #[test]
    fn test_rotation_transposes_dimensions() {
        let rotated = rotate_clockwise(PieceTypeId::CATHEDRAL.shape());
        assert_eq!((rotated.height(), rotated.width()), (3, 4));
        assert_eq!(rotated.to_string(), "..#.\n####\n..#.");
    }

    #[test]
    fn test_four_rotations_are_identity() {
        for shape in catalog() {
            let turned = (0..4).fold(shape.clone(), |s, _| s.rotate_clockwise());
            assert_eq!(&turned, shape);
        }
    }

    #[test]
    fn test_rotation_preserves_footprint() {
        for piece in PieceTypeId::regular() {
            for orientation in Orientation::iter() {
                assert_eq!(
                    shape_of(piece, orientation).footprint(),
                    piece.shape().footprint()
                );
            }
        }
    }

    #[test]
    fn test_piece_type_id_bounds() {
        assert!(PieceTypeId::new(13).is_some());
        assert!(PieceTypeId::new(14).is_none());
        assert_eq!(PieceTypeId::regular().count(), 13);
    }

    #[test]
    fn test_orientation_serde_as_number() {
        let json = serde_json::to_string(&Orientation::Down).unwrap();
        assert_eq!(json, "2");
        let parsed: Orientation = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, Orientation::Left);
        assert!(serde_json::from_str::<Orientation>("4").is_err());
    }
}
