//! Storage entities: racks, boxes, and the size classes that pair them.

use std::fmt;

use asrs_core::{BoxId, Cell, RackId};

// ── SizeClass ─────────────────────────────────────────────────────────────────

/// Box size class, ordered from smallest to largest.
///
/// A class is derived from a box's footprint (`max(length, width)` in grid
/// units).  Racks declare the largest class they accept.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SizeClass {
    #[default]
    Small,
    Medium,
    Standard,
    Large,
    Bulk,
}

impl SizeClass {
    pub const ALL: [SizeClass; 5] = [
        SizeClass::Small,
        SizeClass::Medium,
        SizeClass::Standard,
        SizeClass::Large,
        SizeClass::Bulk,
    ];

    /// Class for a footprint.  Anything wider than 4 units is `Bulk`.
    pub fn from_footprint(footprint: u32) -> Self {
        match footprint {
            0 | 1 => SizeClass::Small,
            2     => SizeClass::Medium,
            3     => SizeClass::Standard,
            4     => SizeClass::Large,
            _     => SizeClass::Bulk,
        }
    }

    /// Nominal footprint of the class (1–5).
    pub fn footprint(self) -> u32 {
        self as u32 + 1
    }

    /// Nominal weight of a box of this class, in kilograms.
    pub fn nominal_weight_kg(self) -> f32 {
        match self {
            SizeClass::Small    => 5.0,
            SizeClass::Medium   => 15.0,
            SizeClass::Standard => 30.0,
            SizeClass::Large    => 50.0,
            SizeClass::Bulk     => 80.0,
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SizeClass::Small    => "small",
            SizeClass::Medium   => "medium",
            SizeClass::Standard => "standard",
            SizeClass::Large    => "large",
            SizeClass::Bulk     => "bulk",
        };
        f.write_str(s)
    }
}

// ── Box ───────────────────────────────────────────────────────────────────────

/// Outer dimensions of a box in grid units.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimensions {
    pub length: u32,
    pub width:  u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(length: u32, width: u32, height: u32) -> Self {
        Self { length, width, height }
    }

    /// A cube of side `n`.
    pub const fn cube(n: u32) -> Self {
        Self { length: n, width: n, height: n }
    }

    #[inline]
    pub fn footprint(&self) -> u32 {
        self.length.max(self.width)
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::cube(1)
    }
}

/// Everything the registry knows about a box apart from its location.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoxSpec {
    pub id:          BoxId,
    pub sku:         String,
    pub description: Option<String>,
    pub dims:        Dimensions,
    pub weight_kg:   f32,
}

impl BoxSpec {
    /// A unit-size box with the `Small` class's nominal weight.
    pub fn new(id: BoxId, sku: impl Into<String>) -> Self {
        Self {
            id,
            sku:         sku.into(),
            description: None,
            dims:        Dimensions::default(),
            weight_kg:   SizeClass::Small.nominal_weight_kg(),
        }
    }

    /// A box shaped like the nominal member of `class`.
    pub fn of_class(id: BoxId, sku: impl Into<String>, class: SizeClass) -> Self {
        Self {
            dims: Dimensions::cube(class.footprint()),
            weight_kg: class.nominal_weight_kg(),
            ..Self::new(id, sku)
        }
    }

    pub fn with_dims(mut self, dims: Dimensions) -> Self {
        self.dims = dims;
        self
    }

    pub fn with_weight(mut self, weight_kg: f32) -> Self {
        self.weight_kg = weight_kg;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[inline]
    pub fn class(&self) -> SizeClass {
        SizeClass::from_footprint(self.dims.footprint())
    }
}

// ── Rack ──────────────────────────────────────────────────────────────────────

/// A fixed storage slot.  Its contents live in the [`Registry`][crate::Registry].
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rack {
    pub id:            RackId,
    pub position:      Cell,
    pub capacity:      u32,
    pub max_class:     SizeClass,
    pub max_weight_kg: f32,
}

impl Rack {
    /// `true` if a box of this size and weight may be stored here at all.
    #[inline]
    pub fn accepts(&self, spec: &BoxSpec) -> bool {
        spec.class() <= self.max_class && spec.weight_kg <= self.max_weight_kg
    }
}

/// A registered box and the rack holding it (`None` while in transit or
/// never stored).
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoxRecord {
    pub spec:     BoxSpec,
    pub location: Option<RackId>,
}
