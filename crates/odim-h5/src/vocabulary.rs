//! Convention vocabulary used to route attribute names to sub-groups.
//!
//! Both tables must stay sorted (byte order, case-sensitive) since lookups
//! binary-search them. Names on neither list belong in `how`.

/// Names that live in a node's `what` group.
pub const WHAT_NAMES: &[&str] = &[
    "date",
    "enddate",
    "endtime",
    "gain",
    "nodata",
    "object",
    "offset",
    "prodpar",
    "product",
    "quantity",
    "source",
    "startdate",
    "starttime",
    "time",
    "undetect",
    "version",
];

/// Names that live in a node's `where` group.
pub const WHERE_NAMES: &[&str] = &[
    "LL_lat",
    "LL_lon",
    "LR_lat",
    "LR_lon",
    "UL_lat",
    "UL_lon",
    "UR_lat",
    "UR_lon",
    "a1gate",
    "angles",
    "az_angle",
    "elangle",
    "height",
    "interval",
    "lat",
    "levels",
    "lon",
    "maxheight",
    "minheight",
    "nbins",
    "nrays",
    "projdef",
    "range",
    "rscale",
    "rstart",
    "start_lat",
    "start_lon",
    "startaz",
    "stop_lat",
    "stop_lon",
    "stopaz",
    "xscale",
    "xsize",
    "yscale",
    "ysize",
];

/// One of the three metadata sub-groups of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    What,
    Where,
    How,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::What, Slot::Where, Slot::How];

    /// Name of the sub-group in the file.
    pub fn group_name(&self) -> &'static str {
        match self {
            Self::What => "what",
            Self::Where => "where",
            Self::How => "how",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::What => 0,
            Self::Where => 1,
            Self::How => 2,
        }
    }
}

/// The sub-group an attribute name belongs in.
pub fn classify(name: &str) -> Slot {
    if WHAT_NAMES.binary_search(&name).is_ok() {
        Slot::What
    } else if WHERE_NAMES.binary_search(&name).is_ok() {
        Slot::Where
    } else {
        Slot::How
    }
}
