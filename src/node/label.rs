//! Closed set of node labels the reader and writer understand.
//!
//! Dispatch on node kind goes through [`Label`] rather than string
//! comparison. Labels outside the set are kept verbatim in
//! [`Label::Other`] so a scan can release them and move on.

use serde::{Deserialize, Serialize};

/// Node label (the CGNS `*_t` type name).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Root,
    LibraryVersion,
    Base,
    Zone,
    ZoneType,
    GridCoordinates,
    DataArray,
    FlowSolution,
    GridLocation,
    Elements,
    IndexRange,
    IndexArray,
    Rind,
    BaseIterativeData,
    ZoneIterativeData,
    ReferenceState,
    Family,
    FamilyBC,
    FamilyName,
    ZoneBC,
    BC,
    SimulationType,
    DataClass,
    Descriptor,
    /// Any label not in the set above.
    Other(String),
}

impl Label {
    /// Label string as stored in the file.
    pub fn as_str(&self) -> &str {
        match self {
            Label::Root => "Root Node of ADF File",
            Label::LibraryVersion => "CGNSLibraryVersion_t",
            Label::Base => "CGNSBase_t",
            Label::Zone => "Zone_t",
            Label::ZoneType => "ZoneType_t",
            Label::GridCoordinates => "GridCoordinates_t",
            Label::DataArray => "DataArray_t",
            Label::FlowSolution => "FlowSolution_t",
            Label::GridLocation => "GridLocation_t",
            Label::Elements => "Elements_t",
            Label::IndexRange => "IndexRange_t",
            Label::IndexArray => "IndexArray_t",
            Label::Rind => "Rind_t",
            Label::BaseIterativeData => "BaseIterativeData_t",
            Label::ZoneIterativeData => "ZoneIterativeData_t",
            Label::ReferenceState => "ReferenceState_t",
            Label::Family => "Family_t",
            Label::FamilyBC => "FamilyBC_t",
            Label::FamilyName => "FamilyName_t",
            Label::ZoneBC => "ZoneBC_t",
            Label::BC => "BC_t",
            Label::SimulationType => "SimulationType_t",
            Label::DataClass => "DataClass_t",
            Label::Descriptor => "Descriptor_t",
            Label::Other(s) => s,
        }
    }

    /// Parse a stored label string.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Root Node of ADF File" => Label::Root,
            "CGNSLibraryVersion_t" => Label::LibraryVersion,
            "CGNSBase_t" => Label::Base,
            "Zone_t" => Label::Zone,
            "ZoneType_t" => Label::ZoneType,
            "GridCoordinates_t" => Label::GridCoordinates,
            "DataArray_t" => Label::DataArray,
            "FlowSolution_t" => Label::FlowSolution,
            "GridLocation_t" => Label::GridLocation,
            "Elements_t" => Label::Elements,
            "IndexRange_t" => Label::IndexRange,
            "IndexArray_t" => Label::IndexArray,
            "Rind_t" => Label::Rind,
            "BaseIterativeData_t" => Label::BaseIterativeData,
            "ZoneIterativeData_t" => Label::ZoneIterativeData,
            "ReferenceState_t" => Label::ReferenceState,
            "Family_t" => Label::Family,
            "FamilyBC_t" => Label::FamilyBC,
            "FamilyName_t" => Label::FamilyName,
            "ZoneBC_t" => Label::ZoneBC,
            "BC_t" => Label::BC,
            "SimulationType_t" => Label::SimulationType,
            "DataClass_t" => Label::DataClass,
            "Descriptor_t" => Label::Descriptor,
            other => Label::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
