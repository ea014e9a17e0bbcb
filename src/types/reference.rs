use serde::Serialize;

/// Reference tables mapping a value range to a description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeTable {
    Temperature,
    Ph,
    Salinity,
}

impl RangeTable {
    pub const ALL: [RangeTable; 3] = [RangeTable::Temperature, RangeTable::Ph, RangeTable::Salinity];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            RangeTable::Temperature => "temperature",
            RangeTable::Ph => "ph",
            RangeTable::Salinity => "salinity",
        }
    }

    pub fn parse(name: &str) -> Option<RangeTable> {
        let name = name.to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// Reference tables mapping an id to a description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceTable {
    Method,
    Extraction,
    Assembly,
    Sequencing,
    Binning,
    Oxygen,
    Fraction,
    Target,
    Keywords,
    Publication,
    Hkgenes,
}

impl ReferenceTable {
    pub const ALL: [ReferenceTable; 11] = [
        ReferenceTable::Method,
        ReferenceTable::Extraction,
        ReferenceTable::Assembly,
        ReferenceTable::Sequencing,
        ReferenceTable::Binning,
        ReferenceTable::Oxygen,
        ReferenceTable::Fraction,
        ReferenceTable::Target,
        ReferenceTable::Keywords,
        ReferenceTable::Publication,
        ReferenceTable::Hkgenes,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ReferenceTable::Method => "method",
            ReferenceTable::Extraction => "extraction",
            ReferenceTable::Assembly => "assembly",
            ReferenceTable::Sequencing => "sequencing",
            ReferenceTable::Binning => "binning",
            ReferenceTable::Oxygen => "oxygen",
            ReferenceTable::Fraction => "fraction",
            ReferenceTable::Target => "target",
            ReferenceTable::Keywords => "keywords",
            ReferenceTable::Publication => "publication",
            ReferenceTable::Hkgenes => "hkgenes",
        }
    }

    /// `dna` is accepted as the public name of the extraction table.
    pub fn parse(name: &str) -> Option<ReferenceTable> {
        let name = name.to_ascii_lowercase();
        if name == "dna" {
            return Some(ReferenceTable::Extraction);
        }
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// Table addressed by the general query endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTable {
    Range(RangeTable),
    Reference(ReferenceTable),
}

impl QueryTable {
    pub fn parse(name: &str) -> Option<QueryTable> {
        RangeTable::parse(name)
            .map(QueryTable::Range)
            .or_else(|| ReferenceTable::parse(name).map(QueryTable::Reference))
    }
}
