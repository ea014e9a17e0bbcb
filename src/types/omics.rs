//! Omic sequences, their processing steps and the tables backing each step.
//!
//! Every sequence is an ordered list of steps. A step is stored in one
//! [`StepTable`] and, inside a given sequence, hangs from a parent step whose
//! row id is kept in the child's `source_id` column. Samples sit on top of
//! every sequence and hang from projects.

use std::fmt;

use serde::{Serialize, Serializer};

/// Canonical form of a sequence or step name: upper case, with `_` and `-`
/// read as spaces so that URL segments like `trimmed_reads` resolve.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '_' | '-' => ' ',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OmicSequence {
    Metagenome,
    Metatranscriptome,
    Metavirome,
    GenomeProcariota,
    GenomeVirus,
    Proteomics,
    SingleCellGenomics,
    Plasmid,
}

impl OmicSequence {
    pub const ALL: [OmicSequence; 8] = [
        OmicSequence::Metagenome,
        OmicSequence::Metatranscriptome,
        OmicSequence::Metavirome,
        OmicSequence::GenomeProcariota,
        OmicSequence::GenomeVirus,
        OmicSequence::Proteomics,
        OmicSequence::SingleCellGenomics,
        OmicSequence::Plasmid,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            OmicSequence::Metagenome => "METAGENOME",
            OmicSequence::Metatranscriptome => "METATRANSCRIPTOME",
            OmicSequence::Metavirome => "METAVIROME",
            OmicSequence::GenomeProcariota => "GENOME PROCARIOTA",
            OmicSequence::GenomeVirus => "GENOME VIRUS",
            OmicSequence::Proteomics => "PROTEOMICS",
            OmicSequence::SingleCellGenomics => "SINGLE CELL GENOMICS",
            OmicSequence::Plasmid => "PLASMID",
        }
    }

    /// Exact match after normalization.
    pub fn parse(name: &str) -> Option<OmicSequence> {
        let name = normalize(name);
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Ordered processing steps of the sequence.
    #[must_use]
    pub const fn steps(self) -> &'static [SequenceStep] {
        use SequenceStep::*;
        match self {
            OmicSequence::Metagenome => &[RawReads, TrimmedReads, Contigs, PredictedGenes, Mags],
            OmicSequence::Metatranscriptome => &[RawReads, TrimmedReads],
            OmicSequence::Metavirome => {
                &[RawReads, TrimmedReads, Contigs, PredictedGenes, ContigsVirus]
            }
            OmicSequence::GenomeProcariota | OmicSequence::GenomeVirus => {
                &[RawReads, Genome, PredictedGenes]
            }
            OmicSequence::Proteomics => &[Peptides],
            OmicSequence::SingleCellGenomics => &[RawReads, SingleCellGenome, PredictedGenes],
            OmicSequence::Plasmid => &[RawReads, SequenceStep::Plasmid, PredictedGenes],
        }
    }

    #[must_use]
    pub fn has_step(self, step: SequenceStep) -> bool {
        self.steps().contains(&step)
    }
}

impl fmt::Display for OmicSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for OmicSequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceStep {
    Project,
    Sample,
    RawReads,
    TrimmedReads,
    Contigs,
    PredictedGenes,
    Mags,
    ContigsVirus,
    Genome,
    Peptides,
    SingleCellGenome,
    Plasmid,
}

impl SequenceStep {
    pub const ALL: [SequenceStep; 12] = [
        SequenceStep::Project,
        SequenceStep::Sample,
        SequenceStep::RawReads,
        SequenceStep::TrimmedReads,
        SequenceStep::Contigs,
        SequenceStep::PredictedGenes,
        SequenceStep::Mags,
        SequenceStep::ContigsVirus,
        SequenceStep::Genome,
        SequenceStep::Peptides,
        SequenceStep::SingleCellGenome,
        SequenceStep::Plasmid,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            SequenceStep::Project => "PROJECT",
            SequenceStep::Sample => "SAMPLE",
            SequenceStep::RawReads => "RAW READS",
            SequenceStep::TrimmedReads => "TRIMMED READS",
            SequenceStep::Contigs => "CONTIGS",
            SequenceStep::PredictedGenes => "PREDICTED GENES",
            SequenceStep::Mags => "MAGS",
            SequenceStep::ContigsVirus => "CONTIGS VIRUS",
            SequenceStep::Genome => "GENOME",
            SequenceStep::Peptides => "PEPTIDES",
            SequenceStep::SingleCellGenome => "SINGLE CELL GENOME",
            SequenceStep::Plasmid => "PLASMID",
        }
    }

    /// Exact match after normalization.
    pub fn parse(name: &str) -> Option<SequenceStep> {
        let name = normalize(name);
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Table storing rows of this step. Projects are not step rows.
    #[must_use]
    pub const fn table(self) -> Option<StepTable> {
        match self {
            SequenceStep::Project => None,
            SequenceStep::Sample => Some(StepTable::Sample),
            SequenceStep::RawReads | SequenceStep::Peptides => Some(StepTable::Experiment),
            SequenceStep::TrimmedReads => Some(StepTable::TrimmedReads),
            SequenceStep::Contigs => Some(StepTable::Contigs),
            SequenceStep::PredictedGenes => Some(StepTable::PredictedGenes),
            SequenceStep::Mags => Some(StepTable::Mags),
            SequenceStep::ContigsVirus => Some(StepTable::ContigsVirus),
            SequenceStep::Genome => Some(StepTable::Genome),
            SequenceStep::SingleCellGenome => Some(StepTable::SingleCell),
            SequenceStep::Plasmid => Some(StepTable::Plasmid),
        }
    }

    /// Parent step inside `sequence`, or `None` when the step has no parent
    /// there (including steps that are not part of the sequence).
    #[must_use]
    pub fn parent(self, sequence: OmicSequence) -> Option<SequenceStep> {
        use OmicSequence as Seq;
        match self {
            SequenceStep::Project => None,
            SequenceStep::Sample => Some(SequenceStep::Project),
            SequenceStep::RawReads => match sequence {
                Seq::Proteomics => None,
                _ => Some(SequenceStep::Sample),
            },
            SequenceStep::TrimmedReads => match sequence {
                Seq::Metagenome | Seq::Metatranscriptome | Seq::Metavirome => {
                    Some(SequenceStep::RawReads)
                }
                _ => None,
            },
            SequenceStep::Contigs => match sequence {
                Seq::Metagenome | Seq::Metavirome => Some(SequenceStep::TrimmedReads),
                _ => None,
            },
            SequenceStep::PredictedGenes => match sequence {
                Seq::Metagenome | Seq::Metavirome => Some(SequenceStep::Contigs),
                Seq::GenomeProcariota | Seq::GenomeVirus => Some(SequenceStep::Genome),
                Seq::SingleCellGenomics => Some(SequenceStep::SingleCellGenome),
                Seq::Plasmid => Some(SequenceStep::Plasmid),
                _ => None,
            },
            SequenceStep::Mags => match sequence {
                Seq::Metagenome => Some(SequenceStep::PredictedGenes),
                _ => None,
            },
            SequenceStep::ContigsVirus => match sequence {
                Seq::Metavirome => Some(SequenceStep::PredictedGenes),
                _ => None,
            },
            SequenceStep::Genome => match sequence {
                Seq::GenomeProcariota | Seq::GenomeVirus => Some(SequenceStep::RawReads),
                _ => None,
            },
            SequenceStep::Peptides => match sequence {
                Seq::Proteomics => Some(SequenceStep::Sample),
                _ => None,
            },
            SequenceStep::SingleCellGenome => match sequence {
                Seq::SingleCellGenomics => Some(SequenceStep::RawReads),
                _ => None,
            },
            SequenceStep::Plasmid => match sequence {
                Seq::Plasmid => Some(SequenceStep::RawReads),
                _ => None,
            },
        }
    }
}

impl fmt::Display for SequenceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for SequenceStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Storage table of a step. Table and sharing table names come from this
/// closed set only, so they are safe to splice into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepTable {
    Sample,
    Experiment,
    TrimmedReads,
    Contigs,
    PredictedGenes,
    Mags,
    ContigsVirus,
    Genome,
    SingleCell,
    Plasmid,
}

impl StepTable {
    pub const ALL: [StepTable; 10] = [
        StepTable::Sample,
        StepTable::Experiment,
        StepTable::TrimmedReads,
        StepTable::Contigs,
        StepTable::PredictedGenes,
        StepTable::Mags,
        StepTable::ContigsVirus,
        StepTable::Genome,
        StepTable::SingleCell,
        StepTable::Plasmid,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            StepTable::Sample => "sample",
            StepTable::Experiment => "experiment",
            StepTable::TrimmedReads => "trimmed_reads",
            StepTable::Contigs => "contigs",
            StepTable::PredictedGenes => "predicted_genes",
            StepTable::Mags => "mags",
            StepTable::ContigsVirus => "contigs_virus",
            StepTable::Genome => "genome",
            StepTable::SingleCell => "single_cell",
            StepTable::Plasmid => "plasmid",
        }
    }

    #[must_use]
    pub const fn user_sharing_table(self) -> &'static str {
        match self {
            StepTable::Sample => "user_shared_sample",
            StepTable::Experiment => "user_shared_experiment",
            StepTable::TrimmedReads => "user_shared_trimmed_reads",
            StepTable::Contigs => "user_shared_contigs",
            StepTable::PredictedGenes => "user_shared_predicted_genes",
            StepTable::Mags => "user_shared_mags",
            StepTable::ContigsVirus => "user_shared_contigs_virus",
            StepTable::Genome => "user_shared_genome",
            StepTable::SingleCell => "user_shared_single_cell",
            StepTable::Plasmid => "user_shared_plasmid",
        }
    }

    #[must_use]
    pub const fn group_sharing_table(self) -> &'static str {
        match self {
            StepTable::Sample => "group_shared_sample",
            StepTable::Experiment => "group_shared_experiment",
            StepTable::TrimmedReads => "group_shared_trimmed_reads",
            StepTable::Contigs => "group_shared_contigs",
            StepTable::PredictedGenes => "group_shared_predicted_genes",
            StepTable::Mags => "group_shared_mags",
            StepTable::ContigsVirus => "group_shared_contigs_virus",
            StepTable::Genome => "group_shared_genome",
            StepTable::SingleCell => "group_shared_single_cell",
            StepTable::Plasmid => "group_shared_plasmid",
        }
    }

    /// Samples hang from projects; every other table carries `sequence` and
    /// `source_id`.
    #[must_use]
    pub const fn is_sample(self) -> bool {
        matches!(self, StepTable::Sample)
    }

    /// Child tables whose rows reference this table through `source_id`,
    /// each with the sequences in which that link exists.
    #[must_use]
    pub fn child_links(self) -> Vec<(StepTable, Vec<OmicSequence>)> {
        let mut links: Vec<(StepTable, Vec<OmicSequence>)> = Vec::new();
        for sequence in OmicSequence::ALL {
            for &step in sequence.steps() {
                let parent_table = step.parent(sequence).and_then(SequenceStep::table);
                let Some(table) = step.table() else {
                    continue;
                };
                if parent_table != Some(self) {
                    continue;
                }
                match links.iter_mut().find(|(t, _)| *t == table) {
                    Some((_, sequences)) => sequences.push(sequence),
                    None => links.push((table, vec![sequence])),
                }
            }
        }
        links
    }
}

impl fmt::Display for StepTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn are_valid_sequence_step(sequence: &str, step: &str) -> bool {
    match (OmicSequence::parse(sequence), SequenceStep::parse(step)) {
        (Some(sequence), Some(step)) => sequence.has_step(step),
        _ => false,
    }
}

/// Storage table of `step` and, inside `sequence`, the storage table of its
/// parent. `None` when either name is unknown.
pub fn get_reference_tables(sequence: &str, step: &str) -> Option<(StepTable, Option<StepTable>)> {
    let sequence = OmicSequence::parse(sequence)?;
    let step = SequenceStep::parse(step)?;
    let table = step.table()?;
    let parent = step.parent(sequence).and_then(SequenceStep::table);
    Some((table, parent))
}
