//! Library entry for eledat-cli used by integration tests and embedding.

pub mod commands;

// Re-export commands for convenience
pub use commands::*;

use eledat_core::ScanLayout;

/// Scan header layout selectable on the command line
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LayoutArg {
    /// FCF in scan header word 35
    Legacy,
    /// FCF in scan header word 34
    Revised,
}

impl From<LayoutArg> for ScanLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Legacy => ScanLayout::LEGACY,
            LayoutArg::Revised => ScanLayout::REVISED,
        }
    }
}

/// How scans are located in each input file
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Traversal {
    /// Follow the file's scan index
    Indexed,
    /// Resynchronise on scan headers, ignoring the index
    Recover,
}

impl Traversal {
    /// Layout used when none is given on the command line
    pub fn default_layout(self) -> ScanLayout {
        match self {
            Traversal::Indexed => ScanLayout::LEGACY,
            Traversal::Recover => ScanLayout::REVISED,
        }
    }
}
