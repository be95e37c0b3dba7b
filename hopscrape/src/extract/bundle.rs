//! Named raw text blocks collected for one device.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use log::warn;

/// Block holding `show running-config | include ^hostname`.
pub const HOSTNAME_BLOCK: &str = "hostname";
/// Block holding `show version`.
pub const VERSION_BLOCK: &str = "version";
/// Block holding `show platform`.
pub const PLATFORM_BLOCK: &str = "platform";
/// Block holding the Loopback0 interface line.
pub const LOOPBACK_BLOCK: &str = "loopback";
/// Block holding `show cdp neighbors`.
pub const CDP_BLOCK: &str = "cdp";
/// Block holding `show lldp neighbors`.
pub const LLDP_BLOCK: &str = "lldp";

/// Blocks fed to extraction, in the order they are concatenated.
pub const EXTRACTION_BLOCKS: [&str; 4] = [HOSTNAME_BLOCK, LOOPBACK_BLOCK, PLATFORM_BLOCK, VERSION_BLOCK];

/// How a block's text was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    /// The response ended with a prompt (or the text came from a file).
    Complete,
    /// The command's timeout elapsed first; the text is partial.
    TimedOut,
    /// The command failed; the text is whatever was captured.
    Failed { reason: String },
}

/// One named piece of raw output.
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub name: String,
    pub text: String,
    pub status: CaptureStatus,
}

impl RawBlock {
    pub fn complete(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            status: CaptureStatus::Complete,
        }
    }
}

/// Ordered collection of raw blocks for one device.
///
/// A bundle whose backing text could not be read is marked unavailable;
/// extracting it yields the "File not found" sentinel record.
#[derive(Debug, Clone, Default)]
pub struct RawOutputBundle {
    blocks: IndexMap<String, RawBlock>,
    unavailable: Option<String>,
}

impl RawOutputBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bundle whose source could not be read.
    pub fn unavailable(source: impl Into<String>) -> Self {
        Self {
            blocks: IndexMap::new(),
            unavailable: Some(source.into()),
        }
    }

    /// Load one saved log file as a single block named after the file stem.
    ///
    /// A file that cannot be read yields an unavailable bundle.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read(path) {
            Ok(bytes) => {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                let mut bundle = Self::new();
                bundle.push(RawBlock::complete(name, String::from_utf8_lossy(&bytes).into_owned()));
                bundle
            }
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                Self::unavailable(path.display().to_string())
            }
        }
    }

    /// Add a complete block.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.push(RawBlock::complete(name, text));
    }

    /// Add a block, replacing any earlier block with the same name.
    pub fn push(&mut self, block: RawBlock) {
        self.blocks.insert(block.name.clone(), block);
    }

    pub fn get(&self, name: &str) -> Option<&RawBlock> {
        self.blocks.get(name)
    }

    /// Text of the named block.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.blocks.get(name).map(|b| b.text.as_str())
    }

    pub fn blocks(&self) -> impl Iterator<Item = &RawBlock> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The source that could not be read, if any.
    pub fn unavailable_source(&self) -> Option<&str> {
        self.unavailable.as_deref()
    }

    pub fn is_unavailable(&self) -> bool {
        self.unavailable.is_some()
    }

    /// Text the field patterns run over.
    ///
    /// When the standard blocks are present, they are joined in
    /// [`EXTRACTION_BLOCKS`] order and neighbor output is left out.
    /// Otherwise every block is joined in insertion order.
    pub fn extraction_text(&self) -> String {
        let standard: Vec<&str> = EXTRACTION_BLOCKS
            .iter()
            .filter_map(|name| self.text(name))
            .collect();

        if standard.is_empty() {
            self.blocks
                .values()
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            standard.join("\n")
        }
    }
}
