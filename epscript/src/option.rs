use crate::graphics::trans::PageRect;
use educe::Educe;

/// US Letter, used when the document declares no bounding box.
const DEFAULT_PAGE: (f64, f64) = (612.0, 792.0);

/// Option for [`crate::Machine`]
#[derive(Debug, Educe, Clone)]
#[educe(Default)]
pub struct MachineOption {
    /// PostScript language level, 1 to 3, selects registered operators.
    #[educe(Default = 3)]
    level: u8,
    /// Max nesting of procedure calls, child machines and color space
    /// resolution.
    #[educe(Default = 256)]
    max_depth: usize,
    /// Abort after this many operations, shared by child machines.
    max_operations: Option<u64>,
    /// Page box in default user space, defines the device flip.
    page_box: Option<PageRect>,
}

impl MachineOption {
    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn max_operations(&self) -> Option<u64> {
        self.max_operations
    }

    pub fn page_box(&self) -> PageRect {
        self.page_box.unwrap_or_else(|| {
            PageRect::new((0.0, 0.0).into(), DEFAULT_PAGE.into())
        })
    }
}

#[derive(Educe)]
#[educe(Default(new))]
pub struct MachineOptionBuilder(MachineOption);

impl From<MachineOption> for MachineOptionBuilder {
    fn from(option: MachineOption) -> Self {
        Self(option)
    }
}

impl MachineOptionBuilder {
    /// Language level is clamped to 1..=3.
    pub fn level(mut self, level: u8) -> Self {
        self.0.level = level.clamp(1, 3);
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.0.max_depth = depth;
        self
    }

    pub fn max_operations(mut self, n: Option<u64>) -> Self {
        self.0.max_operations = n;
        self
    }

    pub fn page_box(mut self, page: PageRect) -> Self {
        self.0.page_box = Some(page);
        self
    }

    pub fn build(self) -> MachineOption {
        self.0
    }
}
