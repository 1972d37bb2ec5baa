//! 🧠欢迎光临🫐
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::data::bbox::BoundingBox;
pub use crate::data::load;
pub use crate::data::mask::{BrainMaskProvider, IntensityThreshold, ProbabilityMapFile};
pub use crate::data::{CroppedVolume, DenoisedVolume, MaskedVolume, NormalizedVolume, RawVolume};

pub use crate::consts::gray::{BACKGROUND, MASK_ON};

pub use crate::config::SegmentConfig;
pub use crate::error::{PipelineError, Result};

pub use crate::seg::{detect_peaks, Histogram, PeakSet, TissueMasks, TissueStats};

pub use crate::pipeline::batch::{BatchRunner, BatchSummary};
pub use crate::pipeline::{Outcome, Segmentation, Stage, SubjectPipeline};

pub use crate::dataset::{self, home_dataset_dir_with};
pub use crate::dataset::{Participant, Participants, ResultsStore, SubjectRecord};

pub use crate::visual::{GifSink, NoVisualization, VisualizationSink};
