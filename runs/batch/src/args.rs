//! 命令行参数.

use std::path::PathBuf;

use brain_berry::SegmentConfig;
use clap::Parser;

/// 命令行参数. 未给出的路径都从数据根目录推导.
#[derive(Parser, Debug)]
#[command(name = "batch")]
#[command(version, about = "Segment brain MRI volumes into white matter, gray matter and CSF", long_about = None)]
pub struct Args {
    /// Data root (default: $BRAIN_DATA_DIR or $HOME/dataset/brain)
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Participants table (default: <DATA_DIR>/participants.tsv)
    #[arg(short, long, value_name = "FILE")]
    pub participants: Option<PathBuf>,

    /// Directory holding the raw volumes (default: <DATA_DIR>/anat)
    #[arg(short, long, value_name = "DIR")]
    pub anat_dir: Option<PathBuf>,

    /// Results table (default: <DATA_DIR>/processed.csv)
    #[arg(short, long, value_name = "FILE")]
    pub results: Option<PathBuf>,

    /// Directory for the inspection GIFs (default: <DATA_DIR>/gifs)
    #[arg(long, value_name = "DIR")]
    pub gif_dir: Option<PathBuf>,

    /// Do not write inspection GIFs
    #[arg(long)]
    pub no_gif: bool,

    /// Directory of precomputed brain probability maps, named like the raw volumes
    #[arg(short, long, value_name = "DIR")]
    pub mask_dir: Option<PathBuf>,

    /// Without --mask-dir, keep voxels whose normalized intensity exceeds this level
    #[arg(long, value_name = "LEVEL", default_value = "0.0")]
    pub intensity_level: f32,

    /// Intensity margin around the peaks
    #[arg(long, value_name = "N")]
    pub margin: Option<i32>,

    /// Minimum height of a histogram peak
    #[arg(long, value_name = "N")]
    pub peak_height: Option<u64>,

    /// Window of the histogram median filter (odd)
    #[arg(long, value_name = "N")]
    pub median_window: Option<usize>,

    /// Brain probability below which voxels are dropped
    #[arg(long, value_name = "P")]
    pub mask_threshold: Option<f32>,

    /// Radius of the slice median filter
    #[arg(long, value_name = "N")]
    pub denoise_radius: Option<usize>,

    /// Print debug logs
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 以默认参数为基础, 应用命令行给出的覆盖项.
    pub fn segment_config(&self) -> SegmentConfig {
        let mut c = SegmentConfig::default();
        if let Some(v) = self.margin {
            c = c.with_margin(v);
        }
        if let Some(v) = self.peak_height {
            c = c.with_peak_height(v);
        }
        if let Some(v) = self.median_window {
            c = c.with_hist_median_window(v);
        }
        if let Some(v) = self.mask_threshold {
            c = c.with_mask_threshold(v);
        }
        if let Some(v) = self.denoise_radius {
            c = c.with_denoise_radius(v);
        }
        c
    }
}
