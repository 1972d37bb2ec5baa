//! 程序运行函数.

use std::path::{Path, PathBuf};

use brain_berry::dataset::{participants, results, Participants, ResultsStore};
use brain_berry::pipeline::batch::{BatchRunner, BatchSummary};
use brain_berry::visual::{GifSink, NoVisualization, VisualizationSink};
use brain_berry::{BrainMaskProvider, IntensityThreshold, PipelineError, ProbabilityMapFile, Result};
use log::{info, warn};

use crate::args::Args;

fn or_under(path: &Option<PathBuf>, root: &Path, name: &str) -> PathBuf {
    path.clone().unwrap_or_else(|| root.join(name))
}

/// 实际运行.
pub fn run(args: &Args) -> Result<BatchSummary> {
    let root = args
        .data_dir
        .clone()
        .or_else(utils::data_dir_from_env_or_home)
        .ok_or(PipelineError::InvalidConfig(
            "cannot determine the data directory, pass --data-dir or set $BRAIN_DATA_DIR",
        ))?;
    let config = args.segment_config().validate()?;

    let participants_path = args
        .participants
        .clone()
        .unwrap_or_else(|| participants::default_path(&root));
    let results_path = args
        .results
        .clone()
        .unwrap_or_else(|| results::default_path(&root));
    let anat_dir = or_under(&args.anat_dir, &root, "anat");

    let provider: Box<dyn BrainMaskProvider> = match &args.mask_dir {
        Some(dir) => Box::new(ProbabilityMapFile::new(dir)),
        None => {
            warn!(
                "no --mask-dir given, keeping voxels above intensity {}",
                args.intensity_level
            );
            Box::new(IntensityThreshold::new(args.intensity_level))
        }
    };
    let sink: Box<dyn VisualizationSink> = if args.no_gif {
        Box::new(NoVisualization)
    } else {
        Box::new(GifSink::new(or_under(&args.gif_dir, &root, "gifs")))
    };

    let participants = Participants::open(&participants_path)?;
    let mut store = ResultsStore::open(&results_path)?;
    info!(
        "{} participant(s), {} already in {}",
        participants.len(),
        store.len(),
        results_path.display()
    );
    utils::sep();

    BatchRunner::new(anat_dir, config, provider.as_ref(), sink.as_ref())?
        .run(&participants, &mut store)
}
