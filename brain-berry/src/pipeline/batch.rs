//! 批处理: 逐个受试者运行流程, 结果写入结果表.
//!
//! 受试者之间互不影响. 结果表中已有的受试者直接跳过, 因此中断后重新运行会从断点继续.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::{Outcome, SubjectPipeline};
use crate::dataset::{self, Participant, Participants, ResultsStore, SubjectRecord};
use crate::visual::VisualizationSink;
use crate::{BrainMaskProvider, Result, SegmentConfig};

/// 一次批处理的计数.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// 本次成功处理并写入结果表的受试者数.
    pub processed: usize,
    /// 结果表中已有, 因而跳过的受试者数.
    pub resumed: usize,
    /// 处理失败而跳过的受试者数.
    pub skipped: usize,
    /// 找不到原始扫描的受试者数.
    pub missing: usize,
}

impl BatchSummary {
    /// 受试者总数.
    #[inline]
    pub fn total(&self) -> usize {
        self.processed + self.resumed + self.skipped + self.missing
    }
}

/// 单个受试者的批处理结果.
enum Step {
    Processed,
    Resumed,
    Skipped,
    Missing,
}

/// 批处理器.
pub struct BatchRunner<'a> {
    anat_dir: PathBuf,
    config: SegmentConfig,
    provider: &'a dyn BrainMaskProvider,
    sink: &'a dyn VisualizationSink,
}

impl<'a> BatchRunner<'a> {
    /// 在 `anat_dir` 中查找原始扫描. `config` 不合法时返回
    /// [`crate::PipelineError::InvalidConfig`].
    pub fn new<P: AsRef<Path>>(
        anat_dir: P,
        config: SegmentConfig,
        provider: &'a dyn BrainMaskProvider,
        sink: &'a dyn VisualizationSink,
    ) -> Result<Self> {
        Ok(Self {
            anat_dir: anat_dir.as_ref().to_owned(),
            config: config.validate()?,
            provider,
            sink,
        })
    }

    /// 按列表顺序处理所有受试者.
    ///
    /// 单个受试者的失败只会被记录并跳过. 只有写结果表失败时才提前返回错误,
    /// 此时结果表仍保持上一次成功写入的内容.
    pub fn run(&self, participants: &Participants, store: &mut ResultsStore) -> Result<BatchSummary> {
        let mut pipeline = SubjectPipeline::new(self.config, self.provider)?;
        let mut summary = BatchSummary::default();

        for p in participants {
            match self.run_one(&mut pipeline, p, store)? {
                Step::Processed => summary.processed += 1,
                Step::Resumed => summary.resumed += 1,
                Step::Skipped => summary.skipped += 1,
                Step::Missing => summary.missing += 1,
            }
        }
        info!(
            "{} subject(s): {} processed, {} already processed, {} skipped, {} without volume",
            summary.total(),
            summary.processed,
            summary.resumed,
            summary.skipped,
            summary.missing
        );
        Ok(summary)
    }

    fn run_one(
        &self,
        pipeline: &mut SubjectPipeline<'_>,
        participant: &Participant,
        store: &mut ResultsStore,
    ) -> Result<Step> {
        let id = participant.participant_id.as_str();
        if store.contains(id) {
            info!("{id} already processed");
            return Ok(Step::Resumed);
        }

        let file = match dataset::find_subject_volume(&self.anat_dir, id) {
            Ok(Some(file)) => file,
            Ok(None) => {
                debug!("{id}: no volume in {}", self.anat_dir.display());
                return Ok(Step::Missing);
            }
            Err(e) => {
                warn!("{id}: cannot search {}: {e}", self.anat_dir.display());
                return Ok(Step::Missing);
            }
        };

        let seg = match pipeline.run_file(&file) {
            Outcome::Done(seg) => seg,
            Outcome::Skipped { stage, error } => {
                warn!("{id}: skipped after {stage:?}: {error}");
                return Ok(Step::Skipped);
            }
        };

        if let Err(e) = self.sink.render(id, &seg) {
            warn!("{id}: visualization failed: {e}");
        }

        let stats = seg.stats();
        let record = SubjectRecord {
            subject: id.to_string(),
            white_gray_ratio: seg.white_gray_ratio(),
            white: stats.white,
            gray: stats.gray,
            csf: stats.csf,
            margin: seg.margin(),
            condition: participant.condit.clone(),
            file: file.clone(),
        };
        store.append(record)?;
        info!(
            "{} {} {:.4}",
            file.display(),
            participant.condit,
            seg.white_gray_ratio()
        );
        Ok(Step::Processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Segmentation;
    use crate::visual::NoVisualization;
    use crate::RawVolume;
    use image::ImageResult;
    use ndarray::{s, Array3, ArrayView3};
    use nifti::NiftiHeader;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    struct Unreachable;

    impl BrainMaskProvider for Unreachable {
        fn brain_probability(&self, _: &crate::NormalizedVolume) -> Result<Array3<f32>> {
            panic!("resumed subjects must not be processed");
        }
    }

    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);

    impl VisualizationSink for Recorder {
        fn render(&self, subject: &str, _: &Segmentation) -> ImageResult<()> {
            self.0.borrow_mut().push(subject.to_string());
            Ok(())
        }
    }

    fn keep_positive(v: ArrayView3<f32>) -> Array3<f32> {
        v.mapv(|x| if x > 0.0 { 1.0 } else { 0.0 })
    }

    fn participants(ids: &[&str]) -> Participants {
        Participants::from_rows(
            ids.iter()
                .map(|id| Participant {
                    participant_id: id.to_string(),
                    condit: "control".to_string(),
                })
                .collect(),
        )
    }

    fn record(id: &str) -> SubjectRecord {
        SubjectRecord {
            subject: id.to_string(),
            white_gray_ratio: 0.75,
            white: 255 * 3,
            gray: 255 * 4,
            csf: 0,
            margin: 10,
            condition: "control".to_string(),
            file: PathBuf::from(format!("anat/{id}_T1w.nii.gz")),
        }
    }

    /// 写一个沿轴 1 单调的三簇扫描. 轴 1 不参与旋转, 旋转后仍然沿轴 1 单调.
    fn write_three_clusters(path: &Path) {
        let levels = [16u8, 116, 216]
            .into_iter()
            .flat_map(|base| (0..9).flat_map(move |d| [base + d; 2]))
            .collect::<Vec<_>>();
        let mut data = Array3::<f32>::zeros((20, levels.len() + 2, 20));
        for (j, level) in levels.iter().enumerate() {
            data.slice_mut(s![1..19, j + 1, 1..19]).fill(*level as f32);
        }

        let header = NiftiHeader {
            scl_slope: 1.0,
            scl_inter: 0.0,
            magic: *nifti::header::MAGIC_CODE_NIP1,
            ..NiftiHeader::default()
        };
        nifti::writer::WriterOptions::new(path)
            .reference_header(&header)
            .write_nifti(&data)
            .unwrap();
    }

    #[test]
    fn test_resume_keeps_existing_record() {
        let dir = tempdir().unwrap();
        let anat = dir.path().join("anat");
        fs::create_dir(&anat).unwrap();
        fs::write(anat.join("sub-01_T1w.nii.gz"), b"not a nifti file").unwrap();

        let store_path = dir.path().join("processed.csv");
        let mut store = ResultsStore::open(&store_path).unwrap();
        store.append(record("sub-01")).unwrap();
        let before = fs::read(&store_path).unwrap();

        let runner = BatchRunner::new(&anat, SegmentConfig::default(), &Unreachable, &NoVisualization)
            .unwrap();
        let summary = runner.run(&participants(&["sub-01"]), &mut store).unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                resumed: 1,
                ..BatchSummary::default()
            }
        );
        assert_eq!(fs::read(&store_path).unwrap(), before);
        assert_eq!(store.records(), &[record("sub-01")]);
    }

    #[test]
    fn test_failures_do_not_write_records() {
        let dir = tempdir().unwrap();
        let anat = dir.path().join("anat");
        fs::create_dir(&anat).unwrap();
        fs::write(anat.join("sub-02_T1w.nii.gz"), b"not a nifti file").unwrap();

        let store_path = dir.path().join("processed.csv");
        let mut store = ResultsStore::open(&store_path).unwrap();
        let runner = BatchRunner::new(&anat, SegmentConfig::default(), &keep_positive, &NoVisualization)
            .unwrap();
        let summary = runner
            .run(&participants(&["sub-02", "sub-03"]), &mut store)
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.total(), 2);
        assert!(store.is_empty());
        assert!(!store_path.exists());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SegmentConfig::default().with_hist_median_window(0);
        assert!(matches!(
            BatchRunner::new("anat", config, &keep_positive, &NoVisualization),
            Err(crate::PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_process_and_resume() {
        let dir = tempdir().unwrap();
        let anat = dir.path().join("anat");
        fs::create_dir(&anat).unwrap();
        write_three_clusters(&anat.join("sub-04_T1w.nii.gz"));
        let raw = RawVolume::open(anat.join("sub-04_T1w.nii.gz")).unwrap();
        assert_eq!(raw.shape(), (20, 56, 20));

        let store_path = dir.path().join("processed.csv");
        let config = SegmentConfig::default().with_peak_height(40_000);
        let sink = Recorder::default();
        let runner = BatchRunner::new(&anat, config, &keep_positive, &sink).unwrap();

        let mut store = ResultsStore::open(&store_path).unwrap();
        let first = runner.run(&participants(&["sub-04"]), &mut store).unwrap();
        assert_eq!(first.processed, 1);
        assert_eq!(*sink.0.borrow(), ["sub-04"]);

        let rec = &store.records()[0];
        assert_eq!(rec.subject, "sub-04");
        assert_eq!(rec.condition, "control");
        assert_eq!(rec.margin, 10);
        assert!(rec.gray > 0 && rec.white > 0 && rec.csf > 0);
        assert!(rec.file.ends_with("sub-04_T1w.nii.gz"));

        // 重新打开后再次运行, 不再处理.
        let mut store = ResultsStore::open(&store_path).unwrap();
        let second = runner.run(&participants(&["sub-04"]), &mut store).unwrap();
        assert_eq!(second.resumed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(sink.0.borrow().len(), 1);
    }
}
