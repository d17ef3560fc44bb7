//! Stage orchestration.
//!
//! A [`Pipeline`] owns the output of every stage and a [`StageStatus`] per
//! stage. Stages form a chain:
//!
//! ```text
//! database → partition → clustering → vocabulary → signatures → index → ranking → evaluation
//! ```
//!
//! Running or loading a stage clears everything after it in the chain. A
//! failed run or load marks the stage `Failed` and leaves the previously held
//! result in place, so nothing downstream of it changes.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use cluster::{Clustering, ClusteringEngine, Vocabulary, select_vocabulary};
use eval::{Evaluation, evaluate};
use index::{PostingList, Ranker, Ranking, RelevanceJudge};
use kernel::DiagonalDistanceEngine;
use sequence::{ClassPostingList, Partition, SequenceDatabase, SimilarityMatrix};
use signature::{SignatureEncoder, SparseSignature};

use crate::config::EngineConfig;
use crate::metrics::{MetricsSpan, PipelineMetrics, StageAction};
use crate::store::{
    ArtifactFormat, PROTOTYPES_TAG, PrototypeArtifact, RANKINGS_TAG, RankingArtifact,
    SIGNATURES_TAG, SignatureArtifact, VOCABULARY_TAG, VocabularyArtifact, read_artifact,
    write_artifact,
};
use crate::PipelineError;

const EVALUATION_TAG: &str = "evaluation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Database,
    Partition,
    Clustering,
    Vocabulary,
    Signatures,
    Index,
    Ranking,
    Evaluation,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Database,
        Stage::Partition,
        Stage::Clustering,
        Stage::Vocabulary,
        Stage::Signatures,
        Stage::Index,
        Stage::Ranking,
        Stage::Evaluation,
    ];

    /// Stages whose results depend on this one.
    pub fn downstream(self) -> &'static [Stage] {
        &Self::ALL[self as usize + 1..]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Database => "database",
            Stage::Partition => "partition",
            Stage::Clustering => "clustering",
            Stage::Vocabulary => "vocabulary",
            Stage::Signatures => "signatures",
            Stage::Index => "index",
            Stage::Ranking => "ranking",
            Stage::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StageStatus {
    #[default]
    NotReady,
    Ready,
    /// Last run or load failed with this reason.
    Failed(String),
}

impl StageStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, StageStatus::Ready)
    }
}

pub struct Pipeline {
    config: EngineConfig,
    kernel: DiagonalDistanceEngine,
    pool: Option<ThreadPool>,
    metrics: Option<Arc<dyn PipelineMetrics>>,
    status: [StageStatus; 8],
    database: Option<SequenceDatabase>,
    partition: Option<Partition>,
    clustering: Option<Clustering>,
    vocabulary: Option<Vocabulary>,
    signatures: Option<Vec<SparseSignature>>,
    postings: Option<PostingList>,
    rankings: Option<Vec<Ranking>>,
    evaluation: Option<Evaluation>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("matrix", self.kernel.matrix())
            .field("status", &self.status)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Validate `config` and build the matrix, kernel and worker pool. No
    /// data is read until a stage runs.
    pub fn new(config: EngineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let matrix = config.matrix.build()?;
        let kernel = DiagonalDistanceEngine::new(matrix, config.matrix.kernel_mode)?;
        let pool = match config.threads {
            0 => None,
            threads => Some(
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("kmer-search-{i}"))
                    .build()
                    .map_err(|e| PipelineError::Configuration(format!("worker pool: {e}")))?,
            ),
        };
        Ok(Self {
            config,
            kernel,
            pool,
            metrics: None,
            status: Default::default(),
            database: None,
            partition: None,
            clustering: None,
            vocabulary: None,
            signatures: None,
            postings: None,
            rankings: None,
            evaluation: None,
        })
    }

    pub fn with_metrics(mut self, recorder: Arc<dyn PipelineMetrics>) -> Self {
        self.metrics = Some(recorder);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn matrix(&self) -> &SimilarityMatrix {
        self.kernel.matrix()
    }

    pub fn kernel(&self) -> &DiagonalDistanceEngine {
        &self.kernel
    }

    pub fn status(&self, stage: Stage) -> &StageStatus {
        &self.status[stage as usize]
    }

    pub fn database(&self) -> Option<&SequenceDatabase> {
        self.database.as_ref()
    }

    pub fn partition(&self) -> Option<&Partition> {
        self.partition.as_ref()
    }

    pub fn clustering(&self) -> Option<&Clustering> {
        self.clustering.as_ref()
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }

    pub fn signatures(&self) -> Option<&[SparseSignature]> {
        self.signatures.as_deref()
    }

    pub fn postings(&self) -> Option<&PostingList> {
        self.postings.as_ref()
    }

    pub fn rankings(&self) -> Option<&[Ranking]> {
        self.rankings.as_deref()
    }

    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.evaluation.as_ref()
    }

    // ── Runs ────────────────────────────────────────────────────────────

    /// Read the FASTA file named by `database.path`.
    pub fn run_database(&mut self) -> Result<&SequenceDatabase, PipelineError> {
        let span = self.span(Stage::Database, StageAction::Run);
        let result = self.read_database();
        let db = self.settle(Stage::Database, StageAction::Run, span, result)?;
        Ok(&*self.database.insert(db))
    }

    /// Use an already built database. Its alphabet must be the matrix's.
    pub fn set_database(&mut self, db: SequenceDatabase) -> Result<&SequenceDatabase, PipelineError> {
        let span = self.span(Stage::Database, StageAction::Load);
        let result = if db.alphabet() == self.matrix().alphabet() {
            Ok(db)
        } else {
            Err(PipelineError::Configuration(format!(
                "database alphabet {:?} does not match matrix alphabet {:?}",
                db.alphabet(),
                self.matrix().alphabet()
            )))
        };
        let db = self.settle(Stage::Database, StageAction::Load, span, result)?;
        Ok(&*self.database.insert(db))
    }

    pub fn run_partition(&mut self) -> Result<&Partition, PipelineError> {
        let span = self.span(Stage::Partition, StageAction::Run);
        let result = self.compute_partition();
        let partition = self.settle(Stage::Partition, StageAction::Run, span, result)?;
        Ok(&*self.partition.insert(partition))
    }

    /// Cluster every k-mer of the training sequences.
    pub fn run_clustering(&mut self) -> Result<&Clustering, PipelineError> {
        let span = self.span(Stage::Clustering, StageAction::Run);
        let result = self.compute_clustering();
        let clustering = self.settle(Stage::Clustering, StageAction::Run, span, result)?;
        Ok(&*self.clustering.insert(clustering))
    }

    pub fn run_vocabulary(&mut self) -> Result<&Vocabulary, PipelineError> {
        let span = self.span(Stage::Vocabulary, StageAction::Run);
        let result = self.compute_vocabulary();
        let vocabulary = self.settle(Stage::Vocabulary, StageAction::Run, span, result)?;
        Ok(&*self.vocabulary.insert(vocabulary))
    }

    /// Encode every database sequence, training and test alike.
    pub fn run_signatures(&mut self) -> Result<&[SparseSignature], PipelineError> {
        let span = self.span(Stage::Signatures, StageAction::Run);
        let result = self.compute_signatures();
        let signatures = self.settle(Stage::Signatures, StageAction::Run, span, result)?;
        Ok(self.signatures.insert(signatures).as_slice())
    }

    /// Index the training signatures.
    pub fn run_index(&mut self) -> Result<&PostingList, PipelineError> {
        let span = self.span(Stage::Index, StageAction::Run);
        let result = self.compute_index();
        let postings = self.settle(Stage::Index, StageAction::Run, span, result)?;
        Ok(&*self.postings.insert(postings))
    }

    /// Rank every test sequence against the index and judge the rankings
    /// with training class labels.
    pub fn run_ranking(&mut self) -> Result<&[Ranking], PipelineError> {
        let span = self.span(Stage::Ranking, StageAction::Run);
        let result = self.compute_rankings();
        let rankings = self.settle(Stage::Ranking, StageAction::Run, span, result)?;
        Ok(self.rankings.insert(rankings).as_slice())
    }

    pub fn run_evaluation(&mut self) -> Result<&Evaluation, PipelineError> {
        let span = self.span(Stage::Evaluation, StageAction::Run);
        let result = self.compute_evaluation();
        let evaluation = self.settle(Stage::Evaluation, StageAction::Run, span, result)?;
        Ok(&*self.evaluation.insert(evaluation))
    }

    /// Run every stage in order. A database set through
    /// [`set_database`](Self::set_database) is kept; otherwise it is read
    /// from the configured path.
    pub fn run_all(&mut self) -> Result<&Evaluation, PipelineError> {
        if self.database.is_none() {
            self.run_database()?;
        }
        self.run_partition()?;
        self.run_clustering()?;
        self.run_vocabulary()?;
        self.run_signatures()?;
        self.run_index()?;
        self.run_ranking()?;
        self.run_evaluation()
    }

    // ── Persistence ─────────────────────────────────────────────────────

    pub fn save_clustering(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let path = path.as_ref();
        let span = self.span(Stage::Clustering, StageAction::Save);
        let result = self.write_clustering(path);
        self.observe(Stage::Clustering, StageAction::Save, span, result)
    }

    pub fn save_vocabulary(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let path = path.as_ref();
        let span = self.span(Stage::Vocabulary, StageAction::Save);
        let result = self.write_vocabulary(path);
        self.observe(Stage::Vocabulary, StageAction::Save, span, result)
    }

    pub fn save_signatures(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let path = path.as_ref();
        let span = self.span(Stage::Signatures, StageAction::Save);
        let result = self.write_signatures(path);
        self.observe(Stage::Signatures, StageAction::Save, span, result)
    }

    pub fn save_rankings(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let path = path.as_ref();
        let span = self.span(Stage::Ranking, StageAction::Save);
        let result = self.write_rankings(path);
        self.observe(Stage::Ranking, StageAction::Save, span, result)
    }

    /// Write every available artifact into `dir` using the configured output
    /// format, returning the written paths.
    pub fn save_all(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, PipelineError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| PipelineError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let ext = self.config.output.format.extension();
        let mut written = Vec::new();

        if self.clustering.is_some() {
            let path = dir.join(format!("{PROTOTYPES_TAG}.{ext}"));
            self.save_clustering(&path)?;
            written.push(path);
        }
        if self.vocabulary.is_some() {
            let path = dir.join(format!("{VOCABULARY_TAG}.{ext}"));
            self.save_vocabulary(&path)?;
            written.push(path);
        }
        if self.signatures.is_some() {
            let path = dir.join(format!("{SIGNATURES_TAG}.{ext}"));
            self.save_signatures(&path)?;
            written.push(path);
        }
        if self.rankings.is_some() {
            let path = dir.join(format!("{RANKINGS_TAG}.{ext}"));
            self.save_rankings(&path)?;
            written.push(path);
        }
        if let Some(evaluation) = &self.evaluation {
            let path = dir.join(format!("{EVALUATION_TAG}.{ext}"));
            let span = self.span(Stage::Evaluation, StageAction::Save);
            let result = write_artifact(&path, self.format_for(&path), EVALUATION_TAG, evaluation);
            self.observe(Stage::Evaluation, StageAction::Save, span, result)?;
            written.push(path);
        }
        info!(dir = %dir.display(), artifacts = written.len(), "artifacts saved");
        Ok(written)
    }

    /// Replace the clustering with a saved one. The artifact must match the
    /// configured k and the pipeline's matrix.
    pub fn load_clustering(&mut self, path: impl AsRef<Path>) -> Result<&Clustering, PipelineError> {
        let span = self.span(Stage::Clustering, StageAction::Load);
        let result = self.read_clustering(path.as_ref());
        let clustering = self.settle(Stage::Clustering, StageAction::Load, span, result)?;
        Ok(&*self.clustering.insert(clustering))
    }

    pub fn load_vocabulary(&mut self, path: impl AsRef<Path>) -> Result<&Vocabulary, PipelineError> {
        let span = self.span(Stage::Vocabulary, StageAction::Load);
        let result = self.read_vocabulary(path.as_ref());
        let vocabulary = self.settle(Stage::Vocabulary, StageAction::Load, span, result)?;
        Ok(&*self.vocabulary.insert(vocabulary))
    }

    /// Replace the signatures with a saved batch. A batch carrying any id
    /// outside the current vocabulary is discarded whole.
    pub fn load_signatures(&mut self, path: impl AsRef<Path>) -> Result<&[SparseSignature], PipelineError> {
        let span = self.span(Stage::Signatures, StageAction::Load);
        let result = self.read_signatures(path.as_ref());
        let signatures = self.settle(Stage::Signatures, StageAction::Load, span, result)?;
        Ok(self.signatures.insert(signatures).as_slice())
    }

    pub fn load_rankings(&mut self, path: impl AsRef<Path>) -> Result<&[Ranking], PipelineError> {
        let span = self.span(Stage::Ranking, StageAction::Load);
        let result = self.read_rankings(path.as_ref());
        let rankings = self.settle(Stage::Ranking, StageAction::Load, span, result)?;
        Ok(self.rankings.insert(rankings).as_slice())
    }

    // ── Stage bodies ────────────────────────────────────────────────────

    fn read_database(&self) -> Result<SequenceDatabase, PipelineError> {
        let path = self
            .config
            .database
            .path
            .as_ref()
            .ok_or_else(|| PipelineError::Configuration("database.path is not set".to_string()))?;
        let db = SequenceDatabase::from_fasta_file(
            path,
            self.matrix().alphabet().clone(),
            self.config.database.layout.clone(),
        )
        .map_err(|e| match e {
            sequence::SequenceError::Io(reason) => PipelineError::Io {
                path: path.clone(),
                source: std::io::Error::other(reason),
            },
            other => PipelineError::Sequence(other),
        })?;
        Ok(db)
    }

    fn compute_partition(&self) -> Result<Partition, PipelineError> {
        let n = self.require_database()?.len();
        let partition = match self.config.partition.test_fraction {
            Some(fraction) => Partition::split(n, fraction, self.config.partition.seed)?,
            None => Partition::all(n),
        };
        info!(
            training = partition.training().len(),
            test = partition.test().len(),
            "partition ready"
        );
        Ok(partition)
    }

    fn compute_clustering(&self) -> Result<Clustering, PipelineError> {
        let db = self.require_database()?;
        let partition = self.require_partition()?;
        let engine = ClusteringEngine::new(self.kernel.clone(), self.config.cluster.clone())?;
        let population = db.kmer_population(partition.training(), self.config.cluster.kmer_length)?;
        debug!(population = population.len(), "clustering population collected");
        let clustering = self.install(|| engine.cluster(db, &population))?;
        Ok(clustering)
    }

    fn compute_vocabulary(&self) -> Result<Vocabulary, PipelineError> {
        let clustering = self.require_clustering()?;
        let vocabulary = select_vocabulary(
            &clustering.prototypes,
            clustering.kmer_length,
            &self.config.vocabulary,
        )?;
        Ok(vocabulary)
    }

    fn compute_signatures(&self) -> Result<Vec<SparseSignature>, PipelineError> {
        let db = self.require_database()?;
        let vocabulary = self.require_vocabulary()?;
        let encoder = SignatureEncoder::new(vocabulary, &self.kernel, &self.config.signature)?;
        Ok(self.install(|| encoder.encode_all(db)))
    }

    fn compute_index(&self) -> Result<PostingList, PipelineError> {
        let partition = self.require_partition()?;
        let vocabulary = self.require_vocabulary()?;
        let signatures = self.require_signatures()?;
        let postings = PostingList::build(signatures, partition.training(), vocabulary.len())?;
        Ok(postings)
    }

    fn compute_rankings(&self) -> Result<Vec<Ranking>, PipelineError> {
        let db = self.require_database()?;
        let partition = self.require_partition()?;
        let signatures = self.require_signatures()?;
        let postings = self.require_postings()?;
        let ranker = Ranker::new(signatures, postings, &self.config.rank)?;
        let mut rankings = self.install(|| ranker.rank_all(partition.test()))?;

        let classes = ClassPostingList::build(db, partition.training());
        let judge = RelevanceJudge::new(db, &classes, self.config.rank.exclude_self);
        let skipped = judge.attach_all(&mut rankings);
        info!(
            queries = rankings.len(),
            unjudged = skipped,
            "rankings judged"
        );
        Ok(rankings)
    }

    fn compute_evaluation(&self) -> Result<Evaluation, PipelineError> {
        let rankings = self.require_rankings()?;
        Ok(evaluate(rankings, &self.config.eval)?)
    }

    fn write_clustering(&self, path: &Path) -> Result<(), PipelineError> {
        let db = self.require_database()?;
        let clustering = self.require_clustering()?;
        let artifact = PrototypeArtifact::from_clustering(clustering, self.matrix(), db)?;
        write_artifact(path, self.format_for(path), PROTOTYPES_TAG, &artifact)
    }

    fn write_vocabulary(&self, path: &Path) -> Result<(), PipelineError> {
        let db = self.require_database()?;
        let vocabulary = self.require_vocabulary()?;
        let artifact = VocabularyArtifact::from_vocabulary(vocabulary, db)?;
        write_artifact(path, self.format_for(path), VOCABULARY_TAG, &artifact)
    }

    fn write_signatures(&self, path: &Path) -> Result<(), PipelineError> {
        let db = self.require_database()?;
        let vocabulary = self.require_vocabulary()?;
        let signatures = self.require_signatures()?;
        let artifact = SignatureArtifact::from_signatures(signatures, vocabulary.len(), db)?;
        write_artifact(path, self.format_for(path), SIGNATURES_TAG, &artifact)
    }

    fn write_rankings(&self, path: &Path) -> Result<(), PipelineError> {
        let db = self.require_database()?;
        let rankings = self.require_rankings()?;
        let artifact = RankingArtifact::from_rankings(rankings, db)?;
        write_artifact(path, self.format_for(path), RANKINGS_TAG, &artifact)
    }

    fn read_clustering(&self, path: &Path) -> Result<Clustering, PipelineError> {
        let db = self.require_database()?;
        let artifact: PrototypeArtifact = read_artifact(path, self.format_for(path), PROTOTYPES_TAG)?;
        artifact.into_clustering(db, self.matrix(), self.config.cluster.kmer_length)
    }

    fn read_vocabulary(&self, path: &Path) -> Result<Vocabulary, PipelineError> {
        let db = self.require_database()?;
        let artifact: VocabularyArtifact = read_artifact(path, self.format_for(path), VOCABULARY_TAG)?;
        artifact.into_vocabulary(db, self.config.cluster.kmer_length)
    }

    fn read_signatures(&self, path: &Path) -> Result<Vec<SparseSignature>, PipelineError> {
        let db = self.require_database()?;
        let vocabulary = self.require_vocabulary()?;
        let artifact: SignatureArtifact = read_artifact(path, self.format_for(path), SIGNATURES_TAG)?;
        artifact.into_signatures(db, vocabulary.len())
    }

    fn read_rankings(&self, path: &Path) -> Result<Vec<Ranking>, PipelineError> {
        let db = self.require_database()?;
        let artifact: RankingArtifact = read_artifact(path, self.format_for(path), RANKINGS_TAG)?;
        artifact.into_rankings(db)
    }

    // ── Plumbing ────────────────────────────────────────────────────────

    fn format_for(&self, path: &Path) -> ArtifactFormat {
        ArtifactFormat::resolve(path, self.config.output.format)
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    fn span(&self, stage: Stage, action: StageAction) -> MetricsSpan {
        MetricsSpan::start(self.metrics.as_ref(), stage, action)
    }

    /// Report an outcome to the recorder and the log without touching
    /// stage state.
    fn observe<T>(
        &self,
        stage: Stage,
        action: StageAction,
        span: MetricsSpan,
        result: Result<T, PipelineError>,
    ) -> Result<T, PipelineError> {
        let latency = span.finish(result.as_ref().map(|_| ()));
        match &result {
            Ok(_) => info!(
                %stage,
                %action,
                elapsed_ms = latency.as_millis() as u64,
                "stage finished"
            ),
            Err(err) => warn!(%stage, %action, error = %err, "stage failed"),
        }
        result
    }

    /// Like [`observe`](Self::observe), then mark the stage ready and clear
    /// its downstream stages, or mark it failed.
    fn settle<T>(
        &mut self,
        stage: Stage,
        action: StageAction,
        span: MetricsSpan,
        result: Result<T, PipelineError>,
    ) -> Result<T, PipelineError> {
        let result = self.observe(stage, action, span, result);
        match &result {
            Ok(_) => {
                self.invalidate_downstream(stage);
                self.status[stage as usize] = StageStatus::Ready;
            }
            Err(err) => self.status[stage as usize] = StageStatus::Failed(err.to_string()),
        }
        result
    }

    fn invalidate_downstream(&mut self, stage: Stage) {
        for &next in stage.downstream() {
            match next {
                Stage::Database => self.database = None,
                Stage::Partition => self.partition = None,
                Stage::Clustering => self.clustering = None,
                Stage::Vocabulary => self.vocabulary = None,
                Stage::Signatures => self.signatures = None,
                Stage::Index => self.postings = None,
                Stage::Ranking => self.rankings = None,
                Stage::Evaluation => self.evaluation = None,
            }
            self.status[next as usize] = StageStatus::NotReady;
        }
    }

    fn missing(&self, stage: Stage) -> PipelineError {
        let reason = match self.status(stage) {
            StageStatus::Failed(reason) => format!("last attempt failed: {reason}"),
            _ => "not run or loaded yet".to_string(),
        };
        PipelineError::Stage { stage, reason }
    }

    fn require_database(&self) -> Result<&SequenceDatabase, PipelineError> {
        self.database.as_ref().ok_or_else(|| self.missing(Stage::Database))
    }

    fn require_partition(&self) -> Result<&Partition, PipelineError> {
        self.partition.as_ref().ok_or_else(|| self.missing(Stage::Partition))
    }

    fn require_clustering(&self) -> Result<&Clustering, PipelineError> {
        self.clustering.as_ref().ok_or_else(|| self.missing(Stage::Clustering))
    }

    fn require_vocabulary(&self) -> Result<&Vocabulary, PipelineError> {
        self.vocabulary.as_ref().ok_or_else(|| self.missing(Stage::Vocabulary))
    }

    fn require_signatures(&self) -> Result<&[SparseSignature], PipelineError> {
        self.signatures.as_deref().ok_or_else(|| self.missing(Stage::Signatures))
    }

    fn require_postings(&self) -> Result<&PostingList, PipelineError> {
        self.postings.as_ref().ok_or_else(|| self.missing(Stage::Index))
    }

    fn require_rankings(&self) -> Result<&[Ranking], PipelineError> {
        self.rankings.as_deref().ok_or_else(|| self.missing(Stage::Ranking))
    }
}
