//! Artifact persistence.
//!
//! Four artifacts are written: prototypes (with optional cluster members),
//! the vocabulary, signatures and rankings. Each starts with a tag and a
//! record count that are checked on load. Records refer to sequences by
//! their database id so artifacts stay valid across database reloads.
//!
//! [`ArtifactFormat::Json`] is human readable. [`ArtifactFormat::Binary`] is
//! bincode (serde mode, standard config) compressed with zstd.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zstd::{decode_all, encode_all};

use cluster::{Clustering, ClusteringStats, Prototype, Vocabulary};
use index::{RankedHit, Ranking};
use kernel::Distance;
use sequence::{KmerInstance, SequenceDatabase, SequenceError, SimilarityMatrix};
use signature::SparseSignature;

use crate::PipelineError;

pub const PROTOTYPES_TAG: &str = "prototypes";
pub const VOCABULARY_TAG: &str = "vocabulary";
pub const SIGNATURES_TAG: &str = "signatures";
pub const RANKINGS_TAG: &str = "rankings";

/// Prototype index of the record closing the `clusters` section.
pub const MEMBER_SENTINEL: i64 = -1;

const ZSTD_LEVEL: i32 = 3;

/// On-disk encoding of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    #[default]
    Json,
    Binary,
}

impl ArtifactFormat {
    /// `.json` selects JSON, `.bin` and `.zst` select binary.
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(ArtifactFormat::Json),
            "bin" | "zst" => Some(ArtifactFormat::Binary),
            _ => None,
        }
    }

    /// Format implied by `path`, or `fallback` for unknown extensions.
    pub fn resolve(path: &Path, fallback: Self) -> Self {
        Self::from_extension(path).unwrap_or(fallback)
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Json => "json",
            ArtifactFormat::Binary => "bin",
        }
    }

    pub fn encode<T: Serialize>(self, artifact: &'static str, value: &T) -> Result<Vec<u8>, PipelineError> {
        let encode_err = |reason: String| PipelineError::Encode { artifact, reason };
        match self {
            ArtifactFormat::Json => {
                serde_json::to_vec_pretty(value).map_err(|e| encode_err(e.to_string()))
            }
            ArtifactFormat::Binary => {
                let encoded = encode_to_vec(value, standard()).map_err(|e| encode_err(e.to_string()))?;
                encode_all(encoded.as_slice(), ZSTD_LEVEL).map_err(|e| encode_err(e.to_string()))
            }
        }
    }

    pub fn decode<T: DeserializeOwned>(self, artifact: &'static str, bytes: &[u8]) -> Result<T, PipelineError> {
        let decode_err = |reason: String| PipelineError::Decode { artifact, reason };
        match self {
            ArtifactFormat::Json => serde_json::from_slice(bytes).map_err(|e| decode_err(e.to_string())),
            ArtifactFormat::Binary => {
                let decompressed = decode_all(bytes).map_err(|e| decode_err(e.to_string()))?;
                let (value, _) =
                    decode_from_slice(&decompressed, standard()).map_err(|e| decode_err(e.to_string()))?;
                Ok(value)
            }
        }
    }
}

pub fn write_artifact<T: Serialize>(
    path: &Path,
    format: ArtifactFormat,
    artifact: &'static str,
    value: &T,
) -> Result<(), PipelineError> {
    let bytes = format.encode(artifact, value)?;
    fs::write(path, bytes).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_artifact<T: DeserializeOwned>(
    path: &Path,
    format: ArtifactFormat,
    artifact: &'static str,
) -> Result<T, PipelineError> {
    let bytes = fs::read(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    format.decode(artifact, &bytes)
}

fn mismatch(
    artifact: &'static str,
    field: &'static str,
    expected: impl ToString,
    found: impl ToString,
) -> PipelineError {
    PipelineError::LoadMismatch {
        artifact,
        field,
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

fn check_header(
    artifact: &'static str,
    tag: &str,
    expected_tag: &str,
    count: usize,
    records: usize,
) -> Result<(), PipelineError> {
    if tag != expected_tag {
        return Err(mismatch(artifact, "tag", expected_tag, tag));
    }
    if count != records {
        return Err(mismatch(artifact, "count", count, records));
    }
    Ok(())
}

fn sequence_id(db: &SequenceDatabase, index: u32) -> Result<&str, PipelineError> {
    db.get(index as usize)
        .map(|s| s.id())
        .ok_or(PipelineError::Sequence(SequenceError::IndexOutOfRange {
            index: index as usize,
            len: db.len(),
        }))
}

fn sequence_index(db: &SequenceDatabase, artifact: &'static str, id: &str) -> Result<u32, PipelineError> {
    db.index_of(id)
        .map(|i| i as u32)
        .ok_or_else(|| PipelineError::UnknownSequence {
            artifact,
            id: id.to_string(),
        })
}

/// One prototype, addressed by the id of the sequence holding its centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrototypeRecord {
    pub index: u32,
    pub sequence_id: String,
    pub offset: u32,
    pub initial_cluster_size: u64,
    pub final_cluster_size: u64,
    pub final_instance_count: u64,
    pub purity: f64,
    pub entropy: f64,
}

impl PrototypeRecord {
    fn from_prototype(index: usize, prototype: &Prototype, db: &SequenceDatabase) -> Result<Self, PipelineError> {
        Ok(Self {
            index: index as u32,
            sequence_id: sequence_id(db, prototype.centroid.sequence)?.to_string(),
            offset: prototype.centroid.offset,
            initial_cluster_size: prototype.initial_cluster_size as u64,
            final_cluster_size: prototype.final_cluster_size as u64,
            final_instance_count: prototype.final_instance_count as u64,
            purity: prototype.purity,
            entropy: prototype.entropy,
        })
    }

    fn resolve(&self, artifact: &'static str, db: &SequenceDatabase, k: usize) -> Result<Prototype, PipelineError> {
        let centroid = KmerInstance::new(sequence_index(db, artifact, &self.sequence_id)?, self.offset);
        let kmer = db
            .kmer(centroid, k)
            .ok_or_else(|| {
                let windows = db.get(centroid.sequence as usize).map_or(0, |s| s.kmer_count(k));
                mismatch(artifact, "offset", format!("< {windows}"), self.offset)
            })?
            .to_owned_kmer();
        let mut prototype = Prototype::new(centroid, kmer, self.initial_cluster_size as usize);
        prototype.final_cluster_size = self.final_cluster_size as usize;
        prototype.final_instance_count = self.final_instance_count as usize;
        prototype.purity = self.purity;
        prototype.entropy = self.entropy;
        Ok(prototype)
    }
}

/// `(prototype, member sequence id, member offset)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub prototype: i64,
    pub sequence_id: String,
    pub offset: u32,
}

impl MemberRecord {
    fn sentinel() -> Self {
        Self {
            prototype: MEMBER_SENTINEL,
            sequence_id: String::new(),
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrototypeArtifact {
    pub tag: String,
    pub kmer_length: usize,
    pub threshold: Distance,
    pub matrix: SimilarityMatrix,
    pub count: usize,
    pub prototypes: Vec<PrototypeRecord>,
    /// Member triples closed by a [`MEMBER_SENTINEL`] record.
    pub clusters: Option<Vec<MemberRecord>>,
}

impl PrototypeArtifact {
    const NAME: &'static str = PROTOTYPES_TAG;

    pub fn from_clustering(
        clustering: &Clustering,
        matrix: &SimilarityMatrix,
        db: &SequenceDatabase,
    ) -> Result<Self, PipelineError> {
        let prototypes = clustering
            .prototypes
            .iter()
            .enumerate()
            .map(|(i, p)| PrototypeRecord::from_prototype(i, p, db))
            .collect::<Result<Vec<_>, _>>()?;

        let clusters = match &clustering.members {
            Some(members) => {
                let mut records = Vec::with_capacity(members.iter().map(Vec::len).sum::<usize>() + 1);
                for (prototype, instances) in members.iter().enumerate() {
                    for member in instances {
                        records.push(MemberRecord {
                            prototype: prototype as i64,
                            sequence_id: sequence_id(db, member.sequence)?.to_string(),
                            offset: member.offset,
                        });
                    }
                }
                records.push(MemberRecord::sentinel());
                Some(records)
            }
            None => None,
        };

        Ok(Self {
            tag: PROTOTYPES_TAG.to_string(),
            kmer_length: clustering.kmer_length,
            threshold: clustering.threshold,
            matrix: matrix.clone(),
            count: prototypes.len(),
            prototypes,
            clusters,
        })
    }

    /// Rebuild a clustering over `db`. The artifact must have been produced
    /// with the same k and matrix.
    pub fn into_clustering(
        self,
        db: &SequenceDatabase,
        matrix: &SimilarityMatrix,
        kmer_length: usize,
    ) -> Result<Clustering, PipelineError> {
        check_header(Self::NAME, &self.tag, PROTOTYPES_TAG, self.count, self.prototypes.len())?;
        if self.kmer_length != kmer_length {
            return Err(mismatch(Self::NAME, "kmer_length", kmer_length, self.kmer_length));
        }
        if self.matrix != *matrix {
            return Err(mismatch(Self::NAME, "matrix", matrix.name(), self.matrix.name()));
        }

        let prototypes = self
            .prototypes
            .iter()
            .map(|record| record.resolve(Self::NAME, db, kmer_length))
            .collect::<Result<Vec<_>, _>>()?;

        let members = match self.clusters {
            Some(records) => {
                let mut members = vec![Vec::new(); prototypes.len()];
                let mut closed = false;
                for (i, record) in records.iter().enumerate() {
                    if record.prototype < 0 {
                        let trailing = records.len() - i - 1;
                        if trailing > 0 {
                            return Err(mismatch(
                                Self::NAME,
                                "clusters",
                                "sentinel as last record",
                                format!("{trailing} records after sentinel"),
                            ));
                        }
                        closed = true;
                        break;
                    }
                    let slot = members
                        .get_mut(record.prototype as usize)
                        .ok_or_else(|| mismatch(Self::NAME, "clusters", format!("< {}", self.count), record.prototype))?;
                    let instance = KmerInstance::new(sequence_index(db, Self::NAME, &record.sequence_id)?, record.offset);
                    if db.kmer(instance, kmer_length).is_none() {
                        return Err(mismatch(Self::NAME, "clusters", "member inside its sequence", record.offset));
                    }
                    slot.push(instance);
                }
                if !closed {
                    return Err(mismatch(Self::NAME, "clusters", "sentinel record", "end of section"));
                }
                Some(members)
            }
            None => None,
        };

        Ok(Clustering {
            kmer_length,
            threshold: self.threshold,
            prototypes,
            members,
            stats: ClusteringStats::default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyArtifact {
    pub tag: String,
    pub kmer_length: usize,
    pub count: usize,
    pub prototypes: Vec<PrototypeRecord>,
}

impl VocabularyArtifact {
    const NAME: &'static str = VOCABULARY_TAG;

    pub fn from_vocabulary(vocabulary: &Vocabulary, db: &SequenceDatabase) -> Result<Self, PipelineError> {
        let prototypes = vocabulary
            .iter()
            .enumerate()
            .map(|(i, p)| PrototypeRecord::from_prototype(i, p, db))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            tag: VOCABULARY_TAG.to_string(),
            kmer_length: vocabulary.kmer_length(),
            count: prototypes.len(),
            prototypes,
        })
    }

    pub fn into_vocabulary(self, db: &SequenceDatabase, kmer_length: usize) -> Result<Vocabulary, PipelineError> {
        check_header(Self::NAME, &self.tag, VOCABULARY_TAG, self.count, self.prototypes.len())?;
        if self.kmer_length != kmer_length {
            return Err(mismatch(Self::NAME, "kmer_length", kmer_length, self.kmer_length));
        }
        let prototypes = self
            .prototypes
            .iter()
            .map(|record| record.resolve(Self::NAME, db, kmer_length))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Vocabulary::new(kmer_length, prototypes)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub sequence_id: String,
    pub ids: Vec<u32>,
    pub weights: Option<Vec<u32>>,
}

/// Signatures of every database sequence, in database order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureArtifact {
    pub tag: String,
    pub vocabulary_size: usize,
    pub count: usize,
    pub signatures: Vec<SignatureRecord>,
}

impl SignatureArtifact {
    const NAME: &'static str = SIGNATURES_TAG;

    pub fn from_signatures(
        signatures: &[SparseSignature],
        vocabulary_size: usize,
        db: &SequenceDatabase,
    ) -> Result<Self, PipelineError> {
        let signatures = signatures
            .iter()
            .enumerate()
            .map(|(i, sig)| {
                Ok(SignatureRecord {
                    sequence_id: sequence_id(db, i as u32)?.to_string(),
                    ids: sig.ids().to_vec(),
                    weights: sig.weights().map(<[u32]>::to_vec),
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;
        Ok(Self {
            tag: SIGNATURES_TAG.to_string(),
            vocabulary_size,
            count: signatures.len(),
            signatures,
        })
    }

    /// Rebuild one signature per database sequence. Any feature id at or
    /// beyond `vocabulary_size` discards the whole batch.
    pub fn into_signatures(
        self,
        db: &SequenceDatabase,
        vocabulary_size: usize,
    ) -> Result<Vec<SparseSignature>, PipelineError> {
        check_header(Self::NAME, &self.tag, SIGNATURES_TAG, self.count, self.signatures.len())?;
        if self.count != db.len() {
            return Err(mismatch(Self::NAME, "count", db.len(), self.count));
        }
        // Ids are checked against the current vocabulary before the header.
        for record in &self.signatures {
            if let Some(&feature) = record.ids.iter().find(|&&id| id as usize >= vocabulary_size) {
                return Err(PipelineError::OutOfRange {
                    artifact: Self::NAME,
                    record: record.sequence_id.clone(),
                    feature,
                    vocabulary_size,
                });
            }
        }
        if self.vocabulary_size != vocabulary_size {
            return Err(mismatch(Self::NAME, "vocabulary_size", vocabulary_size, self.vocabulary_size));
        }

        let mut slots: Vec<Option<SparseSignature>> = vec![None; db.len()];
        for record in self.signatures {
            let index = sequence_index(db, Self::NAME, &record.sequence_id)? as usize;
            if slots[index].is_some() {
                return Err(mismatch(Self::NAME, "sequence_id", "unique ids", record.sequence_id));
            }
            slots[index] = Some(SparseSignature::from_sorted_ids(record.ids, record.weights)?);
        }
        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| mismatch(Self::NAME, "signatures", "one per sequence", "missing sequences"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRecord {
    pub sequence_id: String,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRecord {
    pub query_id: String,
    pub capacity: usize,
    pub hits: Vec<HitRecord>,
}

/// Per-rank values of one query, keyed by its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveRecord {
    pub query_id: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingArtifact {
    pub tag: String,
    pub count: usize,
    pub rankings: Vec<RankingRecord>,
    pub precision: Option<Vec<CurveRecord>>,
    pub recall: Option<Vec<CurveRecord>>,
}

impl RankingArtifact {
    const NAME: &'static str = RANKINGS_TAG;

    /// The precision and recall sections are written only when at least one
    /// ranking has been judged.
    pub fn from_rankings(rankings: &[Ranking], db: &SequenceDatabase) -> Result<Self, PipelineError> {
        let mut records = Vec::with_capacity(rankings.len());
        let mut precision = Vec::new();
        let mut recall = Vec::new();
        for ranking in rankings {
            let query_id = sequence_id(db, ranking.query)?.to_string();
            let hits = ranking
                .hits
                .iter()
                .map(|hit| {
                    Ok(HitRecord {
                        sequence_id: sequence_id(db, hit.candidate)?.to_string(),
                        distance: hit.distance,
                    })
                })
                .collect::<Result<Vec<_>, PipelineError>>()?;
            if ranking.judged {
                precision.push(CurveRecord {
                    query_id: query_id.clone(),
                    values: ranking.precision.clone(),
                });
                recall.push(CurveRecord {
                    query_id: query_id.clone(),
                    values: ranking.recall.clone(),
                });
            }
            records.push(RankingRecord {
                query_id,
                capacity: ranking.capacity,
                hits,
            });
        }

        let judged = !precision.is_empty();
        Ok(Self {
            tag: RANKINGS_TAG.to_string(),
            count: records.len(),
            rankings: records,
            precision: judged.then_some(precision),
            recall: judged.then_some(recall),
        })
    }

    pub fn into_rankings(self, db: &SequenceDatabase) -> Result<Vec<Ranking>, PipelineError> {
        check_header(Self::NAME, &self.tag, RANKINGS_TAG, self.count, self.rankings.len())?;

        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(self.rankings.len());
        let mut rankings = Vec::with_capacity(self.rankings.len());
        for (pos, record) in self.rankings.iter().enumerate() {
            if positions.insert(record.query_id.as_str(), pos).is_some() {
                return Err(mismatch(Self::NAME, "query_id", "unique ids", &record.query_id));
            }
            let query = sequence_index(db, Self::NAME, &record.query_id)?;
            let hits = record
                .hits
                .iter()
                .map(|hit| {
                    Ok(RankedHit {
                        candidate: sequence_index(db, Self::NAME, &hit.sequence_id)?,
                        distance: hit.distance,
                    })
                })
                .collect::<Result<Vec<_>, PipelineError>>()?;
            if hits.len() > record.capacity {
                return Err(mismatch(Self::NAME, "capacity", format!(">= {}", hits.len()), record.capacity));
            }
            rankings.push(Ranking::new(query, record.capacity, hits));
        }

        let sections = [
            ("precision", self.precision.as_deref()),
            ("recall", self.recall.as_deref()),
        ];
        for (field, section) in sections {
            let mut seen = vec![false; rankings.len()];
            for curve in section.unwrap_or_default() {
                let pos = *positions
                    .get(curve.query_id.as_str())
                    .ok_or_else(|| PipelineError::UnknownSequence {
                        artifact: Self::NAME,
                        id: curve.query_id.clone(),
                    })?;
                if std::mem::replace(&mut seen[pos], true) {
                    return Err(mismatch(Self::NAME, field, "one curve per query", &curve.query_id));
                }
                let ranking = &mut rankings[pos];
                if curve.values.len() != ranking.hits.len() {
                    return Err(mismatch(Self::NAME, field, ranking.hits.len(), curve.values.len()));
                }
                if field == "precision" {
                    ranking.precision = curve.values.clone();
                } else {
                    ranking.recall = curve.values.clone();
                }
                ranking.judged = true;
            }
        }
        if let Some(ranking) = rankings
            .iter()
            .find(|r| r.judged && (r.precision.len() != r.hits.len() || r.recall.len() != r.hits.len()))
        {
            let id = sequence_id(db, ranking.query)?;
            return Err(mismatch(Self::NAME, "recall", "precision and recall for every judged query", id));
        }
        Ok(rankings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequence::{Alphabet, FieldLayout};
    use tempfile::tempdir;

    fn db() -> SequenceDatabase {
        let text = ">s1|a\nacgtacgt\n>s2|b\nggccaatt\n>s3|a\nttttcccc\n";
        SequenceDatabase::from_fasta_str(text, Alphabet::dna(), FieldLayout::new().with_class_field(Some(1)))
            .unwrap()
    }

    fn matrix() -> SimilarityMatrix {
        SimilarityMatrix::match_mismatch(Alphabet::dna(), 0, 1)
    }

    fn clustering(db: &SequenceDatabase) -> Clustering {
        let k = 4;
        let prototype = |seq: u32, offset: u32, size: usize| {
            let centroid = KmerInstance::new(seq, offset);
            let kmer = db.kmer(centroid, k).unwrap().to_owned_kmer();
            let mut p = Prototype::new(centroid, kmer, size);
            p.final_cluster_size = 2;
            p.final_instance_count = size;
            p.purity = 0.5;
            p.entropy = 1.0 / 3.0;
            p
        };
        Clustering {
            kmer_length: k,
            threshold: 1,
            prototypes: vec![prototype(0, 0, 3), prototype(1, 2, 1)],
            members: Some(vec![
                vec![KmerInstance::new(0, 0), KmerInstance::new(0, 4), KmerInstance::new(2, 1)],
                vec![KmerInstance::new(1, 2)],
            ]),
            stats: ClusteringStats::default(),
        }
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ArtifactFormat::from_extension(Path::new("a/p.json")), Some(ArtifactFormat::Json));
        assert_eq!(ArtifactFormat::from_extension(Path::new("p.bin")), Some(ArtifactFormat::Binary));
        assert_eq!(ArtifactFormat::from_extension(Path::new("p.zst")), Some(ArtifactFormat::Binary));
        assert_eq!(ArtifactFormat::from_extension(Path::new("p")), None);
        assert_eq!(
            ArtifactFormat::resolve(Path::new("p.dat"), ArtifactFormat::Binary),
            ArtifactFormat::Binary
        );
    }

    #[test]
    fn prototype_artifact_roundtrips_in_both_formats() {
        let db = db();
        let clustering = clustering(&db);
        let artifact = PrototypeArtifact::from_clustering(&clustering, &matrix(), &db).unwrap();
        assert_eq!(artifact.clusters.as_ref().unwrap().last().unwrap().prototype, MEMBER_SENTINEL);

        let dir = tempdir().unwrap();
        for format in [ArtifactFormat::Json, ArtifactFormat::Binary] {
            let path = dir.path().join(format!("prototypes.{}", format.extension()));
            write_artifact(&path, format, PROTOTYPES_TAG, &artifact).unwrap();
            let loaded: PrototypeArtifact = read_artifact(&path, format, PROTOTYPES_TAG).unwrap();
            assert_eq!(loaded, artifact);
            let rebuilt = loaded.into_clustering(&db, &matrix(), 4).unwrap();
            assert_eq!(rebuilt.prototypes, clustering.prototypes);
            assert_eq!(rebuilt.members, clustering.members);
        }
    }

    #[test]
    fn prototype_load_rejects_mismatches() {
        let db = db();
        let artifact = PrototypeArtifact::from_clustering(&clustering(&db), &matrix(), &db).unwrap();

        let err = artifact.clone().into_clustering(&db, &matrix(), 5).unwrap_err();
        assert!(matches!(err, PipelineError::LoadMismatch { field: "kmer_length", .. }));

        let other = SimilarityMatrix::match_mismatch(Alphabet::dna(), 0, 2);
        let err = artifact.clone().into_clustering(&db, &other, 4).unwrap_err();
        assert!(matches!(err, PipelineError::LoadMismatch { field: "matrix", .. }));

        let mut wrong_count = artifact.clone();
        wrong_count.count = 7;
        let err = wrong_count.into_clustering(&db, &matrix(), 4).unwrap_err();
        assert!(matches!(err, PipelineError::LoadMismatch { field: "count", .. }));

        let mut unterminated = artifact.clone();
        unterminated.clusters.as_mut().unwrap().pop();
        let err = unterminated.into_clustering(&db, &matrix(), 4).unwrap_err();
        assert!(matches!(err, PipelineError::LoadMismatch { field: "clusters", .. }));

        let mut trailing = artifact.clone();
        let extra = trailing.clusters.as_ref().unwrap()[0].clone();
        trailing.clusters.as_mut().unwrap().push(extra);
        let err = trailing.into_clustering(&db, &matrix(), 4).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::LoadMismatch { field: "clusters", ref found, .. } if found.contains("after sentinel")
        ));

        let mut unknown = artifact;
        unknown.prototypes[1].sequence_id = "missing".to_string();
        let err = unknown.into_clustering(&db, &matrix(), 4).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownSequence { ref id, .. } if id == "missing"));
    }

    #[test]
    fn vocabulary_artifact_roundtrips() {
        let db = db();
        let clustering = clustering(&db);
        let vocabulary = Vocabulary::new(4, clustering.prototypes.clone()).unwrap();
        let artifact = VocabularyArtifact::from_vocabulary(&vocabulary, &db).unwrap();
        let bytes = ArtifactFormat::Binary.encode(VOCABULARY_TAG, &artifact).unwrap();
        let decoded: VocabularyArtifact = ArtifactFormat::Binary.decode(VOCABULARY_TAG, &bytes).unwrap();
        assert_eq!(decoded.into_vocabulary(&db, 4).unwrap(), vocabulary);

        let mut wrong_tag = artifact;
        wrong_tag.tag = "signatures".to_string();
        assert!(matches!(
            wrong_tag.into_vocabulary(&db, 4),
            Err(PipelineError::LoadMismatch { field: "tag", .. })
        ));
    }

    #[test]
    fn signature_ids_beyond_vocabulary_discard_the_batch() {
        let db = db();
        let signatures = vec![
            SparseSignature::from_ids(vec![0, 2]),
            SparseSignature::empty(),
            SparseSignature::from_ids(vec![1]),
        ];
        let artifact = SignatureArtifact::from_signatures(&signatures, 3, &db).unwrap();
        assert_eq!(artifact.clone().into_signatures(&db, 3).unwrap(), signatures);

        let mut corrupt = artifact.clone();
        corrupt.vocabulary_size = 2;
        assert!(matches!(
            corrupt.into_signatures(&db, 2),
            Err(PipelineError::OutOfRange { feature: 2, vocabulary_size: 2, .. })
        ));
        assert!(matches!(
            artifact.clone().into_signatures(&db, 4),
            Err(PipelineError::LoadMismatch { field: "vocabulary_size", .. })
        ));
        // Saved against three terms, loaded against two: the id wins over the header.
        assert!(matches!(
            artifact.into_signatures(&db, 2),
            Err(PipelineError::OutOfRange { feature: 2, vocabulary_size: 2, .. })
        ));
    }

    #[test]
    fn ranking_artifact_keeps_judgements() {
        let db = db();
        let mut judged = Ranking::new(
            0,
            5,
            vec![
                RankedHit { candidate: 2, distance: 0.25 },
                RankedHit { candidate: 1, distance: 0.75 },
            ],
        );
        judged.precision = vec![1.0, 0.5];
        judged.recall = vec![1.0, 1.0];
        judged.judged = true;
        let unjudged = Ranking::new(1, 5, Vec::new());
        let rankings = vec![judged, unjudged];

        let artifact = RankingArtifact::from_rankings(&rankings, &db).unwrap();
        assert_eq!(artifact.precision.as_ref().unwrap().len(), 1);
        let json = ArtifactFormat::Json.encode(RANKINGS_TAG, &artifact).unwrap();
        let decoded: RankingArtifact = ArtifactFormat::Json.decode(RANKINGS_TAG, &json).unwrap();
        assert_eq!(decoded.into_rankings(&db).unwrap(), rankings);

        let bare = RankingArtifact::from_rankings(&rankings[1..], &db).unwrap();
        assert!(bare.precision.is_none() && bare.recall.is_none());

        let mut repeated = artifact.clone();
        let first = repeated.precision.as_ref().unwrap()[0].clone();
        repeated.precision.as_mut().unwrap().push(first);
        assert!(matches!(
            repeated.into_rankings(&db),
            Err(PipelineError::LoadMismatch { field: "precision", .. })
        ));

        let mut short = artifact;
        short.recall = Some(Vec::new());
        assert!(matches!(
            short.into_rankings(&db),
            Err(PipelineError::LoadMismatch { field: "recall", .. })
        ));
    }

    #[test]
    fn corrupt_bytes_are_decode_errors() {
        let err = ArtifactFormat::Binary
            .decode::<SignatureArtifact>(SIGNATURES_TAG, b"not zstd")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode { artifact: SIGNATURES_TAG, .. }));
        let err = ArtifactFormat::Json
            .decode::<SignatureArtifact>(SIGNATURES_TAG, b"{}")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = read_artifact::<SignatureArtifact>(&dir.path().join("none.json"), ArtifactFormat::Json, SIGNATURES_TAG)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
