//! Negative examples by recombination of positives.
//!
//! If `(C, T)` and `(c, t)` are two bound pairs, `(c, T)` is a candidate
//! negative with original CDR `C`. It is kept when
//! `align(c, C) + align(T, t)` is below the threshold, i.e. when neither the
//! CDRs nor the targets of the two parents resemble each other.
//!
//! Sampling runs in rounds until enough negatives are accepted:
//!
//! 1. draw two samples with replacement from the positives and pair them row by row
//! 2. drop pairs repeated within the batch
//! 3. drop pairs seen before, then remember the rest
//! 4. align the survivors and keep the dissimilar ones
//! 5. write a checkpoint every `checkpoint_every` rounds

use crate::libs::align::Aligner;
use crate::libs::error::BindError;
use crate::libs::pair::{write_pairs, BoundPair, FragmentRecord};
use anyhow::bail;
use fxhash::FxHashSet;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Number of negatives; defaults to the number of positives
    pub k: Option<usize>,
    pub seed: u64,
    /// Proposals drawn per round, as a multiple of `k`
    pub proposal_factor: usize,
    pub max_proposals: usize,
    /// Proposals scoring strictly below this are accepted
    pub threshold: f64,
    /// Checkpoint cadence in rounds, 0 disables checkpoints
    pub checkpoint_every: usize,
    /// Give up after this many rounds
    pub max_rounds: Option<usize>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            k: None,
            seed: 42,
            proposal_factor: 3,
            max_proposals: 1_000_000,
            threshold: 0.0,
            checkpoint_every: 10,
            max_rounds: None,
        }
    }
}

/// `(cdr, target)` sequence pairs that must not be proposed again.
#[derive(Debug, Clone, Default)]
pub struct ConsideredPairSet {
    pairs: FxHashSet<(String, String)>,
}

impl ConsideredPairSet {
    pub fn from_pairs(pairs: &[BoundPair]) -> Self {
        Self {
            pairs: pairs.iter().map(|p| p.key()).collect(),
        }
    }

    pub fn contains(&self, key: &(String, String)) -> bool {
        self.pairs.contains(key)
    }

    /// Returns `false` when the pair was already present.
    pub fn insert(&mut self, key: (String, String)) -> bool {
        self.pairs.insert(key)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// A candidate negative: the target of one positive with the CDR of another.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub cdr: FragmentRecord,
    pub target: FragmentRecord,
    pub original_cdr: FragmentRecord,
    /// Target of the positive that donated `cdr`
    pub donor_target: String,
    pub similarity_score: Option<f64>,
}

impl Proposal {
    pub fn key(&self) -> (String, String) {
        (self.cdr.resnames.clone(), self.target.resnames.clone())
    }

    /// Drops the bookkeeping fields; `None` until scored.
    pub fn into_negative(self) -> Option<BoundPair> {
        let similarity_score = self.similarity_score?;
        Some(BoundPair::Negative {
            cdr: self.cdr,
            target: self.target,
            original_cdr: self.original_cdr,
            similarity_score,
        })
    }
}

/// Receives snapshots of all negatives accepted so far.
pub trait CheckpointSink {
    fn save(&mut self, negatives: &[BoundPair]) -> anyhow::Result<()>;
}

pub struct NoCheckpoint;

impl CheckpointSink for NoCheckpoint {
    fn save(&mut self, _negatives: &[BoundPair]) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Writes `.tmp.negatives_{count}.tsv` files into a directory.
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    dir: PathBuf,
}

impl FileCheckpoint {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, count: usize) -> PathBuf {
        self.dir.join(format!(".tmp.negatives_{}.tsv", count))
    }
}

impl CheckpointSink for FileCheckpoint {
    fn save(&mut self, negatives: &[BoundPair]) -> anyhow::Result<()> {
        let path = self.path_for(negatives.len());
        log::info!(
            "Saving {} negatives so far to {}",
            negatives.len(),
            path.display()
        );
        let mut writer = crate::writer(&path.to_string_lossy())?;
        write_pairs(&mut writer, negatives)?;
        writer.flush()?;
        Ok(())
    }
}

/// Counters of one sampling round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundStats {
    pub round: usize,
    pub proposed: usize,
    pub duplicated: usize,
    pub already_considered: usize,
    pub too_similar: usize,
    pub accepted: usize,
    /// Negatives accumulated after this round
    pub total: usize,
}

pub struct NegativeSampler<'a, A: ?Sized> {
    positives: &'a [BoundPair],
    aligner: &'a A,
    config: SamplerConfig,
    target: usize,
    rng: StdRng,
    considered: ConsideredPairSet,
    negatives: Vec<BoundPair>,
    rounds: usize,
}

impl<'a, A> NegativeSampler<'a, A>
where
    A: Aligner + Sync + ?Sized,
{
    pub fn new(
        positives: &'a [BoundPair],
        aligner: &'a A,
        config: SamplerConfig,
    ) -> anyhow::Result<Self> {
        if let Some(i) = positives.iter().position(|p| !p.binding_observed()) {
            bail!("Row {} is not a positive bound pair", i + 1);
        }
        let target = config.k.unwrap_or(positives.len());
        if target > 0 && positives.is_empty() {
            return Err(BindError::EmptyPositives.into());
        }

        Ok(Self {
            positives,
            aligner,
            target,
            rng: StdRng::seed_from_u64(config.seed),
            considered: ConsideredPairSet::from_pairs(positives),
            negatives: vec![],
            rounds: 0,
            config,
        })
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn accepted(&self) -> usize {
        self.negatives.len()
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn considered(&self) -> &ConsideredPairSet {
        &self.considered
    }

    pub fn is_done(&self) -> bool {
        self.negatives.len() >= self.target
    }

    /// Pairs row `i` of one sample of the positives with row `i` of another:
    /// the first keeps its target, the second donates its CDR.
    pub fn propose(&mut self, n: usize) -> Vec<Proposal> {
        let len = self.positives.len();
        if len == 0 {
            return vec![];
        }
        let recipients: Vec<usize> = (0..n).map(|_| self.rng.gen_range(0..len)).collect();
        let donors: Vec<usize> = (0..n).map(|_| self.rng.gen_range(0..len)).collect();

        recipients
            .into_iter()
            .zip(donors)
            .map(|(r, d)| {
                let recipient = &self.positives[r];
                let donor = &self.positives[d];
                Proposal {
                    cdr: donor.cdr().clone(),
                    target: recipient.target().clone(),
                    original_cdr: recipient.cdr().clone(),
                    donor_target: donor.target().resnames.clone(),
                    similarity_score: None,
                }
            })
            .collect()
    }

    /// Runs one propose-filter-validate round.
    pub fn run_round(&mut self, sink: &mut dyn CheckpointSink) -> anyhow::Result<RoundStats> {
        let n = (self.config.proposal_factor * self.target).min(self.config.max_proposals);
        let proposals = self.propose(n);
        let mut stats = RoundStats {
            round: self.rounds,
            proposed: proposals.len(),
            ..Default::default()
        };

        // first occurrence wins
        let mut unique = IndexMap::with_capacity(proposals.len());
        for p in proposals {
            unique.entry(p.key()).or_insert(p);
        }
        let mut proposals: Vec<Proposal> = unique.into_values().collect();
        stats.duplicated = stats.proposed - proposals.len();

        let before = proposals.len();
        proposals.retain(|p| !self.considered.contains(&p.key()));
        stats.already_considered = before - proposals.len();

        // Remembered before validation, so rejected pairs are never retried
        for p in &proposals {
            self.considered.insert(p.key());
        }

        let aligner = self.aligner;
        let scores = proposals
            .par_iter()
            .map(|p| -> anyhow::Result<f64> {
                let cdr_score = aligner.score(&p.cdr.resnames, &p.original_cdr.resnames)?;
                let target_score = aligner.score(&p.target.resnames, &p.donor_target)?;
                Ok(cdr_score + target_score)
            })
            .collect::<anyhow::Result<Vec<f64>>>()?;

        let threshold = self.config.threshold;
        for (mut p, score) in proposals.into_iter().zip(scores) {
            if score < threshold {
                p.similarity_score = Some(score);
                self.negatives.extend(p.into_negative());
                stats.accepted += 1;
            } else {
                stats.too_similar += 1;
            }
        }
        stats.total = self.negatives.len();

        log::info!(
            "Round {}: {} proposals, {} duplicated, {} already considered, {} too similar, {} accepted",
            stats.round,
            stats.proposed,
            stats.duplicated,
            stats.already_considered,
            stats.too_similar,
            stats.accepted
        );
        log::info!(
            "Progress: {:.2}%. Generated {} negatives so far.",
            100.0 * stats.total as f64 / self.target.max(1) as f64,
            stats.total
        );

        let every = self.config.checkpoint_every;
        if every > 0 && self.rounds % every == 0 {
            sink.save(&self.negatives)?;
        }
        self.rounds += 1;

        Ok(stats)
    }

    /// Runs rounds until `k` negatives are accepted or the round budget is
    /// spent.
    pub fn run(&mut self, sink: &mut dyn CheckpointSink) -> anyhow::Result<()> {
        log::info!(
            "Generating {} negative examples from {} positive examples",
            self.target,
            self.positives.len()
        );
        while !self.is_done() {
            if let Some(max_rounds) = self.config.max_rounds {
                if self.rounds >= max_rounds {
                    return Err(BindError::NonConvergence {
                        accepted: self.negatives.len(),
                        target: self.target,
                        rounds: self.rounds,
                    }
                    .into());
                }
            }
            self.run_round(sink)?;
        }
        Ok(())
    }

    /// Positives followed by the first `k` negatives in generation order.
    pub fn finish(self) -> Vec<BoundPair> {
        log::info!(
            "Generated {} negatives, keeping {}",
            self.negatives.len(),
            self.target
        );
        let mut combined = self.positives.to_vec();
        combined.extend(self.negatives.into_iter().take(self.target));
        combined
    }
}

/// Appends `k` validated negatives to `positives`.
pub fn generate<A>(
    positives: &[BoundPair],
    aligner: &A,
    config: SamplerConfig,
    sink: &mut dyn CheckpointSink,
) -> anyhow::Result<Vec<BoundPair>>
where
    A: Aligner + Sync + ?Sized,
{
    let mut sampler = NegativeSampler::new(positives, aligner, config)?;
    sampler.run(sink)?;
    Ok(sampler.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::pair::read_pairs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Identical sequences score +1, anything else -1
    #[derive(Default)]
    struct EqualityAligner {
        calls: AtomicUsize,
    }

    impl Aligner for EqualityAligner {
        fn score(&self, a: &str, b: &str) -> anyhow::Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(if a == b { 1.0 } else { -1.0 })
        }
    }

    struct SimilarAligner;

    impl Aligner for SimilarAligner {
        fn score(&self, _a: &str, _b: &str) -> anyhow::Result<f64> {
            Ok(5.0)
        }
    }

    struct BrokenAligner;

    impl Aligner for BrokenAligner {
        fn score(&self, a: &str, _b: &str) -> anyhow::Result<f64> {
            anyhow::bail!("cannot align {}", a)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sizes: Vec<usize>,
    }

    impl CheckpointSink for RecordingSink {
        fn save(&mut self, negatives: &[BoundPair]) -> anyhow::Result<()> {
            self.sizes.push(negatives.len());
            Ok(())
        }
    }

    fn record(pdb_id: &str, resnames: &str) -> FragmentRecord {
        FragmentRecord {
            pdb_id: pdb_id.to_string(),
            resnames: resnames.to_string(),
            positions: (0..resnames.len()).collect(),
        }
    }

    fn positives() -> Vec<BoundPair> {
        [
            ("GSWK", "EEK"),
            ("PPGA", "DRH"),
            ("LRLS", "SQL"),
            ("QLAA", "TRR"),
            ("TAYA", "MNV"),
        ]
        .iter()
        .enumerate()
        .map(|(i, (cdr, target))| BoundPair::Positive {
            cdr: record(&format!("{}abc", i), cdr),
            target: record(&format!("{}abc", i), target),
        })
        .collect()
    }

    fn config(k: usize) -> SamplerConfig {
        SamplerConfig {
            k: Some(k),
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_count() {
        let pos = positives();
        let aligner = EqualityAligner::default();
        let combined = generate(&pos, &aligner, config(12), &mut NoCheckpoint).unwrap();

        assert_eq!(combined.len(), pos.len() + 12);
        assert_eq!(&combined[..pos.len()], &pos[..]);

        let negatives = &combined[pos.len()..];
        assert!(negatives.iter().all(|n| !n.binding_observed()));
        assert!(negatives
            .iter()
            .all(|n| n.similarity_score().is_some_and(|s| s < 0.0)));

        // Every negative is new, and none repeats a positive
        let mut keys = FxHashSet::default();
        for p in &pos {
            keys.insert(p.key());
        }
        for n in negatives {
            assert!(keys.insert(n.key()));
        }
    }

    #[test]
    fn test_provenance() {
        let pos = positives();
        let aligner = EqualityAligner::default();
        let combined = generate(&pos, &aligner, config(5), &mut NoCheckpoint).unwrap();

        for n in &combined[pos.len()..] {
            let original = n.original_cdr().unwrap();
            // the original CDR is the recipient's own CDR
            let recipient = pos
                .iter()
                .find(|p| p.target() == n.target())
                .unwrap();
            assert_eq!(recipient.cdr(), original);
            assert_ne!(n.cdr(), original);
            assert!(pos.iter().any(|p| p.cdr() == n.cdr()));
        }
    }

    #[test]
    fn test_deterministic_with_seed() {
        let pos = positives();
        let aligner = EqualityAligner::default();
        let a = generate(&pos, &aligner, config(8), &mut NoCheckpoint).unwrap();
        let b = generate(&pos, &aligner, config(8), &mut NoCheckpoint).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_default_k_is_positive_count() {
        let pos = positives();
        let aligner = EqualityAligner::default();
        let combined =
            generate(&pos, &aligner, SamplerConfig::default(), &mut NoCheckpoint).unwrap();
        assert_eq!(combined.len(), 2 * pos.len());
    }

    #[test]
    fn test_rejected_pairs_never_revalidated() {
        let pos = positives();
        let aligner = EqualityAligner::default();
        let cfg = SamplerConfig {
            // only 20 recombinations exist, so the budget runs out
            k: Some(25),
            max_rounds: Some(30),
            ..Default::default()
        };
        let mut sampler = NegativeSampler::new(&pos, &aligner, cfg).unwrap();
        let err = sampler.run(&mut NoCheckpoint).unwrap_err();

        assert_eq!(
            err.downcast_ref::<BindError>(),
            Some(&BindError::NonConvergence {
                accepted: sampler.accepted(),
                target: 25,
                rounds: 30
            })
        );
        // Two alignments per validated proposal, one proposal per new pair
        let validated = sampler.considered().len() - pos.len();
        assert_eq!(aligner.calls.load(Ordering::SeqCst), 2 * validated);
        assert!(sampler.accepted() <= 20);
    }

    #[test]
    fn test_too_similar_rejected() {
        let pos = positives();
        let cfg = SamplerConfig {
            max_rounds: Some(3),
            ..config(4)
        };
        let mut sampler = NegativeSampler::new(&pos, &SimilarAligner, cfg).unwrap();
        let mut rejected = 0;
        for _ in 0..3 {
            let stats = sampler.run_round(&mut NoCheckpoint).unwrap();
            assert_eq!(stats.accepted, 0);
            assert_eq!(
                stats.proposed,
                stats.duplicated + stats.already_considered + stats.too_similar
            );
            rejected += stats.too_similar;
        }
        assert_eq!(sampler.considered().len(), pos.len() + rejected);
        assert!(sampler.run(&mut NoCheckpoint).is_err());
    }

    #[test]
    fn test_configurable_threshold() {
        let pos = positives();
        let cfg = SamplerConfig {
            threshold: 10.5,
            ..config(3)
        };
        let combined = generate(&pos, &SimilarAligner, cfg, &mut NoCheckpoint).unwrap();
        assert_eq!(combined.len(), pos.len() + 3);
        assert_eq!(combined[pos.len()].similarity_score(), Some(10.0));
    }

    #[test]
    fn test_aligner_failure_propagates() {
        let pos = positives();
        let res = generate(&pos, &BrokenAligner, config(3), &mut NoCheckpoint);
        assert!(res.is_err());
    }

    #[test]
    fn test_checkpoint_cadence() {
        let pos = positives();
        let aligner = EqualityAligner::default();
        let cfg = SamplerConfig {
            checkpoint_every: 2,
            ..config(4)
        };
        let mut sampler = NegativeSampler::new(&pos, &aligner, cfg).unwrap();
        let mut sink = RecordingSink::default();
        let mut totals = vec![];
        for _ in 0..5 {
            totals.push(sampler.run_round(&mut sink).unwrap().total);
        }
        // rounds 0, 2 and 4
        assert_eq!(sink.sizes, vec![totals[0], totals[2], totals[4]]);
    }

    #[test]
    fn test_file_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let pos = positives();
        let aligner = EqualityAligner::default();
        let mut sink = FileCheckpoint::new(dir.path());
        let mut sampler = NegativeSampler::new(&pos, &aligner, config(4)).unwrap();
        let stats = sampler.run_round(&mut sink).unwrap();

        let path = sink.path_for(stats.total);
        let saved = read_pairs(crate::reader(&path.to_string_lossy()).unwrap()).unwrap();
        assert_eq!(saved.len(), stats.total);
        assert!(saved.iter().all(|p| !p.binding_observed()));
    }

    #[test]
    fn test_zero_and_empty() {
        let aligner = EqualityAligner::default();
        let pos = positives();
        let combined = generate(&pos, &aligner, config(0), &mut NoCheckpoint).unwrap();
        assert_eq!(combined, pos);

        let res = NegativeSampler::new(&[], &aligner, config(3));
        assert!(res.is_err());
        assert!(generate(&[], &aligner, SamplerConfig::default(), &mut NoCheckpoint)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_negatives_rejected_as_input() {
        let aligner = EqualityAligner::default();
        let mut pos = positives();
        pos.push(BoundPair::Negative {
            cdr: record("x", "GSWK"),
            target: record("y", "DRH"),
            original_cdr: record("y", "PPGA"),
            similarity_score: -2.0,
        });
        assert!(NegativeSampler::new(&pos, &aligner, config(3)).is_err());
    }
}
