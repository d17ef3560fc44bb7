//! Synthetic sequence data for the benchmarks.

#![allow(dead_code)]

use kmersearch::{Alphabet, FieldLayout, SequenceDatabase};

const DNA: &[u8] = b"acgt";

pub fn random_dna(rng: &mut fastrand::Rng, len: usize) -> String {
    (0..len).map(|_| DNA[rng.usize(..DNA.len())] as char).collect()
}

/// `families` seed sequences, each mutated into `per_family` members at
/// roughly `mutation_rate` substitutions per residue.
pub fn family_fasta(families: usize, per_family: usize, len: usize, mutation_rate: f64, seed: u64) -> String {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut fasta = String::new();
    for family in 0..families {
        let root = random_dna(&mut rng, len).into_bytes();
        for member in 0..per_family {
            let residues: String = root
                .iter()
                .map(|&c| {
                    if rng.f64() < mutation_rate {
                        DNA[rng.usize(..DNA.len())] as char
                    } else {
                        c as char
                    }
                })
                .collect();
            fasta.push_str(&format!(">f{family}_m{member}|family{family}\n{residues}\n"));
        }
    }
    fasta
}

pub fn family_db(families: usize, per_family: usize, len: usize) -> SequenceDatabase {
    let fasta = family_fasta(families, per_family, len, 0.05, 42);
    SequenceDatabase::from_fasta_str(&fasta, Alphabet::dna(), FieldLayout::new().with_class_field(Some(1)))
        .expect("generated fasta parses")
}
