use tracing::debug;

use sequence::{Digram, Distance, KmerView, Sequence, SimilarityMatrix, Symbol};

use crate::{KernelError, KernelMode};

/// Per-row and per-column minima of the window distance grid.
///
/// `row_minima[r] = min_c W(r, c)` and `col_minima[c] = min_r W(r, c)`. Both
/// are empty when either sequence is shorter than `k`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowMinima {
    pub row_minima: Vec<Distance>,
    pub col_minima: Vec<Distance>,
}

impl WindowMinima {
    fn filled(rows: usize, cols: usize) -> Self {
        Self {
            row_minima: vec![Distance::MAX; rows],
            col_minima: vec![Distance::MAX; cols],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_minima.is_empty()
    }

    #[inline]
    fn update(&mut self, r: usize, c: usize, distance: Distance) {
        if distance < self.row_minima[r] {
            self.row_minima[r] = distance;
        }
        if distance < self.col_minima[c] {
            self.col_minima[c] = distance;
        }
    }
}

/// Diagonal sliding-window distance engine over one substitution matrix.
#[derive(Debug, Clone)]
pub struct DiagonalDistanceEngine {
    matrix: SimilarityMatrix,
    mode: KernelMode,
}

impl DiagonalDistanceEngine {
    /// Fails when digrams are forced but the matrix has no digram table.
    pub fn new(matrix: SimilarityMatrix, mode: KernelMode) -> Result<Self, KernelError> {
        if mode == KernelMode::Digrams && !matrix.has_digram_table() {
            return Err(KernelError::DigramTableUnavailable {
                matrix: matrix.name().to_owned(),
            });
        }
        debug!(
            matrix = matrix.name(),
            ?mode,
            digram_table = matrix.has_digram_table(),
            "distance kernel ready"
        );
        Ok(Self { matrix, mode })
    }

    /// Engine that always reads per-symbol costs.
    pub fn symbols(matrix: SimilarityMatrix) -> Self {
        Self {
            matrix,
            mode: KernelMode::Symbols,
        }
    }

    pub fn matrix(&self) -> &SimilarityMatrix {
        &self.matrix
    }

    pub fn mode(&self) -> KernelMode {
        self.mode
    }

    /// Whether windows of length `k` are summed from digram pair costs.
    pub fn uses_digrams(&self, k: usize) -> bool {
        self.digram_table_for(k).is_some()
    }

    fn digram_table_for(&self, k: usize) -> Option<&[Distance]> {
        if k < 2 || k % 2 != 0 || self.mode == KernelMode::Symbols {
            return None;
        }
        self.matrix.digram_table()
    }

    /// Row and column minima of every k-window pair between two sequences.
    pub fn window_distances(&self, query: &Sequence, subject: &Sequence, k: usize) -> WindowMinima {
        self.window_distances_raw(
            query.symbols(),
            query.digrams(),
            subject.symbols(),
            subject.digrams(),
            k,
        )
    }

    /// Same as [`window_distances`](Self::window_distances) on raw encodings.
    /// `digrams` must be the digram encoding of the matching `symbols`.
    pub fn window_distances_raw(
        &self,
        query: &[Symbol],
        query_digrams: &[Digram],
        subject: &[Symbol],
        subject_digrams: &[Digram],
        k: usize,
    ) -> WindowMinima {
        if k == 0 || query.len() < k || subject.len() < k {
            return WindowMinima::default();
        }
        let rows = query.len() - k + 1;
        let cols = subject.len() - k + 1;
        let mut out = WindowMinima::filled(rows, cols);

        match self.digram_table_for(k) {
            Some(table) => {
                let dd = self.matrix.dim() * self.matrix.dim();
                digram_diagonals(table, dd, query_digrams, subject_digrams, k, &mut out);
            }
            None => {
                symbol_diagonals(
                    self.matrix.cost_table(),
                    self.matrix.dim(),
                    query,
                    subject,
                    k,
                    &mut out,
                );
            }
        }
        out
    }

    /// Distance between two equally long k-mers at aligned offsets.
    #[inline]
    pub fn aligned_distance(&self, a: KmerView<'_>, b: KmerView<'_>) -> Distance {
        debug_assert_eq!(a.len(), b.len());
        match self.digram_table_for(a.len()) {
            Some(table) => {
                let dd = self.matrix.dim() * self.matrix.dim();
                a.digrams
                    .iter()
                    .zip(b.digrams)
                    .step_by(2)
                    .map(|(&x, &y)| table[x as usize * dd + y as usize])
                    .sum()
            }
            None => self.matrix.window_distance(a.symbols, b.symbols),
        }
    }
}

/// Diagonal starts: `(0, c)` for every column, then `(r, 0)` for `r > 0`.
fn diagonal_starts(rows: usize, cols: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..cols).map(|c| (0, c)).chain((1..rows).map(|r| (r, 0)))
}

fn symbol_diagonals(
    table: &[Distance],
    dim: usize,
    query: &[Symbol],
    subject: &[Symbol],
    k: usize,
    out: &mut WindowMinima,
) {
    let cost = |a: Symbol, b: Symbol| table[a as usize * dim + b as usize];
    let rows = out.row_minima.len();
    let cols = out.col_minima.len();
    let mut buf = vec![0 as Distance; k];

    for (r0, c0) in diagonal_starts(rows, cols) {
        let len = (rows - r0).min(cols - c0);

        let mut sum: Distance = 0;
        for (t, slot) in buf.iter_mut().enumerate() {
            *slot = cost(query[r0 + t], subject[c0 + t]);
            sum += *slot;
        }
        out.update(r0, c0, sum);

        let mut oldest = 0;
        for step in 1..len {
            let (r, c) = (r0 + step, c0 + step);
            let v = cost(query[r + k - 1], subject[c + k - 1]);
            sum += v - buf[oldest];
            buf[oldest] = v;
            oldest += 1;
            if oldest == k {
                oldest = 0;
            }
            out.update(r, c, sum);
        }
    }
}

fn digram_diagonals(
    table: &[Distance],
    dd: usize,
    query: &[Digram],
    subject: &[Digram],
    k: usize,
    out: &mut WindowMinima,
) {
    let cost = |a: Digram, b: Digram| table[a as usize * dd + b as usize];
    let half = k / 2;
    let rows = out.row_minima.len();
    let cols = out.col_minima.len();
    let mut buf = vec![0 as Distance; half];

    for (r0, c0) in diagonal_starts(rows, cols) {
        let len = (rows - r0).min(cols - c0);

        // Windows at even and odd steps share no digram terms; walk each
        // interleaving with its own buffer.
        for phase in 0..len.min(2) {
            let (r, c) = (r0 + phase, c0 + phase);
            let mut sum: Distance = 0;
            for (j, slot) in buf.iter_mut().enumerate() {
                *slot = cost(query[r + 2 * j], subject[c + 2 * j]);
                sum += *slot;
            }
            out.update(r, c, sum);

            let mut oldest = 0;
            let mut step = phase + 2;
            while step < len {
                let (r, c) = (r0 + step, c0 + step);
                let v = cost(query[r + k - 2], subject[c + k - 2]);
                sum += v - buf[oldest];
                buf[oldest] = v;
                oldest += 1;
                if oldest == half {
                    oldest = 0;
                }
                out.update(r, c, sum);
                step += 2;
            }
        }
    }
}
